//! WGS84 coordinates and the great-circle helpers used to move the vehicle
//!
//! Pure functions only, no simulation state lives here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point on the WGS84 ellipsoid, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Wgs84 {
    pub latitude: f64,
    pub longitude: f64,
}

impl Wgs84 {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

impl From<(f64, f64)> for Wgs84 {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}

impl fmt::Display for Wgs84 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// Haversine great-circle distance between two points in kilometers.
///
/// Returns 0.0 for coincident points. The formula goes through `atan2`, so
/// antipodal points are fine as well.
pub fn distance_km(a: Wgs84, b: Wgs84) -> f64 {
    let d_lat = (a.latitude - b.latitude).to_radians();
    let d_lon = (a.longitude - b.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2);

    // Rounding can push h a hair outside [0, 1] near the antipode
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Point `km` kilometers from `from` toward `to`.
///
/// The intermediate point is interpolated linearly in degree space, which is
/// close enough for the short legs of a route. A factor above 1.0 moves past
/// `to` along the same line. When both points coincide there is no
/// direction to move in and `from` is returned unchanged.
pub fn move_toward(from: Wgs84, to: Wgs84, km: f64) -> Wgs84 {
    let distance = distance_km(from, to);
    if distance <= 0.0 {
        return from;
    }

    let factor = km / distance;
    if !factor.is_finite() {
        return from;
    }

    Wgs84 {
        latitude: from.latitude + factor * (to.latitude - from.latitude),
        longitude: from.longitude + factor * (to.longitude - from.longitude),
    }
}
