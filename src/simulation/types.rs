//! Core value types shared by the engine and its callers

use super::geo::Wgs84;

/// Observable state of one simulated vehicle.
///
/// The engine keeps the live copy behind its lock; callers only ever get
/// owned clones of it.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    /// Epoch milliseconds of the last update
    pub time: u64,
    pub vehicle_id: String,
    pub running: bool,
    pub position: Wgs84,
    pub speed_kmh: f64,
    pub rpm: f64,
    /// 0 is neutral, 1..=gear_count are the forward gears
    pub gear: u32,
}

impl VehicleState {
    pub fn new(vehicle_id: impl Into<String>, position: Wgs84, time: u64) -> Self {
        Self {
            time,
            vehicle_id: vehicle_id.into(),
            running: false,
            position,
            speed_kmh: 0.0,
            rpm: 0.0,
            gear: 0,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.position.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.position.longitude
    }

    /// One-line summary for console output
    pub fn summary(&self) -> String {
        format!(
            "{} | {} | {:.1} km/h | {:.0} rpm | gear {} | {}",
            self.vehicle_id,
            if self.running { "running" } else { "stopped" },
            self.speed_kmh,
            self.rpm,
            self.gear,
            self.position
        )
    }
}

/// Things that happened inside the engine which callers may want to report
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleEvent {
    Started,
    Stopped,
    /// The route has fewer than two waypoints; raised once per vehicle
    NoRoute,
    /// The vehicle passed a waypoint, `index` is the new leg start
    WaypointReached { index: usize, position: Wgs84 },
    /// A new target speed was picked
    NewTarget { kmh: f64 },
}

/// Most events kept before the oldest ones are dropped
pub const MAX_PENDING_EVENTS: usize = 64;
