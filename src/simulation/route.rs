//! Cyclic waypoint route with a leg cursor
//!
//! The route remembers which waypoint was passed last and how far the vehicle
//! has driven on the current leg. Positions are always derived from the leg
//! start, so the position update and the leg rollover in one step agree on
//! the same pair of endpoints.

use super::geo::{distance_km, move_toward, Wgs84};

/// Outcome of advancing the vehicle along its route for one step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RouteStep {
    /// The vehicle moved along the current leg
    Moved(Wgs84),
    /// The vehicle reached the end of its leg; `waypoint` is the new leg start
    WaypointReached { position: Wgs84, waypoint: usize },
    /// Fewer than two waypoints, the position stays where it is.
    /// `first_report` is only true for the first step that ran into this.
    NoRoute { first_report: bool },
}

impl RouteStep {
    /// New position, if the step produced one
    pub fn position(&self) -> Option<Wgs84> {
        match self {
            RouteStep::Moved(position) => Some(*position),
            RouteStep::WaypointReached { position, .. } => Some(*position),
            RouteStep::NoRoute { .. } => None,
        }
    }
}

/// A closed loop of waypoints; the successor of the last waypoint is the first
#[derive(Debug, Clone, Default)]
pub struct Route {
    waypoints: Vec<Wgs84>,
    current_leg_start: usize,
    distance_on_leg_km: f64,
    no_route_reported: bool,
}

impl Route {
    pub fn new(waypoints: Vec<Wgs84>) -> Self {
        Self {
            waypoints,
            ..Self::default()
        }
    }

    pub fn waypoints(&self) -> &[Wgs84] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Whether the route has at least one leg to drive on
    pub fn is_drivable(&self) -> bool {
        self.waypoints.len() >= 2
    }

    /// Where a vehicle on this route starts out
    pub fn start_position(&self) -> Option<Wgs84> {
        self.waypoints.first().copied()
    }

    /// Index of the waypoint passed last
    pub fn current_leg_start(&self) -> usize {
        self.current_leg_start
    }

    /// Kilometers driven since the last waypoint
    pub fn distance_on_leg_km(&self) -> f64 {
        self.distance_on_leg_km
    }

    fn next_index(&self, index: usize) -> usize {
        if index + 1 < self.waypoints.len() {
            index + 1
        } else {
            0
        }
    }

    /// Current leg as (start, end) points, if the route has one
    pub fn current_leg(&self) -> Option<(Wgs84, Wgs84)> {
        if !self.is_drivable() {
            return None;
        }
        let start = self.waypoints[self.current_leg_start];
        let end = self.waypoints[self.next_index(self.current_leg_start)];
        Some((start, end))
    }

    /// Total length of the closed loop in kilometers
    pub fn loop_length_km(&self) -> f64 {
        if !self.is_drivable() {
            return 0.0;
        }
        (0..self.waypoints.len())
            .map(|i| distance_km(self.waypoints[i], self.waypoints[self.next_index(i)]))
            .sum()
    }

    /// Drive `speed_kmh` for `elapsed_secs` along the current leg.
    ///
    /// Once the distance driven on the leg reaches the leg length the cursor
    /// moves on to the next waypoint (wrapping around after the last one) and
    /// the leg distance starts over at zero. Any distance beyond the leg end
    /// is dropped.
    pub fn advance(&mut self, speed_kmh: f64, elapsed_secs: f64) -> RouteStep {
        let Some((leg_start, leg_end)) = self.current_leg() else {
            let first_report = !self.no_route_reported;
            self.no_route_reported = true;
            return RouteStep::NoRoute { first_report };
        };

        let traveled_km = (speed_kmh * elapsed_secs / 3600.0).max(0.0);
        if traveled_km.is_finite() {
            self.distance_on_leg_km += traveled_km;
        }

        let leg_length = distance_km(leg_start, leg_end);
        if self.distance_on_leg_km >= leg_length {
            self.current_leg_start = self.next_index(self.current_leg_start);
            self.distance_on_leg_km = 0.0;
            return RouteStep::WaypointReached {
                position: leg_end,
                waypoint: self.current_leg_start,
            };
        }

        RouteStep::Moved(move_toward(leg_start, leg_end, self.distance_on_leg_km))
    }
}
