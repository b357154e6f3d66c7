//! Standalone vehicle simulation module
//!
//! This module contains the motion model and the engine that runs it. It has
//! no knowledge of message formats or transports, callers take snapshots and
//! do with them what they like.

mod clock;
mod config;
mod drivetrain;
mod geo;
mod route;
mod types;
mod vehicle;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{load_config, load_route, parse_route, SimConfig, DEFAULT_TICK_PERIOD_MS};
pub use drivetrain::{
    approach_target, shift, DriveControl, DrivetrainParams, TargetStatus,
    DEFAULT_ACCELERATION_FACTOR, DEFAULT_BASE_SPEED_KMH, DEFAULT_DECELERATION_FACTOR,
    DEFAULT_GEAR_COUNT, DEFAULT_MAX_RETARGET_DELTA_KMH, DEFAULT_MAX_RPM, DEFAULT_MIN_RPM,
    DEFAULT_RETARGET_HOLD_SECS, DEFAULT_RPM_BAND_FRACTION, DEFAULT_RPM_MIDPOINT_FRACTION,
    DEFAULT_STARTUP_BOOST_KMH, LAUNCH_SPEED_KMH,
};
pub use geo::{distance_km, move_toward, Wgs84, EARTH_RADIUS_KM};
pub use route::{Route, RouteStep};
pub use types::{VehicleEvent, VehicleState, MAX_PENDING_EVENTS};
pub use vehicle::Vehicle;
