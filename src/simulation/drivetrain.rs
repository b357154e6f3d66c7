//! Drivetrain model: target speed selection, acceleration and gear shifting
//!
//! The vehicle keeps chasing a target speed. Once a target has been held for
//! a while a new one is picked at random around the current speed. Speed
//! grows geometrically toward the target and drops sharply when above it.
//! Gear and RPM are derived from the settled speed afterwards.

use anyhow::{ensure, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Lowest RPM considered acceptable while driving
pub const DEFAULT_MIN_RPM: f64 = 800.0;

/// Highest RPM the engine is driven at
pub const DEFAULT_MAX_RPM: f64 = 4000.0;

/// Number of forward gears
pub const DEFAULT_GEAR_COUNT: u32 = 6;

/// Fraction of the max RPM the shift logic aims for
pub const DEFAULT_RPM_MIDPOINT_FRACTION: f64 = 0.5;

/// Half width of the comfort band around the midpoint, as a fraction of max RPM
pub const DEFAULT_RPM_BAND_FRACTION: f64 = 0.2;

/// Top speed in first gear
pub const DEFAULT_BASE_SPEED_KMH: f64 = 30.0;

pub const DEFAULT_ACCELERATION_FACTOR: f64 = 1.04;
pub const DEFAULT_DECELERATION_FACTOR: f64 = 0.04;

/// How long a reached target speed is kept before picking a new one
pub const DEFAULT_RETARGET_HOLD_SECS: f64 = 5.0;

/// Upper bound of the random offset added to the basis speed on retarget
pub const DEFAULT_MAX_RETARGET_DELTA_KMH: f64 = 40.0;

/// Basis speed for the very first target, to get the vehicle going
pub const DEFAULT_STARTUP_BOOST_KMH: f64 = 100.0;

/// Speed a standing vehicle jumps to once it has somewhere to go.
/// Multiplying zero by the acceleration factor would never leave zero.
pub const LAUNCH_SPEED_KMH: f64 = 2.0;

/// Tunable drivetrain constants, fixed for the lifetime of a vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrivetrainParams {
    pub min_rpm: f64,
    pub max_rpm: f64,
    pub gear_count: u32,
    pub rpm_midpoint_fraction: f64,
    pub rpm_band_fraction: f64,
    pub base_speed_kmh: f64,
    pub acceleration_factor: f64,
    pub deceleration_factor: f64,
    pub retarget_hold_secs: f64,
    pub max_retarget_delta_kmh: f64,
    pub startup_boost_kmh: f64,
}

impl Default for DrivetrainParams {
    fn default() -> Self {
        Self {
            min_rpm: DEFAULT_MIN_RPM,
            max_rpm: DEFAULT_MAX_RPM,
            gear_count: DEFAULT_GEAR_COUNT,
            rpm_midpoint_fraction: DEFAULT_RPM_MIDPOINT_FRACTION,
            rpm_band_fraction: DEFAULT_RPM_BAND_FRACTION,
            base_speed_kmh: DEFAULT_BASE_SPEED_KMH,
            acceleration_factor: DEFAULT_ACCELERATION_FACTOR,
            deceleration_factor: DEFAULT_DECELERATION_FACTOR,
            retarget_hold_secs: DEFAULT_RETARGET_HOLD_SECS,
            max_retarget_delta_kmh: DEFAULT_MAX_RETARGET_DELTA_KMH,
            startup_boost_kmh: DEFAULT_STARTUP_BOOST_KMH,
        }
    }
}

impl DrivetrainParams {
    /// Lower edge of the RPM comfort band
    pub fn rpm_lower(&self) -> f64 {
        self.max_rpm * self.rpm_midpoint_fraction - self.max_rpm * self.rpm_band_fraction
    }

    /// Upper edge of the RPM comfort band
    pub fn rpm_upper(&self) -> f64 {
        self.max_rpm * self.rpm_midpoint_fraction + self.max_rpm * self.rpm_band_fraction
    }

    /// Hold duration in milliseconds
    pub fn retarget_hold_millis(&self) -> u64 {
        (self.retarget_hold_secs * 1000.0).round() as u64
    }

    /// RPM of the engine at `speed_kmh` in `gear`. Neutral always idles at 0.
    pub fn rpm_for(&self, speed_kmh: f64, gear: u32) -> f64 {
        if gear == 0 {
            return 0.0;
        }
        self.max_rpm * speed_kmh / (self.base_speed_kmh * gear as f64)
    }

    /// Check the parameters for values the model cannot work with
    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_rpm > 0.0, "max_rpm must be positive, got {}", self.max_rpm);
        ensure!(
            self.min_rpm >= 0.0 && self.min_rpm <= self.max_rpm,
            "min_rpm must lie within [0, max_rpm], got {}",
            self.min_rpm
        );
        ensure!(self.gear_count >= 1, "gear_count must be at least 1");
        ensure!(
            self.rpm_midpoint_fraction > 0.0 && self.rpm_midpoint_fraction < 1.0,
            "rpm_midpoint_fraction must lie within (0, 1), got {}",
            self.rpm_midpoint_fraction
        );
        ensure!(
            self.rpm_band_fraction >= 0.0 && self.rpm_band_fraction < self.rpm_midpoint_fraction,
            "rpm_band_fraction must lie within [0, rpm_midpoint_fraction), got {}",
            self.rpm_band_fraction
        );
        ensure!(
            self.base_speed_kmh > 0.0,
            "base_speed_kmh must be positive, got {}",
            self.base_speed_kmh
        );
        ensure!(
            self.acceleration_factor > 1.0,
            "acceleration_factor must be greater than 1, got {}",
            self.acceleration_factor
        );
        ensure!(
            self.deceleration_factor > 0.0 && self.deceleration_factor < 1.0,
            "deceleration_factor must lie within (0, 1), got {}",
            self.deceleration_factor
        );
        ensure!(
            self.retarget_hold_secs >= 0.0,
            "retarget_hold_secs must not be negative"
        );
        ensure!(
            self.max_retarget_delta_kmh > 0.0,
            "max_retarget_delta_kmh must be positive"
        );
        ensure!(
            self.startup_boost_kmh >= 0.0,
            "startup_boost_kmh must not be negative"
        );
        Ok(())
    }
}

/// Whether the current target speed has been attained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStatus {
    /// No target picked yet, the next update picks one
    Unset,
    /// Target reached at the given epoch millisecond
    ReachedAt(u64),
    /// Still accelerating or braking toward the target
    Pending,
}

/// Controller state steering the vehicle toward its target speed
#[derive(Debug, Clone, PartialEq)]
pub struct DriveControl {
    pub target_speed_kmh: f64,
    pub previous_speed_kmh: f64,
    pub startup_boost_kmh: f64,
    pub status: TargetStatus,
}

impl DriveControl {
    /// A fresh controller; the first update picks a real target straight away
    pub fn new(params: &DrivetrainParams) -> Self {
        Self {
            target_speed_kmh: 0.0,
            previous_speed_kmh: 0.0,
            startup_boost_kmh: params.startup_boost_kmh,
            status: TargetStatus::Unset,
        }
    }

    /// Whether the current target has been held long enough to pick a new one
    pub fn retarget_due(&self, now_ms: u64, params: &DrivetrainParams) -> bool {
        match self.status {
            TargetStatus::Unset => true,
            TargetStatus::ReachedAt(reached) => {
                now_ms.saturating_sub(reached) >= params.retarget_hold_millis()
            }
            TargetStatus::Pending => false,
        }
    }

    /// Pick a new target from a uniform `draw` in `[0, 1)`.
    ///
    /// The basis is the pending startup boost the first time, the current
    /// speed afterwards. Targets above the maximum delta are pulled down by
    /// half of it, which keeps them from growing without bound.
    pub fn retarget(&mut self, current_speed_kmh: f64, draw: f64, params: &DrivetrainParams) -> f64 {
        if self.startup_boost_kmh > 0.0 {
            self.previous_speed_kmh = self.startup_boost_kmh;
            self.startup_boost_kmh = 0.0;
        } else {
            self.previous_speed_kmh = current_speed_kmh;
        }

        let draw = draw.clamp(0.0, 1.0);
        let mut target = self.previous_speed_kmh + params.max_retarget_delta_kmh * draw;
        if target > params.max_retarget_delta_kmh {
            target -= params.max_retarget_delta_kmh / 2.0;
        }

        self.target_speed_kmh = target.max(0.0);
        self.status = TargetStatus::Pending;
        self.target_speed_kmh
    }

    /// Retarget if due, drawing from `rng`. Returns the new target, if any.
    pub fn maybe_retarget<R: Rng + ?Sized>(
        &mut self,
        current_speed_kmh: f64,
        now_ms: u64,
        params: &DrivetrainParams,
        rng: &mut R,
    ) -> Option<f64> {
        if !self.retarget_due(now_ms, params) {
            return None;
        }
        let draw: f64 = rng.random();
        Some(self.retarget(current_speed_kmh, draw, params))
    }

    /// Move `speed_kmh` one step toward the target and note when it gets there
    pub fn adjust_speed(&mut self, speed_kmh: f64, now_ms: u64, params: &DrivetrainParams) -> f64 {
        let speed = approach_target(speed_kmh, self.target_speed_kmh, params);
        if speed == self.target_speed_kmh && self.status == TargetStatus::Pending {
            self.status = TargetStatus::ReachedAt(now_ms);
        }
        speed
    }
}

/// One acceleration or braking step from `speed_kmh` toward `target_kmh`.
/// The result never overshoots the target.
pub fn approach_target(speed_kmh: f64, target_kmh: f64, params: &DrivetrainParams) -> f64 {
    let mut speed = speed_kmh.max(0.0);

    if target_kmh > 0.0 && speed == 0.0 {
        speed = LAUNCH_SPEED_KMH;
    }

    if speed < target_kmh {
        if speed < params.base_speed_kmh {
            // Steeper ramp below base speed so launching does not take ages
            speed *= params.acceleration_factor.powi(6);
        } else {
            speed *= params.acceleration_factor;
        }
        speed = speed.min(target_kmh);
    }

    if speed > target_kmh {
        speed *= params.deceleration_factor;
        speed = speed.max(target_kmh);
    }

    speed
}

/// Gear and RPM after settling at `speed_kmh`, starting from `gear`.
///
/// Shifts one gear at a time until the RPM sits inside the comfort band or
/// the gear is pinned at first or top gear. Bounded by the gear count.
pub fn shift(speed_kmh: f64, gear: u32, params: &DrivetrainParams) -> (u32, f64) {
    let mut gear = gear.min(params.gear_count);
    if speed_kmh > 0.0 && gear == 0 {
        gear = 1;
    }
    if gear == 0 {
        return (0, 0.0);
    }

    let lower = params.rpm_lower();
    let upper = params.rpm_upper();

    for _ in 0..params.gear_count {
        let rpm = params.rpm_for(speed_kmh, gear);

        if rpm > upper {
            gear = (gear + 1).min(params.gear_count);
            if gear == params.gear_count {
                break;
            }
        } else if rpm < lower {
            gear = gear.saturating_sub(1).max(1);
            if gear == 1 {
                break;
            }
        } else {
            break;
        }
    }

    // RPM always matches the gear that ends up engaged
    (gear, params.rpm_for(speed_kmh, gear))
}
