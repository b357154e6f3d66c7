//! Simulation settings and the JSON files they can be loaded from

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::drivetrain::DrivetrainParams;
use super::geo::Wgs84;

/// Milliseconds between two simulation ticks
pub const DEFAULT_TICK_PERIOD_MS: u64 = 500;

/// Settings for one simulated vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub tick_period_ms: u64,
    pub drivetrain: DrivetrainParams,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: DEFAULT_TICK_PERIOD_MS,
            drivetrain: DrivetrainParams::default(),
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.tick_period_ms > 0, "tick_period_ms must be positive");
        self.drivetrain
            .validate()
            .context("Invalid drivetrain parameters")
    }
}

/// Read a [`SimConfig`] from a JSON file. Missing fields keep their defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<SimConfig> {
    let path = path.as_ref();
    let raw = std::fs::read(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: SimConfig = serde_json::from_slice(&raw)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Read a route from a JSON array of `{"latitude": .., "longitude": ..}` objects
pub fn load_route(path: impl AsRef<Path>) -> Result<Vec<Wgs84>> {
    let path = path.as_ref();
    let raw = std::fs::read(path)
        .with_context(|| format!("Failed to read route file {}", path.display()))?;
    parse_route(&raw).with_context(|| format!("Failed to parse route file {}", path.display()))
}

/// Parse route JSON. Every waypoint must be a finite coordinate.
pub fn parse_route(json: &[u8]) -> Result<Vec<Wgs84>> {
    let waypoints: Vec<Wgs84> = serde_json::from_slice(json)?;
    for (index, waypoint) in waypoints.iter().enumerate() {
        ensure!(
            waypoint.is_finite(),
            "Waypoint {} is not a finite coordinate",
            index
        );
    }
    Ok(waypoints)
}
