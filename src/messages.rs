//! JSON messages describing a vehicle
//!
//! Thin value objects for whatever carries vehicle data to other parties.
//! The simulation itself never looks at them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::simulation::VehicleState;

/// Message type tag carried by every sensor message
pub const SENSOR_DATA_TYPE: &str = "SENSOR_DATA";

fn sensor_data_type() -> String {
    SENSOR_DATA_TYPE.to_string()
}

/// Current sensor readings of one vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorMessage {
    /// Epoch milliseconds
    pub time: u64,
    #[serde(rename = "type", default = "sensor_data_type")]
    pub message_type: String,
    pub vehicle_id: String,
    pub running: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub rpm: f64,
    pub kmh: f64,
    /// 0 is neutral
    pub gear: u32,
}

impl From<&VehicleState> for SensorMessage {
    fn from(state: &VehicleState) -> Self {
        Self {
            time: state.time,
            message_type: sensor_data_type(),
            vehicle_id: state.vehicle_id.clone(),
            running: state.running,
            latitude: state.latitude(),
            longitude: state.longitude(),
            rpm: state.rpm,
            kmh: state.speed_kmh,
            gear: state.gear,
        }
    }
}

impl SensorMessage {
    /// UTF-8 encoded JSON
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).context("Failed to encode sensor message")
    }

    pub fn from_json(json: &[u8]) -> Result<Self> {
        serde_json::from_slice(json).context("Failed to decode sensor message")
    }
}

/// Kind of a status message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusType {
    VehicleReady,
    Info,
    Warning,
}

/// Out-of-band notice about a vehicle, e.g. that it came online
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    pub time: u64,
    pub vehicle_id: String,
    #[serde(rename = "type")]
    pub status_type: StatusType,
    #[serde(default)]
    pub message: String,
}

impl StatusMessage {
    pub fn new(
        time: u64,
        vehicle_id: impl Into<String>,
        status_type: StatusType,
        message: impl Into<String>,
    ) -> Self {
        Self {
            time,
            vehicle_id: vehicle_id.into(),
            status_type,
            message: message.into(),
        }
    }

    /// UTF-8 encoded JSON
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).context("Failed to encode status message")
    }

    pub fn from_json(json: &[u8]) -> Result<Self> {
        serde_json::from_slice(json).context("Failed to decode status message")
    }
}
