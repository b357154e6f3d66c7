//! Vehicle Simulation Library
//!
//! Simulates a vehicle driving a closed loop of waypoints, with an optional
//! JSON message layer for publishing its sensor data.

pub mod messages;
pub mod simulation;
