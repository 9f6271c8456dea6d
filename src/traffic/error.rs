//! Error - Failures that cross the simulation boundary
//!
//! Expected outcomes such as a rejected placement are reported through
//! `Option`/`bool` instead; only caller contract violations end up here.

use std::fmt;

use crate::traffic::vehicle::VehicleId;

#[derive(Debug, Clone, PartialEq)]
pub enum TrafficError {
    /// Track parameters that do not describe a usable ring road
    InvalidTrack { reason: String },
    /// Configuration text that could not be parsed
    InvalidConfig(String),
    /// A vehicle extent that is not a positive finite number
    InvalidExtent(f64),
    /// A per-vehicle mutation addressed a vehicle that is not in the simulation
    UnknownVehicle(VehicleId),
}

impl fmt::Display for TrafficError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrafficError::InvalidTrack { reason } => write!(f, "invalid track: {}", reason),
            TrafficError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            TrafficError::InvalidExtent(value) => {
                write!(f, "vehicle extent must be positive, got {}", value)
            }
            TrafficError::UnknownVehicle(id) => write!(f, "no vehicle with id {}", id.0),
        }
    }
}

impl std::error::Error for TrafficError {}

impl From<serde_json::Error> for TrafficError {
    fn from(e: serde_json::Error) -> Self {
        TrafficError::InvalidConfig(e.to_string())
    }
}
