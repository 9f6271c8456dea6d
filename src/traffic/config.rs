//! Config - Simulation session configuration
//!
//! Hosts either build a [`SimulationConfig`] in code or parse one from JSON.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

use crate::traffic::error::TrafficError;

/// Track construction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackConfig {
    pub center_x: f64,
    pub center_y: f64,
    /// Radius of the inner road edge
    pub inner_radius: f64,
    pub lane_width: f64,
    /// Obstacle position in radians
    pub obstacle_angle: f64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            center_x: 400.0,
            center_y: 300.0,
            inner_radius: 150.0,
            lane_width: 50.0,
            obstacle_angle: FRAC_PI_2,
        }
    }
}

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub track: TrackConfig,
    /// Acceleration given to every vehicle on spawn
    pub default_acceleration: f64,
    /// Global speed cap. `None` keeps each kind's own cap.
    pub max_velocity: Option<f64>,
    /// Random placement tries before giving up
    pub placement_attempts: u32,
    /// Seed for placement and removal randomness
    pub seed: Option<u64>,
    /// Number of tick timings kept for statistics
    pub tick_history: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            track: TrackConfig::default(),
            default_acceleration: 1.0,
            max_velocity: None,
            placement_attempts: 50,
            seed: None,
            tick_history: 60,
        }
    }
}

impl SimulationConfig {
    /// Parse a configuration. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, TrafficError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, TrafficError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let config = SimulationConfig::from_json(
            r#"{ "track": { "inner_radius": 200.0 }, "seed": 7 }"#,
        )
        .unwrap();
        assert_eq!(config.track.inner_radius, 200.0);
        assert_eq!(config.track.lane_width, 50.0);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.placement_attempts, 50);
        assert_eq!(config.default_acceleration, 1.0);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = SimulationConfig::from_json(r#"{ "lanes": 3 }"#).unwrap_err();
        assert!(matches!(err, TrafficError::InvalidConfig(_)));
    }

    #[test]
    fn serialized_config_parses_back() {
        let mut config = SimulationConfig::default();
        config.max_velocity = Some(2.5);
        let text = config.to_json().unwrap();
        assert_eq!(SimulationConfig::from_json(&text).unwrap(), config);
    }
}
