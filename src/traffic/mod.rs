//! Traffic Module
//!
//! Vehicles circling a two-lane ring road with one fixed obstacle.
//! The host drives ticks and renders snapshots; everything else lives here.

pub mod config;
pub mod error;
pub mod geometry;
pub mod simulation;
pub mod track;
pub mod vehicle;

pub use config::{SimulationConfig, TrackConfig};
pub use error::TrafficError;
pub use simulation::{
    create_shared_simulation, SharedSimulation, Simulation, SimulationSnapshot, SimulationStats,
};
pub use track::Track;
pub use vehicle::{Color, Lane, Vehicle, VehicleId, VehicleKind, VehicleSnapshot};
