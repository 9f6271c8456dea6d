//! Ring Traffic - Two-lane circular track simulation
//!
//! Vehicles accelerate around a ring road, dodge a fixed obstacle, overtake
//! slower traffic and stop on contact. The crate holds only the simulation;
//! windowing, input and drawing belong to the host, which owns one
//! [`Simulation`] per session and reads [`SimulationSnapshot`]s from it.
//!
//! Diagnostics go through the `log` facade. Install any logger in the host
//! to see them.

pub mod traffic;

pub use traffic::{
    create_shared_simulation, Color, Lane, SharedSimulation, Simulation, SimulationConfig,
    SimulationSnapshot, SimulationStats, Track, TrackConfig, TrafficError, Vehicle, VehicleId,
    VehicleKind, VehicleSnapshot,
};
