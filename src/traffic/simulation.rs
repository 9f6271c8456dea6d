//! Simulation - Vehicle ownership, per-tick rules and the tick loop
//!
//! Each tick walks the vehicles in insertion order and, for every vehicle,
//! applies the rules below in a fixed order. A later rule may override an
//! earlier rule's acceleration or lane decision within the same tick.
//!
//! 1. integrate velocity and angle
//! 2. stop if the vehicle left the road
//! 3. stop if the vehicle touches the obstacle
//! 4. dodge the obstacle into the outer lane, or brake if that lane is busy
//! 5. return to the inner lane once clear of the obstacle
//! 6. overtake a close leader via the other lane, or brake
//! 7. stop on contact with any other vehicle
//!
//! Rules 2, 3 and 7 only zero the velocity; the vehicle is not moved back.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::f64::consts::TAU;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::traffic::config::{SimulationConfig, TrackConfig};
use crate::traffic::error::TrafficError;
use crate::traffic::geometry::{forward_offset, shortest_arc, Aabb};
use crate::traffic::track::Track;
use crate::traffic::vehicle::{Color, Lane, Vehicle, VehicleId, VehicleKind, VehicleSnapshot};

/// Minimum angular gap to any vehicle in a lane before moving into it
pub const LANE_CHANGE_GAP: f64 = 0.3;
/// Angular window ahead in which a same-lane vehicle counts as a leader
pub const FOLLOWING_WINDOW: f64 = 0.3;
/// Distance from the obstacle a dodging vehicle must reach before returning
pub const OBSTACLE_CLEARANCE: f64 = 0.5;
/// Acceleration applied when a vehicle has to brake
pub const BRAKE_ACCELERATION: f64 = -2.0;

/// Simulation statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationStats {
    pub ticks: u64,
    pub avg_tick_time_ms: f64,
    pub vehicle_count: u32,
    pub running: bool,
    pub default_acceleration: f64,
    /// Geometric placement tries made by random spawning, in total
    pub placement_attempts: u64,
}

/// Renderer-facing view of the whole simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub running: bool,
    pub center_x: f64,
    pub center_y: f64,
    pub inner_radius: f64,
    pub lane_width: f64,
    pub outer_radius: f64,
    pub obstacle: Aabb,
    pub obstacle_rotation: f64,
    pub vehicles: Vec<VehicleSnapshot>,
}

impl SimulationSnapshot {
    pub fn to_json(&self) -> Result<String, TrafficError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Traffic simulation on a single ring track
pub struct Simulation {
    track: Track,
    /// Live vehicles in insertion order
    vehicles: Vec<Vehicle>,
    next_id: u32,
    default_acceleration: f64,
    /// Global cap override
    max_velocity: Option<f64>,
    /// Per-kind cap overrides, set after the global one
    kind_max_velocity: HashMap<VehicleKind, f64>,
    placement_attempts: u32,
    rng: StdRng,
    running: bool,
    /// Baseline for the next delta. `None` right after start.
    last_tick: Option<Instant>,
    tick_times: VecDeque<f64>,
    tick_history: usize,
    ticks: u64,
    attempts_made: u64,
}

impl Simulation {
    /// Create a stopped simulation with no vehicles
    pub fn new(config: SimulationConfig) -> Result<Self, TrafficError> {
        let track = Track::from_config(&config.track)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        log::info!(
            "Simulation created: inner radius {}, lane width {}, obstacle at {:.3} rad",
            track.inner_radius(),
            track.lane_width(),
            track.obstacle_angle()
        );

        Ok(Self {
            track,
            vehicles: Vec::new(),
            next_id: 0,
            default_acceleration: config.default_acceleration,
            max_velocity: config.max_velocity.map(|v| v.max(0.0)),
            kind_max_velocity: HashMap::new(),
            placement_attempts: config.placement_attempts,
            rng,
            running: false,
            last_tick: None,
            tick_times: VecDeque::with_capacity(config.tick_history),
            tick_history: config.tick_history,
            ticks: 0,
            attempts_made: 0,
        })
    }

    /// Advance every vehicle by `delta` seconds
    pub fn update(&mut self, delta: f64) {
        let tick_start = Instant::now();

        for index in 0..self.vehicles.len() {
            self.step_vehicle(index, delta);
        }

        self.ticks += 1;
        let tick_time = tick_start.elapsed().as_secs_f64() * 1000.0;
        self.tick_times.push_back(tick_time);
        while self.tick_times.len() > self.tick_history {
            self.tick_times.pop_front();
        }
        log::trace!(
            "Tick {} advanced {} vehicles by {:.4}s",
            self.ticks,
            self.vehicles.len(),
            delta
        );
    }

    fn step_vehicle(&mut self, index: usize, delta: f64) {
        let track = &self.track;
        let vehicles = &mut self.vehicles;

        vehicles[index].integrate(delta);

        let (x, y) = vehicles[index].position();
        if !track.is_on_road(x, y) {
            vehicles[index].set_velocity(0.0);
        }

        if track.collides_with_obstacle(&vehicles[index]) {
            vehicles[index].set_velocity(0.0);
        }

        // Obstacle avoidance
        if vehicles[index].lane() == Lane::Inner
            && !vehicles[index].is_changing_lane()
            && track.is_near_obstacle(&vehicles[index])
        {
            if lane_is_clear(vehicles, index, Lane::Outer) {
                let vehicle = &mut vehicles[index];
                vehicle.set_changing_lane(true);
                vehicle.change_lane(Lane::Outer, track.inner_radius(), track.lane_width());
                log::debug!("Vehicle {} dodging obstacle into outer lane", vehicle.id().0);
            } else {
                vehicles[index].set_acceleration(BRAKE_ACCELERATION);
                log::debug!("Vehicle {} braking before obstacle", vehicles[index].id().0);
            }
        }

        // Return to the inner lane after passing the obstacle
        if vehicles[index].is_changing_lane()
            && vehicles[index].lane() == Lane::Outer
            && shortest_arc(vehicles[index].angle(), track.obstacle_angle()) > OBSTACLE_CLEARANCE
            && lane_is_clear(vehicles, index, Lane::Inner)
        {
            let vehicle = &mut vehicles[index];
            vehicle.set_changing_lane(false);
            vehicle.change_lane(Lane::Inner, track.inner_radius(), track.lane_width());
            log::debug!("Vehicle {} back in inner lane", vehicle.id().0);
        }

        // Car following
        if !vehicles[index].is_changing_lane() {
            if let Some(leader) = find_leader(vehicles, index) {
                let leader_id = vehicles[leader].id();
                let target = vehicles[index].lane().opposite();
                if lane_is_clear(vehicles, index, target) {
                    let vehicle = &mut vehicles[index];
                    vehicle.set_changing_lane(true);
                    vehicle.change_lane(target, track.inner_radius(), track.lane_width());
                    log::debug!(
                        "Vehicle {} overtaking vehicle {} via {:?} lane",
                        vehicle.id().0,
                        leader_id.0,
                        target
                    );
                } else {
                    vehicles[index].set_acceleration(BRAKE_ACCELERATION);
                }
            }
        }

        let me = &vehicles[index];
        let colliding = vehicles
            .iter()
            .enumerate()
            .any(|(other, v)| other != index && me.collides_with(v));
        if colliding {
            vehicles[index].set_velocity(0.0);
        }
    }

    /// Place a vehicle at a point. The point is snapped onto the center
    /// line of the lane it falls in. Returns `None` on overlap.
    pub fn spawn_at(
        &mut self,
        kind: VehicleKind,
        x: f64,
        y: f64,
        color: Option<Color>,
    ) -> Option<VehicleId> {
        let lane = self.track.lane_for_point(x, y);
        let angle = self.track.angle_of(x, y);
        let id = self.try_place(kind, lane, angle, color.unwrap_or(kind.default_color()));
        if id.is_none() {
            log::debug!("Placement of {:?} at ({:.1}, {:.1}) rejected", kind, x, y);
        }
        id
    }

    /// Place a vehicle at a random angle and lane, giving up after the
    /// configured number of attempts
    pub fn spawn_random(&mut self, kind: VehicleKind, color: Option<Color>) -> Option<VehicleId> {
        let color = color.unwrap_or(kind.default_color());

        for _ in 0..self.placement_attempts {
            self.attempts_made += 1;
            let angle = self.rng.gen::<f64>() * TAU;
            let lane = if self.rng.gen_bool(0.5) { Lane::Outer } else { Lane::Inner };

            if let Some(id) = self.try_place(kind, lane, angle, color) {
                return Some(id);
            }
        }

        log::warn!(
            "No free spot for {:?} after {} attempts ({} vehicles on track)",
            kind,
            self.placement_attempts,
            self.vehicles.len()
        );
        None
    }

    /// Spawn up to `count` vehicles at random, returning how many were placed
    pub fn spawn_many(&mut self, kind: VehicleKind, count: u32, color: Option<Color>) -> u32 {
        (0..count)
            .filter(|_| self.spawn_random(kind, color).is_some())
            .count() as u32
    }

    fn try_place(
        &mut self,
        kind: VehicleKind,
        lane: Lane,
        angle: f64,
        color: Color,
    ) -> Option<VehicleId> {
        let mut vehicle = Vehicle::new(
            VehicleId(self.next_id),
            kind,
            &self.track,
            angle,
            lane,
            color,
        );

        if self.track.collides_with_obstacle(&vehicle)
            || self.vehicles.iter().any(|other| vehicle.collides_with(other))
        {
            return None;
        }

        vehicle.set_max_velocity(self.max_velocity_for(kind));
        vehicle.set_acceleration(self.default_acceleration);

        let id = vehicle.id();
        self.next_id = self.next_id.wrapping_add(1);
        self.vehicles.push(vehicle);
        log::debug!("Placed {:?} {} in {:?} lane at {:.3} rad", kind, id.0, lane, angle);
        Some(id)
    }

    fn max_velocity_for(&self, kind: VehicleKind) -> f64 {
        self.kind_max_velocity
            .get(&kind)
            .copied()
            .or(self.max_velocity)
            .unwrap_or(kind.default_max_velocity())
    }

    /// Remove a vehicle. Unknown ids are ignored and return false.
    pub fn remove(&mut self, id: VehicleId) -> bool {
        match self.vehicles.iter().position(|v| v.id() == id) {
            Some(index) => {
                self.vehicles.remove(index);
                log::debug!("Removed vehicle {}", id.0);
                true
            }
            None => false,
        }
    }

    /// Remove one vehicle chosen at random. False if there are none.
    pub fn remove_random(&mut self) -> bool {
        if self.vehicles.is_empty() {
            return false;
        }
        let index = self.rng.gen_range(0..self.vehicles.len());
        let id = self.vehicles[index].id();
        self.remove(id)
    }

    /// Set the acceleration of every vehicle and of future spawns
    pub fn set_default_acceleration(&mut self, acceleration: f64) {
        self.default_acceleration = acceleration;
        for vehicle in &mut self.vehicles {
            vehicle.set_acceleration(acceleration);
        }
        log::info!("Default acceleration set to {}", acceleration);
    }

    /// Cap every vehicle's speed, now and for future spawns.
    /// Clears any per-kind caps.
    pub fn set_global_max_velocity(&mut self, max_velocity: f64) {
        let max_velocity = max_velocity.max(0.0);
        self.max_velocity = Some(max_velocity);
        self.kind_max_velocity.clear();
        for vehicle in &mut self.vehicles {
            vehicle.set_max_velocity(max_velocity);
        }
        log::info!("Global max velocity set to {}", max_velocity);
    }

    /// Cap the speed of one vehicle kind, now and for future spawns
    pub fn set_kind_max_velocity(&mut self, kind: VehicleKind, max_velocity: f64) {
        let max_velocity = max_velocity.max(0.0);
        self.kind_max_velocity.insert(kind, max_velocity);
        for vehicle in self.vehicles.iter_mut().filter(|v| v.kind() == kind) {
            vehicle.set_max_velocity(max_velocity);
        }
        log::info!("Max velocity for {:?} set to {}", kind, max_velocity);
    }

    /// Move a vehicle to another lane in place
    pub fn set_vehicle_lane(&mut self, id: VehicleId, lane: Lane) -> Result<(), TrafficError> {
        let (inner_radius, lane_width) = (self.track.inner_radius(), self.track.lane_width());
        let vehicle = self.vehicle_mut(id).ok_or(TrafficError::UnknownVehicle(id))?;
        vehicle.change_lane(lane, inner_radius, lane_width);
        Ok(())
    }

    /// Replace the track. Vehicles keep their angle and lane; any vehicle
    /// that then overlaps the obstacle or an earlier kept vehicle is
    /// removed. Returns the removed ids in insertion order.
    pub fn set_track(&mut self, config: &TrackConfig) -> Result<Vec<VehicleId>, TrafficError> {
        let track = Track::from_config(config)?;

        let mut kept: Vec<Vehicle> = Vec::with_capacity(self.vehicles.len());
        let mut dropped = Vec::new();
        for mut vehicle in self.vehicles.drain(..) {
            vehicle.rebase(&track);
            if track.collides_with_obstacle(&vehicle)
                || kept.iter().any(|other| vehicle.collides_with(other))
            {
                log::warn!(
                    "Vehicle {} no longer fits on the resized track, removing it",
                    vehicle.id().0
                );
                dropped.push(vehicle.id());
            } else {
                kept.push(vehicle);
            }
        }

        self.vehicles = kept;
        self.track = track;
        log::info!(
            "Track replaced: inner radius {}, lane width {}, {} vehicles removed",
            self.track.inner_radius(),
            self.track.lane_width(),
            dropped.len()
        );
        Ok(dropped)
    }

    /// Start ticking. The first tick afterwards only sets the time baseline.
    pub fn start(&mut self) {
        if !self.running {
            self.running = true;
            self.last_tick = None;
            log::info!("Simulation started with {} vehicles", self.vehicles.len());
        }
    }

    pub fn stop(&mut self) {
        if self.running {
            self.running = false;
            log::info!("Simulation stopped after {} ticks", self.ticks);
        }
    }

    /// Drive the simulation from a host clock, returning the seconds
    /// simulated. Does nothing while stopped.
    pub fn tick_at(&mut self, now: Instant) -> f64 {
        if !self.running {
            return 0.0;
        }

        let delta = match self.last_tick {
            Some(previous) => now.saturating_duration_since(previous).as_secs_f64(),
            None => {
                self.last_tick = Some(now);
                return 0.0;
            }
        };
        self.last_tick = Some(now);

        self.update(delta);
        delta
    }

    pub fn tick(&mut self) -> f64 {
        self.tick_at(Instant::now())
    }

    /// First vehicle whose box contains the point
    pub fn vehicle_at(&self, x: f64, y: f64) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.contains_point(x, y))
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id() == id)
    }

    pub fn vehicle_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.iter_mut().find(|v| v.id() == id)
    }

    /// Vehicles in insertion order
    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.iter()
    }

    pub fn vehicles_of_kind(&self, kind: VehicleKind) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.iter().filter(move |v| v.kind() == kind)
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn default_acceleration(&self) -> f64 {
        self.default_acceleration
    }

    pub fn snapshot(&self) -> SimulationSnapshot {
        let (center_x, center_y) = self.track.center();
        SimulationSnapshot {
            running: self.running,
            center_x,
            center_y,
            inner_radius: self.track.inner_radius(),
            lane_width: self.track.lane_width(),
            outer_radius: self.track.outer_radius(),
            obstacle: self.track.obstacle_bounds(),
            obstacle_rotation: self.track.obstacle_rotation_degrees(),
            vehicles: self.vehicles.iter().map(VehicleSnapshot::from).collect(),
        }
    }

    pub fn stats(&self) -> SimulationStats {
        let avg_tick_time = if self.tick_times.is_empty() {
            0.0
        } else {
            self.tick_times.iter().sum::<f64>() / self.tick_times.len() as f64
        };

        SimulationStats {
            ticks: self.ticks,
            avg_tick_time_ms: avg_tick_time,
            vehicle_count: self.vehicles.len() as u32,
            running: self.running,
            default_acceleration: self.default_acceleration,
            placement_attempts: self.attempts_made,
        }
    }
}

/// True if no other vehicle in `lane` is within [`LANE_CHANGE_GAP`] of
/// the vehicle at `index`, in either direction
fn lane_is_clear(vehicles: &[Vehicle], index: usize, lane: Lane) -> bool {
    let angle = vehicles[index].angle();
    vehicles
        .iter()
        .enumerate()
        .filter(|(other, v)| *other != index && v.lane() == lane)
        .all(|(_, v)| shortest_arc(angle, v.angle()) >= LANE_CHANGE_GAP)
}

/// Nearest same-lane vehicle strictly ahead within [`FOLLOWING_WINDOW`]
fn find_leader(vehicles: &[Vehicle], index: usize) -> Option<usize> {
    let me = &vehicles[index];
    vehicles
        .iter()
        .enumerate()
        .filter(|(other, v)| *other != index && v.lane() == me.lane())
        .map(|(other, v)| (other, forward_offset(me.angle(), v.angle())))
        .filter(|(_, offset)| *offset > 0.0 && *offset < FOLLOWING_WINDOW)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(other, _)| other)
}

/// Thread-safe simulation handle. Holding the lock for a whole `update`
/// keeps the per-tick rules on a consistent snapshot.
pub type SharedSimulation = Arc<Mutex<Simulation>>;

/// Create a new shared simulation
pub fn create_shared_simulation(config: SimulationConfig) -> Result<SharedSimulation, TrafficError> {
    Ok(Arc::new(Mutex::new(Simulation::new(config)?)))
}
