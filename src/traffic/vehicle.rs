//! Vehicle - Kinematic state of a single vehicle on the ring
//!
//! A vehicle is stored in polar form (angle plus lane radius) around the
//! track center. Cartesian position, heading and the collision box are
//! derived on demand. The two vehicle kinds share all behavior and differ
//! only in their dimensions and default speed cap.

use serde::{Deserialize, Serialize};

use crate::traffic::error::TrafficError;
use crate::traffic::geometry::{normalize_angle, Aabb};
use crate::traffic::track::{lane_radius, Track};

/// Scales simulated speed relative to wall-clock time
pub const SPEED_MULTIPLIER: f64 = 3.0;

/// Stable handle for a vehicle owned by a simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(pub u32);

/// Vehicle kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleKind {
    CompactCar,
    Truck,
}

impl VehicleKind {
    /// Extent along the direction of travel
    pub fn width(self) -> f64 {
        match self {
            VehicleKind::CompactCar => 60.0,
            VehicleKind::Truck => 120.0,
        }
    }

    /// Extent across the direction of travel
    pub fn height(self) -> f64 {
        match self {
            VehicleKind::CompactCar => 30.0,
            VehicleKind::Truck => 40.0,
        }
    }

    pub fn default_max_velocity(self) -> f64 {
        match self {
            VehicleKind::CompactCar => 3.0,
            VehicleKind::Truck => 2.0,
        }
    }

    pub fn default_color(self) -> Color {
        match self {
            VehicleKind::CompactCar => Color::BLUE,
            VehicleKind::Truck => Color::RED,
        }
    }
}

/// Lane on the two-lane ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lane {
    Inner,
    Outer,
}

impl Lane {
    /// 0 for the inner lane, 1 for the outer lane
    pub fn index(self) -> u8 {
        match self {
            Lane::Inner => 0,
            Lane::Outer => 1,
        }
    }

    pub fn opposite(self) -> Lane {
        match self {
            Lane::Inner => Lane::Outer,
            Lane::Outer => Lane::Inner,
        }
    }
}

/// Display color. The simulation never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Complete state for a single vehicle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vehicle {
    id: VehicleId,
    kind: VehicleKind,
    /// Track center the polar position is measured from
    center: (f64, f64),
    /// Polar angle in [0, 2π)
    angle: f64,
    lane: Lane,
    lane_radius: f64,
    /// Collision extent along the direction of travel
    width: f64,
    /// Collision extent across the direction of travel
    height: f64,
    velocity: f64,
    acceleration: f64,
    max_velocity: f64,
    changing_lane: bool,
    color: Color,
}

impl Vehicle {
    /// Create a stationary vehicle on `track` with the kind's default
    /// size and speed cap
    pub fn new(
        id: VehicleId,
        kind: VehicleKind,
        track: &Track,
        angle: f64,
        lane: Lane,
        color: Color,
    ) -> Self {
        Self {
            id,
            kind,
            center: track.center(),
            angle: normalize_angle(angle),
            lane,
            lane_radius: track.lane_radius(lane),
            width: kind.width(),
            height: kind.height(),
            velocity: 0.0,
            acceleration: 0.0,
            max_velocity: kind.default_max_velocity(),
            changing_lane: false,
            color,
        }
    }

    /// Advance velocity and angular position by one step.
    ///
    /// The angular step is v / r, so the inner lane sweeps a larger angle
    /// than the outer lane at the same speed.
    pub fn integrate(&mut self, delta: f64) {
        let delta = delta.max(0.0);
        self.velocity = self.clamp_velocity(self.velocity + self.acceleration * delta);
        self.angle = normalize_angle(
            self.angle + self.velocity * delta * SPEED_MULTIPLIER / self.lane_radius,
        );
    }

    /// Move to `lane` in place. The angle is kept, only the radius jumps.
    pub fn change_lane(&mut self, lane: Lane, inner_radius: f64, lane_width: f64) {
        self.lane = lane;
        self.lane_radius = lane_radius(inner_radius, lane_width, lane);
    }

    /// Re-anchor on a rebuilt track, keeping angle and lane
    pub(crate) fn rebase(&mut self, track: &Track) {
        self.center = track.center();
        self.change_lane(self.lane, track.inner_radius(), track.lane_width());
    }

    /// Unrotated bounding box around the current position
    pub fn bounds(&self) -> Aabb {
        let (x, y) = self.position();
        Aabb::centered(x, y, self.width, self.height)
    }

    pub fn collides_with(&self, other: &Vehicle) -> bool {
        self.bounds().intersects(&other.bounds())
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.bounds().contains(x, y)
    }

    fn clamp_velocity(&self, velocity: f64) -> f64 {
        velocity.min(self.max_velocity).max(0.0)
    }

    /// Cartesian position
    pub fn position(&self) -> (f64, f64) {
        (
            self.center.0 + self.lane_radius * self.angle.cos(),
            self.center.1 + self.lane_radius * self.angle.sin(),
        )
    }

    /// Direction of travel in degrees (tangent to the ring)
    pub fn heading_degrees(&self) -> f64 {
        self.angle.to_degrees() + 90.0
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn kind(&self) -> VehicleKind {
        self.kind
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Move the vehicle along its lane to `angle`
    pub fn set_angle(&mut self, angle: f64) {
        self.angle = normalize_angle(angle);
    }

    pub fn lane(&self) -> Lane {
        self.lane
    }

    pub fn lane_radius(&self) -> f64 {
        self.lane_radius
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: f64) {
        self.velocity = self.clamp_velocity(velocity);
    }

    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    pub fn set_acceleration(&mut self, acceleration: f64) {
        self.acceleration = acceleration;
        self.velocity = self.clamp_velocity(self.velocity);
    }

    pub fn max_velocity(&self) -> f64 {
        self.max_velocity
    }

    /// Set the speed cap. Negative caps are treated as zero.
    pub fn set_max_velocity(&mut self, max_velocity: f64) {
        self.max_velocity = max_velocity.max(0.0);
        self.velocity = self.clamp_velocity(self.velocity);
    }

    pub fn is_changing_lane(&self) -> bool {
        self.changing_lane
    }

    pub fn set_changing_lane(&mut self, changing_lane: bool) {
        self.changing_lane = changing_lane;
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn set_width(&mut self, width: f64) -> Result<(), TrafficError> {
        self.width = checked_extent(width)?;
        Ok(())
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn set_height(&mut self, height: f64) -> Result<(), TrafficError> {
        self.height = checked_extent(height)?;
        Ok(())
    }
}

fn checked_extent(value: f64) -> Result<f64, TrafficError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(TrafficError::InvalidExtent(value))
    }
}

/// Compact vehicle state handed to the renderer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub kind: VehicleKind,
    pub lane: Lane,
    pub angle: f64,
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub width: f64,
    pub height: f64,
    pub velocity: f64,
    pub acceleration: f64,
    pub changing_lane: bool,
    pub color: Color,
}

impl From<&Vehicle> for VehicleSnapshot {
    fn from(vehicle: &Vehicle) -> Self {
        let (x, y) = vehicle.position();
        Self {
            id: vehicle.id,
            kind: vehicle.kind,
            lane: vehicle.lane,
            angle: vehicle.angle,
            x,
            y,
            heading: vehicle.heading_degrees(),
            width: vehicle.width(),
            height: vehicle.height(),
            velocity: vehicle.velocity,
            acceleration: vehicle.acceleration,
            changing_lane: vehicle.changing_lane,
            color: vehicle.color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{PI, TAU};

    fn track() -> Track {
        Track::new(0.0, 0.0, 150.0, 50.0, PI).unwrap()
    }

    fn car(lane: Lane, angle: f64) -> Vehicle {
        Vehicle::new(VehicleId(1), VehicleKind::CompactCar, &track(), angle, lane, Color::BLUE)
    }

    #[test]
    fn kinds_differ_only_in_size_and_cap() {
        let truck =
            Vehicle::new(VehicleId(2), VehicleKind::Truck, &track(), 0.0, Lane::Inner, Color::RED);
        assert_eq!(truck.lane_radius(), 175.0);
        assert_eq!((truck.width(), truck.height()), (120.0, 40.0));
        assert_eq!(truck.max_velocity(), 2.0);
        let c = car(Lane::Inner, 0.0);
        assert_eq!((c.width(), c.height()), (60.0, 30.0));
        assert_eq!(c.max_velocity(), 3.0);
    }

    #[test]
    fn integrate_clamps_to_cap() {
        let mut c = car(Lane::Inner, 0.0);
        c.set_acceleration(10.0);
        c.integrate(1.0);
        assert_eq!(c.velocity(), 3.0);
        c.set_acceleration(-100.0);
        c.integrate(1.0);
        assert_eq!(c.velocity(), 0.0);
    }

    #[test]
    fn angular_step_is_inverse_to_radius() {
        let mut inner = car(Lane::Inner, 0.0);
        let mut outer = car(Lane::Outer, 0.0);
        for v in [&mut inner, &mut outer] {
            v.set_velocity(2.0);
            v.integrate(0.5);
        }
        assert!((inner.angle() - 2.0 * 0.5 * SPEED_MULTIPLIER / 175.0).abs() < 1e-12);
        assert!((outer.angle() - 2.0 * 0.5 * SPEED_MULTIPLIER / 225.0).abs() < 1e-12);
        assert!(inner.angle() > outer.angle());
    }

    #[test]
    fn integrate_wraps_angle() {
        let mut c = car(Lane::Inner, TAU - 0.001);
        c.set_velocity(3.0);
        c.integrate(1.0);
        assert!(c.angle() >= 0.0 && c.angle() < TAU);
        assert!(c.angle() < 0.1);
    }

    #[test]
    fn negative_angle_is_normalized_on_construction() {
        let c = car(Lane::Inner, -PI / 2.0);
        assert!((c.angle() - 3.0 * PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn change_lane_keeps_angle_and_is_idempotent() {
        let mut c = car(Lane::Inner, 1.0);
        c.change_lane(Lane::Outer, 150.0, 50.0);
        let once = (c.angle(), c.lane_radius(), c.position());
        c.change_lane(Lane::Outer, 150.0, 50.0);
        assert_eq!(once, (c.angle(), c.lane_radius(), c.position()));
        assert_eq!(c.lane(), Lane::Outer);
        assert_eq!(c.lane_radius(), 225.0);
        assert_eq!(c.angle(), 1.0);
    }

    #[test]
    fn position_and_heading_follow_polar_state() {
        let c = car(Lane::Inner, PI / 2.0);
        let (x, y) = c.position();
        assert!(x.abs() < 1e-9);
        assert!((y - 175.0).abs() < 1e-9);
        assert!((c.heading_degrees() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn setters_keep_velocity_in_range() {
        let mut c = car(Lane::Inner, 0.0);
        c.set_velocity(10.0);
        assert_eq!(c.velocity(), 3.0);
        c.set_velocity(-1.0);
        assert_eq!(c.velocity(), 0.0);
        c.set_velocity(2.5);
        c.set_max_velocity(1.0);
        assert_eq!(c.velocity(), 1.0);
        c.set_max_velocity(-5.0);
        assert_eq!(c.max_velocity(), 0.0);
        assert_eq!(c.velocity(), 0.0);
    }

    #[test]
    fn collision_ignores_rotation() {
        // At angle 0 both boxes lie along x, 50 apart, with width 60
        let a = car(Lane::Inner, 0.0);
        let b = car(Lane::Outer, 0.0);
        assert!(a.collides_with(&b));
        // At angle π/2 they are 50 apart along y, heights 30
        let c = car(Lane::Inner, PI / 2.0);
        let d = car(Lane::Outer, PI / 2.0);
        assert!(!c.collides_with(&d));
    }

    #[test]
    fn lane_index_and_opposite() {
        assert_eq!(Lane::Inner.index(), 0);
        assert_eq!(Lane::Outer.index(), 1);
        assert_eq!(Lane::Inner.opposite(), Lane::Outer);
        assert_eq!(Lane::Outer.opposite(), Lane::Inner);
    }

    #[test]
    fn resized_vehicle_collides_where_it_did_not_before() {
        let mut c = car(Lane::Inner, PI / 2.0);
        let d = car(Lane::Outer, PI / 2.0);
        assert!(!c.collides_with(&d));

        c.set_height(80.0).unwrap();
        assert_eq!(c.height(), 80.0);
        assert_eq!(c.bounds().max_y - c.bounds().min_y, 80.0);
        assert!(c.collides_with(&d));

        c.set_height(30.0).unwrap();
        c.set_width(200.0).unwrap();
        assert!(!c.collides_with(&d));
        assert!(c.contains_point(95.0, 175.0));
    }

    #[test]
    fn extent_setters_reject_bad_values() {
        let mut c = car(Lane::Inner, 0.0);
        for bad in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(c.set_width(bad), Err(TrafficError::InvalidExtent(_))));
            assert!(matches!(c.set_height(bad), Err(TrafficError::InvalidExtent(_))));
        }
        assert_eq!((c.width(), c.height()), (60.0, 30.0));
    }

    #[test]
    fn set_angle_moves_vehicle_along_lane() {
        let mut c = car(Lane::Outer, 0.0);
        c.set_angle(-PI / 2.0);
        assert!((c.angle() - 3.0 * PI / 2.0).abs() < 1e-12);
        let (x, y) = c.position();
        assert!(x.abs() < 1e-9);
        assert!((y + 225.0).abs() < 1e-9);
        assert_eq!(c.lane_radius(), 225.0);
    }
}
