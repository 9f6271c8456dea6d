//! Track - Circular two-lane road with a single fixed obstacle
//!
//! The track is immutable once built. Resizing means building a new one.

use serde::Serialize;

use crate::traffic::config::TrackConfig;
use crate::traffic::error::TrafficError;
use crate::traffic::geometry::{normalize_angle, shortest_arc, Aabb};
use crate::traffic::vehicle::{Lane, Vehicle};

/// Angular window around the obstacle in which inner-lane vehicles react
pub const OBSTACLE_PROXIMITY: f64 = 0.2;

/// Obstacle side length
pub const OBSTACLE_SIZE: f64 = 30.0;

/// Immutable ring-road geometry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    center_x: f64,
    center_y: f64,
    inner_radius: f64,
    lane_width: f64,
    outer_radius: f64,
    /// Obstacle position, normalized into [0, 2π)
    obstacle_angle: f64,
    obstacle: Aabb,
}

impl Track {
    /// Build a track, rejecting geometry that cannot hold two lanes
    pub fn new(
        center_x: f64,
        center_y: f64,
        inner_radius: f64,
        lane_width: f64,
        obstacle_angle: f64,
    ) -> Result<Self, TrafficError> {
        if !center_x.is_finite() || !center_y.is_finite() {
            return Err(TrafficError::InvalidTrack {
                reason: format!("center ({}, {}) is not finite", center_x, center_y),
            });
        }
        if !(inner_radius.is_finite() && inner_radius > 0.0) {
            return Err(TrafficError::InvalidTrack {
                reason: format!("inner radius must be positive, got {}", inner_radius),
            });
        }
        if !(lane_width.is_finite() && lane_width > 0.0) {
            return Err(TrafficError::InvalidTrack {
                reason: format!("lane width must be positive, got {}", lane_width),
            });
        }
        if !obstacle_angle.is_finite() {
            return Err(TrafficError::InvalidTrack {
                reason: format!("obstacle angle {} is not finite", obstacle_angle),
            });
        }

        let obstacle_angle = normalize_angle(obstacle_angle);
        let obstacle_radius = inner_radius + lane_width / 2.0;
        let obstacle = Aabb::centered(
            center_x + obstacle_radius * obstacle_angle.cos(),
            center_y + obstacle_radius * obstacle_angle.sin(),
            OBSTACLE_SIZE,
            OBSTACLE_SIZE,
        );

        log::debug!(
            "Track built: center=({}, {}) inner={} lane_width={} obstacle_angle={:.3}",
            center_x,
            center_y,
            inner_radius,
            lane_width,
            obstacle_angle
        );

        Ok(Self {
            center_x,
            center_y,
            inner_radius,
            lane_width,
            outer_radius: inner_radius + 2.0 * lane_width,
            obstacle_angle,
            obstacle,
        })
    }

    pub fn from_config(config: &TrackConfig) -> Result<Self, TrafficError> {
        Self::new(
            config.center_x,
            config.center_y,
            config.inner_radius,
            config.lane_width,
            config.obstacle_angle,
        )
    }

    /// True if the point lies on the ring, edges included
    pub fn is_on_road(&self, x: f64, y: f64) -> bool {
        let distance = self.distance_from_center(x, y);
        distance >= self.inner_radius && distance <= self.outer_radius
    }

    /// Collision box of the obstacle.
    ///
    /// The obstacle is drawn rotated by [`Track::obstacle_rotation_degrees`],
    /// but collisions use this unrotated box.
    pub fn obstacle_bounds(&self) -> Aabb {
        self.obstacle
    }

    /// Display rotation of the obstacle
    pub fn obstacle_rotation_degrees(&self) -> f64 {
        self.obstacle_angle.to_degrees() + 45.0
    }

    /// True if the vehicle is in the inner lane and within
    /// [`OBSTACLE_PROXIMITY`] radians of the obstacle
    pub fn is_near_obstacle(&self, vehicle: &Vehicle) -> bool {
        vehicle.lane() == Lane::Inner
            && shortest_arc(vehicle.angle(), self.obstacle_angle) < OBSTACLE_PROXIMITY
    }

    pub fn collides_with_obstacle(&self, vehicle: &Vehicle) -> bool {
        vehicle.bounds().intersects(&self.obstacle)
    }

    /// Radius at which vehicles in `lane` travel
    pub fn lane_radius(&self, lane: Lane) -> f64 {
        lane_radius(self.inner_radius, self.lane_width, lane)
    }

    /// Lane a point belongs to, split at the lane divider
    pub fn lane_for_point(&self, x: f64, y: f64) -> Lane {
        if self.distance_from_center(x, y) < self.inner_radius + self.lane_width {
            Lane::Inner
        } else {
            Lane::Outer
        }
    }

    /// Polar angle of a point around the track center, in [0, 2π)
    pub fn angle_of(&self, x: f64, y: f64) -> f64 {
        normalize_angle((y - self.center_y).atan2(x - self.center_x))
    }

    fn distance_from_center(&self, x: f64, y: f64) -> f64 {
        (x - self.center_x).hypot(y - self.center_y)
    }

    pub fn center(&self) -> (f64, f64) {
        (self.center_x, self.center_y)
    }

    pub fn inner_radius(&self) -> f64 {
        self.inner_radius
    }

    pub fn lane_width(&self) -> f64 {
        self.lane_width
    }

    pub fn outer_radius(&self) -> f64 {
        self.outer_radius
    }

    pub fn obstacle_angle(&self) -> f64 {
        self.obstacle_angle
    }
}

/// Lane radius from raw track dimensions
pub fn lane_radius(inner_radius: f64, lane_width: f64, lane: Lane) -> f64 {
    inner_radius + lane.index() as f64 * lane_width + lane_width / 2.0
}
