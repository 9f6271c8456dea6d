//! Geometry - Angle arithmetic and axis-aligned boxes
//!
//! Every angular comparison in the simulation goes through these helpers so
//! that wrapping at 2π is handled in exactly one place.

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Normalize an angle into [0, 2π)
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Shortest-arc difference between two angles, always in [0, π]
pub fn shortest_arc(a: f64, b: f64) -> f64 {
    let d = (normalize_angle(a) - normalize_angle(b)).abs();
    d.min(TAU - d)
}

/// Counter-clockwise offset from `from` to `to`, in [0, 2π)
pub fn forward_offset(from: f64, to: f64) -> f64 {
    normalize_angle(normalize_angle(to) - normalize_angle(from))
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Aabb {
    /// Box of the given extent centered on a point
    pub fn centered(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self {
            min_x: cx - width / 2.0,
            min_y: cy - height / 2.0,
            max_x: cx + width / 2.0,
            max_y: cy + height / 2.0,
        }
    }

    /// Overlap test. Touching edges count as intersecting.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const EPS: f64 = 1e-12;

    #[test]
    fn normalize_wraps_negative_and_large_angles() {
        assert!((normalize_angle(-PI / 2.0) - 3.0 * PI / 2.0).abs() < EPS);
        assert!((normalize_angle(5.0 * PI) - PI).abs() < EPS);
        assert_eq!(normalize_angle(TAU), 0.0);
        assert_eq!(normalize_angle(-1e-20), 0.0);
    }

    #[test]
    fn shortest_arc_crosses_zero() {
        let d = shortest_arc(0.05, TAU - 0.05);
        assert!((d - 0.1).abs() < 1e-9);
        assert!((shortest_arc(0.0, PI) - PI).abs() < EPS);
        assert_eq!(shortest_arc(1.0, 1.0), 0.0);
    }

    #[test]
    fn forward_offset_is_directional() {
        assert!((forward_offset(0.1, 0.2) - 0.1).abs() < 1e-9);
        assert!((forward_offset(0.2, 0.1) - (TAU - 0.1)).abs() < 1e-9);
        assert!((forward_offset(TAU - 0.05, 0.05) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn boxes_intersect_and_contain() {
        let a = Aabb::centered(0.0, 0.0, 60.0, 30.0);
        let b = Aabb::centered(50.0, 0.0, 60.0, 30.0);
        let c = Aabb::centered(0.0, 40.0, 60.0, 30.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
        assert!(a.contains(29.0, -14.0));
        assert!(!a.contains(31.0, 0.0));
    }
}
