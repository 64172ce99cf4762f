//! Common types used throughout frenet_planner

use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// 2D point representation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

impl From<(f64, f64)> for Point2D {
    fn from(tuple: (f64, f64)) -> Self {
        Self { x: tuple.0, y: tuple.1 }
    }
}

impl From<Vector2<f64>> for Point2D {
    fn from(v: Vector2<f64>) -> Self {
        Self { x: v[0], y: v[1] }
    }
}

/// 2D pose (position + orientation)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

impl Pose2D {
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self { x, y, yaw }
    }

    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Express `point` in the frame of this pose.
    pub fn to_relative(&self, point: &Point2D) -> Point2D {
        let dx = point.x - self.x;
        let dy = point.y - self.y;
        let (sin, cos) = self.yaw.sin_cos();
        Point2D::new(cos * dx + sin * dy, -sin * dx + cos * dy)
    }

    /// Relative bearing of `point` seen from this pose, in (-pi, pi].
    pub fn bearing_to(&self, point: &Point2D) -> f64 {
        let rel = self.to_relative(point);
        rel.y.atan2(rel.x)
    }

    /// True when `point` lies in the rear half-plane of this pose.
    pub fn is_behind(&self, point: &Point2D) -> bool {
        self.bearing_to(point).abs() > FRAC_PI_2
    }
}

/// Normalize an angle to [-pi, pi]
pub fn normalize_angle(mut angle: f64) -> f64 {
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// A reference or output waypoint: pose, height and linear velocity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Waypoint {
    pub pose: Pose2D,
    /// Height copied through unchanged; vertical motion is not modelled.
    pub z: f64,
    pub velocity: f64,
}

impl Waypoint {
    pub fn new(x: f64, y: f64, yaw: f64, velocity: f64) -> Self {
        Self {
            pose: Pose2D::new(x, y, yaw),
            z: 0.0,
            velocity,
        }
    }

    pub fn position(&self) -> Point2D {
        self.pose.position()
    }

    pub fn distance(&self, point: &Point2D) -> f64 {
        self.position().distance(point)
    }
}

/// A detected obstacle, read-only for the duration of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    pub id: u32,
    pub position: Point2D,
}

impl DetectedObject {
    pub fn new(id: u32, x: f64, y: f64) -> Self {
        Self {
            id,
            position: Point2D::new(x, y),
        }
    }
}

/// Index of the waypoint closest to `point`. The first minimum wins.
pub fn nearest_waypoint_index(point: &Point2D, waypoints: &[Waypoint]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, wp) in waypoints.iter().enumerate() {
        let d = wp.distance(point);
        match best {
            Some((_, min)) if d >= min => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point2d_distance() {
        let p1 = Point2D::new(0.0, 0.0);
        let p2 = Point2D::new(3.0, 4.0);
        assert!((p1.distance(&p2) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_normalize_angle() {
        let a = normalize_angle(4.0);
        assert!(a >= -PI && a <= PI);
        assert!((a - (4.0 - 2.0 * PI)).abs() < 1e-12);
    }

    #[test]
    fn test_relative_transform() {
        let pose = Pose2D::new(1.0, 1.0, FRAC_PI_2);
        let rel = pose.to_relative(&Point2D::new(1.0, 3.0));
        assert!((rel.x - 2.0).abs() < 1e-10);
        assert!(rel.y.abs() < 1e-10);
    }

    #[test]
    fn test_is_behind() {
        let pose = Pose2D::new(0.0, 0.0, 0.0);
        assert!(!pose.is_behind(&Point2D::new(1.0, 5.0)));
        assert!(pose.is_behind(&Point2D::new(-1.0, 5.0)));
        // a point on the pose itself counts as ahead
        assert!(!pose.is_behind(&Point2D::new(0.0, 0.0)));
    }

    #[test]
    fn test_nearest_waypoint_index_first_minimum() {
        let wps = vec![
            Waypoint::new(0.0, 0.0, 0.0, 1.0),
            Waypoint::new(2.0, 0.0, 0.0, 1.0),
            Waypoint::new(2.0, 0.0, 0.0, 1.0),
        ];
        assert_eq!(nearest_waypoint_index(&Point2D::new(1.9, 0.0), &wps), Some(1));
        assert_eq!(nearest_waypoint_index(&Point2D::new(0.0, 0.0), &[]), None);
    }
}
