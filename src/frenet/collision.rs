//! Circular proximity test against detected objects

use crate::common::{DetectedObject, Point2D, Waypoint};

/// First colliding sample of a trajectory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionInfo {
    /// Index of the sample along the trajectory
    pub waypoint_index: usize,
    pub object_id: u32,
    /// Index of the object in the object list
    pub object_index: usize,
}

/// Treats every object as a disc of `radius` around its position
#[derive(Debug, Clone, Copy)]
pub struct CollisionChecker {
    pub radius: f64,
}

impl CollisionChecker {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    /// First object (in list order) closer than the radius to `point`.
    pub fn colliding_object(&self, point: &Point2D, objects: &[DetectedObject]) -> Option<usize> {
        objects
            .iter()
            .position(|object| object.position.distance(point) < self.radius)
    }

    pub fn is_collision(&self, waypoint: &Waypoint, objects: &[DetectedObject]) -> bool {
        self.colliding_object(&waypoint.position(), objects).is_some()
    }

    pub fn is_trajectory_collision_free(&self, waypoints: &[Waypoint], objects: &[DetectedObject]) -> bool {
        !waypoints.iter().any(|w| self.is_collision(w, objects))
    }

    /// Locate the first colliding sample and the object it hits.
    pub fn first_collision(&self, waypoints: &[Waypoint], objects: &[DetectedObject]) -> Option<CollisionInfo> {
        waypoints.iter().enumerate().find_map(|(i, w)| {
            self.colliding_object(&w.position(), objects)
                .map(|object_index| CollisionInfo {
                    waypoint_index: i,
                    object_id: objects[object_index].id,
                    object_index,
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Vec<Waypoint> {
        (0..n).map(|i| Waypoint::new(i as f64, 0.0, 0.0, 1.0)).collect()
    }

    #[test]
    fn test_collision_radius_is_strict() {
        let checker = CollisionChecker::new(3.0);
        let objects = vec![DetectedObject::new(1, 10.0, 3.0)];
        assert!(!checker.is_collision(&Waypoint::new(10.0, 0.0, 0.0, 1.0), &objects));
        assert!(checker.is_collision(&Waypoint::new(10.0, 0.1, 0.0, 1.0), &objects));
    }

    #[test]
    fn test_first_collision() {
        let checker = CollisionChecker::new(2.5);
        let objects = vec![DetectedObject::new(4, 50.0, 0.0), DetectedObject::new(9, 20.0, 0.0)];
        let info = checker.first_collision(&line(30), &objects).unwrap();
        assert_eq!(info.waypoint_index, 18);
        assert_eq!(info.object_id, 9);
        assert_eq!(info.object_index, 1);
        assert!(!checker.is_trajectory_collision_free(&line(30), &objects));
        assert!(checker.is_trajectory_collision_free(&line(10), &objects));
        assert!(checker.is_trajectory_collision_free(&line(30), &[]));
    }
}
