//! Frenet states, reference points and sampled trajectories

use nalgebra::Vector4;
use serde::{Deserialize, Serialize};

use crate::common::{Point2D, Waypoint};

/// Longitudinal and lateral state: `(position, velocity, acceleration, jerk)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrenetState {
    pub s_state: Vector4<f64>,
    pub d_state: Vector4<f64>,
}

impl FrenetState {
    pub fn new(s_state: Vector4<f64>, d_state: Vector4<f64>) -> Self {
        Self { s_state, d_state }
    }

    /// Resting state at `(s, d)` moving along the lane with speed `s_velocity`.
    pub fn at(s: f64, d: f64, s_velocity: f64) -> Self {
        Self {
            s_state: Vector4::new(s, s_velocity, 0.0, 0.0),
            d_state: Vector4::new(d, 0.0, 0.0, 0.0),
        }
    }

    pub fn s(&self) -> f64 {
        self.s_state[0]
    }

    pub fn s_velocity(&self) -> f64 {
        self.s_state[1]
    }

    pub fn d(&self) -> f64 {
        self.d_state[0]
    }
}

impl Default for FrenetState {
    fn default() -> Self {
        Self::at(0.0, 0.0, 0.0)
    }
}

/// Semantic type of a reference point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceType {
    /// Plain lookahead waypoint
    Waypoint,
    /// Stop target; terminal for next-point generation
    StopLine,
    /// Standoff point in front of a blocking object
    Obstacle {
        object_id: u32,
        /// Position of the object in the cycle's object list
        object_index: usize,
    },
    /// Laterally offset target passing a blocking object
    AvoidingPoint,
    /// No safe target found; stop in place
    Unknown,
}

impl ReferenceType {
    pub fn is_obstacle(&self) -> bool {
        matches!(self, ReferenceType::Obstacle { .. })
    }
}

/// Offset grid sampled around a reference point's target state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingEnvelope {
    pub lateral_max_offset: f64,
    pub lateral_sampling_resolution: f64,
    pub longitudinal_max_offset: f64,
    pub longitudinal_sampling_resolution: f64,
    pub longitudinal_velocity_max_offset: f64,
    pub longitudinal_velocity_sampling_resolution: f64,
    pub time_horizon: f64,
    pub time_horizon_max_offset: f64,
    pub time_horizon_sampling_resolution: f64,
}

impl SamplingEnvelope {
    /// Envelope from `(max_offset, resolution)` pairs and the horizon window.
    pub fn new(
        lateral: (f64, f64),
        longitudinal: (f64, f64),
        velocity: (f64, f64),
        time_horizon: f64,
        time_horizon_max_offset: f64,
        time_horizon_sampling_resolution: f64,
    ) -> Self {
        Self {
            lateral_max_offset: lateral.0,
            lateral_sampling_resolution: lateral.1,
            longitudinal_max_offset: longitudinal.0,
            longitudinal_sampling_resolution: longitudinal.1,
            longitudinal_velocity_max_offset: velocity.0,
            longitudinal_velocity_sampling_resolution: velocity.1,
            time_horizon,
            time_horizon_max_offset,
            time_horizon_sampling_resolution,
        }
    }

    /// Same envelope with a different lateral extent.
    pub fn with_lateral_max_offset(mut self, lateral_max_offset: f64) -> Self {
        self.lateral_max_offset = lateral_max_offset;
        self
    }

    /// Shortest and longest horizon the envelope samples.
    pub fn horizon_window(&self) -> (f64, f64) {
        (
            self.time_horizon - self.time_horizon_max_offset,
            self.time_horizon + self.time_horizon_max_offset,
        )
    }
}

/// Target the planner steers toward
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub frenet_point: FrenetState,
    pub cartesian_point: Point2D,
    pub reference_type: ReferenceType,
    pub envelope: SamplingEnvelope,
}

impl ReferencePoint {
    pub fn new(
        frenet_point: FrenetState,
        cartesian_point: Point2D,
        reference_type: ReferenceType,
        envelope: SamplingEnvelope,
    ) -> Self {
        Self {
            frenet_point,
            cartesian_point,
            reference_type,
            envelope,
        }
    }
}

/// Time-sampled trajectory in both Frenet and Cartesian form.
///
/// The two sample sequences always have the same length; they can only be
/// grown by `push`/`append` and shrunk from either end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    frenet_points: Vec<FrenetState>,
    waypoints: Vec<Waypoint>,
    /// Horizon the trajectory was generated for [s]
    pub required_time: f64,
}

impl Trajectory {
    pub fn new(required_time: f64) -> Self {
        Self {
            frenet_points: Vec::new(),
            waypoints: Vec::new(),
            required_time,
        }
    }

    pub fn push(&mut self, frenet_point: FrenetState, waypoint: Waypoint) {
        self.frenet_points.push(frenet_point);
        self.waypoints.push(waypoint);
    }

    /// Concatenate `other` after the last sample.
    pub fn append(&mut self, other: &Trajectory) {
        self.frenet_points.extend_from_slice(&other.frenet_points);
        self.waypoints.extend_from_slice(&other.waypoints);
    }

    pub fn frenet_points(&self) -> &[FrenetState] {
        &self.frenet_points
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn first_frenet(&self) -> Option<&FrenetState> {
        self.frenet_points.first()
    }

    pub fn last_frenet(&self) -> Option<&FrenetState> {
        self.frenet_points.last()
    }

    pub fn first_waypoint(&self) -> Option<&Waypoint> {
        self.waypoints.first()
    }

    pub fn last_waypoint(&self) -> Option<&Waypoint> {
        self.waypoints.last()
    }

    /// Drop up to `count` samples from the front.
    pub fn crop_front(&mut self, count: usize) {
        let count = count.min(self.len());
        self.frenet_points.drain(..count);
        self.waypoints.drain(..count);
    }

    /// Keep only the first `len` samples.
    pub fn truncate(&mut self, len: usize) {
        self.frenet_points.truncate(len);
        self.waypoints.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trajectory(n: usize) -> Trajectory {
        let mut trajectory = Trajectory::new(4.0);
        for i in 0..n {
            let s = i as f64;
            trajectory.push(FrenetState::at(s, 0.0, 1.0), Waypoint::new(s, 0.0, 0.0, 1.0));
        }
        trajectory
    }

    #[test]
    fn test_crop_and_truncate_keep_lengths_equal() {
        let mut trajectory = sample_trajectory(6);
        trajectory.crop_front(2);
        assert_eq!(trajectory.len(), 4);
        assert_eq!(trajectory.frenet_points().len(), 4);
        assert_eq!(trajectory.first_frenet().map(|f| f.s()), Some(2.0));

        trajectory.truncate(1);
        assert_eq!(trajectory.len(), 1);
        assert_eq!(trajectory.frenet_points().len(), 1);

        trajectory.crop_front(10);
        assert!(trajectory.is_empty());
    }

    #[test]
    fn test_append() {
        let mut a = sample_trajectory(3);
        let b = sample_trajectory(2);
        a.append(&b);
        assert_eq!(a.len(), 5);
        assert_eq!(a.frenet_points().len(), 5);
    }

    #[test]
    fn test_horizon_window() {
        let envelope = SamplingEnvelope::new((0.0, 0.01), (0.0, 0.01), (0.0, 0.01), 10.0, 6.0, 1.0);
        assert_eq!(envelope.horizon_window(), (4.0, 16.0));
        assert_eq!(envelope.with_lateral_max_offset(3.0).lateral_max_offset, 3.0);
    }

    #[test]
    fn test_obstacle_type() {
        let t = ReferenceType::Obstacle {
            object_id: 7,
            object_index: 0,
        };
        assert!(t.is_obstacle());
        assert!(!ReferenceType::StopLine.is_obstacle());
    }
}
