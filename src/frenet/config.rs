//! Frenet planner parameters

use serde::{Deserialize, Serialize};

use crate::common::{PlannerError, PlanningResult, YamlConfig};
use crate::frenet::state::{ReferenceType, SamplingEnvelope};

/// Weights combining the normalised selection costs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostWeights {
    /// Distance from reference waypoints to the trajectory
    pub tracking: f64,
    /// Final (d, s, ṣ) deviation from the reference point
    pub terminal: f64,
    pub jerk: f64,
    /// Realised horizon relative to the nominal window
    pub time: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            tracking: 0.0,
            terminal: 1.0,
            jerk: 0.25,
            time: 1.0,
        }
    }
}

/// Sampling envelope per kind of reference point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// First reference point of a run
    pub initial: SamplingEnvelope,
    pub waypoint: SamplingEnvelope,
    pub stop_line: SamplingEnvelope,
    pub obstacle: SamplingEnvelope,
    /// Lateral extent is taken from `max_lateral_avoidance_offset`
    pub avoiding_point: SamplingEnvelope,
    pub unknown: SamplingEnvelope,
    /// Re-targeted while tracking, toward a near-zero speed
    pub update_stopping: SamplingEnvelope,
    /// Re-targeted while tracking, otherwise
    pub update_swerving: SamplingEnvelope,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        let fixed = (0.0, 0.01);
        Self {
            initial: SamplingEnvelope::new(fixed, fixed, (0.0, 0.1), 12.0, 10.0, 2.0),
            waypoint: SamplingEnvelope::new(fixed, fixed, (1.0, 0.1), 12.0, 8.0, 1.0),
            stop_line: SamplingEnvelope::new(fixed, fixed, fixed, 12.0, 8.0, 1.0),
            obstacle: SamplingEnvelope::new(fixed, fixed, fixed, 12.0, 8.0, 2.0),
            avoiding_point: SamplingEnvelope::new((8.0, 0.5), fixed, fixed, 10.0, 6.0, 1.0),
            unknown: SamplingEnvelope::new(fixed, fixed, fixed, 12.0, 4.0, 2.0),
            update_stopping: SamplingEnvelope::new(fixed, fixed, fixed, 20.0, 18.0, 1.0),
            update_swerving: SamplingEnvelope::new((4.0, 2.0), fixed, fixed, 12.0, 10.0, 2.0),
        }
    }
}

impl EnvelopeConfig {
    fn all(&self) -> [(&'static str, &SamplingEnvelope); 8] {
        [
            ("initial", &self.initial),
            ("waypoint", &self.waypoint),
            ("stop_line", &self.stop_line),
            ("obstacle", &self.obstacle),
            ("avoiding_point", &self.avoiding_point),
            ("unknown", &self.unknown),
            ("update_stopping", &self.update_stopping),
            ("update_swerving", &self.update_swerving),
        ]
    }
}

/// Configuration for the Frenet planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrenetPlannerConfig {
    /// Longitudinal speed of the origin on the very first cycle [m/s]
    pub initial_velocity: f64,
    /// Crawl speed targeted at an obstacle standoff point [m/s]
    pub velocity_before_obstacle: f64,
    /// Standoff distance kept from a blocking object [m]
    pub distance_before_obstacle: f64,
    /// Collision radius for planned trajectories [m]
    pub obstacle_radius: f64,
    /// Collision radius for draft trajectories toward reference points [m]
    pub reference_obstacle_radius: f64,
    pub min_lateral_avoidance_offset: f64,
    pub max_lateral_avoidance_offset: f64,
    pub avoidance_lateral_step: f64,
    pub cost_weights: CostWeights,
    /// Lookahead per unit speed when picking the next reference point [s]
    pub lookahead_per_speed: f64,
    /// Lookahead per unit speed for the initial reference point [s]
    pub initial_lookahead_per_speed: f64,
    pub min_lookahead_distance: f64,
    /// Stop-line convergence distance per unit ego speed [s]
    pub converge_distance_per_speed: f64,
    /// Candidates must end within this radius of the reference point [m]
    pub valid_trajectory_radius: f64,
    pub sampling_dt: f64,
    pub max_lateral_jerk: f64,
    pub max_longitudinal_jerk: f64,
    /// Horizon of the draft toward a default target [s]
    pub draft_horizon: f64,
    /// Horizon of the drafts scanning lateral avoidance offsets [s]
    pub avoidance_horizon: f64,
    /// Reference waypoints slower than this are stop candidates [m/s]
    pub flagged_waypoint_speed: f64,
    /// A default target slower than this becomes a stop line [m/s]
    pub stop_speed_threshold: f64,
    pub flagged_waypoint_radius: f64,
    /// Reference points this close to the last waypoint never expire [m]
    pub end_of_route_tolerance: f64,
    pub min_origin_speed: f64,
    pub origin_speed_nudge: f64,
    /// Avoiding speed = min(ratio * planned, multiplier * crawl)
    pub avoiding_speed_ratio: f64,
    pub avoiding_crawl_multiplier: f64,
    pub envelopes: EnvelopeConfig,
}

impl Default for FrenetPlannerConfig {
    fn default() -> Self {
        Self {
            initial_velocity: 0.583,
            velocity_before_obstacle: 0.278,
            distance_before_obstacle: 7.0,
            obstacle_radius: 3.0,
            reference_obstacle_radius: 2.5,
            min_lateral_avoidance_offset: 5.0,
            max_lateral_avoidance_offset: 8.0,
            avoidance_lateral_step: 1.0,
            cost_weights: CostWeights::default(),
            lookahead_per_speed: 7.2,
            initial_lookahead_per_speed: 4.0,
            min_lookahead_distance: 12.0,
            converge_distance_per_speed: 8.5,
            valid_trajectory_radius: 6.0,
            sampling_dt: 0.5,
            max_lateral_jerk: 1.0,
            max_longitudinal_jerk: 3.0,
            draft_horizon: 8.0,
            avoidance_horizon: 12.0,
            flagged_waypoint_speed: 0.1,
            stop_speed_threshold: 0.01,
            flagged_waypoint_radius: 3.0,
            end_of_route_tolerance: 0.1,
            min_origin_speed: 0.1,
            origin_speed_nudge: 0.3,
            avoiding_speed_ratio: 0.75,
            avoiding_crawl_multiplier: 6.0,
            envelopes: EnvelopeConfig::default(),
        }
    }
}

impl FrenetPlannerConfig {
    /// Envelope of a freshly generated reference point of the given type.
    pub fn envelope_for(&self, reference_type: &ReferenceType) -> SamplingEnvelope {
        let envelopes = &self.envelopes;
        match reference_type {
            ReferenceType::Waypoint => envelopes.waypoint,
            ReferenceType::StopLine => envelopes.stop_line,
            ReferenceType::Obstacle { .. } => envelopes.obstacle,
            ReferenceType::AvoidingPoint => envelopes
                .avoiding_point
                .with_lateral_max_offset(self.max_lateral_avoidance_offset),
            ReferenceType::Unknown => envelopes.unknown,
        }
    }

    /// Envelope of a reference point replaced while tracking.
    pub fn update_envelope(&self, stopping: bool) -> SamplingEnvelope {
        if stopping {
            self.envelopes.update_stopping
        } else {
            self.envelopes.update_swerving
        }
    }
}

impl YamlConfig for FrenetPlannerConfig {
    fn validate(&self) -> PlanningResult<()> {
        let positive = [
            ("obstacle_radius", self.obstacle_radius),
            ("reference_obstacle_radius", self.reference_obstacle_radius),
            ("avoidance_lateral_step", self.avoidance_lateral_step),
            ("min_lookahead_distance", self.min_lookahead_distance),
            ("valid_trajectory_radius", self.valid_trajectory_radius),
            ("sampling_dt", self.sampling_dt),
            ("max_lateral_jerk", self.max_lateral_jerk),
            ("max_longitudinal_jerk", self.max_longitudinal_jerk),
            ("draft_horizon", self.draft_horizon),
            ("avoidance_horizon", self.avoidance_horizon),
        ];
        if let Some((name, value)) = positive.iter().find(|(_, v)| !(*v > 0.0)) {
            return Err(PlannerError::InvalidParameter(format!(
                "{} must be positive, got {}",
                name, value
            )));
        }
        if self.min_lateral_avoidance_offset > self.max_lateral_avoidance_offset {
            return Err(PlannerError::InvalidParameter(format!(
                "lateral avoidance range is empty: [{}, {}]",
                self.min_lateral_avoidance_offset, self.max_lateral_avoidance_offset
            )));
        }
        for (name, envelope) in self.envelopes.all().iter() {
            let extents = [
                envelope.lateral_max_offset,
                envelope.longitudinal_max_offset,
                envelope.longitudinal_velocity_max_offset,
                envelope.time_horizon_max_offset,
            ];
            let resolutions = [
                envelope.lateral_sampling_resolution,
                envelope.longitudinal_sampling_resolution,
                envelope.longitudinal_velocity_sampling_resolution,
                envelope.time_horizon_sampling_resolution,
            ];
            if extents.iter().any(|v| !(*v >= 0.0)) || resolutions.iter().any(|v| !(*v > 0.0)) {
                return Err(PlannerError::InvalidParameter(format!(
                    "{} envelope needs non-negative extents and positive resolutions",
                    name
                )));
            }
        }
        if self.distance_before_obstacle < 0.0 || self.velocity_before_obstacle < 0.0 {
            return Err(PlannerError::InvalidParameter(
                "obstacle standoff distance and crawl speed must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = FrenetPlannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cost_weights.jerk, 0.25);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "obstacle_radius: 4.0\ncost_weights:\n  jerk: 0.5\n";
        let config = FrenetPlannerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.obstacle_radius, 4.0);
        assert_eq!(config.cost_weights.jerk, 0.5);
        assert_eq!(config.cost_weights.terminal, 1.0);
        assert_eq!(config.distance_before_obstacle, 7.0);
    }

    #[test]
    fn test_rejects_zero_sampling_dt() {
        let config = FrenetPlannerConfig {
            sampling_dt: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PlannerError::InvalidParameter(_))));
    }

    #[test]
    fn test_envelopes() {
        let config = FrenetPlannerConfig::default();
        let avoid = config.envelope_for(&ReferenceType::AvoidingPoint);
        assert_eq!(avoid.lateral_max_offset, 8.0);
        assert_eq!(avoid.horizon_window(), (4.0, 16.0));

        let stop = config.update_envelope(true);
        assert_eq!(stop.time_horizon, 20.0);
        assert_eq!(stop.lateral_max_offset, 0.0);
        assert_eq!(config.update_envelope(false).lateral_max_offset, 4.0);

        let narrow = FrenetPlannerConfig {
            max_lateral_avoidance_offset: 6.0,
            ..Default::default()
        };
        assert_eq!(narrow.envelope_for(&ReferenceType::AvoidingPoint).lateral_max_offset, 6.0);
    }

    #[test]
    fn test_envelope_from_yaml() {
        let yaml = "envelopes:\n  unknown:\n    lateral_max_offset: 0.0\n    lateral_sampling_resolution: 0.01\n    longitudinal_max_offset: 0.0\n    longitudinal_sampling_resolution: 0.01\n    longitudinal_velocity_max_offset: 0.0\n    longitudinal_velocity_sampling_resolution: 0.01\n    time_horizon: 10.0\n    time_horizon_max_offset: 2.0\n    time_horizon_sampling_resolution: 1.0\n";
        let config = FrenetPlannerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.envelope_for(&ReferenceType::Unknown).time_horizon, 10.0);
        assert_eq!(config.envelopes.waypoint, EnvelopeConfig::default().waypoint);

        let mut broken = FrenetPlannerConfig::default();
        broken.envelopes.obstacle.time_horizon_sampling_resolution = 0.0;
        assert!(matches!(broken.validate(), Err(PlannerError::InvalidParameter(_))));
    }

    #[test]
    fn test_rejects_inverted_avoidance_range() {
        let yaml = "min_lateral_avoidance_offset: 9.0\n";
        assert!(FrenetPlannerConfig::from_yaml_str(yaml).is_err());
    }
}
