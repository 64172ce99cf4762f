//! Single trajectory generation between an origin and a target Frenet state

use log::trace;

use crate::common::PlanningResult;
use crate::frenet::config::FrenetPlannerConfig;
use crate::frenet::converter::{
    frenet_state_to_waypoint, frenet_state_to_waypoint_with_heading, MIN_LONGITUDINAL_SPEED,
};
use crate::frenet::lane::Lane;
use crate::frenet::polynomial::{QuarticPolynomial, QuinticPolynomial};
use crate::frenet::state::{FrenetState, Trajectory};
use nalgebra::Vector4;

/// A sampled trajectory and whether every sample stayed within the jerk limits
#[derive(Debug, Clone)]
pub struct GeneratedTrajectory {
    pub trajectory: Trajectory,
    pub is_valid: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct TrajectoryGenerator {
    pub sampling_dt: f64,
    pub max_lateral_jerk: f64,
    pub max_longitudinal_jerk: f64,
}

impl TrajectoryGenerator {
    pub fn new(config: &FrenetPlannerConfig) -> Self {
        Self {
            sampling_dt: config.sampling_dt,
            max_lateral_jerk: config.max_lateral_jerk,
            max_longitudinal_jerk: config.max_longitudinal_jerk,
        }
    }

    /// Sample the trajectory from `origin` to `target` over `time_horizon`.
    ///
    /// Samples are taken at `dt, 2dt, ..` up to the horizon; the origin itself is
    /// not included. `s` is integrated from the speed profile so the target arc
    /// length is not enforced. `z` is copied onto every waypoint.
    pub fn generate(
        &self,
        lane: &Lane,
        origin: &FrenetState,
        target: &FrenetState,
        time_horizon: f64,
        z: f64,
    ) -> PlanningResult<GeneratedTrajectory> {
        let lateral = QuinticPolynomial::new(
            (origin.d_state[0], origin.d_state[1], origin.d_state[2]),
            (target.d_state[0], target.d_state[1], target.d_state[2]),
            time_horizon,
        )?;
        let longitudinal = QuarticPolynomial::new(
            (origin.s_state[0], origin.s_state[1], origin.s_state[2]),
            (target.s_state[1], target.s_state[2]),
            time_horizon,
        )?;

        let dt = self.sampling_dt;
        let num_samples = (time_horizon / dt + 1e-9).floor() as usize;
        let mut trajectory = Trajectory::new(time_horizon);
        let mut is_valid = num_samples > 0;
        let mut s = origin.s_state[0];
        let mut heading_offset = 0.0;

        for step in 1..=num_samples {
            let t = step as f64 * dt;
            let d_jerk = lateral.calc_third_derivative(t);
            let s_jerk = longitudinal.calc_third_derivative(t);
            let s_velocity = longitudinal.calc_first_derivative(t);
            s += s_velocity * dt;

            if d_jerk.abs() > self.max_lateral_jerk || s_jerk.abs() > self.max_longitudinal_jerk {
                is_valid = false;
            }

            let state = FrenetState::new(
                Vector4::new(s, s_velocity, longitudinal.calc_second_derivative(t), s_jerk),
                Vector4::new(
                    lateral.calc_point(t),
                    lateral.calc_first_derivative(t),
                    lateral.calc_second_derivative(t),
                    d_jerk,
                ),
            );

            let mut sample = if s_velocity.abs() < MIN_LONGITUDINAL_SPEED {
                trace!("holding heading offset {:.4} at t = {:.2}", heading_offset, t);
                frenet_state_to_waypoint_with_heading(&state, lane, heading_offset)?
            } else {
                frenet_state_to_waypoint(&state, lane)?
            };
            heading_offset = sample.heading_offset;
            sample.waypoint.z = z;
            trajectory.push(state, sample.waypoint);
        }

        Ok(GeneratedTrajectory { trajectory, is_valid })
    }
}
