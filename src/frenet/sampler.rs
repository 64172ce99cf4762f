//! Candidate sampling around a reference point

use itertools::iproduct;
use log::{debug, warn};

use crate::frenet::lane::Lane;
use crate::frenet::state::{FrenetState, ReferencePoint, Trajectory};
use crate::frenet::trajectory_generator::TrajectoryGenerator;

/// Jerk-valid candidates plus every attempted trajectory for debugging
#[derive(Debug, Clone, Default)]
pub struct SampledTrajectories {
    pub candidates: Vec<Trajectory>,
    pub debug_trajectories: Vec<Trajectory>,
}

/// Evenly spaced values `min, min + step, ..` not exceeding `max`.
///
/// The count is computed up front so accumulated rounding never drops or adds
/// the last value. A non-positive step yields `min` alone.
pub fn sample_range(min: f64, max: f64, step: f64) -> Vec<f64> {
    if !(step > 0.0) || max < min {
        return vec![min];
    }
    let count = ((max - min) / step + 1e-9).floor() as usize;
    (0..=count).map(|i| min + i as f64 * step).collect()
}

/// Generate one trajectory per point of the reference point's sampling envelope.
pub fn sample_candidates(
    generator: &TrajectoryGenerator,
    lane: &Lane,
    origin: &FrenetState,
    reference_point: &ReferencePoint,
    z: f64,
) -> SampledTrajectories {
    let envelope = &reference_point.envelope;
    let lateral = sample_range(
        -envelope.lateral_max_offset,
        envelope.lateral_max_offset,
        envelope.lateral_sampling_resolution,
    );
    let longitudinal = sample_range(
        -envelope.longitudinal_max_offset,
        envelope.longitudinal_max_offset,
        envelope.longitudinal_sampling_resolution,
    );
    let velocity = sample_range(
        0.0,
        envelope.longitudinal_velocity_max_offset,
        envelope.longitudinal_velocity_sampling_resolution,
    );
    let horizon = sample_range(
        -envelope.time_horizon_max_offset,
        envelope.time_horizon_max_offset,
        envelope.time_horizon_sampling_resolution,
    );

    let mut sampled = SampledTrajectories::default();
    for (d_offset, s_offset, v_offset, t_offset) in
        iproduct!(lateral.iter(), longitudinal.iter(), velocity.iter(), horizon.iter())
    {
        let mut target = reference_point.frenet_point;
        target.d_state[0] += d_offset;
        target.s_state[0] += s_offset;
        if target.s_state[1] - v_offset < 0.0 {
            continue;
        }
        target.s_state[1] -= v_offset;

        let time_horizon = envelope.time_horizon + t_offset;
        if time_horizon <= 0.0 {
            continue;
        }

        match generator.generate(lane, origin, &target, time_horizon, z) {
            Ok(generated) => {
                if generated.is_valid {
                    sampled.candidates.push(generated.trajectory.clone());
                }
                sampled.debug_trajectories.push(generated.trajectory);
            }
            Err(e) => debug!("skipping sample (T = {:.1}): {}", time_horizon, e),
        }
    }

    if sampled.candidates.is_empty() {
        warn!(
            "no jerk-valid trajectory among {} samples toward s = {:.2}",
            sampled.debug_trajectories.len(),
            reference_point.frenet_point.s()
        );
    } else {
        debug!(
            "{} of {} sampled trajectories are jerk-valid",
            sampled.candidates.len(),
            sampled.debug_trajectories.len()
        );
    }
    sampled
}
