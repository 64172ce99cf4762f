//! Cost-based selection among candidate trajectories

use log::{debug, warn};
use ordered_float::OrderedFloat;

use crate::common::{
    nearest_waypoint_index, DetectedObject, PlannerError, PlanningResult, Point2D, Waypoint,
};
use crate::frenet::collision::CollisionChecker;
use crate::frenet::config::{CostWeights, FrenetPlannerConfig};
use crate::frenet::state::{ReferencePoint, Trajectory};

/// Raw (unnormalised) costs of one candidate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CandidateCosts {
    pub tracking: f64,
    pub terminal: f64,
    pub jerk: f64,
    pub time: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct TrajectorySelector {
    pub weights: CostWeights,
    /// Candidates must end within this distance of the reference point
    pub valid_trajectory_radius: f64,
    pub collision_checker: CollisionChecker,
}

impl TrajectorySelector {
    pub fn new(config: &FrenetPlannerConfig) -> Self {
        Self {
            weights: config.cost_weights,
            valid_trajectory_radius: config.valid_trajectory_radius,
            collision_checker: CollisionChecker::new(config.obstacle_radius),
        }
    }

    /// Index into `candidates` of the cheapest collision-free trajectory.
    ///
    /// Ties keep candidate order. Nothing is modified on failure, so callers
    /// can hold on to their previous selection.
    pub fn select(
        &self,
        candidates: &[Trajectory],
        reference_waypoints: &[Waypoint],
        reference_point: &ReferencePoint,
        objects: &[DetectedObject],
    ) -> PlanningResult<usize> {
        let origin = candidates
            .iter()
            .find_map(|c| c.first_waypoint())
            .ok_or_else(|| PlannerError::NoCandidate("candidate set is empty".to_string()))?;

        let subset = evaluation_waypoints(&origin.position(), reference_waypoints, reference_point);

        let filtered: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                c.last_waypoint()
                    .map(|w| w.distance(&reference_point.cartesian_point) < self.valid_trajectory_radius)
                    .unwrap_or(false)
            })
            .map(|(i, _)| i)
            .collect();
        if filtered.is_empty() {
            return Err(PlannerError::NoCandidate(format!(
                "none of {} candidates ends within {} m of the reference point",
                candidates.len(),
                self.valid_trajectory_radius
            )));
        }

        let costs: Vec<CandidateCosts> = filtered
            .iter()
            .map(|&i| candidate_costs(&candidates[i], subset, reference_point))
            .collect();
        let combined = self.combine(&costs);

        let mut order: Vec<usize> = (0..filtered.len()).collect();
        order.sort_by_key(|&i| OrderedFloat(combined[i]));

        for &rank in &order {
            let index = filtered[rank];
            if self
                .collision_checker
                .is_trajectory_collision_free(candidates[index].waypoints(), objects)
            {
                debug!(
                    "selected candidate {} (T = {:.1}, cost {:.4}) among {}",
                    index,
                    candidates[index].required_time,
                    combined[rank],
                    filtered.len()
                );
                return Ok(index);
            }
        }

        Err(PlannerError::NoCollisionFreeCandidate(format!(
            "all {} scored candidates collide",
            filtered.len()
        )))
    }

    /// Normalise every cost term by its sum over the candidates and weight them.
    pub fn combine(&self, costs: &[CandidateCosts]) -> Vec<f64> {
        let tracking = normalized(costs.iter().map(|c| c.tracking));
        let terminal = normalized(costs.iter().map(|c| c.terminal));
        let jerk = normalized(costs.iter().map(|c| c.jerk));
        let time = normalized(costs.iter().map(|c| c.time));
        (0..costs.len())
            .map(|i| {
                tracking[i] * self.weights.tracking
                    + terminal[i] * self.weights.terminal
                    + jerk[i] * self.weights.jerk
                    + time[i] * self.weights.time
            })
            .collect()
    }
}

/// Reference waypoints between the trajectory origin and the reference point.
fn evaluation_waypoints<'a>(
    origin: &Point2D,
    reference_waypoints: &'a [Waypoint],
    reference_point: &ReferencePoint,
) -> &'a [Waypoint] {
    let first = nearest_waypoint_index(origin, reference_waypoints);
    let last = nearest_waypoint_index(&reference_point.cartesian_point, reference_waypoints);
    match (first, last) {
        (Some(first), Some(last)) if first < last => &reference_waypoints[first..last],
        (first, last) => {
            warn!(
                "no reference waypoints between origin ({:?}) and reference point ({:?})",
                first, last
            );
            &[]
        }
    }
}

pub fn candidate_costs(
    trajectory: &Trajectory,
    subset: &[Waypoint],
    reference_point: &ReferencePoint,
) -> CandidateCosts {
    let mut tracking = 0.0;
    let mut jerk = 0.0;
    for reference in subset {
        if let Some(i) = nearest_waypoint_index(&reference.position(), trajectory.waypoints()) {
            tracking += trajectory.waypoints()[i].distance(&reference.position());
            let f = &trajectory.frenet_points()[i];
            jerk += f.s_state[3].abs() + f.d_state[3].abs();
        }
    }

    let target = &reference_point.frenet_point;
    let terminal = trajectory
        .last_frenet()
        .map(|last| {
            (last.d() - target.d()).powi(2)
                + (last.s() - target.s()).powi(2)
                + (last.s_velocity() - target.s_velocity()).powi(2)
        })
        .unwrap_or(0.0);

    let (min_time, max_time) = reference_point.envelope.horizon_window();
    let time = if max_time != 0.0 {
        (trajectory.required_time - min_time) / max_time
    } else {
        0.0
    };

    CandidateCosts {
        tracking,
        terminal,
        jerk,
        time,
    }
}

fn normalized<I: Iterator<Item = f64> + Clone>(values: I) -> Vec<f64> {
    let sum: f64 = values.clone().sum();
    if sum == 0.0 || !sum.is_finite() {
        values.map(|_| 0.0).collect()
    } else {
        values.map(|v| v / sum).collect()
    }
}
