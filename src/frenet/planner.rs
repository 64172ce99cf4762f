//! Planning cycle orchestration
//!
//! Every cycle refreshes the "current" reference point and trajectory, then
//! advances the "next" pair one step behind it, and publishes both
//! trajectories back to back. All state carried between cycles lives in
//! [`PlannerState`], which is moved into and out of [`FrenetPlanner::plan_cycle`].

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::common::{
    nearest_waypoint_index, DetectedObject, PlannerError, PlanningResult, Point2D, Pose2D, Waypoint, YamlConfig,
};
use crate::frenet::config::FrenetPlannerConfig;
use crate::frenet::converter::waypoint_to_frenet;
use crate::frenet::lane::Lane;
use crate::frenet::reference_point::{CycleContext, ReferencePointEngine};
use crate::frenet::sampler::sample_candidates;
use crate::frenet::selector::TrajectorySelector;
use crate::frenet::state::{FrenetState, ReferencePoint, ReferenceType, Trajectory};
use crate::frenet::trajectory_generator::TrajectoryGenerator;

/// Kept reference points and trajectories carried from one cycle to the next
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerState {
    pub current_reference: Option<ReferencePoint>,
    pub current_trajectory: Option<Trajectory>,
    pub next_reference: Option<ReferencePoint>,
    pub next_trajectory: Option<Trajectory>,
    /// Lookahead of the last next-point generation [m]
    pub lookahead_distance: f64,
}

impl PlannerState {
    /// Empty state for a planner with the given configuration.
    pub fn new(config: &FrenetPlannerConfig) -> Self {
        Self {
            current_reference: None,
            current_trajectory: None,
            next_reference: None,
            next_trajectory: None,
            lookahead_distance: config.min_lookahead_distance,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.current_reference.is_some() && self.current_trajectory.is_some()
    }

    fn drop_next(&mut self) {
        self.next_reference = None;
        self.next_trajectory = None;
    }
}

impl Default for PlannerState {
    fn default() -> Self {
        Self::new(&FrenetPlannerConfig::default())
    }
}

/// Snapshot of everything a cycle reads
#[derive(Debug, Clone, Copy)]
pub struct PlanningInput<'a> {
    pub ego_pose: Pose2D,
    pub ego_velocity: f64,
    pub reference_waypoints: &'a [Waypoint],
    pub lane: &'a Lane,
    pub objects: &'a [DetectedObject],
}

/// Published result of a cycle
#[derive(Debug, Clone, Default)]
pub struct PlanOutput {
    /// Current trajectory followed by the next trajectory
    pub trajectory: Vec<Waypoint>,
    /// Every trajectory sampled this cycle, valid or not
    pub debug_trajectories: Vec<Trajectory>,
    /// Cartesian positions of the active reference points
    pub reference_points: Vec<Point2D>,
}

#[derive(Debug, Clone)]
pub struct FrenetPlanner {
    config: FrenetPlannerConfig,
}

impl FrenetPlanner {
    pub fn new(config: FrenetPlannerConfig) -> PlanningResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FrenetPlannerConfig {
        &self.config
    }

    /// Fresh state for this planner.
    pub fn initial_state(&self) -> PlannerState {
        PlannerState::new(&self.config)
    }

    /// Run one planning cycle.
    ///
    /// Only a cycle without any kept trajectory can fail; later cycles fall back
    /// to the kept state when no better trajectory is found.
    pub fn plan_cycle(
        &self,
        mut state: PlannerState,
        input: &PlanningInput<'_>,
    ) -> (PlannerState, PlanningResult<PlanOutput>) {
        let result = self.run_cycle(&mut state, input);
        if let Err(e) = &result {
            error!("planning cycle failed: {}", e);
        }
        (state, result)
    }

    fn run_cycle(&self, state: &mut PlannerState, input: &PlanningInput<'_>) -> PlanningResult<PlanOutput> {
        if input.reference_waypoints.is_empty() {
            return Err(PlannerError::InvalidInput("reference waypoint list is empty".to_string()));
        }
        let ctx = CycleContext {
            lane: input.lane,
            reference_waypoints: input.reference_waypoints,
            objects: input.objects,
        };
        let engine = ReferencePointEngine::new(&self.config);
        let mut debug_trajectories = Vec::new();

        if state.is_initialized() {
            self.refresh_current(state, &ctx, &engine, input, &mut debug_trajectories);
        } else {
            let (reference, trajectory) = self.initialize(&ctx, &engine, input, &mut debug_trajectories)?;
            *state = PlannerState {
                current_reference: Some(reference),
                current_trajectory: Some(trajectory),
                ..self.initial_state()
            };
        }

        self.advance_next(state, &ctx, &engine, input, &mut debug_trajectories);

        let mut output = PlanOutput {
            debug_trajectories,
            ..Default::default()
        };
        if let Some(trajectory) = &state.current_trajectory {
            output.trajectory.extend_from_slice(trajectory.waypoints());
        }
        if let Some(trajectory) = &state.next_trajectory {
            output.trajectory.extend_from_slice(trajectory.waypoints());
        }
        output.reference_points.extend(
            state
                .current_reference
                .iter()
                .chain(state.next_reference.iter())
                .map(|r| r.cartesian_point),
        );
        debug!(
            "published {} waypoints ({} sampled trajectories)",
            output.trajectory.len(),
            output.debug_trajectories.len()
        );
        Ok(output)
    }

    /// First cycle: plan from the reference waypoint nearest to the ego.
    fn initialize(
        &self,
        ctx: &CycleContext<'_>,
        engine: &ReferencePointEngine<'_>,
        input: &PlanningInput<'_>,
        debug_trajectories: &mut Vec<Trajectory>,
    ) -> PlanningResult<(ReferencePoint, Trajectory)> {
        let ego = input.ego_pose.position();
        let nearest = nearest_waypoint_index(&ego, ctx.reference_waypoints)
            .ok_or_else(|| PlannerError::InvalidInput("reference waypoint list is empty".to_string()))?;
        let origin = waypoint_to_frenet(
            &ctx.reference_waypoints[nearest].position(),
            self.config.initial_velocity,
            ctx.lane,
        )?;

        let reference = engine.generate_initial(ctx, &ego, input.ego_velocity)?;
        let reference = engine.screen_for_obstacles(ctx, &origin, reference)?;
        let trajectory = self.sample_and_select(ctx, &origin, &reference, debug_trajectories)?;
        info!(
            "tracking started toward {:?} at s = {:.2}",
            reference.reference_type,
            reference.frenet_point.s()
        );
        Ok((reference, trajectory))
    }

    /// Expire, crop and re-target the current pair.
    fn refresh_current(
        &self,
        state: &mut PlannerState,
        ctx: &CycleContext<'_>,
        engine: &ReferencePointEngine<'_>,
        input: &PlanningInput<'_>,
        debug_trajectories: &mut Vec<Trajectory>,
    ) {
        let ego = &input.ego_pose;
        let (current_reference, current_trajectory) =
            match (state.current_reference.as_mut(), state.current_trajectory.as_mut()) {
                (Some(r), Some(t)) => (r, t),
                _ => return,
            };

        if let Some(last) = ctx.reference_waypoints.last() {
            if !engine.is_valid(ego, current_reference, &last.position()) {
                match state.next_reference.take() {
                    Some(next_reference) => {
                        info!("current reference point passed; promoting {:?}", next_reference.reference_type);
                        *current_reference = next_reference;
                        if let Some(next_trajectory) = state.next_trajectory.take() {
                            current_trajectory.append(&next_trajectory);
                        }
                    }
                    None => warn!("current reference point is behind the ego and there is no next one"),
                }
            }
        }

        crop_behind(current_trajectory, ego, 1);
        if let Some(next_trajectory) = state.next_trajectory.as_mut() {
            crop_behind(next_trajectory, ego, 0);
            if next_trajectory.is_empty() {
                debug!("next trajectory fully passed");
                state.next_reference = None;
                state.next_trajectory = None;
            }
        }
        if current_trajectory.is_empty() {
            warn!("current trajectory is exhausted");
            if let (Some(r), Some(t)) = (state.next_reference.take(), state.next_trajectory.take()) {
                *current_reference = r;
                *current_trajectory = t;
            }
        }

        let origin = match current_trajectory.first_frenet() {
            Some(origin) => *origin,
            None => return,
        };
        match engine.update(ctx, current_trajectory, current_reference) {
            Ok(Some(updated)) => match self.sample_and_select(ctx, &origin, &updated, debug_trajectories) {
                Ok(trajectory) => {
                    info!("current reference point updated to {:?}", updated.reference_type);
                    *current_reference = updated;
                    *current_trajectory = trajectory;
                }
                Err(e) => warn!("keeping current trajectory: {}", e),
            },
            Ok(None) => {}
            Err(e) => warn!("could not update current reference point: {}", e),
        }
    }

    /// Update or create the next pair behind the current one.
    fn advance_next(
        &self,
        state: &mut PlannerState,
        ctx: &CycleContext<'_>,
        engine: &ReferencePointEngine<'_>,
        input: &PlanningInput<'_>,
        debug_trajectories: &mut Vec<Trajectory>,
    ) {
        let (current_reference, current_trajectory) =
            match (state.current_reference.as_mut(), state.current_trajectory.as_mut()) {
                (Some(r), Some(t)) if !t.is_empty() => (r, t),
                _ => return,
            };

        let next = match (&state.next_reference, &state.next_trajectory) {
            (Some(next_reference), Some(next_trajectory)) => {
                match engine.update(ctx, next_trajectory, next_reference) {
                    Ok(next) => next,
                    Err(e) => {
                        warn!("could not update next reference point: {}", e);
                        None
                    }
                }
            }
            _ => {
                let distance = input.ego_pose.position().distance(&current_reference.cartesian_point);
                if distance < state.lookahead_distance {
                    let speed = current_trajectory.last_frenet().map(|f| f.s_velocity()).unwrap_or(0.0);
                    state.lookahead_distance = engine.next_lookahead(speed);
                    match engine.generate_new(ctx, current_reference, state.lookahead_distance) {
                        Ok(next) => next,
                        Err(e) => {
                            warn!("could not generate next reference point: {}", e);
                            None
                        }
                    }
                } else {
                    None
                }
            }
        };
        let mut next_reference = match next {
            Some(next) => next,
            None => return,
        };

        let mut origin = match current_trajectory.last_frenet() {
            Some(origin) => *origin,
            None => return,
        };

        if let ReferenceType::Obstacle { object_index, .. } = next_reference.reference_type {
            if let Some(object) = ctx.objects.get(object_index) {
                if object.position.distance(&next_reference.cartesian_point) < self.config.distance_before_obstacle {
                    let index = nearest_beyond(current_trajectory, &object.position, self.config.distance_before_obstacle)
                        .unwrap_or_else(|| {
                            warn!("current trajectory never keeps the standoff distance");
                            0
                        });
                    debug!("re-anchoring obstacle standoff on current trajectory sample {}", index);
                    let mut anchor = current_trajectory.frenet_points()[index];
                    anchor.s_state[1] = self.config.velocity_before_obstacle;
                    next_reference.frenet_point = anchor;
                    next_reference.cartesian_point = current_trajectory.waypoints()[index].position();
                    current_trajectory.truncate(index + 1);
                    if let (Some(f), Some(w)) = (current_trajectory.first_frenet(), current_trajectory.first_waypoint()) {
                        current_reference.frenet_point = *f;
                        current_reference.cartesian_point = w.position();
                    }
                    origin = current_reference.frenet_point;
                }
            }
        }

        if origin.s_velocity() < self.config.min_origin_speed {
            origin.s_state[1] += self.config.origin_speed_nudge;
        }
        if next_reference.frenet_point.s() < current_reference.frenet_point.s() {
            warn!(
                "next reference point (s = {:.2}) is behind the current one (s = {:.2})",
                next_reference.frenet_point.s(),
                current_reference.frenet_point.s()
            );
        }

        if next_reference.reference_type == ReferenceType::StopLine {
            let gap = next_reference.cartesian_point.distance(&current_reference.cartesian_point);
            let converge_distance = self.config.converge_distance_per_speed * input.ego_velocity;
            if gap < converge_distance {
                let index = nearest_beyond(current_trajectory, &next_reference.cartesian_point, converge_distance)
                    .unwrap_or(0);
                debug!(
                    "stop line {:.2} m after the current reference point; pulling it back to sample {}",
                    gap, index
                );
                current_reference.frenet_point = current_trajectory.frenet_points()[index];
                current_reference.cartesian_point = current_trajectory.waypoints()[index].position();
                current_trajectory.truncate(index + 1);
                if let Some(last) = current_trajectory.last_frenet() {
                    origin = *last;
                }
            }
        }

        match self.sample_and_select(ctx, &origin, &next_reference, debug_trajectories) {
            Ok(trajectory) => {
                state.next_reference = Some(next_reference);
                state.next_trajectory = Some(trajectory);
            }
            Err(e) => {
                warn!("dropping next reference point: {}", e);
                state.drop_next();
            }
        }
    }

    fn sample_and_select(
        &self,
        ctx: &CycleContext<'_>,
        origin: &FrenetState,
        reference: &ReferencePoint,
        debug_trajectories: &mut Vec<Trajectory>,
    ) -> PlanningResult<Trajectory> {
        let generator = TrajectoryGenerator::new(&self.config);
        let mut sampled = sample_candidates(&generator, ctx.lane, origin, reference, ctx.z());
        debug_trajectories.append(&mut sampled.debug_trajectories);
        let selector = TrajectorySelector::new(&self.config);
        let index = selector.select(&sampled.candidates, ctx.reference_waypoints, reference, ctx.objects)?;
        Ok(sampled.candidates.swap_remove(index))
    }
}

/// Drop the leading run of samples that lie behind the ego, keeping at least `keep`.
fn crop_behind(trajectory: &mut Trajectory, ego: &Pose2D, keep: usize) {
    let behind = trajectory
        .waypoints()
        .iter()
        .take_while(|w| ego.is_behind(&w.position()))
        .count();
    let removable = trajectory.len().saturating_sub(keep);
    trajectory.crop_front(behind.min(removable));
}

/// Sample closest to `point` among those farther than `min_distance` from it.
fn nearest_beyond(trajectory: &Trajectory, point: &Point2D, min_distance: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, w) in trajectory.waypoints().iter().enumerate() {
        let distance = w.distance(point);
        if distance <= min_distance {
            continue;
        }
        match best {
            Some((_, min)) if distance >= min => {}
            _ => best = Some((i, distance)),
        }
    }
    best.map(|(i, _)| i)
}
