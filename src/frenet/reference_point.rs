//! Reference point state machine
//!
//! Decides where the vehicle is heading: a lookahead waypoint, a stop line, a
//! standoff point in front of an obstacle or a laterally offset avoiding point.
//! All functions are pure; the planner owns the resulting reference points.

use std::f64::consts::FRAC_PI_2;

use log::{debug, info, warn};

use crate::common::{DetectedObject, PlannerError, PlanningResult, Point2D, Pose2D, Waypoint};
use crate::frenet::collision::{CollisionChecker, CollisionInfo};
use crate::frenet::config::FrenetPlannerConfig;
use crate::frenet::converter::{frenet_to_cartesian, waypoint_to_frenet};
use crate::frenet::lane::Lane;
use crate::frenet::sampler::sample_range;
use crate::frenet::state::{FrenetState, ReferencePoint, ReferenceType, Trajectory};
use crate::frenet::trajectory_generator::TrajectoryGenerator;

/// Read-only inputs of one planning cycle
#[derive(Debug, Clone, Copy)]
pub struct CycleContext<'a> {
    pub lane: &'a Lane,
    pub reference_waypoints: &'a [Waypoint],
    pub objects: &'a [DetectedObject],
}

impl<'a> CycleContext<'a> {
    /// Height copied onto generated waypoints.
    pub fn z(&self) -> f64 {
        self.reference_waypoints.first().map(|w| w.z).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReferencePointEngine<'c> {
    config: &'c FrenetPlannerConfig,
    generator: TrajectoryGenerator,
}

impl<'c> ReferencePointEngine<'c> {
    pub fn new(config: &'c FrenetPlannerConfig) -> Self {
        Self {
            config,
            generator: TrajectoryGenerator::new(config),
        }
    }

    /// Lookahead used when picking the next reference point at `speed`.
    pub fn next_lookahead(&self, speed: f64) -> f64 {
        (speed.abs() * self.config.lookahead_per_speed).max(self.config.min_lookahead_distance)
    }

    /// First reference point of a run: the farthest reference waypoint inside
    /// a speed-scaled lookahead around `origin`.
    pub fn generate_initial(
        &self,
        ctx: &CycleContext<'_>,
        origin: &Point2D,
        speed: f64,
    ) -> PlanningResult<ReferencePoint> {
        let lookahead =
            (speed.abs() * self.config.initial_lookahead_per_speed).max(self.config.min_lookahead_distance);
        let target = farthest_within(ctx.reference_waypoints, origin, lookahead, |_| true).ok_or_else(|| {
            PlannerError::ReferenceSearchExhausted(format!(
                "no reference waypoint within {:.1} m of the origin",
                lookahead
            ))
        })?;

        let frenet_point = waypoint_to_frenet(&target.position(), target.velocity, ctx.lane)?;
        info!(
            "initial reference point at s = {:.2} (lookahead {:.1} m)",
            frenet_point.s(),
            lookahead
        );
        Ok(ReferencePoint::new(
            frenet_point,
            target.position(),
            ReferenceType::Waypoint,
            self.config.envelopes.initial,
        ))
    }

    /// Replace `reference` with an obstacle standoff point when the draft
    /// trajectory from `origin` toward it is blocked.
    pub fn screen_for_obstacles(
        &self,
        ctx: &CycleContext<'_>,
        origin: &FrenetState,
        reference: ReferencePoint,
    ) -> PlanningResult<ReferencePoint> {
        let draft = self.generator.generate(
            ctx.lane,
            origin,
            &reference.frenet_point,
            self.config.draft_horizon,
            ctx.z(),
        )?;
        match self.draft_checker().first_collision(draft.trajectory.waypoints(), ctx.objects) {
            Some(collision) => {
                info!(
                    "object {} blocks the way to the initial reference point",
                    collision.object_id
                );
                self.obstacle_standoff(ctx, &draft.trajectory, &collision)
            }
            None => Ok(reference),
        }
    }

    /// Next reference point beyond `current`, or `None` when `current` is a
    /// stop line.
    pub fn generate_new(
        &self,
        ctx: &CycleContext<'_>,
        current: &ReferencePoint,
        lookahead: f64,
    ) -> PlanningResult<Option<ReferencePoint>> {
        if current.reference_type == ReferenceType::StopLine {
            return Ok(None);
        }

        // waypoints that have the current reference point behind them
        let default_target = farthest_within(ctx.reference_waypoints, &current.cartesian_point, lookahead, |w| {
            w.pose.bearing_to(&current.cartesian_point).abs() >= FRAC_PI_2
        });
        let default_target = match default_target {
            Some(target) => target,
            None => {
                warn!(
                    "no reference waypoint within {:.1} m ahead of the current reference point",
                    lookahead
                );
                return Ok(Some(self.stop_in_place(current)));
            }
        };
        let default_frenet = waypoint_to_frenet(&default_target.position(), default_target.velocity, ctx.lane)?;

        let next = if current.reference_type.is_obstacle() {
            self.avoiding_point(ctx, current, &default_frenet)?
        } else {
            let draft = self.generator.generate(
                ctx.lane,
                &current.frenet_point,
                &default_frenet,
                self.config.draft_horizon,
                ctx.z(),
            )?;
            match self.draft_checker().first_collision(draft.trajectory.waypoints(), ctx.objects) {
                Some(collision) => self.obstacle_standoff(ctx, &draft.trajectory, &collision)?,
                None => {
                    let reference_type = if default_target.velocity < self.config.stop_speed_threshold {
                        ReferenceType::StopLine
                    } else {
                        ReferenceType::Waypoint
                    };
                    ReferencePoint::new(
                        default_frenet,
                        default_target.position(),
                        reference_type,
                        self.config.envelope_for(&reference_type),
                    )
                }
            }
        };
        info!(
            "new reference point {:?} at s = {:.2}, d = {:.2}",
            next.reference_type,
            next.frenet_point.s(),
            next.frenet_point.d()
        );
        Ok(Some(next))
    }

    /// Re-target `current` when its kept trajectory now runs into an object
    /// or passes a stop waypoint. `None` leaves it unchanged.
    pub fn update(
        &self,
        ctx: &CycleContext<'_>,
        kept_trajectory: &Trajectory,
        current: &ReferencePoint,
    ) -> PlanningResult<Option<ReferencePoint>> {
        if let Some(last) = ctx.reference_waypoints.last() {
            if last.distance(&current.cartesian_point) < self.config.end_of_route_tolerance {
                return Ok(None);
            }
        }

        let flagged = flagged_waypoint(ctx.reference_waypoints, self.config.flagged_waypoint_speed);
        let checker = CollisionChecker::new(self.config.obstacle_radius);

        let mut found: Option<(Waypoint, ReferenceType)> = None;
        for waypoint in kept_trajectory.waypoints() {
            if let Some(object_index) = checker.colliding_object(&waypoint.position(), ctx.objects) {
                debug!("kept trajectory now collides with object {}", ctx.objects[object_index].id);
                found = Some((
                    *waypoint,
                    ReferenceType::Obstacle {
                        object_id: ctx.objects[object_index].id,
                        object_index,
                    },
                ));
                break;
            }
            if let Some(flagged) = flagged {
                if flagged.distance(&waypoint.position()) < self.config.flagged_waypoint_radius {
                    debug!("kept trajectory passes a stop waypoint");
                    found = Some((*flagged, ReferenceType::StopLine));
                    break;
                }
            }
        }

        let (target, reference_type) = match found {
            Some(found) => found,
            None => return Ok(None),
        };
        let frenet_point = waypoint_to_frenet(&target.position(), target.velocity, ctx.lane)?;
        let stopping = target.velocity < self.config.flagged_waypoint_speed;
        Ok(Some(ReferencePoint::new(
            frenet_point,
            target.position(),
            reference_type,
            self.config.update_envelope(stopping),
        )))
    }

    /// A reference point expires once it falls behind the ego, except at the
    /// end of the route.
    pub fn is_valid(&self, ego: &Pose2D, reference: &ReferencePoint, last_waypoint: &Point2D) -> bool {
        if reference.cartesian_point.distance(last_waypoint) < self.config.end_of_route_tolerance {
            return true;
        }
        ego.bearing_to(&reference.cartesian_point).abs() < FRAC_PI_2
    }

    fn draft_checker(&self) -> CollisionChecker {
        CollisionChecker::new(self.config.reference_obstacle_radius)
    }

    /// Sample before the collision that is closest to the object while still
    /// keeping the standoff distance from it.
    fn obstacle_standoff(
        &self,
        ctx: &CycleContext<'_>,
        draft: &Trajectory,
        collision: &CollisionInfo,
    ) -> PlanningResult<ReferencePoint> {
        let object = ctx.objects[collision.object_index].position;
        let waypoints = &draft.waypoints()[..collision.waypoint_index];
        let standoff = waypoints
            .iter()
            .map(|w| (w.position(), w.distance(&object)))
            .filter(|(_, distance)| *distance > self.config.distance_before_obstacle)
            .fold(None, |best: Option<(Point2D, f64)>, candidate| match best {
                Some(b) if b.1 <= candidate.1 => Some(b),
                _ => Some(candidate),
            });

        let position = match standoff {
            Some((position, distance)) => {
                debug!("standoff point {:.2} m before object {}", distance, collision.object_id);
                position
            }
            None => {
                warn!(
                    "no draft sample keeps {:.1} m from object {}; using the draft origin",
                    self.config.distance_before_obstacle, collision.object_id
                );
                draft
                    .first_waypoint()
                    .map(|w| w.position())
                    .ok_or_else(|| PlannerError::DegenerateGeometry("empty draft trajectory".to_string()))?
            }
        };

        let reference_type = ReferenceType::Obstacle {
            object_id: collision.object_id,
            object_index: collision.object_index,
        };
        Ok(ReferencePoint::new(
            waypoint_to_frenet(&position, self.config.velocity_before_obstacle, ctx.lane)?,
            position,
            reference_type,
            self.config.envelope_for(&reference_type),
        ))
    }

    /// Scan lateral offsets around `default_frenet` for a collision-free draft.
    fn avoiding_point(
        &self,
        ctx: &CycleContext<'_>,
        current: &ReferencePoint,
        default_frenet: &FrenetState,
    ) -> PlanningResult<ReferencePoint> {
        let offsets = sample_range(
            self.config.min_lateral_avoidance_offset,
            self.config.max_lateral_avoidance_offset,
            self.config.avoidance_lateral_step,
        );
        for offset in offsets {
            let mut target = *default_frenet;
            target.d_state[0] += offset;
            let draft = self.generator.generate(
                ctx.lane,
                &current.frenet_point,
                &target,
                self.config.avoidance_horizon,
                ctx.z(),
            )?;
            if !self
                .draft_checker()
                .is_trajectory_collision_free(draft.trajectory.waypoints(), ctx.objects)
            {
                continue;
            }

            debug!("lateral offset {:.1} m clears the obstacle", offset);
            target.s_state[1] = (target.s_state[1] * self.config.avoiding_speed_ratio)
                .min(self.config.velocity_before_obstacle * self.config.avoiding_crawl_multiplier);
            let position = frenet_to_cartesian(target.s(), target.d(), ctx.lane);
            return Ok(ReferencePoint::new(
                target,
                position,
                ReferenceType::AvoidingPoint,
                self.config.envelope_for(&ReferenceType::AvoidingPoint),
            ));
        }

        warn!("no lateral offset avoids the obstacle; stopping at the current reference point");
        Ok(self.stop_in_place(current))
    }

    fn stop_in_place(&self, current: &ReferencePoint) -> ReferencePoint {
        let mut frenet_point = current.frenet_point;
        frenet_point.s_state[1] = 0.0;
        ReferencePoint::new(
            frenet_point,
            current.cartesian_point,
            ReferenceType::Unknown,
            self.config.envelope_for(&ReferenceType::Unknown),
        )
    }
}

/// First reference waypoint slower than `speed_threshold`.
pub fn flagged_waypoint(waypoints: &[Waypoint], speed_threshold: f64) -> Option<&Waypoint> {
    waypoints.iter().find(|w| w.velocity < speed_threshold)
}

/// Farthest waypoint strictly closer than `radius` to `center` among those
/// accepted by `accept`. The first of equally distant waypoints wins.
fn farthest_within<'w, F>(waypoints: &'w [Waypoint], center: &Point2D, radius: f64, accept: F) -> Option<&'w Waypoint>
where
    F: Fn(&Waypoint) -> bool,
{
    let mut best: Option<(&Waypoint, f64)> = None;
    for waypoint in waypoints.iter().filter(|w| accept(*w)) {
        let distance = waypoint.distance(center);
        if distance >= radius {
            continue;
        }
        match best {
            Some((_, max)) if distance <= max => {}
            _ => best = Some((waypoint, distance)),
        }
    }
    best.map(|(w, _)| w)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scene {
        config: FrenetPlannerConfig,
        lane: Lane,
        waypoints: Vec<Waypoint>,
    }

    fn scene() -> Scene {
        Scene {
            config: FrenetPlannerConfig::default(),
            lane: Lane::straight(Point2D::origin(), 0.0, 100, 1.0).unwrap(),
            waypoints: (0..100).map(|i| Waypoint::new(i as f64, 0.0, 0.0, 5.0)).collect(),
        }
    }

    fn waypoint_reference(s: f64, speed: f64) -> ReferencePoint {
        ReferencePoint::new(
            FrenetState::at(s, 0.0, speed),
            Point2D::new(s, 0.0),
            ReferenceType::Waypoint,
            FrenetPlannerConfig::default().envelope_for(&ReferenceType::Waypoint),
        )
    }

    #[test]
    fn test_initial_reference_point() {
        let s = scene();
        let engine = ReferencePointEngine::new(&s.config);
        let ctx = CycleContext {
            lane: &s.lane,
            reference_waypoints: &s.waypoints,
            objects: &[],
        };
        let reference = engine.generate_initial(&ctx, &Point2D::origin(), 5.0).unwrap();
        // lookahead max(4 * 5, 12) = 20, strictly inside
        assert!((reference.cartesian_point.x - 19.0).abs() < 1e-9);
        assert_eq!(reference.reference_type, ReferenceType::Waypoint);
        assert_eq!(reference.envelope, s.config.envelopes.initial);
    }

    #[test]
    fn test_collision_on_draft_yields_obstacle() {
        let s = scene();
        let engine = ReferencePointEngine::new(&s.config);
        let objects = vec![DetectedObject::new(42, 40.0, 0.0)];
        let ctx = CycleContext {
            lane: &s.lane,
            reference_waypoints: &s.waypoints,
            objects: &objects,
        };
        let current = waypoint_reference(20.0, 5.0);
        let next = engine.generate_new(&ctx, &current, 36.0).unwrap().unwrap();
        assert_eq!(
            next.reference_type,
            ReferenceType::Obstacle {
                object_id: 42,
                object_index: 0
            }
        );
        assert!(next.cartesian_point.distance(&objects[0].position) > s.config.distance_before_obstacle);
        assert!((next.frenet_point.s_velocity() - s.config.velocity_before_obstacle).abs() < 1e-12);
    }

    #[test]
    fn test_free_draft_yields_waypoint() {
        let s = scene();
        let engine = ReferencePointEngine::new(&s.config);
        let ctx = CycleContext {
            lane: &s.lane,
            reference_waypoints: &s.waypoints,
            objects: &[],
        };
        let current = waypoint_reference(20.0, 5.0);
        let next = engine.generate_new(&ctx, &current, 36.0).unwrap().unwrap();
        assert_eq!(next.reference_type, ReferenceType::Waypoint);
        assert!((next.cartesian_point.x - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_stop_line_is_terminal() {
        let s = scene();
        let engine = ReferencePointEngine::new(&s.config);
        let ctx = CycleContext {
            lane: &s.lane,
            reference_waypoints: &s.waypoints,
            objects: &[],
        };
        let mut current = waypoint_reference(20.0, 0.0);
        current.reference_type = ReferenceType::StopLine;
        assert!(engine.generate_new(&ctx, &current, 36.0).unwrap().is_none());
    }

    #[test]
    fn test_obstacle_yields_avoiding_point() {
        let s = scene();
        let engine = ReferencePointEngine::new(&s.config);
        let objects = vec![DetectedObject::new(3, 30.0, 1.0)];
        let ctx = CycleContext {
            lane: &s.lane,
            reference_waypoints: &s.waypoints,
            objects: &objects,
        };
        let mut current = waypoint_reference(22.0, s.config.velocity_before_obstacle);
        current.reference_type = ReferenceType::Obstacle {
            object_id: 3,
            object_index: 0,
        };
        let next = engine.generate_new(&ctx, &current, 12.0).unwrap().unwrap();
        assert_eq!(next.reference_type, ReferenceType::AvoidingPoint);
        assert!(next.frenet_point.d() >= s.config.min_lateral_avoidance_offset);
        // positive d lies to the right of a +x lane
        assert!(next.cartesian_point.y < 0.0);
        let expected_speed = (5.0 * 0.75f64).min(0.278 * 6.0);
        assert!((next.frenet_point.s_velocity() - expected_speed).abs() < 1e-9);
    }

    #[test]
    fn test_exhausted_avoidance_yields_unknown() {
        let s = scene();
        let engine = ReferencePointEngine::new(&s.config);
        // a wall of objects across every avoidance offset
        let objects: Vec<DetectedObject> = (0..40)
            .map(|i| DetectedObject::new(i, 28.0, -12.0 + i as f64 * 0.5))
            .collect();
        let ctx = CycleContext {
            lane: &s.lane,
            reference_waypoints: &s.waypoints,
            objects: &objects,
        };
        let mut current = waypoint_reference(22.0, s.config.velocity_before_obstacle);
        current.reference_type = ReferenceType::Obstacle {
            object_id: 0,
            object_index: 0,
        };
        let next = engine.generate_new(&ctx, &current, 12.0).unwrap().unwrap();
        assert_eq!(next.reference_type, ReferenceType::Unknown);
        assert_eq!(next.frenet_point.s_velocity(), 0.0);
        assert_eq!(next.cartesian_point, current.cartesian_point);
    }

    #[test]
    fn test_update_detects_stop_waypoint() {
        let mut s = scene();
        s.waypoints.truncate(51);
        s.waypoints[50].velocity = 0.0;
        let engine = ReferencePointEngine::new(&s.config);
        let ctx = CycleContext {
            lane: &s.lane,
            reference_waypoints: &s.waypoints,
            objects: &[],
        };
        let mut kept = Trajectory::new(4.0);
        for i in 0..10 {
            let x = 40.0 + i as f64;
            kept.push(FrenetState::at(x, 0.0, 2.0), Waypoint::new(x, 0.0, 0.0, 2.0));
        }
        let current = waypoint_reference(45.0, 5.0);
        let updated = engine.update(&ctx, &kept, &current).unwrap().unwrap();
        assert_eq!(updated.reference_type, ReferenceType::StopLine);
        assert!((updated.cartesian_point.x - 50.0).abs() < 1e-9);
        assert_eq!(updated.envelope, s.config.update_envelope(true));

        // already at the end of the route
        let at_end = waypoint_reference(50.0, 0.0);
        assert!(engine.update(&ctx, &kept, &at_end).unwrap().is_none());
    }

    #[test]
    fn test_update_retargets_to_colliding_sample() {
        let s = scene();
        let engine = ReferencePointEngine::new(&s.config);
        let objects = vec![DetectedObject::new(1, 80.0, 0.0), DetectedObject::new(9, 46.0, 1.0)];
        let ctx = CycleContext {
            lane: &s.lane,
            reference_waypoints: &s.waypoints,
            objects: &objects,
        };
        let mut kept = Trajectory::new(4.0);
        for i in 0..10 {
            let x = 40.0 + i as f64;
            kept.push(FrenetState::at(x, 0.0, 2.0), Waypoint::new(x, 0.0, 0.0, 2.0));
        }
        let current = waypoint_reference(49.0, 5.0);
        let updated = engine.update(&ctx, &kept, &current).unwrap().unwrap();
        // x = 44 is the first kept sample within 3 m of the object
        assert_eq!(
            updated.reference_type,
            ReferenceType::Obstacle {
                object_id: 9,
                object_index: 1
            }
        );
        assert_eq!(updated.cartesian_point, Point2D::new(44.0, 0.0));
        assert!((updated.frenet_point.s() - 44.0).abs() < 1e-9);
        assert_eq!(updated.frenet_point.s_velocity(), 2.0);
        assert_eq!(updated.envelope, s.config.update_envelope(false));

        // nothing left in the way
        let clear = CycleContext { objects: &objects[..1], ..ctx };
        assert!(engine.update(&clear, &kept, &current).unwrap().is_none());
    }

    #[test]
    fn test_validity() {
        let s = scene();
        let engine = ReferencePointEngine::new(&s.config);
        let ego = Pose2D::new(10.0, 0.0, 0.0);
        let last = Point2D::new(99.0, 0.0);
        assert!(engine.is_valid(&ego, &waypoint_reference(20.0, 5.0), &last));
        assert!(!engine.is_valid(&ego, &waypoint_reference(5.0, 5.0), &last));
        let ego_past_end = Pose2D::new(100.0, 0.0, 0.0);
        assert!(engine.is_valid(&ego_past_end, &waypoint_reference(99.0, 0.0), &last));
    }
}
