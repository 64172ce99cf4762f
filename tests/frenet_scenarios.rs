use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use frenet_planner::frenet::{cartesian_to_frenet, frenet_to_cartesian, ReferenceType};
use frenet_planner::{
    DetectedObject, FrenetPlanner, FrenetPlannerConfig, Lane, PlanOutput, PlannerState, PlanningInput, Point2D,
    Pose2D, Waypoint,
};

struct World {
    lane: Lane,
    waypoints: Vec<Waypoint>,
    objects: Vec<DetectedObject>,
}

impl World {
    fn straight(num_waypoints: usize, objects: Vec<DetectedObject>) -> Self {
        let lane = Lane::straight(Point2D::origin(), 0.0, 100, 1.0).unwrap();
        let waypoints = (0..num_waypoints)
            .map(|i| Waypoint::new(i as f64, 0.0, 0.0, 5.0))
            .collect();
        Self {
            lane,
            waypoints,
            objects,
        }
    }
}

/// Runs the planner in closed loop, moving the ego onto the second published
/// sample after every cycle.
struct Driver {
    planner: FrenetPlanner,
    state: Option<PlannerState>,
    ego: Pose2D,
    ego_velocity: f64,
}

impl Driver {
    fn new(ego: Pose2D, ego_velocity: f64) -> Self {
        let planner = FrenetPlanner::new(FrenetPlannerConfig::default()).unwrap();
        let state = Some(planner.initial_state());
        Self {
            planner,
            state,
            ego,
            ego_velocity,
        }
    }

    fn step(&mut self, world: &World) -> PlanOutput {
        let input = PlanningInput {
            ego_pose: self.ego,
            ego_velocity: self.ego_velocity,
            reference_waypoints: &world.waypoints,
            lane: &world.lane,
            objects: &world.objects,
        };
        let (state, result) = self.planner.plan_cycle(self.state.take().unwrap(), &input);
        self.state = Some(state);
        let output = result.unwrap();
        if let Some(next) = output.trajectory.get(1).or_else(|| output.trajectory.first()) {
            self.ego = next.pose;
            self.ego_velocity = next.velocity;
        }
        output
    }

    fn state(&self) -> &PlannerState {
        self.state.as_ref().unwrap()
    }
}

#[test]
fn obstacle_ahead_becomes_standoff_reference_point() {
    let config = FrenetPlannerConfig::default();
    let world = World::straight(100, vec![DetectedObject::new(7, 20.0, 0.0)]);
    let mut driver = Driver::new(Pose2D::new(0.0, 0.0, 0.0), 5.0);

    let output = driver.step(&world);
    let current = driver.state().current_reference.clone().unwrap();
    assert_eq!(
        current.reference_type,
        ReferenceType::Obstacle {
            object_id: 7,
            object_index: 0
        }
    );
    assert!(current.cartesian_point.distance(&world.objects[0].position) >= config.distance_before_obstacle);
    assert!(!output.trajectory.is_empty());

    let mut outputs = vec![output];
    for _ in 0..30 {
        outputs.push(driver.step(&world));
    }
    for output in &outputs {
        for waypoint in &output.trajectory {
            assert!(
                waypoint.distance(&world.objects[0].position) >= config.obstacle_radius,
                "waypoint ({:.2}, {:.2}) inside the obstacle radius",
                waypoint.pose.x,
                waypoint.pose.y
            );
        }
    }
}

#[test]
fn zero_speed_waypoint_becomes_stop_line() {
    let mut world = World::straight(51, vec![]);
    world.waypoints[50].velocity = 0.0;
    let mut driver = Driver::new(Pose2D::new(0.0, 0.0, 0.0), 5.0);

    let mut stop_trajectory = None;
    for _ in 0..60 {
        driver.step(&world);
        let state = driver.state();
        let pairs = [
            (&state.current_reference, &state.current_trajectory),
            (&state.next_reference, &state.next_trajectory),
        ];
        stop_trajectory = pairs.iter().find_map(|(reference, trajectory)| match (reference, trajectory) {
            (Some(r), Some(t)) if r.reference_type == ReferenceType::StopLine => Some(t.clone()),
            _ => None,
        });
        if stop_trajectory.is_some() {
            break;
        }
    }

    let trajectory = stop_trajectory.expect("no stop line reference point was generated");
    let last = trajectory.last_frenet().unwrap();
    assert!(last.s_velocity().abs() < 1e-3, "final speed {}", last.s_velocity());
    assert!((last.s() - 50.0).abs() < 6.0, "final s {}", last.s());
}

#[test]
fn first_cycle_failure_leaves_state_untouched() {
    // every sample of every candidate collides
    let objects = (0..30).map(|i| DetectedObject::new(i, i as f64, 0.0)).collect();
    let world = World::straight(100, objects);
    let planner = FrenetPlanner::new(FrenetPlannerConfig::default()).unwrap();
    let input = PlanningInput {
        ego_pose: Pose2D::new(0.0, 0.0, 0.0),
        ego_velocity: 5.0,
        reference_waypoints: &world.waypoints,
        lane: &world.lane,
        objects: &world.objects,
    };
    let (state, result) = planner.plan_cycle(planner.initial_state(), &input);
    assert!(result.is_err());
    assert!(!state.is_initialized());
    assert!(state.next_reference.is_none());
}

#[test]
fn cartesian_frenet_round_trip() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20 {
        let start = Point2D::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0));
        let yaw = rng.gen_range(-3.0..3.0);
        let lane = Lane::straight(start, yaw, 60, 1.0).unwrap();
        for _ in 0..20 {
            let s = rng.gen_range(2.0..57.0);
            let d = rng.gen_range(-5.0..5.0);
            let point = frenet_to_cartesian(s, d, &lane);
            let (s2, d2) = cartesian_to_frenet(&point, &lane).unwrap();
            assert!((s - s2).abs() < 1e-6, "s {} vs {}", s, s2);
            assert!((d - d2).abs() < 1e-6, "d {} vs {}", d, d2);
            let back = frenet_to_cartesian(s2, d2, &lane);
            assert!(back.distance(&point) < 1e-6);
        }
    }
}
