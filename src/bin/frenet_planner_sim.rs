// Closed-loop Frenet planner demo on a synthetic S-shaped lane.
//
// The ego is teleported along the published trajectory every cycle, so the
// run shows how reference points are generated, promoted and re-targeted as
// the obstacle comes into view and the route ends in a stop.
//
// usage: frenet_planner_sim [config.yaml]

use std::error::Error;

use log::{info, warn};

use frenet_planner::frenet::ReferenceType;
use frenet_planner::utils::{colors, PointStyle, Visualizer};
use frenet_planner::{
    DetectedObject, FrenetPlanner, FrenetPlannerConfig, Lane, PlanningInput, Point2D, Pose2D, Waypoint, YamlConfig,
};

const MAX_CYCLES: usize = 120;
const CRUISE_SPEED: f64 = 5.0;
const OUTPUT_PATH: &str = "img/frenet_planner.png";

fn synthetic_lane() -> Result<Lane, Box<dyn Error>> {
    let polyline: Vec<Point2D> = (0..=160)
        .map(|i| {
            let x = i as f64;
            Point2D::new(x, 6.0 * (x / 40.0).sin())
        })
        .collect();
    Ok(Lane::from_polyline(&polyline)?)
}

fn route_waypoints(lane: &Lane) -> Vec<Waypoint> {
    let last = lane.len() - 1;
    lane.points()
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let speed = if i == last { 0.0 } else { CRUISE_SPEED };
            Waypoint::new(p.position.x, p.position.y, p.yaw, speed)
        })
        .collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => FrenetPlannerConfig::from_yaml_file(path)?,
        None => FrenetPlannerConfig::default(),
    };
    let planner = FrenetPlanner::new(config)?;

    let lane = synthetic_lane()?;
    let waypoints = route_waypoints(&lane);
    let objects = vec![DetectedObject::new(1, 60.0, 6.0 * (1.5f64).sin())];

    let mut state = planner.initial_state();
    let mut ego = Pose2D::new(0.0, 0.0, waypoints[0].pose.yaw);
    let mut ego_velocity = CRUISE_SPEED;
    let mut ego_trace = vec![ego.position()];
    let mut last_output = None;

    for cycle in 0..MAX_CYCLES {
        let input = PlanningInput {
            ego_pose: ego,
            ego_velocity,
            reference_waypoints: &waypoints,
            lane: &lane,
            objects: &objects,
        };
        let (next_state, result) = planner.plan_cycle(state, &input);
        state = next_state;
        let output = match result {
            Ok(output) => output,
            Err(e) => {
                warn!("cycle {}: {}", cycle, e);
                break;
            }
        };

        if let Some(current) = &state.current_reference {
            info!(
                "cycle {:3}: ego ({:6.2}, {:5.2}) v = {:4.2}, current {:?} at s = {:.1}",
                cycle,
                ego.x,
                ego.y,
                ego_velocity,
                current.reference_type,
                current.frenet_point.s()
            );
            if current.reference_type == ReferenceType::StopLine && ego.position().distance(&current.cartesian_point) < 1.0 {
                info!("stopped at the end of the route");
                last_output = Some(output);
                break;
            }
        }

        match output.trajectory.get(1).or_else(|| output.trajectory.first()) {
            Some(next) => {
                ego = next.pose;
                ego_velocity = next.velocity;
            }
            None => break,
        }
        ego_trace.push(ego.position());
        last_output = Some(output);
    }

    let mut vis = Visualizer::new();
    vis.set_title("Frenet planner");
    vis.draw(&lane).plot_obstacles(&objects);
    if let Some(output) = &last_output {
        vis.draw(output);
    }
    vis.plot_points(&ego_trace, &PointStyle::new(colors::ROBOT, "Ego").with_symbol('.'));
    std::fs::create_dir_all("img")?;
    vis.save_png(OUTPUT_PATH, 1200, 600)?;
    info!("saved {}", OUTPUT_PATH);
    Ok(())
}
