// Clearance-aware path search demo: a parked car and a wall narrow the road,
// the search bends the reference path around them.

use std::error::Error;

use log::info;
use nalgebra::Isometry2;

use frenet_planner::utils::{colors, PointStyle, Visualizer};
use frenet_planner::{ClearancePathSearch, ClearanceSearchConfig, GridMap, PathPlanner, Point2D};

const RESOLUTION: f64 = 0.1;
const OUTPUT_PATH: &str = "img/clearance_path.png";

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    // 30 m x 10 m grid in the sensor frame
    let mut obstacles: Vec<Point2D> = (0..=300).map(|i| Point2D::new(i as f64 * 0.1, 0.0)).collect();
    obstacles.extend((0..=40).map(|i| Point2D::new(14.0 + i as f64 * 0.1, 4.0)));
    obstacles.extend((0..=20).map(|i| Point2D::new(14.0, 2.0 + i as f64 * 0.1)));
    let occupancy = GridMap::from_obstacles(300, 100, RESOLUTION, Point2D::origin(), &obstacles, 0.15)?;

    // sensor frame sits 100 m east of the map origin, rotated by 10 degrees
    let sensor_to_map = Isometry2::new(nalgebra::Vector2::new(100.0, 20.0), 10f64.to_radians());
    let search = ClearancePathSearch::new(&occupancy, sensor_to_map, ClearanceSearchConfig::default())?;

    let to_map = |p: Point2D| {
        let q = sensor_to_map.transform_point(&nalgebra::Point2::new(p.x, p.y));
        Point2D::new(q.x, q.y)
    };
    let start = to_map(Point2D::new(3.0, 5.0));
    let goal = to_map(Point2D::new(27.0, 5.0));
    let path = search.plan(start, goal)?;

    for point in &path.points {
        info!(
            "({:7.2}, {:6.2}) clearance {:5.2} curvature {:+.3}",
            point.position.x, point.position.y, point.clearance, point.curvature
        );
    }

    let mut vis = Visualizer::new();
    vis.set_title("Clearance path search");
    let map_obstacles: Vec<Point2D> = obstacles.iter().map(|p| to_map(*p)).collect();
    vis.plot_points(
        &map_obstacles,
        &PointStyle::new(colors::OBSTACLE, "Obstacles").with_symbol('.'),
    );
    vis.plot_start(start).plot_goal(goal).draw(&path);
    std::fs::create_dir_all("img")?;
    vis.save_png(OUTPUT_PATH, 1200, 600)?;
    info!("saved {} ({} points, {:.2} m)", OUTPUT_PATH, path.len(), path.length());
    Ok(())
}
