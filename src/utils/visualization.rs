//! Visualization utilities for frenet_planner
//!
//! Series are collected first and drawn onto a single set of axes when the
//! figure is shown or saved.

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

use crate::common::{DetectedObject, Point2D, Pose2D, Visualizable};
use crate::frenet::{Lane, PlanOutput, Trajectory};
use crate::path_planning::ReferencePath;

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const GREEN: &str = "#00FF00";
    pub const BLUE: &str = "#0000FF";
    pub const CYAN: &str = "#00FFFF";
    pub const ORANGE: &str = "#FFA500";
    pub const GRAY: &str = "#808080";

    // Semantic colors
    pub const OBSTACLE: &str = BLACK;
    pub const START: &str = GREEN;
    pub const GOAL: &str = BLUE;
    pub const PATH: &str = RED;
    pub const ROBOT: &str = CYAN;
    pub const LANE: &str = GRAY;
    pub const CANDIDATE: &str = "#C0C0C0";
    pub const REFERENCE_POINT: &str = ORANGE;
}

/// Style for path rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            line_width: 2.0,
            caption: caption.to_string(),
        }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            color: colors::PATH.to_string(),
            line_width: 2.0,
            caption: "Path".to_string(),
        }
    }
}

/// Style for point rendering
#[derive(Debug, Clone)]
pub struct PointStyle {
    pub color: String,
    pub size: f64,
    pub symbol: char,
    pub caption: String,
}

impl PointStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self {
            color: color.to_string(),
            size: 1.0,
            symbol: 'O',
            caption: caption.to_string(),
        }
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_symbol(mut self, symbol: char) -> Self {
        self.symbol = symbol;
        self
    }
}

#[derive(Debug, Clone)]
enum Series {
    Lines { x: Vec<f64>, y: Vec<f64>, style: PathStyle },
    Points { x: Vec<f64>, y: Vec<f64>, style: PointStyle },
}

/// Main visualizer struct
#[derive(Debug, Clone)]
pub struct Visualizer {
    series: Vec<Series>,
    title: String,
    x_label: String,
    y_label: String,
    x_range: Option<(f64, f64)>,
    y_range: Option<(f64, f64)>,
    aspect_ratio: Option<f64>,
}

impl Visualizer {
    pub fn new() -> Self {
        Self {
            series: Vec::new(),
            title: String::new(),
            x_label: "X [m]".to_string(),
            y_label: "Y [m]".to_string(),
            x_range: None,
            y_range: None,
            aspect_ratio: Some(1.0),
        }
    }

    pub fn set_title(&mut self, title: &str) -> &mut Self {
        self.title = title.to_string();
        self
    }

    pub fn set_x_label(&mut self, label: &str) -> &mut Self {
        self.x_label = label.to_string();
        self
    }

    pub fn set_y_label(&mut self, label: &str) -> &mut Self {
        self.y_label = label.to_string();
        self
    }

    pub fn set_x_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.x_range = Some((min, max));
        self
    }

    pub fn set_y_range(&mut self, min: f64, max: f64) -> &mut Self {
        self.y_range = Some((min, max));
        self
    }

    /// Set aspect ratio (None for auto)
    pub fn set_aspect_ratio(&mut self, ratio: Option<f64>) -> &mut Self {
        self.aspect_ratio = ratio;
        self
    }

    /// Number of collected series
    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Drop every collected series, keeping the axis settings.
    pub fn clear(&mut self) -> &mut Self {
        self.series.clear();
        self
    }

    pub fn plot_path(&mut self, points: &[Point2D], style: &PathStyle) -> &mut Self {
        let x = points.iter().map(|p| p.x).collect();
        let y = points.iter().map(|p| p.y).collect();
        self.series.push(Series::Lines {
            x,
            y,
            style: style.clone(),
        });
        self
    }

    pub fn plot_path_xy(&mut self, x: &[f64], y: &[f64], style: &PathStyle) -> &mut Self {
        self.series.push(Series::Lines {
            x: x.to_vec(),
            y: y.to_vec(),
            style: style.clone(),
        });
        self
    }

    pub fn plot_obstacles(&mut self, objects: &[DetectedObject]) -> &mut Self {
        let points: Vec<Point2D> = objects.iter().map(|o| o.position).collect();
        self.plot_points(
            &points,
            &PointStyle::new(colors::OBSTACLE, "Obstacles").with_symbol('S').with_size(1.5),
        )
    }

    pub fn plot_point(&mut self, point: Point2D, style: &PointStyle) -> &mut Self {
        self.plot_points(&[point], style)
    }

    pub fn plot_points(&mut self, points: &[Point2D], style: &PointStyle) -> &mut Self {
        let x = points.iter().map(|p| p.x).collect();
        let y = points.iter().map(|p| p.y).collect();
        self.series.push(Series::Points {
            x,
            y,
            style: style.clone(),
        });
        self
    }

    /// Plot robot pose with direction indicator
    pub fn plot_robot(&mut self, pose: &Pose2D, size: f64) -> &mut Self {
        self.plot_point(pose.position(), &PointStyle::new(colors::ROBOT, "Robot").with_size(size));

        // Plot direction line (arrow substitute)
        let arrow_len = size * 0.5;
        let end_x = pose.x + arrow_len * pose.yaw.cos();
        let end_y = pose.y + arrow_len * pose.yaw.sin();
        self.plot_path_xy(
            &[pose.x, end_x],
            &[pose.y, end_y],
            &PathStyle::new(colors::ROBOT, "").with_line_width(2.0),
        )
    }

    pub fn plot_start(&mut self, point: Point2D) -> &mut Self {
        self.plot_point(point, &PointStyle::new(colors::START, "Start").with_size(1.5))
    }

    pub fn plot_goal(&mut self, point: Point2D) -> &mut Self {
        self.plot_point(point, &PointStyle::new(colors::GOAL, "Goal").with_size(1.5))
    }

    /// Draw anything that knows how to draw itself
    pub fn draw<V: Visualizable + ?Sized>(&mut self, item: &V) -> &mut Self {
        item.visualize(self);
        self
    }

    pub fn show(&self) -> Result<(), String> {
        let mut figure = self.render();
        figure.show().map_err(|e| e.to_string()).map(|_| ())
    }

    /// Save plot to PNG file
    pub fn save_png(&self, path: &str, width: u32, height: u32) -> Result<(), String> {
        let mut figure = self.render();
        figure.save_to_png(path, width, height).map_err(|e| e.to_string())
    }

    /// Save plot to SVG file
    pub fn save_svg(&self, path: &str) -> Result<(), String> {
        let mut figure = self.render();
        figure.save_to_svg(path, 800, 600).map_err(|e| e.to_string())
    }

    fn render(&self) -> Figure {
        let mut figure = Figure::new();
        let axes = figure.axes2d();

        for series in &self.series {
            match series {
                Series::Lines { x, y, style } => {
                    axes.lines(
                        x,
                        y,
                        &[
                            Caption(style.caption.as_str()),
                            Color(style.color.as_str()),
                            LineWidth(style.line_width),
                        ],
                    );
                }
                Series::Points { x, y, style } => {
                    axes.points(
                        x,
                        y,
                        &[
                            Caption(style.caption.as_str()),
                            Color(style.color.as_str()),
                            PointSymbol(style.symbol),
                            PointSize(style.size),
                        ],
                    );
                }
            }
        }

        if !self.title.is_empty() {
            axes.set_title(&self.title, &[]);
        }
        axes.set_x_label(&self.x_label, &[]);
        axes.set_y_label(&self.y_label, &[]);
        if let Some((min, max)) = self.x_range {
            axes.set_x_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some((min, max)) = self.y_range {
            axes.set_y_range(AutoOption::Fix(min), AutoOption::Fix(max));
        }
        if let Some(ratio) = self.aspect_ratio {
            axes.set_aspect_ratio(AutoOption::Fix(ratio));
        }
        figure
    }
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Visualizable for Lane {
    fn visualize(&self, vis: &mut Visualizer) {
        let points: Vec<Point2D> = self.points().iter().map(|p| p.position).collect();
        vis.plot_path(&points, &PathStyle::new(colors::LANE, "Lane").with_line_width(1.0));
    }
}

impl Visualizable for Trajectory {
    fn visualize(&self, vis: &mut Visualizer) {
        let points: Vec<Point2D> = self.waypoints().iter().map(|w| w.position()).collect();
        vis.plot_path(&points, &PathStyle::new(colors::PATH, "Trajectory"));
    }
}

impl Visualizable for PlanOutput {
    fn visualize(&self, vis: &mut Visualizer) {
        for candidate in &self.debug_trajectories {
            let points: Vec<Point2D> = candidate.waypoints().iter().map(|w| w.position()).collect();
            vis.plot_path(&points, &PathStyle::new(colors::CANDIDATE, "").with_line_width(0.5));
        }
        let points: Vec<Point2D> = self.trajectory.iter().map(|w| w.position()).collect();
        vis.plot_path(&points, &PathStyle::new(colors::PATH, "Planned"));
        vis.plot_points(
            &self.reference_points,
            &PointStyle::new(colors::REFERENCE_POINT, "Reference points").with_size(1.5),
        );
    }
}

impl Visualizable for ReferencePath {
    fn visualize(&self, vis: &mut Visualizer) {
        vis.plot_path(&self.positions(), &PathStyle::new(colors::PATH, "Clearance path"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Waypoint;

    #[test]
    fn test_visualizer_creation() {
        let vis = Visualizer::new();
        assert!(vis.aspect_ratio.is_some());
        assert_eq!(vis.series_count(), 0);
    }

    #[test]
    fn test_path_style() {
        let style = PathStyle::new(colors::RED, "Test Path").with_line_width(3.0);
        assert_eq!(style.line_width, 3.0);
        assert_eq!(style.color, colors::RED);
    }

    #[test]
    fn test_series_are_collected() {
        let lane = Lane::straight(Point2D::origin(), 0.0, 10, 1.0).unwrap();
        let output = PlanOutput {
            trajectory: vec![Waypoint::new(0.0, 0.0, 0.0, 1.0), Waypoint::new(1.0, 0.0, 0.0, 1.0)],
            debug_trajectories: vec![Trajectory::new(2.0), Trajectory::new(4.0)],
            reference_points: vec![Point2D::new(1.0, 0.0)],
        };
        let mut vis = Visualizer::new();
        vis.draw(&lane).draw(&output).plot_robot(&Pose2D::new(0.0, 0.0, 0.0), 1.0);
        // lane, two candidates, planned path, reference points, robot marker and heading
        assert_eq!(vis.series_count(), 7);
        vis.clear();
        assert_eq!(vis.series_count(), 0);
    }
}
