//! Clearance-aware path search
//!
//! A best-first search over discs: every node is a point whose expansion
//! radius is the local clearance, so the search takes long strides through
//! open space and short ones next to obstacles. Children are placed on the
//! parent's circle at evenly spaced bearings.
//!
//! The occupancy grid lives in its own frame; `frame` maps grid coordinates to
//! the caller's output frame.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::f64::consts::PI;

use log::{debug, info, warn};
use nalgebra::{Isometry2, Point2};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::common::{PathPlanner, PlannerError, PlanningResult, Point2D, YamlConfig};
use crate::path_planning::clearance_map::GridMap;
use crate::path_planning::path_curvature::path_curvatures;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearanceSearchConfig {
    /// Smallest expansion radius; children with less clearance are dropped [m]
    pub min_radius: f64,
    /// Largest expansion radius [m]
    pub max_radius: f64,
    pub num_bearings: usize,
    /// Node reaches the goal when `dist - max(r) < ratio * min(r)`
    pub goal_overlap_ratio: f64,
    pub max_expansions: usize,
}

impl Default for ClearanceSearchConfig {
    fn default() -> Self {
        Self {
            min_radius: 1.6,
            max_radius: 10.0,
            num_bearings: 36,
            goal_overlap_ratio: 0.5,
            max_expansions: 200_000,
        }
    }
}

impl YamlConfig for ClearanceSearchConfig {
    fn validate(&self) -> PlanningResult<()> {
        if !(self.min_radius > 0.0) || self.max_radius < self.min_radius {
            return Err(PlannerError::InvalidParameter(format!(
                "radius interval [{}, {}] is invalid",
                self.min_radius, self.max_radius
            )));
        }
        if self.num_bearings == 0 {
            return Err(PlannerError::InvalidParameter("num_bearings must be positive".to_string()));
        }
        if !(self.goal_overlap_ratio > 0.0) {
            return Err(PlannerError::InvalidParameter("goal_overlap_ratio must be positive".to_string()));
        }
        if self.max_expansions == 0 {
            return Err(PlannerError::InvalidParameter("max_expansions must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub position: Point2D,
    /// Clamped clearance at the point [m]
    pub clearance: f64,
    pub curvature: f64,
}

/// Search result in the output frame, with the clearance field it was
/// computed on
#[derive(Debug, Clone)]
pub struct ReferencePath {
    pub points: Vec<PathPoint>,
    pub clearance_map: GridMap,
}

impl ReferencePath {
    pub fn positions(&self) -> Vec<Point2D> {
        self.points.iter().map(|p| p.position).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Polyline length [m]
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| w[0].position.distance(&w[1].position))
            .sum()
    }
}

#[derive(Debug, Clone, Copy)]
struct Node {
    position: Point2D,
    radius: f64,
    g: f64,
    h: f64,
    parent: Option<usize>,
}

impl Node {
    fn f(&self) -> f64 {
        self.g + self.h
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenEntry {
    f: OrderedFloat<f64>,
    index: usize,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior, older nodes first on ties
        other.f.cmp(&self.f).then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct ClearancePathSearch {
    config: ClearanceSearchConfig,
    clearance: GridMap,
    frame: Isometry2<f64>,
    obstacle_free: bool,
}

impl ClearancePathSearch {
    /// Prepare a search over `occupancy`, whose frame maps to the output frame
    /// through `frame`.
    pub fn new(occupancy: &GridMap, frame: Isometry2<f64>, config: ClearanceSearchConfig) -> PlanningResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            clearance: occupancy.clearance_map(),
            frame,
            obstacle_free: !occupancy.has_obstacles(),
        })
    }

    pub fn config(&self) -> &ClearanceSearchConfig {
        &self.config
    }

    pub fn clearance_map(&self) -> &GridMap {
        &self.clearance
    }

    /// Search a path between two points given in the output frame.
    pub fn search(&self, start: Point2D, goal: Point2D) -> PlanningResult<ReferencePath> {
        let start_local = self.to_grid_frame(&start);
        let goal_local = self.to_grid_frame(&goal);
        if self.obstacle_free {
            return self.straight_path(start, goal, &start_local, &goal_local);
        }
        let start_radius = self.endpoint_radius(&start_local, "start")?;
        let goal_radius = self.endpoint_radius(&goal_local, "goal")?;

        let mut nodes = vec![Node {
            position: start_local,
            radius: start_radius,
            g: 0.0,
            h: start_local.distance(&goal_local),
            parent: None,
        }];
        let mut open = BinaryHeap::new();
        open.push(OpenEntry {
            f: OrderedFloat(nodes[0].f()),
            index: 0,
        });
        let mut closed: Vec<usize> = Vec::new();
        let mut reached: Option<usize> = None;
        let mut f_goal = f64::INFINITY;

        while let Some(entry) = open.pop() {
            if entry.f.0 > f_goal {
                break;
            }
            let node = nodes[entry.index];
            if closed
                .iter()
                .any(|&c| nodes[c].position.distance(&node.position) < nodes[c].radius)
            {
                continue;
            }
            if closed.len() >= self.config.max_expansions {
                return Err(PlannerError::UnreachableGoal(format!(
                    "gave up after {} expansions",
                    closed.len()
                )));
            }

            for child in self.expand(&node, entry.index, &goal_local) {
                open.push(OpenEntry {
                    f: OrderedFloat(child.f()),
                    index: nodes.len(),
                });
                nodes.push(child);
            }
            closed.push(entry.index);

            if reached.is_none() && self.overlaps(&node.position, node.radius, &goal_local, goal_radius) {
                debug!("goal reached with f = {:.2} after {} expansions", node.f(), closed.len());
                reached = Some(entry.index);
                f_goal = node.f();
            }
        }

        let last = reached.ok_or_else(|| {
            PlannerError::UnreachableGoal(format!(
                "open set exhausted after {} expansions without reaching the goal",
                closed.len()
            ))
        })?;

        let mut chain = Vec::new();
        let mut cursor = Some(last);
        while let Some(index) = cursor {
            let node = &nodes[index];
            if node.parent.is_some() {
                chain.push(node);
            }
            cursor = node.parent;
        }
        chain.reverse();

        let mut points = Vec::with_capacity(chain.len() + 2);
        points.push(PathPoint {
            position: start,
            clearance: start_radius,
            curvature: 0.0,
        });
        points.extend(chain.iter().map(|node| PathPoint {
            position: self.to_output_frame(&node.position),
            clearance: node.radius,
            curvature: 0.0,
        }));
        points.push(PathPoint {
            position: goal,
            clearance: goal_radius,
            curvature: 0.0,
        });

        let path = self.finish(points);
        info!(
            "clearance path with {} points, {:.2} m long ({} nodes expanded)",
            path.len(),
            path.length(),
            closed.len()
        );
        Ok(path)
    }

    /// Nothing to avoid: the path is the segment between the endpoints.
    fn straight_path(
        &self,
        start: Point2D,
        goal: Point2D,
        start_local: &Point2D,
        goal_local: &Point2D,
    ) -> PlanningResult<ReferencePath> {
        for (point, label) in [(start_local, "start"), (goal_local, "goal")] {
            if self.clearance.cell_index(point).is_none() {
                return Err(PlannerError::InvalidInput(format!(
                    "{} point ({:.2}, {:.2}) lies outside the grid",
                    label, point.x, point.y
                )));
            }
        }
        debug!("grid has no occupied cell; connecting start and goal directly");
        let endpoint = |position| PathPoint {
            position,
            clearance: self.config.max_radius,
            curvature: 0.0,
        };
        Ok(self.finish(vec![endpoint(start), endpoint(goal)]))
    }

    fn finish(&self, mut points: Vec<PathPoint>) -> ReferencePath {
        let positions: Vec<Point2D> = points.iter().map(|p| p.position).collect();
        for (point, curvature) in points.iter_mut().zip(path_curvatures(&positions)) {
            point.curvature = curvature;
        }
        ReferencePath {
            points,
            clearance_map: self.clearance.clone(),
        }
    }

    fn expand(&self, parent: &Node, parent_index: usize, goal: &Point2D) -> Vec<Node> {
        let step = parent.radius.max(self.config.min_radius).min(self.config.max_radius);
        let delta_theta = 2.0 * PI / self.config.num_bearings as f64;
        (0..self.config.num_bearings)
            .filter_map(|k| {
                let theta = k as f64 * delta_theta;
                let position = Point2D::new(
                    parent.position.x + step * theta.cos(),
                    parent.position.y + step * theta.sin(),
                );
                let radius = self.clearance.value_at(&position)?.min(self.config.max_radius);
                if radius < self.config.min_radius {
                    return None;
                }
                Some(Node {
                    position,
                    radius,
                    g: parent.g + step,
                    h: position.distance(goal),
                    parent: Some(parent_index),
                })
            })
            .collect()
    }

    fn overlaps(&self, a: &Point2D, ra: f64, b: &Point2D, rb: f64) -> bool {
        a.distance(b) - ra.max(rb) < self.config.goal_overlap_ratio * ra.min(rb)
    }

    /// Clearance at a start or goal point clamped into the radius interval.
    fn endpoint_radius(&self, point: &Point2D, label: &str) -> PlanningResult<f64> {
        let clearance = self.clearance.value_at(point).ok_or_else(|| {
            PlannerError::InvalidInput(format!(
                "{} point ({:.2}, {:.2}) lies outside the grid",
                label, point.x, point.y
            ))
        })?;
        if clearance < self.config.min_radius {
            warn!(
                "{} point clearance {:.2} m is below the minimum radius {:.2} m",
                label, clearance, self.config.min_radius
            );
        }
        Ok(clearance.max(self.config.min_radius).min(self.config.max_radius))
    }

    fn to_grid_frame(&self, point: &Point2D) -> Point2D {
        let local = self.frame.inverse_transform_point(&Point2::new(point.x, point.y));
        Point2D::new(local.x, local.y)
    }

    fn to_output_frame(&self, point: &Point2D) -> Point2D {
        let global = self.frame.transform_point(&Point2::new(point.x, point.y));
        Point2D::new(global.x, global.y)
    }
}

impl PathPlanner for ClearancePathSearch {
    type Path = ReferencePath;

    fn plan(&self, start: Point2D, goal: Point2D) -> PlanningResult<ReferencePath> {
        self.search(start, goal)
    }
}
