//! frenet_planner - Frenet-frame motion planning for road vehicles
//!
//! This crate provides a cycle-driven Frenet trajectory planner (reference
//! point state machine, polynomial trajectory sampling, cost-based selection)
//! and a clearance-aware path search over occupancy grids.

// Core modules
pub mod common;
pub mod utils;

// Algorithm modules
pub mod frenet;
pub mod path_planning;

// Re-export common types for convenience
pub use common::{DetectedObject, Point2D, Pose2D, Waypoint};
pub use common::{PathPlanner, Visualizable, YamlConfig};
pub use common::{PlannerError, PlanningResult};
pub use frenet::{FrenetPlanner, FrenetPlannerConfig, Lane, PlanOutput, PlannerState, PlanningInput};
pub use path_planning::{ClearancePathSearch, ClearanceSearchConfig, GridMap, ReferencePath};
