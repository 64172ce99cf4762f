//! Frenet-frame trajectory planning
//!
//! Lane-relative coordinates, polynomial trajectory generation, sampling,
//! cost-based selection and the reference point state machine that drives a
//! two-segment (current + next) plan cycle by cycle.

pub mod collision;
pub mod config;
pub mod converter;
pub mod lane;
pub mod planner;
pub mod polynomial;
pub mod reference_point;
pub mod sampler;
pub mod selector;
pub mod state;
pub mod trajectory_generator;

pub use collision::{CollisionChecker, CollisionInfo};
pub use config::{CostWeights, EnvelopeConfig, FrenetPlannerConfig};
pub use converter::{
    cartesian_to_frenet, frenet_state_to_waypoint, frenet_state_to_waypoint_with_heading, frenet_to_cartesian,
    offset_from_lane_point, waypoint_to_frenet, CartesianSample,
};
pub use lane::{Lane, LanePoint};
pub use planner::{FrenetPlanner, PlanOutput, PlannerState, PlanningInput};
pub use polynomial::{QuarticPolynomial, QuinticPolynomial};
pub use reference_point::{CycleContext, ReferencePointEngine};
pub use sampler::{sample_candidates, SampledTrajectories};
pub use selector::TrajectorySelector;
pub use state::{FrenetState, ReferencePoint, ReferenceType, SamplingEnvelope, Trajectory};
pub use trajectory_generator::{GeneratedTrajectory, TrajectoryGenerator};
