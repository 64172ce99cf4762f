//! Utility modules for frenet_planner

pub mod visualization;

pub use visualization::{colors, PathStyle, PointStyle, Visualizer};
