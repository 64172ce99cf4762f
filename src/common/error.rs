//! Error types for frenet_planner

use std::fmt;

/// Main error type for the planning core
#[derive(Debug)]
pub enum PlannerError {
    /// Sampling produced no jerk-valid trajectory
    NoCandidate(String),
    /// Every scored candidate collides with a detected object
    NoCollisionFreeCandidate(String),
    /// No lookahead waypoint or lateral avoidance offset could be found
    ReferenceSearchExhausted(String),
    /// Coincident lane points or near-zero longitudinal speed in a conversion
    DegenerateGeometry(String),
    /// Path search exhausted its open set before reaching the goal
    UnreachableGoal(String),
    /// Invalid parameter
    InvalidParameter(String),
    /// Malformed per-cycle input (empty lane, unordered arc length, ...)
    InvalidInput(String),
    /// Configuration could not be parsed
    ConfigError(String),
    /// I/O error
    IoError(std::io::Error),
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannerError::NoCandidate(msg) => write!(f, "No candidate trajectory: {}", msg),
            PlannerError::NoCollisionFreeCandidate(msg) => {
                write!(f, "No collision-free candidate: {}", msg)
            }
            PlannerError::ReferenceSearchExhausted(msg) => {
                write!(f, "Reference search exhausted: {}", msg)
            }
            PlannerError::DegenerateGeometry(msg) => write!(f, "Degenerate geometry: {}", msg),
            PlannerError::UnreachableGoal(msg) => write!(f, "Unreachable goal: {}", msg),
            PlannerError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            PlannerError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            PlannerError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            PlannerError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for PlannerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlannerError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PlannerError {
    fn from(e: std::io::Error) -> Self {
        PlannerError::IoError(e)
    }
}

impl From<serde_yaml::Error> for PlannerError {
    fn from(e: serde_yaml::Error) -> Self {
        PlannerError::ConfigError(e.to_string())
    }
}

/// Result type alias for planning operations
pub type PlanningResult<T> = Result<T, PlannerError>;
