//! Common traits shared by the planners

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::common::error::PlanningResult;
use crate::common::types::Point2D;

/// Trait for point-to-point path planners
pub trait PathPlanner {
    /// Path representation produced by the planner
    type Path;

    /// Plan a path from start to goal
    fn plan(&self, start: Point2D, goal: Point2D) -> PlanningResult<Self::Path>;
}

/// Configuration that can be loaded from YAML and checked for consistency
pub trait YamlConfig: Sized + DeserializeOwned {
    /// Reject values the planners cannot work with
    fn validate(&self) -> PlanningResult<()>;

    fn from_yaml_str(yaml: &str) -> PlanningResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn from_yaml_file<P: AsRef<Path>>(path: P) -> PlanningResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }
}

/// Trait for things that can draw themselves
pub trait Visualizable {
    /// Draw current state to visualizer
    fn visualize(&self, vis: &mut crate::utils::Visualizer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::PlannerError;
    use serde::Deserialize;

    struct StraightLinePlanner;

    impl PathPlanner for StraightLinePlanner {
        type Path = Vec<Point2D>;

        fn plan(&self, start: Point2D, goal: Point2D) -> PlanningResult<Vec<Point2D>> {
            Ok(vec![start, goal])
        }
    }

    #[derive(Debug, Deserialize)]
    struct StepConfig {
        step: f64,
    }

    impl YamlConfig for StepConfig {
        fn validate(&self) -> PlanningResult<()> {
            if self.step > 0.0 {
                Ok(())
            } else {
                Err(PlannerError::InvalidParameter("step".to_string()))
            }
        }
    }

    #[test]
    fn test_path_planner_trait() {
        let planner = StraightLinePlanner;
        let path = planner.plan(Point2D::origin(), Point2D::new(1.0, 1.0)).unwrap();
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn test_yaml_config_validates() {
        assert!((StepConfig::from_yaml_str("step: 0.5").unwrap().step - 0.5).abs() < 1e-12);
        assert!(matches!(
            StepConfig::from_yaml_str("step: -1.0"),
            Err(PlannerError::InvalidParameter(_))
        ));
        assert!(matches!(
            StepConfig::from_yaml_file("/nonexistent/planner.yaml"),
            Err(PlannerError::IoError(_))
        ));
    }
}
