// Clearance-aware path search module

pub mod clearance_map;
pub mod clearance_path_search;
pub mod path_curvature;

pub use clearance_map::{GridMap, OCCUPIED_THRESHOLD};
pub use clearance_path_search::{ClearancePathSearch, ClearanceSearchConfig, PathPoint, ReferencePath};
pub use path_curvature::{path_curvatures, three_point_curvature};
