//! Common types, traits, and error definitions for frenet_planner
//!
//! This module provides the building blocks shared by the Frenet engine and
//! the clearance path search.

pub mod types;
pub mod traits;
pub mod error;

pub use types::*;
pub use traits::*;
pub use error::*;
