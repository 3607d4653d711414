//! Mathematical utilities for motion comparison.
//!
//! This module provides:
//! - [`geometry`]: interior joint angles from landmark positions
//! - [`stats`]: distances, means and score mapping

pub mod geometry;
pub mod stats;

pub use geometry::interior_angle_degrees;
pub use stats::{cost_to_score, euclidean_distance, mean};
