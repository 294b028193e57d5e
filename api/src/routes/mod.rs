//! API route definitions.
//!
//! This module organizes all HTTP routes for the housing prediction API.

mod health;
mod metrics;
mod predict;

pub use health::health_routes;
pub use metrics::metrics_routes;
pub use predict::predict_routes;
