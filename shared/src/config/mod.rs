//! Configuration module for the housing predictor.
//!
//! This module contains configuration structures shared by the server and
//! the CLI.

pub mod retention;

pub use retention::{LogRetentionPolicy, MAX_RETENTION_DAYS};
