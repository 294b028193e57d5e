//! Integration tests for the housing prediction API.
//!
//! These tests drive the full router, middleware included, and check the
//! responses, the metrics registry and the log sinks together.

#[path = "integration_tests/common/mod.rs"]
mod common;
#[path = "integration_tests/health_tests.rs"]
mod health_tests;
#[path = "integration_tests/interceptor_tests.rs"]
mod interceptor_tests;
#[path = "integration_tests/metrics_tests.rs"]
mod metrics_tests;
#[path = "integration_tests/predict_tests.rs"]
mod predict_tests;
