//! Integration tests for the health check endpoint.

use super::common::{degraded_app, get, test_app};
use axum::http::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn test_health_with_model() {
    let (app, _state) = test_app();

    let (status, body) = get(app, "/health").await;
    let health: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["model_loaded"], true);
    assert_eq!(health["service"], "housing-api");
}

#[tokio::test]
async fn test_health_without_model() {
    let (app, _state) = degraded_app();

    let (status, body) = get(app, "/health").await;
    let health: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["model_loaded"], false);
}
