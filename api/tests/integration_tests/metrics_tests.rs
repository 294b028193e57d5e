//! Integration tests for the Prometheus metrics endpoint.

use super::common::{degraded_app, get, post_json, scenario_input, test_app};
use axum::http::StatusCode;

#[tokio::test]
async fn test_metrics_exposition() {
    let (app, _state) = test_app();

    let response = tower::ServiceExt::oneshot(
        app,
        axum::http::Request::builder()
            .uri("/metrics")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain; version=0.0.4"));
}

#[tokio::test]
async fn test_metrics_lists_every_series() {
    let (app, _state) = test_app();
    post_json(app.clone(), "/predict", scenario_input()).await;

    let (status, body) = get(app, "/metrics").await;
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert_eq!(status, StatusCode::OK);
    for name in [
        "model_up",
        "model_version",
        "total_requests",
        "successful_predictions",
        "failed_predictions",
        "request_latency_seconds_bucket",
    ] {
        assert!(text.contains(name), "missing {name}");
    }
    assert!(text.contains("model_up 1"));
}

#[tokio::test]
async fn test_metrics_shows_error_labels() {
    let (app, _state) = test_app();
    post_json(app.clone(), "/predict", serde_json::json!({})).await;

    let (_, body) = get(app, "/metrics").await;
    let text = String::from_utf8(body.to_vec()).unwrap();

    assert!(text.contains(r#"error_count{status_code="422"} 1"#));
}

#[tokio::test]
async fn test_metrics_request_counts_itself() {
    let (app, state) = degraded_app();

    let (status, _) = get(app, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.metrics().total_requests(), 1);
    assert_eq!(state.metrics().successful_predictions(), 1);
}
