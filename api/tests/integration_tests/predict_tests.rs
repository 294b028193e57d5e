//! Integration tests for the prediction endpoint.

use super::common::{degraded_app, post_json, scenario_input, test_app, SCENARIO_PREDICTION};
use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_predict_returns_single_prediction() {
    let (app, state) = test_app();

    let (status, body) = post_json(app, "/predict", scenario_input()).await;

    assert_eq!(status, StatusCode::OK);
    let object = body.as_object().unwrap();
    assert_eq!(object.len(), 1);
    let prediction = object["prediction"].as_f64().unwrap();
    assert!((prediction - SCENARIO_PREDICTION).abs() < 1e-6);

    let metrics = state.metrics();
    assert_eq!(metrics.total_requests(), 1);
    assert_eq!(metrics.successful_predictions(), 1);
    assert_eq!(metrics.failed_predictions(), 0);
    assert_eq!(metrics.latency_samples(), 1);
}

#[tokio::test]
async fn test_predict_accepts_integer_and_float_numbers() {
    let (app, _state) = test_app();
    let mut input = scenario_input();
    input["median_income"] = json!(5);

    let (status, body) = post_json(app, "/predict", input).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["prediction"].is_number());
}

#[tokio::test]
async fn test_predict_is_deterministic() {
    let (app, _state) = test_app();

    let (_, first) = post_json(app.clone(), "/predict", scenario_input()).await;
    let (_, second) = post_json(app, "/predict", scenario_input()).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_predict_missing_field_is_rejected() {
    let (app, state) = test_app();
    let mut input = scenario_input();
    input.as_object_mut().unwrap().remove("median_income");

    let (status, body) = post_json(app, "/predict", input).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("median_income"));
    assert!(body.get("prediction").is_none());

    let metrics = state.metrics();
    assert_eq!(metrics.total_requests(), 1);
    assert_eq!(metrics.successful_predictions(), 0);
    assert_eq!(metrics.failed_predictions(), 1);
    assert_eq!(metrics.error_count("422"), 1);
}

#[tokio::test]
async fn test_predict_wrong_type_is_rejected() {
    let (app, state) = test_app();
    let mut input = scenario_input();
    input["population"] = json!("many");

    let (status, body) = post_json(app, "/predict", input).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());
    assert_eq!(state.metrics().error_count("422"), 1);
}

#[tokio::test]
async fn test_predict_without_model_returns_error_payload() {
    let (app, state) = degraded_app();

    let (status, body) = post_json(app, "/predict", scenario_input()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"error": "Prediction failed due to internal error."})
    );
    assert_eq!(state.metrics().model_up(), 0.0);
}

#[tokio::test]
async fn test_failed_request_does_not_count_as_success() {
    let (app, state) = test_app();

    post_json(app.clone(), "/predict", scenario_input()).await;
    post_json(app, "/predict", json!({})).await;

    let metrics = state.metrics();
    assert_eq!(metrics.total_requests(), 2);
    assert_eq!(metrics.successful_predictions(), 1);
    assert_eq!(metrics.failed_predictions(), 1);
}
