//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality used across all integration tests,
//! including test app setup and HTTP request helpers.

use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use housing_api::{create_router, AppState, PredictionService};
use housing_shared::models::FEATURE_NAMES;
use housing_shared::regression::{LinearRegression, Model, ModelArtifact};
use http_body_util::BodyExt;
use serde_json::{json, Value};

/// Prediction of [`income_model`] for [`scenario_input`].
pub const SCENARIO_PREDICTION: f64 = 210_000.0;

/// A linear model of median income only: `10_000 + 40_000 * median_income`.
pub fn income_model() -> ModelArtifact {
    let mut coefficients = vec![0.0; FEATURE_NAMES.len()];
    coefficients[7] = 40_000.0;
    ModelArtifact::new(
        Model::Linear(LinearRegression::from_parameters(coefficients, 10_000.0)),
        FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
    )
}

/// The reference housing record.
pub fn scenario_input() -> Value {
    json!({
        "longitude": -122.1,
        "latitude": 37.7,
        "housing_median_age": 30,
        "total_rooms": 2000,
        "total_bedrooms": 400,
        "population": 800,
        "households": 300,
        "median_income": 5.0
    })
}

/// Creates a test router serving [`income_model`] with in-memory sinks.
///
/// # Returns
///
/// A tuple containing the configured router and the app state.
pub fn test_app() -> (Router, AppState) {
    app_with(PredictionService::from_artifact(income_model()))
}

/// Creates a test router whose model failed to load.
pub fn degraded_app() -> (Router, AppState) {
    app_with(PredictionService::unavailable())
}

/// Creates a test router around `predictor`.
pub fn app_with(predictor: PredictionService) -> (Router, AppState) {
    let state = AppState::with_in_memory_store(predictor, 1.0).unwrap();
    let router = create_router(state.clone());
    (router, state)
}

/// Sends `request` and returns the status and raw body.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, body_bytes)
}

/// Helper to POST raw bytes with a JSON content type.
pub async fn post_bytes(app: Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Bytes) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap(),
    )
    .await
}

/// Helper to make a POST request with JSON body.
///
/// # Returns
///
/// A tuple containing the response status code and parsed JSON response body.
pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let (status, body_bytes) =
        post_bytes(app, uri, serde_json::to_string(&body).unwrap()).await;
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Helper to make a GET request.
///
/// # Returns
///
/// A tuple containing the response status code and raw response body.
pub async fn get(app: Router, uri: &str) -> (StatusCode, Bytes) {
    send(
        app,
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

/// Messages stored by the app's logger, oldest first.
pub fn logged_messages(state: &AppState) -> Vec<String> {
    let mut records = state
        .logger()
        .store()
        .query(housing_shared::storage::LogQuery::new())
        .unwrap();
    records.reverse();
    records.into_iter().map(|r| r.message).collect()
}
