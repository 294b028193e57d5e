//! Integration tests for the request/response logging middleware.

use super::common::{
    app_with, income_model, logged_messages, post_bytes, post_json, scenario_input, test_app,
};
use axum::body::Bytes;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use housing_api::middleware::TRUNCATED_MARKER;
use housing_api::{apply_middleware, create_router, AppState, BodyLimits, PredictionService};

async fn echo(body: Bytes) -> Bytes {
    body
}

async fn explode() -> &'static str {
    panic!("boom")
}

/// Router with extra handlers behind the same middleware stack.
fn instrumented_app() -> (Router, AppState) {
    let state =
        AppState::with_in_memory_store(PredictionService::from_artifact(income_model()), 1.0)
            .unwrap();
    let routes = Router::new()
        .route("/echo", post(echo))
        .route("/explode", get(explode));
    (apply_middleware(routes, state.clone()), state)
}

#[tokio::test]
async fn test_request_and_response_are_logged() {
    let (app, state) = test_app();

    post_json(app, "/predict", scenario_input()).await;

    let messages = logged_messages(&state);
    assert_eq!(messages.len(), 3);
    assert!(messages[0].contains("| INFO | REQUEST: POST /predict BODY: {"));
    assert!(messages[0].contains("\"median_income\""));
    assert!(messages[1].contains("INPUT: "));
    assert!(messages[1].contains("PREDICTION: 210000"));
    assert!(messages[2].contains(r#"RESPONSE: status_code=200 body={"prediction":210000.0}"#));
}

#[tokio::test]
async fn test_response_bytes_pass_through_unchanged() {
    let (app, _state) = test_app();
    let body = serde_json::to_string(&scenario_input()).unwrap();

    let (status, bytes) = post_bytes(app, "/predict", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(&bytes[..], br#"{"prediction":210000.0}"#);
}

#[tokio::test]
async fn test_invalid_utf8_body_reaches_handler() {
    let (app, state) = test_app();

    let (status, _) = post_bytes(app, "/predict", vec![0xff, 0xfe, 0x00]).await;

    assert!(status.is_client_error());
    let messages = logged_messages(&state);
    assert!(messages[0].ends_with("REQUEST: POST /predict BODY: "));
    assert_eq!(state.metrics().failed_predictions(), 1);
}

#[tokio::test]
async fn test_invalid_utf8_body_is_forwarded_byte_for_byte() {
    let (app, state) = instrumented_app();
    let sent = vec![0xff, 0xfe, 0x00, b'{'];

    let (status, received) = post_bytes(app, "/echo", sent.clone()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(&received[..], &sent[..]);
    let messages = logged_messages(&state);
    assert!(messages[0].ends_with("REQUEST: POST /echo BODY: "));
    assert_eq!(state.metrics().successful_predictions(), 1);
}

#[tokio::test]
async fn test_handler_panic_is_a_fault() {
    let (app, state) = instrumented_app();

    let (status, body) = super::common::get(app, "/explode").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.is_empty());
    let metrics = state.metrics();
    assert_eq!(metrics.total_requests(), 1);
    assert_eq!(metrics.successful_predictions(), 0);
    assert_eq!(metrics.failed_predictions(), 1);
    assert_eq!(metrics.error_count("500"), 1);
    let messages = logged_messages(&state);
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("REQUEST: GET /explode"));
    assert!(messages[1].contains("| ERROR | Unhandled middleware error:"));
    assert!(messages[1].contains("boom"));
}

#[tokio::test]
async fn test_oversized_body_is_a_fault() {
    let state = housing_api::AppState::with_in_memory_store(
        PredictionService::from_artifact(income_model()),
        1.0,
    )
    .unwrap()
    .with_body_limits(BodyLimits {
        max_body_bytes: 16,
        max_logged_body_bytes: 8,
    });
    let app = create_router(state.clone());

    let (status, body) = post_json(app, "/predict", scenario_input()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.is_null());
    let metrics = state.metrics();
    assert_eq!(metrics.total_requests(), 1);
    assert_eq!(metrics.failed_predictions(), 1);
    assert_eq!(metrics.error_count("500"), 1);
    let messages = logged_messages(&state);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("| ERROR | Unhandled middleware error:"));
}

#[tokio::test]
async fn test_long_bodies_are_truncated_in_logs() {
    let (_, state) = app_with(PredictionService::from_artifact(income_model()));
    let state = state.with_body_limits(BodyLimits {
        max_body_bytes: 4096,
        max_logged_body_bytes: 30,
    });
    let app = create_router(state.clone());

    let (status, body) = post_json(app, "/predict", scenario_input()).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["prediction"].is_number());
    let messages = logged_messages(&state);
    assert!(messages[0].ends_with(TRUNCATED_MARKER));
    // The response is short enough to be logged whole.
    assert!(!messages[2].ends_with(TRUNCATED_MARKER));
}

#[tokio::test]
async fn test_query_string_is_logged() {
    let (app, state) = test_app();

    super::common::get(app, "/health?source=lb").await;

    let messages = logged_messages(&state);
    assert!(messages[0].contains("REQUEST: GET /health?source=lb BODY: "));
    assert!(messages[1].contains("RESPONSE: status_code=200"));
}
