//! Health check endpoint.
//!
//! Reports liveness plus whether the model artifact was loaded.

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` with a model loaded, `degraded` without one.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Whether predictions can succeed.
    pub model_loaded: bool,
}

/// Creates the health check routes.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
///
/// Always answers 200 so load balancers keep a degraded instance reachable.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_loaded = state.predictor().is_loaded();
    Json(HealthResponse {
        status: if model_loaded { "healthy" } else { "degraded" },
        service: "housing-api",
        version: env!("CARGO_PKG_VERSION"),
        model_loaded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::PredictionService;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn get_health(state: AppState) -> (StatusCode, serde_json::Value) {
        let response = health_routes()
            .with_state(state)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_check_degraded() {
        let state = AppState::with_in_memory_store(PredictionService::unavailable(), 1.0).unwrap();
        let (status, health) = get_health(state).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "degraded");
        assert_eq!(health["service"], "housing-api");
        assert_eq!(health["model_loaded"], false);
        assert!(health["version"].is_string());
    }
}
