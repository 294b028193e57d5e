//! Metrics exposition endpoint.

use crate::metrics::CONTENT_TYPE;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

/// Creates the metrics routes.
pub fn metrics_routes() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_endpoint))
}

/// Serves the current metrics snapshot in the text exposition format.
async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match state.metrics().encode() {
        Ok(body) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
