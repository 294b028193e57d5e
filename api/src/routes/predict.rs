//! Prediction endpoint.

use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use housing_shared::models::HousingInput;
use serde::{Deserialize, Serialize};

/// Body returned when the request fails schema validation.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationError {
    /// What was wrong with the request.
    pub detail: String,
}

/// Creates the prediction routes.
pub fn predict_routes() -> Router<AppState> {
    Router::new().route("/predict", post(predict))
}

/// Handler for `POST /predict`.
///
/// A body that is not a valid [`HousingInput`] is rejected with the
/// extractor's status (400, 415 or 422). Otherwise the answer is always 200
/// with either a prediction or the generic error payload.
async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<HousingInput>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(input)) => Json(state.predictor().predict(&input, state.logger())).into_response(),
        Err(rejection) => (
            rejection.status(),
            Json(ValidationError {
                detail: rejection.body_text(),
            }),
        )
            .into_response(),
    }
}
