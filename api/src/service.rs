//! Prediction service.
//!
//! Holds the model artifact loaded at startup. A failed load leaves the
//! service in degraded mode, where every prediction returns the generic
//! failure payload.

use crate::logger::AppLogger;
use crate::metrics::AppMetrics;
use housing_shared::models::{HousingInput, PredictResponse};
use housing_shared::regression::{ModelArtifact, ModelError};
use std::path::Path;
use thiserror::Error;

/// Internal prediction failures. Never shown to callers.
#[derive(Debug, Error)]
pub enum PredictionError {
    /// No model was loaded at startup.
    #[error("Model is not loaded")]
    ModelNotLoaded,

    /// The model rejected the input.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The model produced a value that cannot be returned as JSON.
    #[error("Model produced a non-finite prediction: {0}")]
    NonFinite(f64),
}

/// Serves predictions from an immutable model artifact.
#[derive(Debug, Clone)]
pub struct PredictionService {
    artifact: Option<ModelArtifact>,
}

impl PredictionService {
    /// Loads the artifact at `path` and updates the model gauges.
    ///
    /// A load failure is logged and yields a degraded service rather than an
    /// error.
    pub fn load(path: &Path, version: f64, logger: &AppLogger, metrics: &AppMetrics) -> Self {
        match ModelArtifact::load(path) {
            Ok(artifact) => {
                tracing::info!(
                    path = %path.display(),
                    model_type = artifact.model.model_type(),
                    trained_at = %artifact.trained_at,
                    "Model loaded"
                );
                metrics.set_model_status(true, version);
                Self::from_artifact(artifact)
            }
            Err(e) => {
                logger.error(format!("Model failed to load: {e}"));
                metrics.set_model_status(false, version);
                Self::unavailable()
            }
        }
    }

    /// Wraps an already loaded artifact.
    #[must_use]
    pub fn from_artifact(artifact: ModelArtifact) -> Self {
        Self {
            artifact: Some(artifact),
        }
    }

    /// A degraded service with no model.
    #[must_use]
    pub fn unavailable() -> Self {
        Self { artifact: None }
    }

    /// Returns true if a model is loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.artifact.is_some()
    }

    fn try_predict(&self, input: &HousingInput) -> Result<f64, PredictionError> {
        let artifact = self
            .artifact
            .as_ref()
            .ok_or(PredictionError::ModelNotLoaded)?;
        let prediction = artifact.predict(&input.to_features())?;
        if !prediction.is_finite() {
            return Err(PredictionError::NonFinite(prediction));
        }
        Ok(prediction)
    }

    /// Predicts the median house value for `input`.
    ///
    /// Never fails: internal errors are logged in full and mapped to the
    /// generic failure payload.
    pub fn predict(&self, input: &HousingInput, logger: &AppLogger) -> PredictResponse {
        match self.try_predict(input) {
            Ok(prediction) => {
                let input_json = serde_json::to_string(input).unwrap_or_default();
                logger.info(format!("INPUT: {input_json} | PREDICTION: {prediction}"));
                PredictResponse::success(prediction)
            }
            Err(e) => {
                logger.error(format!("ERROR:\n{e:?}"));
                PredictResponse::failure()
            }
        }
    }
}
