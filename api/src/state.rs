//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use crate::config::Config;
use crate::logger::AppLogger;
use crate::metrics::AppMetrics;
use crate::service::PredictionService;
use std::sync::Arc;

/// Size limits applied by the request/response middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyLimits {
    /// Largest body buffered.
    pub max_body_bytes: usize,
    /// Largest body excerpt written to a log line.
    pub max_logged_body_bytes: usize,
}

impl BodyLimits {
    /// Takes the limits from the server configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_body_bytes: config.max_body_bytes,
            max_logged_body_bytes: config.max_logged_body_bytes,
        }
    }
}

impl Default for BodyLimits {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Application state shared across all request handlers.
///
/// Holds the single logger, metrics registry and prediction service of the
/// process. Cloning shares them.
#[derive(Clone, Debug)]
pub struct AppState {
    logger: Arc<AppLogger>,
    metrics: Arc<AppMetrics>,
    predictor: Arc<PredictionService>,
    body_limits: BodyLimits,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        logger: Arc<AppLogger>,
        metrics: Arc<AppMetrics>,
        predictor: Arc<PredictionService>,
        body_limits: BodyLimits,
    ) -> Self {
        Self {
            logger,
            metrics,
            predictor,
            body_limits,
        }
    }

    /// Creates a state with an in-memory logger and a fresh metrics
    /// registry around `predictor`, with the model gauges set from it.
    ///
    /// This is useful for development and testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be registered.
    pub fn with_in_memory_store(
        predictor: PredictionService,
        model_version: f64,
    ) -> Result<Self, prometheus::Error> {
        let metrics = AppMetrics::new()?;
        metrics.set_model_status(predictor.is_loaded(), model_version);
        Ok(Self::new(
            Arc::new(AppLogger::in_memory()),
            Arc::new(metrics),
            Arc::new(predictor),
            BodyLimits::default(),
        ))
    }

    /// Replaces the body limits.
    #[must_use]
    pub fn with_body_limits(mut self, body_limits: BodyLimits) -> Self {
        self.body_limits = body_limits;
        self
    }

    /// Returns the request logger.
    #[must_use]
    pub fn logger(&self) -> &AppLogger {
        &self.logger
    }

    /// Returns the metrics registry.
    #[must_use]
    pub fn metrics(&self) -> &AppMetrics {
        &self.metrics
    }

    /// Returns the prediction service.
    #[must_use]
    pub fn predictor(&self) -> &PredictionService {
        &self.predictor
    }

    /// Returns the middleware body limits.
    #[must_use]
    pub fn body_limits(&self) -> BodyLimits {
        self.body_limits
    }
}
