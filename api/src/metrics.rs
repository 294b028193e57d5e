//! Prometheus metrics for the prediction API.

use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// The metrics registry of one server instance.
///
/// Owns its own [`Registry`] so independent instances (e.g. in tests) never
/// share counters.
#[derive(Clone)]
pub struct AppMetrics {
    registry: Registry,
    model_up: Gauge,
    total_requests: IntCounter,
    successful_predictions: IntCounter,
    failed_predictions: IntCounter,
    error_count: IntCounterVec,
    request_latency: Histogram,
    model_version: Gauge,
}

impl AppMetrics {
    /// Creates and registers every metric.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric cannot be registered.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let model_up = Gauge::new("model_up", "Model availability (1 = up, 0 = down)")?;
        let total_requests = IntCounter::new("total_requests", "Total number of requests")?;
        let successful_predictions =
            IntCounter::new("successful_predictions", "Successful prediction count")?;
        let failed_predictions = IntCounter::new("failed_predictions", "Failed prediction count")?;
        let error_count = IntCounterVec::new(
            Opts::new("error_count", "Error counts by status"),
            &["status_code"],
        )?;
        let request_latency = Histogram::with_opts(HistogramOpts::new(
            "request_latency_seconds",
            "Request latency in seconds",
        ))?;
        let model_version = Gauge::new("model_version", "Version of the model")?;

        registry.register(Box::new(model_up.clone()))?;
        registry.register(Box::new(total_requests.clone()))?;
        registry.register(Box::new(successful_predictions.clone()))?;
        registry.register(Box::new(failed_predictions.clone()))?;
        registry.register(Box::new(error_count.clone()))?;
        registry.register(Box::new(request_latency.clone()))?;
        registry.register(Box::new(model_version.clone()))?;

        Ok(Self {
            registry,
            model_up,
            total_requests,
            successful_predictions,
            failed_predictions,
            error_count,
            request_latency,
            model_version,
        })
    }

    /// Counts an inbound request.
    pub fn record_request(&self) {
        self.total_requests.inc();
    }

    /// Counts a request that completed with a status below 400.
    pub fn record_success(&self) {
        self.successful_predictions.inc();
    }

    /// Counts a failed request under `status_code`.
    pub fn record_failure(&self, status_code: &str) {
        self.failed_predictions.inc();
        self.error_count.with_label_values(&[status_code]).inc();
    }

    /// Records the wall-clock time of a completed request.
    pub fn observe_latency(&self, elapsed: Duration) {
        self.request_latency.observe(elapsed.as_secs_f64());
    }

    /// Sets the availability gauge, and the version gauge when loaded.
    pub fn set_model_status(&self, loaded: bool, version: f64) {
        if loaded {
            self.model_up.set(1.0);
            self.model_version.set(version);
        } else {
            self.model_up.set(0.0);
        }
    }

    /// Encodes the current snapshot in the text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// Total requests counted so far.
    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.total_requests.get()
    }

    /// Successful requests counted so far.
    #[must_use]
    pub fn successful_predictions(&self) -> u64 {
        self.successful_predictions.get()
    }

    /// Failed requests counted so far.
    #[must_use]
    pub fn failed_predictions(&self) -> u64 {
        self.failed_predictions.get()
    }

    /// Failures counted under `status_code`.
    #[must_use]
    pub fn error_count(&self, status_code: &str) -> u64 {
        self.error_count.with_label_values(&[status_code]).get()
    }

    /// Number of latency observations.
    #[must_use]
    pub fn latency_samples(&self) -> u64 {
        self.request_latency.get_sample_count()
    }

    /// Current availability gauge value.
    #[must_use]
    pub fn model_up(&self) -> f64 {
        self.model_up.get()
    }

    /// Current version gauge value.
    #[must_use]
    pub fn model_version(&self) -> f64 {
        self.model_version.get()
    }
}

impl std::fmt::Debug for AppMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppMetrics")
            .field("total_requests", &self.total_requests())
            .field("model_up", &self.model_up())
            .finish_non_exhaustive()
    }
}
