//! Housing Price Prediction API Server
//!
//! This crate provides the HTTP server that serves the trained California
//! housing model.
//!
//! # Architecture
//!
//! The API server is built on Axum and Tokio, providing:
//! - `POST /predict` for model predictions
//! - `GET /metrics` with Prometheus metrics
//! - `GET /health` for liveness and model status
//!
//! Every request passes through a middleware that logs the request and
//! response bodies to a daily log file and a SQLite log store, and updates
//! the request metrics.
//!
//! # Example
//!
//! ```no_run
//! use housing_api::run_server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_server().await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
pub mod logger;
pub mod metrics;
pub mod middleware;
pub mod retention;
mod routes;
pub mod service;
pub mod state;

pub use config::{Config, ConfigError};
pub use logger::AppLogger;
pub use metrics::AppMetrics;
pub use retention::RetentionMonitor;
pub use service::PredictionService;
pub use state::{AppState, BodyLimits};

use anyhow::{Context, Result};
use axum::Router;
use housing_shared::storage::SqliteLogStore;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Runs the housing API server.
///
/// This function initializes the server with configuration from environment variables
/// and starts listening for incoming connections. It handles graceful shutdown on
/// SIGTERM/SIGINT signals.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - The log store or log directory cannot be opened
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server() -> Result<()> {
    let config = Config::from_env()?;
    run_server_with_config(config).await
}

/// Builds the logger, metrics and prediction service described by `config`.
///
/// A missing or invalid model artifact yields a degraded state, not an
/// error.
///
/// # Errors
///
/// Returns an error if the log store or log directory cannot be opened, or
/// the metrics cannot be registered.
pub fn build_state(config: &Config) -> Result<AppState> {
    let store = SqliteLogStore::open(&config.log_db_path).with_context(|| {
        format!(
            "Failed to open log store at {}",
            config.log_db_path.display()
        )
    })?;
    let logger = AppLogger::open(&config.log_dir, config.log_files_retained, Arc::new(store))
        .context("Failed to open log directory")?;
    let metrics = AppMetrics::new().context("Failed to register metrics")?;
    let predictor =
        PredictionService::load(&config.model_path, config.model_version, &logger, &metrics);

    Ok(AppState::new(
        Arc::new(logger),
        Arc::new(metrics),
        Arc::new(predictor),
        BodyLimits::from_config(config),
    ))
}

/// Runs the housing API server with the provided configuration.
///
/// This is useful for testing or when you want to provide configuration programmatically.
///
/// # Errors
///
/// Returns an error if:
/// - The log store or log directory cannot be opened
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server_with_config(config: Config) -> Result<()> {
    config.validate()?;
    let addr = config.socket_addr()?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        "Housing API server starting"
    );

    let state = build_state(&config)?;

    let monitor = Arc::new(RetentionMonitor::new(
        Arc::clone(state.logger().store()),
        config.retention,
        config.retention_interval,
    ));
    if let Err(e) = monitor.prune_now() {
        tracing::error!(error = %e, "Initial log pruning failed");
    }
    let retention_task = tokio::spawn(monitor.run());

    let app = create_router(state);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(%addr, "Listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    retention_task.abort();
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Creates the main application router with all routes and middleware.
///
/// This function is public to allow testing the router without starting a full server.
pub fn create_router(state: AppState) -> Router {
    apply_middleware(
        Router::new()
            .merge(routes::predict_routes())
            .merge(routes::metrics_routes())
            .merge(routes::health_routes()),
        state,
    )
}

/// Wraps `routes` with the request logging and metrics interceptor and
/// HTTP tracing, then binds the state.
pub fn apply_middleware(routes: Router<AppState>, state: AppState) -> Router {
    routes
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::log_requests_and_metrics,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
