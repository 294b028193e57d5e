//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use housing_shared::config::LogRetentionPolicy;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("Invalid value '{value}' for {name}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },

    /// The host and port do not form a socket address.
    #[error("Invalid bind address {0}")]
    InvalidAddress(String),

    /// The configuration is internally inconsistent.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `HOUSING_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `HOUSING_PORT`: The port to listen on (default: 8000)
/// - `HOUSING_MODEL_PATH`: Model artifact to load at startup
/// - `HOUSING_MODEL_VERSION`: Value reported by the `model_version` gauge (default: 1.0)
/// - `HOUSING_LOG_DIR`: Directory of the daily log files (default: "logs")
/// - `HOUSING_LOG_DB`: SQLite log store (default: "logs/logs.db")
/// - `HOUSING_LOG_FILES_RETAINED`: Rotated log files kept (default: 7)
/// - `HOUSING_LOG_RETENTION_DAYS`: Age after which stored log records are pruned, 0 to keep forever (default: 30)
/// - `HOUSING_RETENTION_INTERVAL_SECS`: Seconds between pruning passes (default: 3600)
/// - `HOUSING_MAX_BODY_BYTES`: Largest request or response body buffered by the interceptor
/// - `HOUSING_MAX_LOGGED_BODY_BYTES`: Largest body excerpt written to a log line
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// Path of the model artifact.
    pub model_path: PathBuf,
    /// Version reported for the loaded model.
    pub model_version: f64,
    /// Directory of the rotating log files.
    pub log_dir: PathBuf,
    /// Path of the SQLite log store.
    pub log_db_path: PathBuf,
    /// Number of rotated log files kept.
    pub log_files_retained: usize,
    /// Age-based pruning of the log store.
    pub retention: LogRetentionPolicy,
    /// Time between pruning passes.
    pub retention_interval: Duration,
    /// Largest body the interceptor buffers.
    pub max_body_bytes: usize,
    /// Largest body excerpt written to a log line.
    pub max_logged_body_bytes: usize,
}

fn env_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed, or the
    /// resulting configuration fails [`Config::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            host: env_or("HOUSING_HOST", defaults.host)?,
            port: env_or("HOUSING_PORT", defaults.port)?,
            model_path: env_or("HOUSING_MODEL_PATH", defaults.model_path)?,
            model_version: env_or("HOUSING_MODEL_VERSION", defaults.model_version)?,
            log_dir: env_or("HOUSING_LOG_DIR", defaults.log_dir)?,
            log_db_path: env_or("HOUSING_LOG_DB", defaults.log_db_path)?,
            log_files_retained: env_or("HOUSING_LOG_FILES_RETAINED", defaults.log_files_retained)?,
            retention: LogRetentionPolicy::new(env_or(
                "HOUSING_LOG_RETENTION_DAYS",
                defaults.retention.max_age_days,
            )?),
            retention_interval: Duration::from_secs(env_or(
                "HOUSING_RETENTION_INTERVAL_SECS",
                defaults.retention_interval.as_secs(),
            )?),
            max_body_bytes: env_or("HOUSING_MAX_BODY_BYTES", defaults.max_body_bytes)?,
            max_logged_body_bytes: env_or(
                "HOUSING_MAX_LOGGED_BODY_BYTES",
                defaults.max_logged_body_bytes,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for inconsistent values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_files_retained == 0 {
            return Err(ConfigError::Invalid(
                "HOUSING_LOG_FILES_RETAINED must be at least 1".to_string(),
            ));
        }
        if self.max_body_bytes == 0 || self.max_logged_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "Body size limits must be greater than 0".to_string(),
            ));
        }
        if self.max_logged_body_bytes > self.max_body_bytes {
            return Err(ConfigError::Invalid(
                "HOUSING_MAX_LOGGED_BODY_BYTES cannot exceed HOUSING_MAX_BODY_BYTES".to_string(),
            ));
        }
        if !self.model_version.is_finite() {
            return Err(ConfigError::Invalid(
                "HOUSING_MODEL_VERSION must be a finite number".to_string(),
            ));
        }
        if self.retention.is_enabled() && self.retention_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "HOUSING_RETENTION_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }
        self.retention.validate().map_err(ConfigError::Invalid)
    }

    /// Returns the socket address for binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port do not form a valid socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|_| ConfigError::InvalidAddress(addr))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_path: PathBuf::from(housing_shared::pipeline::DEFAULT_ARTIFACT_PATH),
            model_version: 1.0,
            log_dir: PathBuf::from("logs"),
            log_db_path: PathBuf::from("logs/logs.db"),
            log_files_retained: 7,
            retention: LogRetentionPolicy::default(),
            retention_interval: Duration::from_secs(3600),
            max_body_bytes: 2 * 1024 * 1024,
            max_logged_body_bytes: 64 * 1024,
        }
    }
}
