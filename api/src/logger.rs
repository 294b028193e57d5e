//! Request and prediction logger.
//!
//! Every record goes to two sinks: a daily-rotating text file and the
//! relational log store. Records are also mirrored to `tracing` so they show
//! up in the process diagnostics.

use chrono::Local;
use housing_shared::models::{LogLevel, NewLogRecord};
use housing_shared::storage::{InMemoryLogStore, LogStore};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};

/// Timestamp format of a log file line, e.g. `2024-07-01 12:00:00,123`.
pub const LINE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Errors raised while setting up the logger.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// The log directory could not be created.
    #[error("Failed to create log directory {path}: {source}")]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The rolling file appender could not be initialized.
    #[error("Failed to initialize log file appender: {0}")]
    Appender(#[from] InitError),
}

/// Formats one file-sink line (without the trailing newline).
#[must_use]
pub fn format_line(level: LogLevel, message: &str) -> String {
    format!(
        "{} | {} | {}",
        Local::now().format(LINE_TIMESTAMP_FORMAT),
        level,
        message
    )
}

/// The process-wide request logger.
///
/// Built once at startup and shared through the application state.
pub struct AppLogger {
    file: Mutex<Box<dyn Write + Send>>,
    store: Arc<dyn LogStore>,
}

impl AppLogger {
    /// Opens a logger writing `<YYYY-MM-DD>.log` files under `log_dir`,
    /// rotated at midnight and keeping `files_retained` files.
    ///
    /// File names and rotation follow the UTC date, while line timestamps
    /// use local time. Away from UTC, lines near midnight can land in the
    /// file named after the neighbouring day.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or appender cannot be created.
    pub fn open(
        log_dir: &Path,
        files_retained: usize,
        store: Arc<dyn LogStore>,
    ) -> Result<Self, LoggerError> {
        std::fs::create_dir_all(log_dir).map_err(|source| LoggerError::CreateDir {
            path: log_dir.to_path_buf(),
            source,
        })?;

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_suffix("log")
            .max_log_files(files_retained)
            .build(log_dir)?;

        Ok(Self::with_writer(appender, store))
    }

    /// Creates a logger over an arbitrary file sink.
    pub fn with_writer(writer: impl Write + Send + 'static, store: Arc<dyn LogStore>) -> Self {
        Self {
            file: Mutex::new(Box::new(writer)),
            store,
        }
    }

    /// Creates a logger that discards file output and keeps records in
    /// memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_writer(std::io::sink(), Arc::new(InMemoryLogStore::new()))
    }

    /// Returns the relational sink.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn LogStore> {
        &self.store
    }

    /// Writes a record to both sinks.
    ///
    /// Sink failures are reported through `tracing` and never propagate to
    /// the caller.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        let line = format_line(level, &message);

        match level {
            LogLevel::Debug => tracing::debug!("{message}"),
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Warning => tracing::warn!("{message}"),
            LogLevel::Error | LogLevel::Critical => tracing::error!("{message}"),
        }

        match self.file.lock() {
            Ok(mut file) => {
                if let Err(e) = writeln!(file, "{line}").and_then(|()| file.flush()) {
                    tracing::error!(error = %e, "Failed to write log file line");
                }
            }
            Err(_) => tracing::error!("Log file sink lock poisoned"),
        }

        if let Err(e) = self.store.insert(NewLogRecord::new(level, line)) {
            tracing::error!(error = %e, "Failed to store log record");
        }
    }

    /// Logs at `DEBUG`.
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    /// Logs at `INFO`.
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    /// Logs at `WARNING`.
    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    /// Logs at `ERROR`.
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Logs at `CRITICAL`.
    pub fn critical(&self, message: impl Into<String>) {
        self.log(LogLevel::Critical, message);
    }
}

impl std::fmt::Debug for AppLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppLogger").finish_non_exhaustive()
    }
}
