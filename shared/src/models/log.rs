//! Log record model.
//!
//! Defines the `LogRecord` row persisted by the relational log sink and the
//! `LogLevel` severity scale shared by every sink.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Log severity level.
///
/// Stored and rendered in uppercase (`DEBUG`, `INFO`, `WARNING`, `ERROR`,
/// `CRITICAL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Debug information.
    Debug,
    /// Informational messages.
    Info,
    /// Warning conditions.
    Warning,
    /// Error conditions.
    Error,
    /// Critical conditions.
    Critical,
}

impl LogLevel {
    /// Returns the uppercase name used in log lines and the `level` column.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

/// Error returned when a string is not a known log level.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown log level: {0}")]
pub struct ParseLogLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARNING" | "WARN" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            "CRITICAL" | "FATAL" => Ok(Self::Critical),
            _ => Err(ParseLogLevelError(s.to_string())),
        }
    }
}

/// Format of the ISO-8601 timestamp stored with each record.
///
/// Local time with microsecond precision. Values sort lexicographically in
/// chronological order, which the retention pruning relies on.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Returns the current local time formatted with [`TIMESTAMP_FORMAT`].
#[must_use]
pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// A log record about to be written. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLogRecord {
    /// ISO-8601 timestamp of the event.
    pub timestamp: String,
    /// Severity level.
    pub level: LogLevel,
    /// Formatted message.
    pub message: String,
}

impl NewLogRecord {
    /// Creates a record stamped with the current local time.
    ///
    /// # Example
    ///
    /// ```
    /// use housing_shared::models::{LogLevel, NewLogRecord};
    ///
    /// let record = NewLogRecord::new(LogLevel::Info, "Server started");
    /// assert_eq!(record.level, LogLevel::Info);
    /// assert_eq!(record.message, "Server started");
    /// ```
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: now_timestamp(),
            level,
            message: message.into(),
        }
    }
}

/// A persisted log record.
///
/// Records are append-only: created on every log call and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Auto-incremented row id.
    pub id: i64,
    /// ISO-8601 timestamp of the event.
    pub timestamp: String,
    /// Severity level.
    pub level: LogLevel,
    /// Formatted message.
    pub message: String,
}

impl std::fmt::Display for LogRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, '{}', '{}', '{}')",
            self.id, self.timestamp, self.level, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_roundtrips_through_str() {
        for level in [
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warning,
            LogLevel::Error,
            LogLevel::Critical,
        ] {
            assert_eq!(level.as_str().parse::<LogLevel>().unwrap(), level);
        }
    }

    #[test]
    fn test_level_parse_accepts_aliases_and_case() {
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("fatal".parse::<LogLevel>().unwrap(), LogLevel::Critical);
        assert_eq!("Info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_level_serializes_uppercase() {
        let json = serde_json::to_string(&LogLevel::Warning).unwrap();
        assert_eq!(json, "\"WARNING\"");
    }

    #[test]
    fn test_levels_are_ordered_by_severity() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Error < LogLevel::Critical);
    }

    #[test]
    fn test_timestamp_is_iso8601() {
        let ts = now_timestamp();
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT).is_ok());
        assert_eq!(ts.as_bytes()[10], b'T');
    }
}
