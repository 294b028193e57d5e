//! Retention configuration for the relational log store.
//!
//! Records older than the configured age are pruned; a zero age keeps
//! records indefinitely.

use crate::models::log::TIMESTAMP_FORMAT;
use chrono::{DateTime, Local, TimeDelta};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound accepted for the retention age (10 years).
pub const MAX_RETENTION_DAYS: u32 = 3650;

/// Age-based retention policy for stored log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRetentionPolicy {
    /// Maximum record age in days. `0` disables pruning.
    pub max_age_days: u32,
}

impl LogRetentionPolicy {
    /// Creates a new retention policy.
    ///
    /// # Examples
    ///
    /// ```
    /// use housing_shared::config::LogRetentionPolicy;
    ///
    /// let policy = LogRetentionPolicy::new(30);
    /// assert!(policy.is_enabled());
    /// assert_eq!(policy.as_duration().as_secs(), 30 * 24 * 60 * 60);
    /// ```
    #[must_use]
    pub fn new(max_age_days: u32) -> Self {
        Self { max_age_days }
    }

    /// A policy that never prunes.
    #[must_use]
    pub fn keep_forever() -> Self {
        Self { max_age_days: 0 }
    }

    /// Returns true if pruning is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.max_age_days > 0
    }

    /// Returns the maximum age as a `Duration`.
    #[must_use]
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.max_age_days) * 24 * 60 * 60)
    }

    /// Returns the timestamp before which records are expired, relative to
    /// `now`, or `None` when pruning is disabled.
    ///
    /// The result uses the same format as stored timestamps so the two
    /// compare lexicographically.
    #[must_use]
    pub fn cutoff(&self, now: DateTime<Local>) -> Option<String> {
        if !self.is_enabled() {
            return None;
        }
        let cutoff = now - TimeDelta::days(i64::from(self.max_age_days));
        Some(cutoff.format(TIMESTAMP_FORMAT).to_string())
    }

    /// Validates the retention policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the age exceeds [`MAX_RETENTION_DAYS`].
    pub fn validate(&self) -> Result<(), String> {
        if self.max_age_days > MAX_RETENTION_DAYS {
            return Err(format!(
                "Log retention cannot exceed {MAX_RETENTION_DAYS} days (10 years)"
            ));
        }
        Ok(())
    }
}

impl Default for LogRetentionPolicy {
    fn default() -> Self {
        Self { max_age_days: 30 }
    }
}
