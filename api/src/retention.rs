//! Background pruning of the relational log store.

use chrono::{DateTime, Local};
use housing_shared::config::LogRetentionPolicy;
use housing_shared::storage::{LogStore, LogStoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant};

/// Periodically deletes log records older than the retention policy allows.
pub struct RetentionMonitor {
    store: Arc<dyn LogStore>,
    policy: LogRetentionPolicy,
    interval_duration: Duration,
}

impl RetentionMonitor {
    /// Creates a new retention monitor.
    ///
    /// # Arguments
    ///
    /// * `store` - The log store to prune
    /// * `policy` - Maximum record age
    /// * `interval_duration` - How often to prune
    #[must_use]
    pub fn new(
        store: Arc<dyn LogStore>,
        policy: LogRetentionPolicy,
        interval_duration: Duration,
    ) -> Self {
        Self {
            store,
            policy,
            interval_duration,
        }
    }

    /// Deletes records that are expired relative to `now`.
    ///
    /// Returns the number of deleted records; always 0 when the policy keeps
    /// records forever.
    ///
    /// # Errors
    ///
    /// Returns an error if the store delete fails.
    pub fn prune_at(&self, now: DateTime<Local>) -> Result<usize, LogStoreError> {
        match self.policy.cutoff(now) {
            Some(cutoff) => self.store.delete_older_than(&cutoff),
            None => Ok(0),
        }
    }

    /// Deletes records that are expired now.
    ///
    /// # Errors
    ///
    /// Returns an error if the store delete fails.
    pub fn prune_now(&self) -> Result<usize, LogStoreError> {
        let deleted = self.prune_at(Local::now())?;
        if deleted > 0 {
            tracing::info!(
                deleted,
                max_age_days = self.policy.max_age_days,
                "Pruned expired log records"
            );
        }
        Ok(deleted)
    }

    /// Starts the pruning loop.
    ///
    /// The first pass runs one interval after the call; callers prune once
    /// themselves at startup. Returns immediately when pruning is disabled.
    ///
    /// # Cancellation
    ///
    /// This function runs until cancelled via the task handle.
    pub async fn run(self: Arc<Self>) {
        if !self.policy.is_enabled() {
            tracing::info!("Log retention disabled; records are kept indefinitely");
            return;
        }

        let mut tick = interval_at(
            Instant::now() + self.interval_duration,
            self.interval_duration,
        );
        loop {
            tick.tick().await;
            if let Err(e) = self.prune_now() {
                tracing::error!(error = %e, "Failed to prune expired log records");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use housing_shared::models::{LogLevel, NewLogRecord};
    use housing_shared::storage::{InMemoryLogStore, LogQuery};

    fn record(timestamp: &str, message: &str) -> NewLogRecord {
        NewLogRecord {
            timestamp: timestamp.to_string(),
            level: LogLevel::Info,
            message: message.to_string(),
        }
    }

    fn seeded_store() -> Arc<dyn LogStore> {
        let store = Arc::new(InMemoryLogStore::new());
        store.insert(record("2024-05-01T08:00:00.000000", "old")).unwrap();
        store.insert(record("2024-06-30T08:00:00.000000", "recent")).unwrap();
        store.insert(record("2024-07-15T08:00:00.000000", "new")).unwrap();
        store
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 7, 20, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_monitor_creation() {
        let monitor = RetentionMonitor::new(
            seeded_store(),
            LogRetentionPolicy::default(),
            Duration::from_secs(60),
        );
        assert_eq!(monitor.interval_duration, Duration::from_secs(60));
    }

    #[test]
    fn test_prune_removes_only_expired_records() {
        let store = seeded_store();
        let monitor = RetentionMonitor::new(
            Arc::clone(&store),
            LogRetentionPolicy::new(30),
            Duration::from_secs(60),
        );

        assert_eq!(monitor.prune_at(now()).unwrap(), 1);

        let remaining: Vec<String> = store
            .query(LogQuery::new())
            .unwrap()
            .into_iter()
            .map(|r| r.message)
            .collect();
        assert_eq!(remaining, ["new", "recent"]);
    }

    #[test]
    fn test_disabled_policy_keeps_everything() {
        let store = seeded_store();
        let monitor = RetentionMonitor::new(
            Arc::clone(&store),
            LogRetentionPolicy::keep_forever(),
            Duration::from_secs(60),
        );

        assert_eq!(monitor.prune_at(now()).unwrap(), 0);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_run_returns_when_disabled() {
        let monitor = Arc::new(RetentionMonitor::new(
            seeded_store(),
            LogRetentionPolicy::keep_forever(),
            Duration::from_secs(60),
        ));
        monitor.run().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_prunes_on_interval() {
        let store: Arc<dyn LogStore> = Arc::new(InMemoryLogStore::new());
        store.insert(record("2000-01-01T00:00:00.000000", "ancient")).unwrap();
        let monitor = Arc::new(RetentionMonitor::new(
            Arc::clone(&store),
            LogRetentionPolicy::new(30),
            Duration::from_secs(60),
        ));

        let handle = tokio::spawn(Arc::clone(&monitor).run());
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(store.count().unwrap(), 0);
        handle.abort();
    }
}
