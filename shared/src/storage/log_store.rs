//! Log storage trait and implementations.
//!
//! Provides the `LogStore` trait backing the relational log sink, a
//! `SqliteLogStore` for the embedded `logs` table, and an `InMemoryLogStore`
//! for development and testing.

use crate::models::{LogLevel, LogRecord, NewLogRecord};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;

/// Errors that can occur during log store operations.
#[derive(Debug, Error)]
pub enum LogStoreError {
    /// Failed to acquire lock on the store.
    #[error("Failed to acquire lock on log store")]
    LockError,

    /// The database file or its directory could not be created.
    #[error("Failed to open log database at {path}: {source}")]
    Open {
        /// Path of the database file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A SQLite statement failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored row could not be decoded.
    #[error("Corrupt log row {id}: {reason}")]
    CorruptRow {
        /// Row id.
        id: i64,
        /// Description of the problem.
        reason: String,
    },
}

/// Query parameters for retrieving log records.
///
/// Results are ordered newest first (descending id).
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    /// Filter by exact log level.
    pub level: Option<LogLevel>,

    /// Maximum number of records to return.
    pub limit: Option<usize>,

    /// Number of records to skip (for pagination).
    pub offset: Option<usize>,
}

impl LogQuery {
    /// Creates a new empty query (returns all records).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log level filter.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Sets the maximum number of results.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the offset for pagination.
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Trait for log storage implementations.
///
/// Implementations must be safe for concurrent appends from many in-flight
/// requests (Send + Sync).
pub trait LogStore: Send + Sync {
    /// Appends a record and returns its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn insert(&self, record: NewLogRecord) -> Result<i64, LogStoreError>;

    /// Queries records based on the provided parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the query operation fails.
    fn query(&self, query: LogQuery) -> Result<Vec<LogRecord>, LogStoreError>;

    /// Returns the total number of records in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the count operation fails.
    fn count(&self) -> Result<usize, LogStoreError>;

    /// Deletes all records.
    ///
    /// # Errors
    ///
    /// Returns an error if the clear operation fails.
    fn clear(&self) -> Result<(), LogStoreError>;

    /// Deletes records whose timestamp sorts before `cutoff` and returns how
    /// many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete operation fails.
    fn delete_older_than(&self, cutoff: &str) -> Result<usize, LogStoreError>;
}

/// In-memory log store implementation.
///
/// **Note:** Data is not persisted across restarts.
///
/// # Example
///
/// ```
/// use housing_shared::models::{LogLevel, NewLogRecord};
/// use housing_shared::storage::{InMemoryLogStore, LogQuery, LogStore};
///
/// let store = InMemoryLogStore::new();
/// let id = store.insert(NewLogRecord::new(LogLevel::Info, "hello")).unwrap();
///
/// let records = store.query(LogQuery::new()).unwrap();
/// assert_eq!(records[0].id, id);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    records: Arc<RwLock<Vec<LogRecord>>>,
}

impl InMemoryLogStore {
    /// Creates a new empty in-memory log store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory log store wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl LogStore for InMemoryLogStore {
    fn insert(&self, record: NewLogRecord) -> Result<i64, LogStoreError> {
        let mut records = self.records.write().map_err(|_| LogStoreError::LockError)?;
        let id = records.last().map_or(1, |last| last.id + 1);
        records.push(LogRecord {
            id,
            timestamp: record.timestamp,
            level: record.level,
            message: record.message,
        });
        Ok(id)
    }

    fn query(&self, query: LogQuery) -> Result<Vec<LogRecord>, LogStoreError> {
        let records = self.records.read().map_err(|_| LogStoreError::LockError)?;

        Ok(records
            .iter()
            .rev()
            .filter(|record| query.level.map_or(true, |level| record.level == level))
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn count(&self) -> Result<usize, LogStoreError> {
        let records = self.records.read().map_err(|_| LogStoreError::LockError)?;
        Ok(records.len())
    }

    fn clear(&self) -> Result<(), LogStoreError> {
        let mut records = self.records.write().map_err(|_| LogStoreError::LockError)?;
        records.clear();
        Ok(())
    }

    fn delete_older_than(&self, cutoff: &str) -> Result<usize, LogStoreError> {
        let mut records = self.records.write().map_err(|_| LogStoreError::LockError)?;
        let before = records.len();
        records.retain(|record| record.timestamp.as_str() >= cutoff);
        Ok(before - records.len())
    }
}

const CREATE_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT,
        level TEXT,
        message TEXT
    )";

/// SQLite-backed log store.
///
/// Holds a single connection; a mutex serializes every statement so
/// concurrent requests never share the connection at the same time.
pub struct SqliteLogStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl std::fmt::Debug for SqliteLogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteLogStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteLogStore {
    /// Opens (or creates) the database at `path` and ensures the `logs` table
    /// exists. Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or database cannot be created, or
    /// the table cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LogStoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| LogStoreError::Open {
                path: path.clone(),
                source,
            })?;
        }

        let conn = Connection::open(&path)?;
        conn.execute(CREATE_TABLE_SQL, [])?;

        tracing::debug!(path = %path.display(), "Opened SQLite log store");

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Opens a private in-memory database. Useful for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be created.
    pub fn open_in_memory() -> Result<Self, LogStoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute(CREATE_TABLE_SQL, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        })
    }

    /// Returns the database file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, LogStoreError>,
    ) -> Result<T, LogStoreError> {
        let conn = self.conn.lock().map_err(|_| LogStoreError::LockError)?;
        f(&conn)
    }
}

fn row_to_record(
    id: i64,
    timestamp: Option<String>,
    level: Option<String>,
    message: Option<String>,
) -> Result<LogRecord, LogStoreError> {
    let level = level
        .as_deref()
        .unwrap_or_default()
        .parse::<LogLevel>()
        .map_err(|e| LogStoreError::CorruptRow {
            id,
            reason: e.to_string(),
        })?;

    Ok(LogRecord {
        id,
        timestamp: timestamp.unwrap_or_default(),
        level,
        message: message.unwrap_or_default(),
    })
}

impl LogStore for SqliteLogStore {
    fn insert(&self, record: NewLogRecord) -> Result<i64, LogStoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO logs (timestamp, level, message) VALUES (?1, ?2, ?3)",
                params![record.timestamp, record.level.as_str(), record.message],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn query(&self, query: LogQuery) -> Result<Vec<LogRecord>, LogStoreError> {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = query
            .limit
            .map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let offset = i64::try_from(query.offset.unwrap_or(0)).unwrap_or(i64::MAX);
        let level = query.level.map(LogLevel::as_str);

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, level, message FROM logs
                 WHERE (?1 IS NULL OR level = ?1)
                 ORDER BY id DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt.query_map(params![level, limit, offset], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?;

            let mut records = Vec::new();
            for row in rows {
                let (id, timestamp, level, message) = row?;
                records.push(row_to_record(id, timestamp, level, message)?);
            }
            Ok(records)
        })
    }

    fn count(&self) -> Result<usize, LogStoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
    }

    fn clear(&self) -> Result<(), LogStoreError> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM logs", [])?;
            Ok(())
        })
    }

    fn delete_older_than(&self, cutoff: &str) -> Result<usize, LogStoreError> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM logs WHERE timestamp < ?1", params![cutoff])?;
            Ok(deleted)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_at(timestamp: &str, level: LogLevel, message: &str) -> NewLogRecord {
        NewLogRecord {
            timestamp: timestamp.to_string(),
            level,
            message: message.to_string(),
        }
    }

    fn exercise_store(store: &dyn LogStore) {
        assert_eq!(store.count().unwrap(), 0);

        let first = store
            .insert(record_at("2024-01-01T00:00:00.000000", LogLevel::Info, "one"))
            .unwrap();
        let second = store
            .insert(record_at("2024-01-02T00:00:00.000000", LogLevel::Error, "two"))
            .unwrap();
        store
            .insert(record_at("2024-01-03T00:00:00.000000", LogLevel::Info, "three"))
            .unwrap();
        assert!(second > first);
        assert_eq!(store.count().unwrap(), 3);

        let all = store.query(LogQuery::new()).unwrap();
        let messages: Vec<_> = all.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, ["three", "two", "one"]);

        let errors = store
            .query(LogQuery::new().with_level(LogLevel::Error))
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].id, second);

        let page = store
            .query(LogQuery::new().with_limit(1).with_offset(1))
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].message, "two");

        let removed = store
            .delete_older_than("2024-01-02T00:00:00.000000")
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count().unwrap(), 2);

        store.clear().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_in_memory_store_operations() {
        exercise_store(&InMemoryLogStore::new());
    }

    #[test]
    fn test_sqlite_store_operations() {
        exercise_store(&SqliteLogStore::open_in_memory().unwrap());
    }

    #[test]
    fn test_sqlite_store_creates_directory_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("logs.db");

        {
            let store = SqliteLogStore::open(&path).unwrap();
            store
                .insert(NewLogRecord::new(LogLevel::Warning, "persisted"))
                .unwrap();
        }

        assert!(path.exists());
        let reopened = SqliteLogStore::open(&path).unwrap();
        let records = reopened.query(LogQuery::new()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, LogLevel::Warning);
        assert_eq!(records[0].message, "persisted");
    }

    #[test]
    fn test_sqlite_store_open_fails_for_unwritable_location() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let result = SqliteLogStore::open(blocker.join("logs.db"));
        assert!(result.is_err());
    }

    #[test]
    fn test_concurrent_inserts_are_serialized() {
        let store = Arc::new(SqliteLogStore::open_in_memory().unwrap());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for j in 0..25 {
                        store
                            .insert(NewLogRecord::new(LogLevel::Debug, format!("{i}-{j}")))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.count().unwrap(), 200);
    }
}
