//! Storage traits and implementations.
//!
//! The `LogStore` trait defines the interface of the relational log sink,
//! allowing the embedded SQLite store to be swapped for an in-memory one in
//! tests.

pub mod log_store;

pub use log_store::{InMemoryLogStore, LogQuery, LogStore, LogStoreError, SqliteLogStore};
