//! Data models for the housing predictor.
//!
//! This module contains the prediction request/response types and the log
//! record persisted by the relational log sink.

pub mod housing;
pub mod log;

pub use housing::{HousingInput, PredictResponse, FEATURE_COUNT, FEATURE_NAMES, TARGET_NAME};
pub use log::{now_timestamp, LogLevel, LogRecord, NewLogRecord, ParseLogLevelError};
