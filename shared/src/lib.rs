//! Housing Predictor Shared Library
//!
//! Domain types and batch logic shared by the prediction API and the
//! `housing` command-line tool.
//!
//! # Modules
//!
//! - [`models`] - Prediction payloads and log records
//! - [`regression`] - Regressors, evaluation metrics and the model artifact
//! - [`storage`] - The relational log store
//! - [`config`] - Log retention policy
//! - [`pipeline`] - Offline preprocessing, training and model registration
//!
//! # Example
//!
//! ```
//! use housing_shared::models::{HousingInput, PredictResponse};
//!
//! let input: HousingInput = serde_json::from_str(
//!     r#"{"longitude": -122.1, "latitude": 37.7, "housing_median_age": 30,
//!         "total_rooms": 2000, "total_bedrooms": 400, "population": 800,
//!         "households": 300, "median_income": 5.0}"#,
//! )
//! .unwrap();
//! assert_eq!(input.to_features()[7], 5.0);
//!
//! let body = serde_json::to_string(&PredictResponse::success(1.5)).unwrap();
//! assert_eq!(body, r#"{"prediction":1.5}"#);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod models;
pub mod pipeline;
pub mod regression;
pub mod storage;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use ndarray;
pub use serde;
pub use serde_json;
pub use validator;
