//! Offline training pipeline.
//!
//! Two steps, each recorded as a tracked run:
//!
//! 1. [`preprocess`] turns the raw housing CSV into train/test split files.
//! 2. [`train_and_register`] fits the candidate regressors on those splits,
//!    keeps the one with the lowest test RMSE, writes the model artifact the
//!    API serves, and registers it as a new version in the [`ModelRegistry`].

pub mod dataset;
pub mod preprocess;
pub mod registry;
pub mod tracking;
pub mod train;

pub use dataset::{read_labeled_csv, read_matrix_csv, read_vector_csv, LabeledData};
pub use preprocess::{preprocess, SplitConfig, SplitPaths, SplitSummary, PREPROCESS_RUN_NAME};
pub use registry::{ModelRegistry, ModelVersion, RegisteredModel, RegistryError, Stage};
pub use tracking::{
    run_tracked, ExperimentTracker, FileTracker, InMemoryTracker, RunRecord, RunStatus,
    TrackingError,
};
pub use train::{
    select_best, train_and_register, CandidateResult, TrainingConfig, TrainingOutcome,
    DEFAULT_ARTIFACT_PATH, REGISTERED_MODEL_NAME,
};

use crate::regression::ModelError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the pipeline steps.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The step configuration failed validation.
    #[error("Invalid pipeline configuration: {0}")]
    InvalidConfig(#[from] validator::ValidationErrors),

    /// A file could not be read or written.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A CSV file was malformed.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// File being read or written.
        path: PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// A required column is absent from the header.
    #[error("Column '{0}' not found")]
    MissingColumn(String),

    /// A numeric file held a non-numeric field.
    #[error("Invalid value '{value}' in {path} at row {row}")]
    InvalidValue {
        /// File being read.
        path: PathBuf,
        /// 1-based data row.
        row: usize,
        /// Offending field.
        value: String,
    },

    /// No usable rows were found.
    #[error("No usable rows in {0}")]
    EmptyDataset(PathBuf),

    /// Too few rows to produce both a train and a test split.
    #[error("Need at least 2 usable rows in {path} to split, found {rows}")]
    TooFewRows {
        /// Dataset path.
        path: PathBuf,
        /// Usable rows found.
        rows: usize,
    },

    /// Every candidate model failed to train.
    #[error("No candidate model trained successfully")]
    NoCandidates,

    /// Fitting, evaluating or saving a model failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The experiment tracker failed.
    #[error(transparent)]
    Tracking(#[from] TrackingError),

    /// The model registry failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl PipelineError {
    pub(crate) fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}
