//! Raw dataset preprocessing into train/test split files.

use super::dataset::{read_labeled_csv, write_matrix_csv, write_vector_csv};
use super::tracking::{run_tracked, ExperimentTracker};
use super::PipelineError;
use crate::models::TARGET_NAME;
use ndarray::Axis;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

/// Name of the tracked run recorded by [`preprocess`].
pub const PREPROCESS_RUN_NAME: &str = "data_preprocessing";

/// File names of the four split files, relative to the output directory.
pub const X_TRAIN_FILE: &str = "X_train.csv";
/// Test features file name.
pub const X_TEST_FILE: &str = "X_test.csv";
/// Train targets file name.
pub const Y_TRAIN_FILE: &str = "y_train.csv";
/// Test targets file name.
pub const Y_TEST_FILE: &str = "y_test.csv";

/// Settings for [`preprocess`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SplitConfig {
    /// Raw CSV dataset.
    pub input_path: PathBuf,
    /// Directory receiving the split files.
    pub output_dir: PathBuf,
    /// Target column name.
    #[validate(length(min = 1, message = "Target column cannot be empty"))]
    pub target: String,
    /// Columns excluded from the features besides the target.
    pub drop_columns: Vec<String>,
    /// Fraction of rows placed in the test split.
    #[validate(range(
        exclusive_min = 0.0,
        exclusive_max = 1.0,
        message = "test_size must be between 0 and 1"
    ))]
    pub test_size: f64,
    /// Seed for the shuffle.
    pub random_state: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/raw/housing.csv"),
            output_dir: PathBuf::from("data/processed"),
            target: TARGET_NAME.to_string(),
            drop_columns: vec!["ocean_proximity".to_string()],
            test_size: 0.2,
            random_state: 42,
        }
    }
}

/// Paths of the four split files inside a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPaths {
    /// Train features.
    pub x_train: PathBuf,
    /// Test features.
    pub x_test: PathBuf,
    /// Train targets.
    pub y_train: PathBuf,
    /// Test targets.
    pub y_test: PathBuf,
}

impl SplitPaths {
    /// Returns the split file paths inside `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            x_train: dir.join(X_TRAIN_FILE),
            x_test: dir.join(X_TEST_FILE),
            y_train: dir.join(Y_TRAIN_FILE),
            y_test: dir.join(Y_TEST_FILE),
        }
    }

    fn all(&self) -> [&Path; 4] {
        [&self.x_train, &self.x_test, &self.y_train, &self.y_test]
    }
}

/// Outcome of a preprocessing run.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitSummary {
    /// Tracked run id.
    pub run_id: String,
    /// Written files.
    pub paths: SplitPaths,
    /// Rows in the train split.
    pub train_rows: usize,
    /// Rows in the test split.
    pub test_rows: usize,
    /// Raw rows dropped for missing or invalid values.
    pub dropped_rows: usize,
}

/// Number of test rows for `n` samples: `ceil(n * test_size)`, leaving at
/// least one training row.
fn test_row_count(n: usize, test_size: f64) -> usize {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let count = (n as f64 * test_size).ceil() as usize;
    count.clamp(1, n.saturating_sub(1).max(1))
}

#[allow(clippy::cast_precision_loss)]
fn count_metric(n: usize) -> f64 {
    n as f64
}

/// Reads the raw dataset, drops incomplete rows, shuffles with a seeded RNG
/// and writes the train/test split files, recording the run in `tracker`.
///
/// # Errors
///
/// Returns an error if the config is invalid, the dataset cannot be read or
/// has fewer than two usable rows, or a file cannot be written.
pub fn preprocess(
    config: &SplitConfig,
    tracker: &mut dyn ExperimentTracker,
) -> Result<SplitSummary, PipelineError> {
    config.validate()?;

    run_tracked(tracker, PREPROCESS_RUN_NAME, |tracker, run_id| {
        tracker.log_param("input_path", &config.input_path.display().to_string())?;
        tracker.log_param("output_dir", &config.output_dir.display().to_string())?;
        tracker.log_param("test_size", &config.test_size.to_string())?;
        tracker.log_param("random_state", &config.random_state.to_string())?;

        let data = read_labeled_csv(&config.input_path, &config.target, &config.drop_columns)?;
        if data.len() < 2 {
            return Err(PipelineError::TooFewRows {
                path: config.input_path.clone(),
                rows: data.len(),
            });
        }

        let mut order: Vec<usize> = (0..data.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(config.random_state));
        let (test_idx, train_idx) = order.split_at(test_row_count(data.len(), config.test_size));


        std::fs::create_dir_all(&config.output_dir).map_err(|source| PipelineError::Io {
            path: config.output_dir.clone(),
            source,
        })?;
        let paths = SplitPaths::in_dir(&config.output_dir);

        let x_train = data.features.select(Axis(0), train_idx);
        let x_test = data.features.select(Axis(0), test_idx);
        let y_train = data.targets.select(Axis(0), train_idx);
        let y_test = data.targets.select(Axis(0), test_idx);

        write_matrix_csv(&paths.x_train, &data.feature_names, x_train.view())?;
        write_matrix_csv(&paths.x_test, &data.feature_names, x_test.view())?;
        write_vector_csv(&paths.y_train, &data.target_name, y_train.view())?;
        write_vector_csv(&paths.y_test, &data.target_name, y_test.view())?;

        for path in paths.all() {
            tracker.log_artifact(path, "splits")?;
        }

        tracker.log_metric("X_train_size", count_metric(train_idx.len()))?;
        tracker.log_metric("X_test_size", count_metric(test_idx.len()))?;
        tracker.log_metric("y_train_size", count_metric(train_idx.len()))?;
        tracker.log_metric("y_test_size", count_metric(test_idx.len()))?;

        tracing::info!(
            train_rows = train_idx.len(),
            test_rows = test_idx.len(),
            dropped_rows = data.dropped_rows,
            output_dir = %config.output_dir.display(),
            "Preprocessing complete"
        );

        Ok(SplitSummary {
            run_id: run_id.to_string(),
            paths,
            train_rows: train_idx.len(),
            test_rows: test_idx.len(),
            dropped_rows: data.dropped_rows,
        })
    })
}
