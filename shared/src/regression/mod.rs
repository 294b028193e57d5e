//! Regression models and the serialized model artifact.
//!
//! This module provides the two candidate regressors trained by the offline
//! pipeline, the `Regressor` trait they share, and `ModelArtifact`, the
//! single JSON file the prediction service loads at startup.
//!
//! # Example
//!
//! ```
//! use housing_shared::ndarray::array;
//! use housing_shared::regression::{LinearRegression, Regressor};
//!
//! let x = array![[1.0, 0.0], [2.0, 1.0], [3.0, 0.0], [4.0, 1.0]];
//! let y = array![3.0, 6.0, 7.0, 10.0];
//!
//! let mut model = LinearRegression::new();
//! model.fit(x.view(), y.view()).unwrap();
//! let prediction = model.predict_row(array![5.0, 0.0].view()).unwrap();
//! assert!((prediction - 11.0).abs() < 1e-6);
//! ```

pub mod evaluation;
pub mod linear;
pub mod tree;

pub use evaluation::{mae, r2, rmse, EvaluationMetrics};
pub use linear::LinearRegression;
pub use tree::DecisionTreeRegressor;

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while fitting, evaluating, or (de)serializing a model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// There were no rows to fit or evaluate.
    #[error("Cannot fit or evaluate on an empty dataset")]
    EmptyDataset,

    /// A row had the wrong number of features.
    #[error("Expected {expected} features, got {actual}")]
    ShapeMismatch {
        /// Features the model was trained with.
        expected: usize,
        /// Features supplied.
        actual: usize,
    },

    /// The number of targets differs from the number of rows.
    #[error("Got {rows} rows but {targets} targets")]
    LengthMismatch {
        /// Number of feature rows.
        rows: usize,
        /// Number of targets.
        targets: usize,
    },

    /// Flat data could not be arranged into the requested shape.
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    /// The least-squares problem has no unique solution.
    #[error("Feature matrix is rank deficient; linear regression has no unique solution")]
    SingularMatrix,

    /// The underlying solver failed.
    #[error("Model fit failed: {0}")]
    Fit(String),

    /// The model was used before being fitted.
    #[error("Model has not been fitted")]
    NotFitted,

    /// The model parameters contradict each other or the feature names.
    #[error("Inconsistent model: {0}")]
    Inconsistent(String),

    /// The artifact file could not be read or written.
    #[error("Model artifact I/O error at {path}: {source}")]
    Io {
        /// Artifact path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The artifact file is not a valid model.
    #[error("Invalid model artifact at {path}: {source}")]
    Format {
        /// Artifact path.
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

/// Checks that `x` and `y` describe a non-empty training set of matching length.
pub(crate) fn check_training_set(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
) -> Result<(), ModelError> {
    if x.nrows() == 0 {
        return Err(ModelError::EmptyDataset);
    }
    if x.nrows() != y.len() {
        return Err(ModelError::LengthMismatch {
            rows: x.nrows(),
            targets: y.len(),
        });
    }
    Ok(())
}

/// Common interface of the trainable regressors.
pub trait Regressor {
    /// Fits the model to features `x` and targets `y`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is empty, misshapen, or degenerate.
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<(), ModelError>;

    /// Predicts the target for a single feature row.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted or the row has the wrong
    /// width.
    fn predict_row(&self, row: ArrayView1<'_, f64>) -> Result<f64, ModelError>;

    /// Number of features the fitted model expects, or `None` before fitting.
    fn n_features(&self) -> Option<usize>;

    /// Predicts every row of `x`.
    ///
    /// # Errors
    ///
    /// Returns the first per-row error.
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        x.outer_iter().map(|row| self.predict_row(row)).collect()
    }
}

/// Validates `row` against a fitted feature count.
pub(crate) fn check_row(expected: Option<usize>, row: ArrayView1<'_, f64>) -> Result<(), ModelError> {
    let expected = expected.ok_or(ModelError::NotFitted)?;
    if row.len() != expected {
        return Err(ModelError::ShapeMismatch {
            expected,
            actual: row.len(),
        });
    }
    Ok(())
}

/// A trained model of either supported kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Model {
    /// Ordinary least squares.
    Linear(LinearRegression),
    /// CART regression tree.
    DecisionTree(DecisionTreeRegressor),
}

impl Model {
    /// Human-readable model type, as logged by the training runs.
    #[must_use]
    pub fn model_type(&self) -> &'static str {
        match self {
            Self::Linear(_) => "LinearRegression",
            Self::DecisionTree(_) => "DecisionTree",
        }
    }

    /// Relative structural complexity. Lower is simpler; used to break ties
    /// between candidates with equal error.
    #[must_use]
    pub fn complexity_rank(&self) -> u8 {
        match self {
            Self::Linear(_) => 0,
            Self::DecisionTree(_) => 1,
        }
    }

    /// Checks that the fitted parameters are usable with `n_features`
    /// inputs.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Inconsistent`] describing the first problem.
    pub fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        match self {
            Self::Linear(m) => m.validate(n_features),
            Self::DecisionTree(m) => m.validate(n_features),
        }
    }
}

impl Regressor for Model {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<(), ModelError> {
        match self {
            Self::Linear(m) => m.fit(x, y),
            Self::DecisionTree(m) => m.fit(x, y),
        }
    }

    fn predict_row(&self, row: ArrayView1<'_, f64>) -> Result<f64, ModelError> {
        match self {
            Self::Linear(m) => m.predict_row(row),
            Self::DecisionTree(m) => m.predict_row(row),
        }
    }

    fn n_features(&self) -> Option<usize> {
        match self {
            Self::Linear(m) => m.n_features(),
            Self::DecisionTree(m) => m.n_features(),
        }
    }
}

/// The serialized model file loaded by the prediction service.
///
/// Immutable once loaded; replaced only by redeploying with a new file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Feature names in the order `model` consumes them.
    pub feature_names: Vec<String>,
    /// ISO-8601 time the model was trained.
    pub trained_at: String,
    /// The fitted model.
    pub model: Model,
}

impl ModelArtifact {
    /// Wraps a fitted model.
    #[must_use]
    pub fn new(model: Model, feature_names: Vec<String>) -> Self {
        Self {
            feature_names,
            trained_at: crate::models::now_timestamp(),
            model,
        }
    }

    /// Predicts the target for one row, validating its width first.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ShapeMismatch`] when the row width differs from
    /// the trained feature count.
    pub fn predict(&self, row: &[f64]) -> Result<f64, ModelError> {
        if row.len() != self.feature_names.len() {
            return Err(ModelError::ShapeMismatch {
                expected: self.feature_names.len(),
                actual: row.len(),
            });
        }
        self.model.predict_row(ArrayView1::from(row))
    }

    /// Checks that the model matches the feature names and that its
    /// parameters are internally consistent.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Inconsistent`] describing the first problem.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.feature_names.is_empty() {
            return Err(ModelError::Inconsistent(
                "artifact lists no feature names".to_string(),
            ));
        }
        self.model.validate(self.feature_names.len())
    }

    /// Reads an artifact from a JSON file and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, is not a valid artifact, or
    /// describes a model that could not serve predictions.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: Self =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| ModelError::Format {
                path: path.to_path_buf(),
                source,
            })?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Writes the artifact as JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        let io_err = |source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = File::create(path).map_err(io_err)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self).map_err(|source| {
            ModelError::Format {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}
