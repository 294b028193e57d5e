//! Ordinary least squares linear regression.

use super::{check_row, check_training_set, ModelError, Regressor};
use linfa::traits::Fit;
use linfa::DatasetBase;
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Linear regression with an intercept, fitted by least squares.
///
/// Fitting is delegated to `linfa-linear`, which centers the data before
/// solving the normal equations. Only the coefficients and intercept are
/// kept, so the serialized form is independent of the solver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Fitted coefficients, one per feature. Empty before fitting.
    pub coefficients: Array1<f64>,
    /// Fitted intercept.
    pub intercept: f64,
}

impl LinearRegression {
    /// Creates an unfitted model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a model from known parameters.
    #[must_use]
    pub fn from_parameters(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients: Array1::from(coefficients),
            intercept,
        }
    }

    pub(crate) fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        if self.coefficients.len() != n_features {
            return Err(ModelError::Inconsistent(format!(
                "linear model has {} coefficients for {n_features} features",
                self.coefficients.len()
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::Inconsistent(
                "linear model has non-finite parameters".to_string(),
            ));
        }
        Ok(())
    }
}

/// A column with a single repeated value has no identifiable coefficient.
fn has_constant_column(x: ArrayView2<'_, f64>) -> bool {
    x.axis_iter(Axis(1))
        .any(|column| column.iter().all(|v| *v == column[0]))
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<(), ModelError> {
        check_training_set(x, y)?;
        if has_constant_column(x) {
            return Err(ModelError::SingularMatrix);
        }

        let dataset = DatasetBase::new(x.to_owned(), y.to_owned());
        let fitted = linfa_linear::LinearRegression::new()
            .fit(&dataset)
            .map_err(|e| ModelError::Fit(e.to_string()))?;

        let coefficients = fitted.params().clone();
        let intercept = fitted.intercept();
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ModelError::SingularMatrix);
        }

        self.coefficients = coefficients;
        self.intercept = intercept;
        Ok(())
    }

    fn predict_row(&self, row: ArrayView1<'_, f64>) -> Result<f64, ModelError> {
        check_row(self.n_features(), row)?;
        Ok(self.intercept + self.coefficients.dot(&row))
    }

    fn n_features(&self) -> Option<usize> {
        if self.coefficients.is_empty() {
            None
        } else {
            Some(self.coefficients.len())
        }
    }
}
