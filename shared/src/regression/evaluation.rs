//! Regression evaluation metrics.

use super::ModelError;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

fn check_lengths(
    predictions: ArrayView1<'_, f64>,
    targets: ArrayView1<'_, f64>,
) -> Result<(), ModelError> {
    if targets.is_empty() {
        return Err(ModelError::EmptyDataset);
    }
    if predictions.len() != targets.len() {
        return Err(ModelError::LengthMismatch {
            rows: predictions.len(),
            targets: targets.len(),
        });
    }
    Ok(())
}

/// Root mean squared error.
///
/// # Errors
///
/// Returns an error if the arrays are empty or differ in length.
pub fn rmse(predictions: ArrayView1<'_, f64>, targets: ArrayView1<'_, f64>) -> Result<f64, ModelError> {
    check_lengths(predictions, targets)?;
    let residuals = &predictions - &targets;
    let mse = residuals.mapv(|r| r * r).mean().ok_or(ModelError::EmptyDataset)?;
    Ok(mse.sqrt())
}

/// Mean absolute error.
///
/// # Errors
///
/// Returns an error if the arrays are empty or differ in length.
pub fn mae(predictions: ArrayView1<'_, f64>, targets: ArrayView1<'_, f64>) -> Result<f64, ModelError> {
    check_lengths(predictions, targets)?;
    let residuals = &predictions - &targets;
    residuals.mapv(f64::abs).mean().ok_or(ModelError::EmptyDataset)
}

/// Coefficient of determination.
///
/// A constant target yields `1.0` for a perfect fit and `0.0` otherwise.
///
/// # Errors
///
/// Returns an error if the arrays are empty or differ in length.
pub fn r2(predictions: ArrayView1<'_, f64>, targets: ArrayView1<'_, f64>) -> Result<f64, ModelError> {
    check_lengths(predictions, targets)?;
    let mean = targets.mean().ok_or(ModelError::EmptyDataset)?;
    let ss_res = (&targets - &predictions).mapv(|r| r * r).sum();
    let ss_tot = targets.mapv(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

/// The metrics logged for each trained candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// Root mean squared error.
    pub rmse: f64,
    /// Mean absolute error.
    pub mae: f64,
    /// Coefficient of determination.
    pub r2: f64,
}

impl EvaluationMetrics {
    /// Computes all metrics for a prediction set.
    ///
    /// # Errors
    ///
    /// Returns an error if the arrays are empty or differ in length.
    pub fn compute(
        predictions: ArrayView1<'_, f64>,
        targets: ArrayView1<'_, f64>,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            rmse: rmse(predictions, targets)?,
            mae: mae(predictions, targets)?,
            r2: r2(predictions, targets)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    #[test]
    fn test_perfect_predictions() {
        let y = array![1.0, 2.0, 3.0];
        let m = EvaluationMetrics::compute(y.view(), y.view()).unwrap();
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.r2, 1.0);
    }

    #[test]
    fn test_known_values() {
        let predictions = array![2.0, 2.0, 2.0, 2.0];
        let targets = array![1.0, 3.0, 1.0, 3.0];
        assert_eq!(rmse(predictions.view(), targets.view()).unwrap(), 1.0);
        assert_eq!(mae(predictions.view(), targets.view()).unwrap(), 1.0);
        // Predicting the mean explains nothing.
        assert_eq!(r2(predictions.view(), targets.view()).unwrap(), 0.0);
    }

    #[test]
    fn test_rmse_penalizes_large_errors_more_than_mae() {
        let predictions = array![0.0, 0.0];
        let targets = array![0.0, 4.0];
        assert!(
            rmse(predictions.view(), targets.view()).unwrap()
                > mae(predictions.view(), targets.view()).unwrap()
        );
    }

    #[test]
    fn test_constant_target_r2() {
        let targets = array![5.0, 5.0];
        assert_eq!(r2(targets.view(), targets.view()).unwrap(), 1.0);
        assert_eq!(r2(array![4.0, 6.0].view(), targets.view()).unwrap(), 0.0);
    }

    #[test]
    fn test_length_errors() {
        let empty = Array1::<f64>::zeros(0);
        assert!(matches!(
            rmse(empty.view(), empty.view()),
            Err(ModelError::EmptyDataset)
        ));
        assert!(matches!(
            mae(array![1.0].view(), array![1.0, 2.0].view()),
            Err(ModelError::LengthMismatch { .. })
        ));
    }
}
