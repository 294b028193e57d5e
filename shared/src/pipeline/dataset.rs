//! CSV reading and writing for raw datasets and split files.

use super::PipelineError;
use crate::regression::ModelError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use std::path::Path;

/// A raw dataset after row filtering: numeric features plus a target.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledData {
    /// Feature column names.
    pub feature_names: Vec<String>,
    /// Feature rows, one column per feature name.
    pub features: Array2<f64>,
    /// Name of the target column.
    pub target_name: String,
    /// Target value per row.
    pub targets: Array1<f64>,
    /// Rows dropped because a field was missing or not numeric.
    pub dropped_rows: usize,
}

impl LabeledData {
    /// Number of retained rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns true if no rows were retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize, PipelineError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
}

fn parse_number(field: &str) -> Option<f64> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Reads a raw CSV dataset with a header row.
///
/// The target column and every column in `drop_columns` are removed from the
/// features; all remaining columns must be numeric. A row is dropped if any
/// of its fields is empty, or if a feature or target field is not a number.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a named column is missing,
/// or no rows survive filtering.
pub fn read_labeled_csv(
    path: &Path,
    target: &str,
    drop_columns: &[String],
) -> Result<LabeledData, PipelineError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| PipelineError::csv(path, e))?;
    let headers = reader
        .headers()
        .map_err(|e| PipelineError::csv(path, e))?
        .clone();

    let target_index = column_index(&headers, target)?;
    for name in drop_columns {
        column_index(&headers, name)?;
    }

    let feature_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, name)| *i != target_index && !drop_columns.iter().any(|d| d == name))
        .map(|(i, name)| (i, name.to_string()))
        .collect();

    let mut features = Vec::new();
    let mut targets = Vec::new();
    let mut dropped_rows = 0;
    let n_features = feature_columns.len();

    for record in reader.records() {
        let record = record.map_err(|e| PipelineError::csv(path, e))?;
        if record.iter().any(|field| field.trim().is_empty()) {
            dropped_rows += 1;
            continue;
        }

        let row: Option<Vec<f64>> = feature_columns
            .iter()
            .map(|(i, _)| record.get(*i).and_then(parse_number))
            .collect();
        let target_value = record.get(target_index).and_then(parse_number);

        match (row, target_value) {
            (Some(row), Some(y)) => {
                features.extend(row);
                targets.push(y);
            }
            _ => dropped_rows += 1,
        }
    }

    if targets.is_empty() {
        return Err(PipelineError::EmptyDataset(path.to_path_buf()));
    }

    let features = Array2::from_shape_vec((targets.len(), n_features), features)
        .map_err(ModelError::from)?;

    Ok(LabeledData {
        feature_names: feature_columns.into_iter().map(|(_, name)| name).collect(),
        features,
        target_name: target.to_string(),
        targets: Array1::from(targets),
        dropped_rows,
    })
}

/// Writes feature rows with a header to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_matrix_csv(
    path: &Path,
    headers: &[String],
    rows: ArrayView2<'_, f64>,
) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| PipelineError::csv(path, e))?;
    writer
        .write_record(headers)
        .map_err(|e| PipelineError::csv(path, e))?;
    for row in rows.outer_iter() {
        writer
            .write_record(row.iter().map(f64::to_string))
            .map_err(|e| PipelineError::csv(path, e))?;
    }
    writer.flush().map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes a single named column to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_vector_csv(
    path: &Path,
    header: &str,
    values: ArrayView1<'_, f64>,
) -> Result<(), PipelineError> {
    write_matrix_csv(path, &[header.to_string()], values.insert_axis(Axis(1)))
}

/// Reads an all-numeric CSV written by [`write_matrix_csv`].
///
/// # Errors
///
/// Returns an error if the file cannot be read or a field is not numeric.
pub fn read_matrix_csv(path: &Path) -> Result<(Vec<String>, Array2<f64>), PipelineError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| PipelineError::csv(path, e))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::csv(path, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut values = Vec::new();
    let mut n_rows = 0;
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| PipelineError::csv(path, e))?;
        for field in &record {
            let value = parse_number(field).ok_or_else(|| PipelineError::InvalidValue {
                path: path.to_path_buf(),
                row: line + 1,
                value: field.to_string(),
            })?;
            values.push(value);
        }
        n_rows += 1;
    }

    if n_rows == 0 {
        return Err(PipelineError::EmptyDataset(path.to_path_buf()));
    }

    let matrix =
        Array2::from_shape_vec((n_rows, headers.len()), values).map_err(ModelError::from)?;
    Ok((headers, matrix))
}

/// Reads a single-column CSV (a target split) into a flat vector.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not numeric.
pub fn read_vector_csv(path: &Path) -> Result<Array1<f64>, PipelineError> {
    let (_, matrix) = read_matrix_csv(path)?;
    Ok(matrix.column(0).to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const RAW: &str = "\
longitude,latitude,median_income,median_house_value,ocean_proximity
-122.23,37.88,8.3252,452600.0,NEAR BAY
-122.22,37.86,,358500.0,NEAR BAY
-122.24,37.85,7.2574,352100.0,
-122.25,37.85,5.6431,341300.0,NEAR BAY
-122.25,abc,3.8462,342200.0,NEAR BAY
";

    fn write_raw(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("housing.csv");
        std::fs::write(&path, RAW).unwrap();
        path
    }

    #[test]
    fn test_read_labeled_drops_incomplete_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_raw(dir.path());

        let data =
            read_labeled_csv(&path, "median_house_value", &["ocean_proximity".to_string()])
                .unwrap();

        assert_eq!(data.feature_names, ["longitude", "latitude", "median_income"]);
        assert_eq!(data.len(), 2);
        assert_eq!(data.dropped_rows, 3);
        assert_eq!(data.features.row(1), array![-122.25, 37.85, 5.6431]);
        assert_eq!(data.targets, array![452_600.0, 341_300.0]);
    }

    #[test]
    fn test_read_labeled_missing_target_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_raw(dir.path());

        let err = read_labeled_csv(&path, "price", &[]).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(name) if name == "price"));
    }

    #[test]
    fn test_matrix_and_vector_files_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let x_path = dir.path().join("X.csv");
        let y_path = dir.path().join("y.csv");

        let headers = vec!["a".to_string(), "b".to_string()];
        let rows = array![[1.5, -2.0], [3.0, 4.25]];
        write_matrix_csv(&x_path, &headers, rows.view()).unwrap();
        write_vector_csv(&y_path, "target", array![10.0, 20.5].view()).unwrap();

        let (read_headers, matrix) = read_matrix_csv(&x_path).unwrap();
        assert_eq!(read_headers, headers);
        assert_eq!(matrix, rows);
        assert_eq!(read_vector_csv(&y_path).unwrap(), array![10.0, 20.5]);

        let text = std::fs::read_to_string(&y_path).unwrap();
        assert!(text.starts_with("target\n"));
    }

    #[test]
    fn test_read_matrix_rejects_non_numeric() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "a\n1\nx\n").unwrap();

        let err = read_matrix_csv(&path).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidValue { row: 2, .. }));
    }
}
