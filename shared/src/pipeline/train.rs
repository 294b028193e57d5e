//! Candidate training, selection and registration.

use super::dataset::{read_matrix_csv, read_vector_csv};
use super::preprocess::SplitPaths;
use super::registry::{ModelRegistry, ModelVersion, RegistryError, Stage};
use super::tracking::{run_tracked, ExperimentTracker};
use super::PipelineError;
use crate::regression::{
    DecisionTreeRegressor, EvaluationMetrics, LinearRegression, Model, ModelArtifact, Regressor,
};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;
use validator::Validate;

/// Name under which the selected model is registered.
pub const REGISTERED_MODEL_NAME: &str = "CaliforniaHousingModel";

/// Default path of the served model artifact.
pub const DEFAULT_ARTIFACT_PATH: &str = "model/CaliforniaHousingModel.json";

/// Settings for [`train_and_register`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TrainingConfig {
    /// Directory holding the four split files.
    pub processed_dir: PathBuf,
    /// Where the selected model artifact is written.
    pub artifact_path: PathBuf,
    /// Where each candidate's artifact is written before selection.
    pub candidates_dir: PathBuf,
    /// Registry name of the model.
    #[validate(length(min = 1, message = "Registered model name cannot be empty"))]
    pub registered_model_name: String,
    /// Depth limit of the tree candidate; unbounded when `None`.
    #[validate(range(min = 1, message = "tree_max_depth must be at least 1"))]
    pub tree_max_depth: Option<usize>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            processed_dir: PathBuf::from("data/processed"),
            artifact_path: PathBuf::from(DEFAULT_ARTIFACT_PATH),
            candidates_dir: PathBuf::from("model/candidates"),
            registered_model_name: REGISTERED_MODEL_NAME.to_string(),
            tree_max_depth: None,
        }
    }
}

impl TrainingConfig {
    fn candidates(&self) -> Vec<Model> {
        let tree = match self.tree_max_depth {
            Some(depth) => DecisionTreeRegressor::new().with_max_depth(depth),
            None => DecisionTreeRegressor::new(),
        };
        vec![
            Model::Linear(LinearRegression::new()),
            Model::DecisionTree(tree),
        ]
    }
}

/// A trained and evaluated candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateResult {
    /// Tracked run that trained the candidate.
    pub run_id: String,
    /// Test-set metrics.
    pub metrics: EvaluationMetrics,
    /// The fitted model with its feature names.
    pub artifact: ModelArtifact,
}

impl CandidateResult {
    /// Model type name, e.g. `LinearRegression`.
    #[must_use]
    pub fn model_type(&self) -> &'static str {
        self.artifact.model.model_type()
    }
}

/// Outcome of [`train_and_register`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    /// The selected candidate.
    pub best: CandidateResult,
    /// Every candidate that trained successfully, in training order.
    pub candidates: Vec<CandidateResult>,
    /// Where the selected artifact was written.
    pub artifact_path: PathBuf,
    /// The registry version created for the selected model.
    pub version: ModelVersion,
}

fn compare_candidates(a: &CandidateResult, b: &CandidateResult) -> Ordering {
    a.metrics
        .rmse
        .total_cmp(&b.metrics.rmse)
        .then_with(|| {
            a.artifact
                .model
                .complexity_rank()
                .cmp(&b.artifact.model.complexity_rank())
        })
}

/// Picks the candidate with the lowest test RMSE.
///
/// Equal RMSE goes to the simpler model (lower
/// [`Model::complexity_rank`]). Candidates with a NaN RMSE are never
/// selected.
#[must_use]
pub fn select_best(candidates: &[CandidateResult]) -> Option<&CandidateResult> {
    candidates
        .iter()
        .filter(|c| !c.metrics.rmse.is_nan())
        .min_by(|a, b| compare_candidates(a, b))
}

struct Splits {
    feature_names: Vec<String>,
    x_train: Array2<f64>,
    y_train: Array1<f64>,
    x_test: Array2<f64>,
    y_test: Array1<f64>,
}

fn load_splits(config: &TrainingConfig) -> Result<Splits, PipelineError> {
    let paths = SplitPaths::in_dir(&config.processed_dir);
    let (feature_names, x_train) = read_matrix_csv(&paths.x_train)?;
    let (_, x_test) = read_matrix_csv(&paths.x_test)?;
    Ok(Splits {
        feature_names,
        x_train,
        y_train: read_vector_csv(&paths.y_train)?,
        x_test,
        y_test: read_vector_csv(&paths.y_test)?,
    })
}

fn train_candidate(
    mut model: Model,
    splits: &Splits,
    config: &TrainingConfig,
    tracker: &mut dyn ExperimentTracker,
) -> Result<CandidateResult, PipelineError> {
    let model_type = model.model_type();
    run_tracked(tracker, model_type, |tracker, run_id| {
        tracker.log_param("model_type", model_type)?;

        model.fit(splits.x_train.view(), splits.y_train.view())?;
        let predictions = model.predict(splits.x_test.view())?;
        let metrics = EvaluationMetrics::compute(predictions.view(), splits.y_test.view())?;

        tracker.log_metric("rmse", metrics.rmse)?;
        tracker.log_metric("mae", metrics.mae)?;
        tracker.log_metric("r2", metrics.r2)?;

        let artifact = ModelArtifact::new(model, splits.feature_names.clone());
        let path = config.candidates_dir.join(format!("{model_type}.json"));
        artifact.save(&path)?;
        tracker.log_artifact(&path, "model")?;

        tracing::info!(
            model_type,
            rmse = metrics.rmse,
            mae = metrics.mae,
            r2 = metrics.r2,
            "Candidate trained"
        );

        Ok(CandidateResult {
            run_id: run_id.to_string(),
            metrics,
            artifact,
        })
    })
}

fn register(
    registry: &ModelRegistry,
    name: &str,
    run_id: &str,
) -> Result<ModelVersion, RegistryError> {
    match registry.create_registered_model(name) {
        Ok(_) | Err(RegistryError::AlreadyExists(_)) => {}
        Err(e) => return Err(e),
    }
    let version = registry.create_model_version(name, &format!("runs:/{run_id}/model"), run_id)?;
    registry.transition_stage(name, version.version, Stage::Staging)
}

/// Trains every candidate on the split files, writes the best one to the
/// artifact path and registers it as a new `Staging` version.
///
/// A candidate that fails to train is recorded as a failed run and skipped.
///
/// # Errors
///
/// Returns an error if the config is invalid, the split files cannot be
/// read, no candidate trains, or the artifact or registry cannot be written.
pub fn train_and_register(
    config: &TrainingConfig,
    tracker: &mut dyn ExperimentTracker,
    registry: &ModelRegistry,
) -> Result<TrainingOutcome, PipelineError> {
    config.validate()?;
    let splits = load_splits(config)?;

    let mut candidates = Vec::new();
    for model in config.candidates() {
        let model_type = model.model_type();
        match train_candidate(model, &splits, config, tracker) {
            Ok(result) => candidates.push(result),
            Err(e) => tracing::warn!(model_type, error = %e, "Candidate failed to train"),
        }
    }

    let best = select_best(&candidates)
        .cloned()
        .ok_or(PipelineError::NoCandidates)?;
    tracing::info!(model_type = best.model_type(), rmse = best.metrics.rmse, "Best model selected");

    best.artifact.save(&config.artifact_path)?;
    let version = register(registry, &config.registered_model_name, &best.run_id)?;

    tracing::info!(
        name = %config.registered_model_name,
        version = version.version,
        stage = %version.stage,
        "Model registered"
    );

    Ok(TrainingOutcome {
        best,
        candidates,
        artifact_path: config.artifact_path.clone(),
        version,
    })
}
