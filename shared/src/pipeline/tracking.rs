//! Experiment tracking for pipeline runs.
//!
//! Each pipeline step runs inside a tracked run that records its parameters,
//! metrics and artifacts. `FileTracker` persists runs as JSON under a local
//! directory; `InMemoryTracker` keeps them in memory for tests.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by an experiment tracker.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// A run is already active.
    #[error("Run {0} is already active")]
    RunAlreadyActive(String),

    /// No run is active.
    #[error("No active run")]
    NoActiveRun,

    /// The run store could not be read or written.
    #[error("Tracking I/O error at {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A run record could not be encoded or decoded.
    #[error("Invalid run record: {0}")]
    Format(#[from] serde_json::Error),
}

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    /// The run is in progress.
    Running,
    /// The run completed.
    Finished,
    /// The run ended with an error.
    Failed,
}

/// A recorded run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique run id.
    pub run_id: String,
    /// Human-readable run name.
    pub run_name: String,
    /// Lifecycle state.
    pub status: RunStatus,
    /// RFC 3339 start time.
    pub start_time: String,
    /// RFC 3339 end time, once ended.
    pub end_time: Option<String>,
    /// Logged parameters.
    pub params: BTreeMap<String, String>,
    /// Logged metrics.
    pub metrics: BTreeMap<String, f64>,
    /// Logged artifact paths, relative to the run's artifact root.
    pub artifacts: Vec<String>,
}

impl RunRecord {
    fn start(run_name: &str) -> Self {
        Self {
            run_id: Uuid::new_v4().simple().to_string(),
            run_name: run_name.to_string(),
            status: RunStatus::Running,
            start_time: Utc::now().to_rfc3339(),
            end_time: None,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            artifacts: Vec::new(),
        }
    }

    fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.end_time = Some(Utc::now().to_rfc3339());
    }
}

/// Interface to an experiment tracker.
///
/// At most one run is active at a time.
pub trait ExperimentTracker {
    /// Starts a run and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if a run is already active or cannot be persisted.
    fn start_run(&mut self, run_name: &str) -> Result<String, TrackingError>;

    /// Records a parameter on the active run.
    ///
    /// # Errors
    ///
    /// Returns an error if no run is active or it cannot be persisted.
    fn log_param(&mut self, key: &str, value: &str) -> Result<(), TrackingError>;

    /// Records a metric on the active run.
    ///
    /// # Errors
    ///
    /// Returns an error if no run is active or it cannot be persisted.
    fn log_metric(&mut self, key: &str, value: f64) -> Result<(), TrackingError>;

    /// Attaches a file to the active run under `artifact_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if no run is active or the file cannot be stored.
    fn log_artifact(&mut self, local_path: &Path, artifact_path: &str)
        -> Result<(), TrackingError>;

    /// Ends the active run with the given status.
    ///
    /// # Errors
    ///
    /// Returns an error if no run is active or it cannot be persisted.
    fn end_run(&mut self, status: RunStatus) -> Result<(), TrackingError>;
}

/// Runs `body` inside a tracked run named `run_name`.
///
/// The run ends as `Finished` when `body` succeeds and `Failed` otherwise;
/// the body's error is returned unchanged.
///
/// # Errors
///
/// Returns the body's error, or a tracking error if the run cannot be
/// started or ended.
pub fn run_tracked<T, E>(
    tracker: &mut dyn ExperimentTracker,
    run_name: &str,
    body: impl FnOnce(&mut dyn ExperimentTracker, &str) -> Result<T, E>,
) -> Result<T, E>
where
    E: From<TrackingError>,
{
    let run_id = tracker.start_run(run_name)?;
    match body(tracker, &run_id) {
        Ok(value) => {
            tracker.end_run(RunStatus::Finished)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(end_err) = tracker.end_run(RunStatus::Failed) {
                tracing::warn!(run_id = %run_id, error = %end_err, "Failed to mark run as failed");
            }
            Err(err)
        }
    }
}

fn artifact_name(local_path: &Path, artifact_path: &str) -> String {
    let file_name = local_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if artifact_path.is_empty() {
        file_name
    } else {
        format!("{artifact_path}/{file_name}")
    }
}

/// Tracker that keeps runs in memory.
#[derive(Debug, Default)]
pub struct InMemoryTracker {
    active: Option<RunRecord>,
    runs: Vec<RunRecord>,
}

impl InMemoryTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all ended runs in start order.
    #[must_use]
    pub fn runs(&self) -> &[RunRecord] {
        &self.runs
    }

    fn active_mut(&mut self) -> Result<&mut RunRecord, TrackingError> {
        self.active.as_mut().ok_or(TrackingError::NoActiveRun)
    }
}

impl ExperimentTracker for InMemoryTracker {
    fn start_run(&mut self, run_name: &str) -> Result<String, TrackingError> {
        if let Some(active) = &self.active {
            return Err(TrackingError::RunAlreadyActive(active.run_id.clone()));
        }
        let run = RunRecord::start(run_name);
        let run_id = run.run_id.clone();
        self.active = Some(run);
        Ok(run_id)
    }

    fn log_param(&mut self, key: &str, value: &str) -> Result<(), TrackingError> {
        self.active_mut()?
            .params
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn log_metric(&mut self, key: &str, value: f64) -> Result<(), TrackingError> {
        self.active_mut()?.metrics.insert(key.to_string(), value);
        Ok(())
    }

    fn log_artifact(
        &mut self,
        local_path: &Path,
        artifact_path: &str,
    ) -> Result<(), TrackingError> {
        let name = artifact_name(local_path, artifact_path);
        self.active_mut()?.artifacts.push(name);
        Ok(())
    }

    fn end_run(&mut self, status: RunStatus) -> Result<(), TrackingError> {
        let mut run = self.active.take().ok_or(TrackingError::NoActiveRun)?;
        run.finish(status);
        self.runs.push(run);
        Ok(())
    }
}

/// Tracker that persists each run under `<root>/<run_id>/`.
///
/// The run record lives in `run.json` and artifacts are copied into
/// `artifacts/<artifact_path>/`.
#[derive(Debug)]
pub struct FileTracker {
    root: PathBuf,
    active: Option<RunRecord>,
}

impl FileTracker {
    /// Creates a tracker rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            active: None,
        }
    }

    /// Returns the tracker root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads a persisted run.
    ///
    /// # Errors
    ///
    /// Returns an error if the run record cannot be read or decoded.
    pub fn load_run(&self, run_id: &str) -> Result<RunRecord, TrackingError> {
        let path = self.root.join(run_id).join("run.json");
        let text = std::fs::read_to_string(&path).map_err(|source| TrackingError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    fn persist(&self, run: &RunRecord) -> Result<(), TrackingError> {
        let dir = self.root.join(&run.run_id);
        std::fs::create_dir_all(&dir).map_err(|source| TrackingError::Io {
            path: dir.clone(),
            source,
        })?;
        let path = dir.join("run.json");
        let json = serde_json::to_string_pretty(run)?;
        std::fs::write(&path, json).map_err(|source| TrackingError::Io { path, source })
    }

    fn update(&mut self, f: impl FnOnce(&mut RunRecord)) -> Result<(), TrackingError> {
        let run = self.active.as_mut().ok_or(TrackingError::NoActiveRun)?;
        f(run);
        let snapshot = run.clone();
        self.persist(&snapshot)
    }
}

impl ExperimentTracker for FileTracker {
    fn start_run(&mut self, run_name: &str) -> Result<String, TrackingError> {
        if let Some(active) = &self.active {
            return Err(TrackingError::RunAlreadyActive(active.run_id.clone()));
        }
        let run = RunRecord::start(run_name);
        self.persist(&run)?;
        let run_id = run.run_id.clone();
        tracing::debug!(run_id = %run_id, run_name, "Started tracked run");
        self.active = Some(run);
        Ok(run_id)
    }

    fn log_param(&mut self, key: &str, value: &str) -> Result<(), TrackingError> {
        self.update(|run| {
            run.params.insert(key.to_string(), value.to_string());
        })
    }

    fn log_metric(&mut self, key: &str, value: f64) -> Result<(), TrackingError> {
        self.update(|run| {
            run.metrics.insert(key.to_string(), value);
        })
    }

    fn log_artifact(
        &mut self,
        local_path: &Path,
        artifact_path: &str,
    ) -> Result<(), TrackingError> {
        let run_id = self
            .active
            .as_ref()
            .ok_or(TrackingError::NoActiveRun)?
            .run_id
            .clone();
        let name = artifact_name(local_path, artifact_path);
        let target = self.root.join(&run_id).join("artifacts").join(&name);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|source| TrackingError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::copy(local_path, &target).map_err(|source| TrackingError::Io {
            path: local_path.to_path_buf(),
            source,
        })?;
        self.update(|run| run.artifacts.push(name))
    }

    fn end_run(&mut self, status: RunStatus) -> Result<(), TrackingError> {
        let mut run = self.active.take().ok_or(TrackingError::NoActiveRun)?;
        run.finish(status);
        self.persist(&run)
    }
}
