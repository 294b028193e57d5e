//! File-backed model registry.
//!
//! Tracks named models, their numbered versions, and the stage each version
//! is in. The whole registry is one JSON document rewritten on every change.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the model registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A registered model with this name already exists.
    #[error("Registered model '{0}' already exists")]
    AlreadyExists(String),

    /// No registered model has this name.
    #[error("Registered model '{0}' not found")]
    ModelNotFound(String),

    /// The model exists but the version does not.
    #[error("Version {version} of model '{name}' not found")]
    VersionNotFound {
        /// Model name.
        name: String,
        /// Requested version.
        version: u32,
    },

    /// The registry file could not be read or written.
    #[error("Registry I/O error at {path}: {source}")]
    Io {
        /// Registry path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The registry file is not valid JSON.
    #[error("Invalid registry file: {0}")]
    Format(#[from] serde_json::Error),
}

/// Deployment stage of a model version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// Newly created.
    None,
    /// Under evaluation.
    Staging,
    /// Serving traffic.
    Production,
    /// Retired.
    Archived,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::None => "None",
            Self::Staging => "Staging",
            Self::Production => "Production",
            Self::Archived => "Archived",
        };
        f.write_str(name)
    }
}

/// One registered version of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelVersion {
    /// Version number, starting at 1.
    pub version: u32,
    /// Location of the model the version points to.
    pub source: String,
    /// Tracked run that produced the model.
    pub run_id: String,
    /// Current stage.
    pub stage: Stage,
    /// RFC 3339 creation time.
    pub created_at: String,
}

/// A named model and its versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredModel {
    /// Model name.
    pub name: String,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// Versions in creation order.
    pub versions: Vec<ModelVersion>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    models: BTreeMap<String, RegisteredModel>,
}

/// Model registry persisted to a JSON file.
///
/// # Example
///
/// ```
/// use housing_shared::pipeline::{ModelRegistry, Stage};
///
/// let dir = tempfile::tempdir().unwrap();
/// let registry = ModelRegistry::new(dir.path().join("registry.json"));
///
/// registry.create_registered_model("CaliforniaHousingModel").unwrap();
/// let v = registry
///     .create_model_version("CaliforniaHousingModel", "runs:/abc/model", "abc")
///     .unwrap();
/// registry
///     .transition_stage("CaliforniaHousingModel", v.version, Stage::Staging)
///     .unwrap();
///
/// let latest = registry.latest_version("CaliforniaHousingModel").unwrap().unwrap();
/// assert_eq!(latest.stage, Stage::Staging);
/// ```
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    path: PathBuf,
}

impl ModelRegistry {
    /// Creates a registry backed by `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the registry file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<RegistryDocument, RegistryError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RegistryDocument::default()),
            Err(source) => Err(RegistryError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn save(&self, doc: &RegistryDocument) -> Result<(), RegistryError> {
        let io_err = |source| RegistryError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(doc)?;
        std::fs::write(&self.path, json).map_err(io_err)
    }

    /// Registers a new model name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyExists`] if the name is taken.
    pub fn create_registered_model(&self, name: &str) -> Result<RegisteredModel, RegistryError> {
        let mut doc = self.load()?;
        if doc.models.contains_key(name) {
            return Err(RegistryError::AlreadyExists(name.to_string()));
        }
        let model = RegisteredModel {
            name: name.to_string(),
            created_at: Utc::now().to_rfc3339(),
            versions: Vec::new(),
        };
        doc.models.insert(name.to_string(), model.clone());
        self.save(&doc)?;
        Ok(model)
    }

    /// Adds a new version (numbered one past the latest) in stage `None`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ModelNotFound`] if the name is not registered.
    pub fn create_model_version(
        &self,
        name: &str,
        source: &str,
        run_id: &str,
    ) -> Result<ModelVersion, RegistryError> {
        let mut doc = self.load()?;
        let model = doc
            .models
            .get_mut(name)
            .ok_or_else(|| RegistryError::ModelNotFound(name.to_string()))?;

        let version = ModelVersion {
            version: model.versions.last().map_or(1, |v| v.version + 1),
            source: source.to_string(),
            run_id: run_id.to_string(),
            stage: Stage::None,
            created_at: Utc::now().to_rfc3339(),
        };
        model.versions.push(version.clone());
        self.save(&doc)?;
        Ok(version)
    }

    /// Moves a version to `stage`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model or version does not exist.
    pub fn transition_stage(
        &self,
        name: &str,
        version: u32,
        stage: Stage,
    ) -> Result<ModelVersion, RegistryError> {
        let mut doc = self.load()?;
        let model = doc
            .models
            .get_mut(name)
            .ok_or_else(|| RegistryError::ModelNotFound(name.to_string()))?;
        let entry = model
            .versions
            .iter_mut()
            .find(|v| v.version == version)
            .ok_or_else(|| RegistryError::VersionNotFound {
                name: name.to_string(),
                version,
            })?;
        entry.stage = stage;
        let updated = entry.clone();
        self.save(&doc)?;
        Ok(updated)
    }

    /// Returns the newest version of a model, if it has any.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ModelNotFound`] if the name is not registered.
    pub fn latest_version(&self, name: &str) -> Result<Option<ModelVersion>, RegistryError> {
        let doc = self.load()?;
        let model = doc
            .models
            .get(name)
            .ok_or_else(|| RegistryError::ModelNotFound(name.to_string()))?;
        Ok(model.versions.last().cloned())
    }
}
