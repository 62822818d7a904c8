//! Engine settings loaded from a TOML file.
//!
//! Carries the defaults a deployment hands to `ProcessorRegistry` plus
//! the database location. A missing file means defaults; a present file
//! with bad values is an error, not a silent fallback.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use presage_core::ProcessorConfig;

use crate::error::{Result, StoreError};

fn default_database_path() -> PathBuf {
    PathBuf::from("presage.db")
}

fn default_max_predictions() -> usize {
    ProcessorConfig::default().max_predictions
}

fn default_recall_threshold() -> f64 {
    ProcessorConfig::default().recall_threshold
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_max_predictions")]
    pub max_predictions: usize,
    #[serde(default = "default_recall_threshold")]
    pub recall_threshold: f64,
    #[serde(default)]
    pub max_working_memory: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            max_predictions: default_max_predictions(),
            recall_threshold: default_recall_threshold(),
            max_working_memory: None,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no settings file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(StoreError::InvalidData(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)
            .map_err(|e| StoreError::InvalidData(format!("invalid settings: {e}")))?;
        settings.processor_config().validate().map_err(|e| {
            StoreError::InvalidData(format!("invalid settings: {e}"))
        })?;
        Ok(settings)
    }

    /// The per-context configuration these settings describe.
    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            max_predictions: self.max_predictions,
            recall_threshold: self.recall_threshold,
            max_working_memory: self.max_working_memory,
        }
    }
}
