//! JSON export/import of one namespace's models.
//!
//! The wire format is a versioned envelope around the models' natural
//! serde representation, for backup and transfer between stores.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use presage_core::Model;

use crate::error::{Result, StoreError};
use crate::store::SqliteBackend;

pub const WIRE_VERSION: &str = "1";

#[derive(Serialize, Deserialize, Debug)]
pub struct WireExport {
    pub version: String,
    pub namespace: String,
    pub models: Vec<Model>,
}

impl SqliteBackend {
    /// Export every model in the namespace to a JSON file.
    pub fn export_json_file(&self, namespace: &str, path: &Path) -> Result<()> {
        let json = self.export_json_string(namespace)?;
        fs::write(path, json).map_err(|e| {
            StoreError::InvalidData(format!("failed to write {}: {e}", path.display()))
        })
    }

    pub fn export_json_string(&self, namespace: &str) -> Result<String> {
        let mut models = Vec::new();
        for id in self.model_ids(namespace)? {
            match self.get_model(namespace, &id)? {
                Some(model) => models.push(model),
                None => {
                    return Err(StoreError::InvalidData(format!(
                        "model {id} vanished during export"
                    )));
                }
            }
        }

        let export = WireExport {
            version: WIRE_VERSION.to_string(),
            namespace: namespace.to_string(),
            models,
        };
        serde_json::to_string_pretty(&export)
            .map_err(|e| StoreError::InvalidData(format!("JSON export failed: {e}")))
    }

    /// Import a JSON export into the given namespace, replacing any model
    /// whose id already exists there. The file's own namespace field is
    /// informational only.
    pub fn import_json_file(&self, namespace: &str, path: &Path) -> Result<usize> {
        let json = fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidData(format!("failed to read {}: {e}", path.display()))
        })?;
        self.import_json_str(namespace, &json)
    }

    pub fn import_json_str(&self, namespace: &str, json: &str) -> Result<usize> {
        let export: WireExport = serde_json::from_str(json)
            .map_err(|e| StoreError::InvalidData(format!("invalid JSON: {e}")))?;
        if export.version != WIRE_VERSION {
            return Err(StoreError::InvalidData(format!(
                "unsupported wire version: {}",
                export.version
            )));
        }

        for model in &export.models {
            self.put_model(namespace, model)?;
        }

        tracing::info!(
            count = export.models.len(),
            namespace,
            "imported models from JSON"
        );
        Ok(export.models.len())
    }
}
