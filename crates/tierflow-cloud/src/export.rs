//! Named exports
//!
//! Exports publish a resource's resulting identifier under a deterministic
//! `/<resource-name>/<attribute>` path so that consumers outside this run can
//! read it by exact match.

use crate::reference::ResourceRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Build the export path for a resource attribute
pub fn export_path(resource_name: &str, attribute: &str) -> String {
    format!("/{}/{}", resource_name, attribute)
}

/// A single exported value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedExport {
    pub path: String,

    /// ARN, ID or URI; may contain reference tokens until realized
    pub value: String,

    /// Logical ID of the resource the value describes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Exports declared during one run, keyed by path
#[derive(Debug, Clone, Default)]
pub struct ExportRegistry {
    exports: BTreeMap<String, NamedExport>,
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert an export; the last write for a path wins
    pub fn export(&mut self, path: impl Into<String>, value: impl Into<String>) {
        self.upsert(NamedExport {
            path: path.into(),
            value: value.into(),
            source: None,
        });
    }

    /// Upsert an export that must be written after `source` exists
    pub fn export_from(
        &mut self,
        source: &ResourceRef,
        path: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.upsert(NamedExport {
            path: path.into(),
            value: value.into(),
            source: Some(source.logical_id().to_string()),
        });
    }

    fn upsert(&mut self, export: NamedExport) {
        if let Some(previous) = self.exports.get(&export.path) {
            if previous.value != export.value {
                tracing::debug!(
                    "Overwriting export {}: {} -> {}",
                    export.path,
                    previous.value,
                    export.value
                );
            }
        }
        self.exports.insert(export.path.clone(), export);
    }

    pub fn get(&self, path: &str) -> Option<&NamedExport> {
        self.exports.get(path)
    }

    pub fn value(&self, path: &str) -> Option<&str> {
        self.exports.get(path).map(|e| e.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedExport> {
        self.exports.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.exports.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.exports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }
}
