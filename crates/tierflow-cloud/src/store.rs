//! Parameter store interface and a file-backed implementation
//!
//! The real parameter store is an external collaborator; this module defines
//! the contract exports are published through, plus a local store that keeps
//! parameters in `.tierflow/parameters.json`.

use crate::error::{CloudError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const STORE_DIR: &str = ".tierflow";
const STORE_FILE: &str = "parameters.json";

/// External key/value store that receives exports
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Returns the store name (e.g., "file", "ssm")
    fn name(&self) -> &str;

    /// Insert or overwrite a parameter
    async fn put(&self, path: &str, value: &str) -> Result<()>;

    /// Read a parameter by exact path
    async fn get(&self, path: &str) -> Result<Option<String>>;

    /// All parameters currently held
    async fn list(&self) -> Result<BTreeMap<String, String>>;
}

/// A single stored parameter
///
/// `version` starts at 1 and only moves when the value changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredParameter {
    pub value: String,
    pub version: u64,
    pub last_modified: DateTime<Utc>,
}

/// Parameter store persisted as a JSON map of path to parameter
pub struct FileParameterStore {
    path: PathBuf,
}

impl FileParameterStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            path: root.as_ref().join(STORE_DIR).join(STORE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every parameter with its metadata
    pub async fn parameters(&self) -> Result<BTreeMap<String, StoredParameter>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Replace the file in one step so a failed write never leaves it truncated
    async fn write(&self, parameters: &BTreeMap<String, StoredParameter>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).await?;
        }
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_string_pretty(parameters)?).await?;
        fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

fn validate_path(path: &str) -> Result<()> {
    if !path.starts_with('/') || path.ends_with('/') || path.contains("//") {
        return Err(CloudError::StoreError(format!(
            "Invalid parameter path: {:?}",
            path
        )));
    }
    Ok(())
}

#[async_trait]
impl ParameterStore for FileParameterStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn put(&self, path: &str, value: &str) -> Result<()> {
        validate_path(path)?;

        let mut parameters = self.parameters().await?;
        let version = match parameters.get(path) {
            Some(current) if current.value == value => return Ok(()),
            Some(current) => current.version + 1,
            None => 1,
        };
        parameters.insert(
            path.to_string(),
            StoredParameter {
                value: value.to_string(),
                version,
                last_modified: Utc::now(),
            },
        );
        self.write(&parameters).await?;

        tracing::debug!("Stored {} (version {})", path, version);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<String>> {
        Ok(self.parameters().await?.remove(path).map(|p| p.value))
    }

    async fn list(&self) -> Result<BTreeMap<String, String>> {
        Ok(self
            .parameters()
            .await?
            .into_iter()
            .map(|(k, p)| (k, p.value))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_get() {
        let temp_dir = tempdir().unwrap();
        let store = FileParameterStore::new(temp_dir.path());

        store
            .put("/acme-app-repository/uri", "repo-uri")
            .await
            .unwrap();

        assert_eq!(
            store.get("/acme-app-repository/uri").await.unwrap(),
            Some("repo-uri".to_string())
        );
        assert!(store.get("/missing").await.unwrap().is_none());
        assert_eq!(store.path(), temp_dir.path().join(".tierflow/parameters.json"));
        assert!(!temp_dir.path().join(".tierflow/parameters.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_version_moves_only_on_change() {
        let temp_dir = tempdir().unwrap();
        let store = FileParameterStore::new(temp_dir.path());

        store.put("/acme-vpc/id", "a").await.unwrap();
        store.put("/acme-vpc/id", "a").await.unwrap();
        assert_eq!(store.parameters().await.unwrap()["/acme-vpc/id"].version, 1);

        store.put("/acme-vpc/id", "b").await.unwrap();
        let parameters = store.parameters().await.unwrap();
        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters["/acme-vpc/id"].value, "b");
        assert_eq!(parameters["/acme-vpc/id"].version, 2);
    }

    #[tokio::test]
    async fn test_rejects_malformed_paths() {
        let temp_dir = tempdir().unwrap();
        let store = FileParameterStore::new(temp_dir.path());

        for path in ["acme-vpc/id", "/acme-vpc/", "/acme-vpc//id"] {
            let result = store.put(path, "v").await;
            assert!(
                matches!(result, Err(CloudError::StoreError(_))),
                "{} should be rejected",
                path
            );
        }
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let store = FileParameterStore::new(temp_dir.path());
        std::fs::create_dir_all(temp_dir.path().join(".tierflow")).unwrap();
        std::fs::write(store.path(), "not json").unwrap();

        assert!(matches!(store.list().await, Err(CloudError::Json(_))));
    }

    #[tokio::test]
    async fn test_empty_store() {
        let temp_dir = tempdir().unwrap();
        let store = FileParameterStore::new(temp_dir.path());
        assert!(store.list().await.unwrap().is_empty());
    }
}
