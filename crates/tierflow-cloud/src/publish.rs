//! Publishing exports to a parameter store

use crate::export::ExportRegistry;
use crate::store::ParameterStore;
use serde::{Deserialize, Serialize};

/// Result of publishing a set of exports
///
/// There is no transaction across exports: a failed write leaves earlier
/// writes in place, and the next run simply publishes everything again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResult {
    pub succeeded: Vec<PublishOutcome>,
    pub failed: Vec<PublishOutcome>,
    pub duration_ms: u64,
}

impl PublishResult {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, path: String, changed: bool) {
        self.succeeded.push(PublishOutcome {
            path,
            changed,
            error: None,
        });
    }

    pub fn add_failure(&mut self, path: String, error: String) {
        self.failed.push(PublishOutcome {
            path,
            changed: false,
            error: Some(error),
        });
    }

    pub fn changed(&self) -> usize {
        self.succeeded.iter().filter(|o| o.changed).count()
    }
}

impl Default for PublishResult {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub path: String,

    /// Whether the stored value differed before this write
    pub changed: bool,

    pub error: Option<String>,
}

/// Upsert every export into `store`, skipping values that are already current
pub async fn publish(registry: &ExportRegistry, store: &dyn ParameterStore) -> PublishResult {
    let mut result = PublishResult::new();
    let start = std::time::Instant::now();

    for export in registry.iter() {
        match store.get(&export.path).await {
            Ok(Some(current)) if current == export.value => {
                result.add_success(export.path.clone(), false);
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                result.add_failure(export.path.clone(), e.to_string());
                continue;
            }
        }

        tracing::info!("Publishing {} to {} store", export.path, store.name());
        match store.put(&export.path, &export.value).await {
            Ok(()) => result.add_success(export.path.clone(), true),
            Err(e) => result.add_failure(export.path.clone(), e.to_string()),
        }
    }

    result.duration_ms = start.elapsed().as_millis() as u64;
    result
}
