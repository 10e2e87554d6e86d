//! Resource graph error types

use thiserror::Error;

/// Resource graph errors
#[derive(Error, Debug)]
pub enum CloudError {
    /// A resource referenced something that has not been declared yet.
    #[error("Dependency order violation: {resource} references {missing} before it exists")]
    DependencyOrder { resource: String, missing: String },

    #[error("Resource already declared: {0}")]
    DuplicateLogicalId(String),

    #[error("Dependency cycle detected at: {0}")]
    CycleDetected(String),

    #[error("Deferred reference already assigned: {0}")]
    AlreadyAssigned(String),

    #[error("Deferred reference not yet assigned: {0}")]
    Unassigned(String),

    #[error("Graph node not found: {0}")]
    NodeNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("External provisioning failed: {0}")]
    ExternalProvisioning(String),

    #[error("Parameter store error: {0}")]
    StoreError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
