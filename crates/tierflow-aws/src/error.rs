//! AWS topology error types

use thiserror::Error;
use tierflow_cloud::CloudError;
use tierflow_config::ConfigError;

#[derive(Error, Debug)]
pub enum AwsError {
    /// Environment context is unresolved or incomplete
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cloud(#[from] CloudError),

    /// A component ran before a component it depends on
    #[error("Component {requester} requires {missing}, which has not been built")]
    MissingComponent {
        requester: &'static str,
        missing: &'static str,
    },

    #[error("Invalid IPv6 block: {0}")]
    InvalidIpv6Block(String),

    #[error("Invalid route table {table}: {reason}")]
    InvalidRoute { table: String, reason: String },
}

impl AwsError {
    /// Whether this error means something was declared out of order
    pub fn is_dependency_order(&self) -> bool {
        matches!(
            self,
            AwsError::MissingComponent { .. }
                | AwsError::Cloud(CloudError::DependencyOrder { .. })
                | AwsError::Cloud(CloudError::CycleDetected(_))
                | AwsError::Cloud(CloudError::Unassigned(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, AwsError>;
