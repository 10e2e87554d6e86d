//! Environment-scoped naming

use crate::error::Result;
use serde_json::{Value, json};
use tierflow_cloud::export_path;
use tierflow_config::{ConfigError, EnvironmentContext};

/// Derives resource names from the active system name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    system_name: String,
}

impl Naming {
    pub fn new(system_name: impl Into<String>) -> Self {
        Self {
            system_name: system_name.into(),
        }
    }

    pub fn prefix(&self) -> String {
        format!("{}-", self.system_name)
    }

    /// `{system}-{logical}`
    pub fn resource_name(&self, logical: &str) -> String {
        format!("{}{}", self.prefix(), logical)
    }

    /// `/{system}-{logical}/{attribute}`
    pub fn export_path(&self, logical: &str, attribute: &str) -> String {
        export_path(&self.resource_name(logical), attribute)
    }
}

/// Standard `Name` tag list
pub fn name_tag(name: &str) -> Value {
    json!([{ "Key": "Name", "Value": name }])
}

/// Environment context plus naming, handed to every component
#[derive(Debug, Clone)]
pub struct StackContext {
    env: EnvironmentContext,
    naming: Naming,
}

impl StackContext {
    pub fn new(env: EnvironmentContext) -> Self {
        let naming = Naming::new(&env.system_name);
        Self { env, naming }
    }

    pub fn env(&self) -> &EnvironmentContext {
        &self.env
    }

    pub fn naming(&self) -> &Naming {
        &self.naming
    }

    pub fn region(&self) -> &str {
        &self.env.region
    }

    pub fn account(&self) -> &str {
        &self.env.account
    }

    pub fn resource_name(&self, logical: &str) -> String {
        self.naming.resource_name(logical)
    }

    pub fn export_path(&self, logical: &str, attribute: &str) -> String {
        self.naming.export_path(logical, attribute)
    }

    /// Certificate for TLS termination; absent is a configuration error
    pub fn certificate_arn(&self) -> Result<&str> {
        self.env.certificate_arn.as_deref().ok_or_else(|| {
            ConfigError::MissingField {
                env: self.env.env.clone(),
                field: "certificateArn",
            }
            .into()
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn acme_env() -> EnvironmentContext {
        EnvironmentContext {
            system_name: "acme".to_string(),
            env: "dev".to_string(),
            region: "ap-northeast-1".to_string(),
            account: "111111111111".to_string(),
            certificate_arn: Some(
                "arn:aws:acm:ap-northeast-1:111111111111:certificate/test".to_string(),
            ),
            domain_name: Some("dev.acme.example".to_string()),
        }
    }

    pub fn acme() -> StackContext {
        StackContext::new(acme_env())
    }
}
