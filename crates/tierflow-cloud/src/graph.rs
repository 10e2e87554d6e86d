//! Declarative resource graph
//!
//! Components declare resources into a single [`ResourceGraph`]. Declaration
//! order is checked: a resource may only reference (or depend on) resources
//! that were declared before it, which turns a forgotten ordering edge into
//! an immediate error instead of a template that fails to deploy.

use crate::dag::Dag;
use crate::error::{CloudError, Result};
use crate::export::ExportRegistry;
use crate::reference::{ResourceRef, to_logical_id};
use crate::resource::Resource;
use serde_json::{Map, Value, json};
use std::collections::{BTreeSet, HashMap};

const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";
const EXPORT_RESOURCE_TYPE: &str = "AWS::SSM::Parameter";

#[derive(Debug, Default)]
pub struct ResourceGraph {
    description: Option<String>,
    resources: Vec<Resource>,
    index: HashMap<String, usize>,
    exports: ExportRegistry,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare a resource and get its reference
    ///
    /// Fails if the logical ID is taken or if any referenced logical ID has
    /// not been declared yet.
    pub fn declare(&mut self, resource: Resource) -> Result<ResourceRef> {
        if self.index.contains_key(&resource.logical_id) {
            return Err(CloudError::DuplicateLogicalId(resource.logical_id));
        }
        if let Some(missing) = resource
            .dependencies()
            .into_iter()
            .find(|dep| !self.index.contains_key(dep))
        {
            return Err(CloudError::DependencyOrder {
                resource: resource.logical_id,
                missing,
            });
        }

        tracing::debug!(
            "Declared {} ({})",
            resource.logical_id,
            resource.resource_type
        );
        let reference = ResourceRef::new(&resource.logical_id, &resource.resource_type);
        self.index
            .insert(resource.logical_id.clone(), self.resources.len());
        self.resources.push(resource);
        Ok(reference)
    }

    pub fn get(&self, logical_id: &str) -> Option<&Resource> {
        self.index.get(logical_id).map(|&i| &self.resources[i])
    }

    pub fn reference(&self, logical_id: &str) -> Option<ResourceRef> {
        self.get(logical_id)
            .map(|r| ResourceRef::new(&r.logical_id, &r.resource_type))
    }

    pub fn contains(&self, logical_id: &str) -> bool {
        self.index.contains_key(logical_id)
    }

    /// Resources in declaration order
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn by_type(&self, resource_type: &str) -> Vec<&Resource> {
        self.resources
            .iter()
            .filter(|r| r.resource_type == resource_type)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn dependencies_of(&self, logical_id: &str) -> Result<BTreeSet<String>> {
        self.get(logical_id)
            .map(Resource::dependencies)
            .ok_or_else(|| CloudError::NodeNotFound(logical_id.to_string()))
    }

    pub fn exports(&self) -> &ExportRegistry {
        &self.exports
    }

    pub fn exports_mut(&mut self) -> &mut ExportRegistry {
        &mut self.exports
    }

    /// Order in which the provisioning engine may realize resources
    pub fn deployment_order(&self) -> Result<Vec<String>> {
        let mut dag = Dag::new();
        for resource in &self.resources {
            dag.add_node(resource.logical_id.clone());
        }
        for resource in &self.resources {
            for dep in resource.dependencies() {
                dag.add_dependency(&dep, &resource.logical_id)?;
            }
        }
        dag.toposort()
    }

    /// Render the full declarative description, exports included
    pub fn to_template(&self) -> Result<Value> {
        let mut resources = Map::new();
        for resource in &self.resources {
            resources.insert(resource.logical_id.clone(), resource.to_template());
        }

        for export in self.exports.iter() {
            let logical_id = format!("Param{}", to_logical_id(&export.path));
            if resources.contains_key(&logical_id) {
                return Err(CloudError::DuplicateLogicalId(logical_id));
            }

            let mut parameter = Resource::new(
                &logical_id,
                EXPORT_RESOURCE_TYPE,
                json!({
                    "Name": export.path,
                    "Type": "String",
                    "Value": export.value,
                }),
            );
            if let Some(source) = &export.source {
                let source_ref = self.reference(source).ok_or_else(|| {
                    CloudError::DependencyOrder {
                        resource: logical_id.clone(),
                        missing: source.clone(),
                    }
                })?;
                parameter = parameter.depends_on(&source_ref);
            }
            if let Some(missing) = parameter
                .references()
                .into_iter()
                .find(|dep| !self.contains(dep))
            {
                return Err(CloudError::DependencyOrder {
                    resource: logical_id,
                    missing,
                });
            }
            resources.insert(logical_id, parameter.to_template());
        }

        let mut template = Map::new();
        template.insert(
            "AWSTemplateFormatVersion".to_string(),
            json!(TEMPLATE_FORMAT_VERSION),
        );
        if let Some(description) = &self.description {
            template.insert("Description".to_string(), json!(description));
        }
        template.insert("Resources".to_string(), Value::Object(resources));
        Ok(Value::Object(template))
    }
}
