//! Declared resources and intrinsic rendering

use crate::reference::ResourceRef;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;

/// What happens to the cloud object when its declaration goes away
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Delete with the owning run (provider default)
    #[default]
    Destroy,
    /// Keep on delete and on replacement
    Retain,
    /// Keep on update or delete, but clean up a failed create
    RetainOnUpdateOrDelete,
}

impl RemovalPolicy {
    fn deletion_policy(&self) -> Option<&'static str> {
        match self {
            RemovalPolicy::Destroy => None,
            RemovalPolicy::Retain => Some("Retain"),
            RemovalPolicy::RetainOnUpdateOrDelete => Some("RetainExceptOnCreate"),
        }
    }

    fn update_replace_policy(&self) -> Option<&'static str> {
        match self {
            RemovalPolicy::Destroy => None,
            RemovalPolicy::Retain | RemovalPolicy::RetainOnUpdateOrDelete => Some("Retain"),
        }
    }
}

/// A single resource in the declarative description
#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    /// Template-unique logical ID
    pub logical_id: String,

    /// Provider resource type (e.g., "AWS::EC2::Subnet")
    pub resource_type: String,

    /// Provider-specific properties, may contain reference tokens
    pub properties: Value,

    /// Explicit ordering edges that are not visible in `properties`
    pub depends_on: Vec<String>,

    pub removal_policy: RemovalPolicy,
}

impl Resource {
    pub fn new(
        logical_id: impl Into<String>,
        resource_type: impl Into<String>,
        properties: Value,
    ) -> Self {
        Self {
            logical_id: logical_id.into(),
            resource_type: resource_type.into(),
            properties,
            depends_on: Vec::new(),
            removal_policy: RemovalPolicy::Destroy,
        }
    }

    /// Add an explicit ordering edge on another resource
    pub fn depends_on(mut self, other: &ResourceRef) -> Self {
        let id = other.logical_id().to_string();
        if !self.depends_on.contains(&id) {
            self.depends_on.push(id);
        }
        self
    }

    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = policy;
        self
    }

    /// Logical IDs referenced from `properties`
    pub fn references(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        collect_references(&self.properties, &mut out);
        out
    }

    /// All logical IDs this resource must come after
    pub fn dependencies(&self) -> BTreeSet<String> {
        let mut deps = self.references();
        deps.extend(self.depends_on.iter().cloned());
        deps
    }

    /// Render the template entry for this resource
    pub fn to_template(&self) -> Value {
        let mut entry = Map::new();
        entry.insert("Type".to_string(), json!(self.resource_type));
        entry.insert("Properties".to_string(), render_intrinsics(&self.properties));
        if !self.depends_on.is_empty() {
            entry.insert("DependsOn".to_string(), json!(self.depends_on));
        }
        if let Some(policy) = self.removal_policy.deletion_policy() {
            entry.insert("DeletionPolicy".to_string(), json!(policy));
        }
        if let Some(policy) = self.removal_policy.update_replace_policy() {
            entry.insert("UpdateReplacePolicy".to_string(), json!(policy));
        }
        Value::Object(entry)
    }
}

/// Collect the logical IDs referenced anywhere in a property value
///
/// Understands `${Id}` / `${Id.Attr}` string tokens, `Ref` and `Fn::GetAtt`.
/// Pseudo parameters (`AWS::Region`) and escaped `${!Literal}` are skipped.
pub fn collect_references(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => {
            for token in string_tokens(s) {
                out.insert(token);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        Value::Object(map) => {
            if let Some(Value::String(id)) = map.get("Ref") {
                if !id.contains("::") {
                    out.insert(id.clone());
                }
            }
            if let Some(Value::Array(args)) = map.get("Fn::GetAtt") {
                if let Some(Value::String(id)) = args.first() {
                    out.insert(id.clone());
                }
            }
            for (key, item) in map {
                if key != "Ref" && key != "Fn::GetAtt" {
                    collect_references(item, out);
                }
            }
        }
        _ => {}
    }
}

fn string_tokens(s: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        let inner = &after[..end];
        if !inner.starts_with('!') && !inner.contains("::") && !inner.is_empty() {
            let id = inner.split('.').next().unwrap_or(inner);
            tokens.push(id.to_string());
        }
        rest = &after[end + 1..];
    }
    tokens
}

/// Whether a string carries any substitution, pseudo parameters included
fn needs_sub(s: &str) -> bool {
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 && !after.starts_with('!') => return true,
            Some(end) => rest = &after[end + 1..],
            None => return false,
        }
    }
    false
}

/// Wrap token-bearing strings in `Fn::Sub`
pub fn render_intrinsics(value: &Value) -> Value {
    match value {
        Value::String(s) if needs_sub(s) => json!({ "Fn::Sub": s }),
        Value::Array(items) => Value::Array(items.iter().map(render_intrinsics).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_intrinsics(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_all_reference_forms() {
        let props = json!({
            "VpcId": "${Vpc}",
            "Arn": "arn:aws:ec2:${AWS::Region}:123:subnet/${SubnetA}",
            "Literal": "${!NotARef}",
            "Cidr": {"Fn::Select": [0, {"Fn::GetAtt": ["Vpc6", "Ipv6CidrBlocks"]}]},
            "Group": {"Ref": "EdgeSg"},
            "Region": {"Ref": "AWS::Region"},
            "Nested": [{"Target": "${Alb.DNSName}"}]
        });
        let mut refs = BTreeSet::new();
        collect_references(&props, &mut refs);

        let expected: BTreeSet<String> = ["Vpc", "SubnetA", "Vpc6", "EdgeSg", "Alb"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(refs, expected);
    }

    #[test]
    fn test_render_wraps_tokens_in_sub() {
        let rendered = render_intrinsics(&json!({
            "VpcId": "${Vpc}",
            "Name": "plain",
            "Arn": "arn:${AWS::Partition}:iam::aws:policy/x",
            "Literal": "${!Literal}"
        }));
        assert_eq!(rendered["VpcId"], json!({"Fn::Sub": "${Vpc}"}));
        assert_eq!(rendered["Name"], json!("plain"));
        assert_eq!(
            rendered["Arn"],
            json!({"Fn::Sub": "arn:${AWS::Partition}:iam::aws:policy/x"})
        );
        assert_eq!(rendered["Literal"], json!("${!Literal}"));
    }

    #[test]
    fn test_retain_policies_in_template() {
        let retained = Resource::new("Repo", "AWS::ECR::Repository", json!({}))
            .with_removal_policy(RemovalPolicy::RetainOnUpdateOrDelete)
            .to_template();
        assert_eq!(retained["DeletionPolicy"], "RetainExceptOnCreate");
        assert_eq!(retained["UpdateReplacePolicy"], "Retain");

        let plain = Resource::new("Vpc", "AWS::EC2::VPC", json!({})).to_template();
        assert!(plain.get("DeletionPolicy").is_none());
    }
}
