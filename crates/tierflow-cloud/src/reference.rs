//! Resource references
//!
//! A [`ResourceRef`] is the handle a component gets back when it declares a
//! resource. Dependents embed it in their own properties before the provider
//! has realized anything; the provisioning engine resolves it later.

use crate::error::{CloudError, Result};
use serde::Serialize;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Handle to a declared (not necessarily realized) cloud object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResourceRef {
    logical_id: String,
    resource_type: String,
}

impl ResourceRef {
    pub(crate) fn new(logical_id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            logical_id: logical_id.into(),
            resource_type: resource_type.into(),
        }
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Token for the provider's primary identifier, usable inside strings
    ///
    /// Rendered as `Fn::Sub`, so `${VpcMain}` resolves like `Ref: VpcMain`.
    pub fn id(&self) -> String {
        format!("${{{}}}", self.logical_id)
    }

    /// Token for a provider-returned attribute (`Fn::GetAtt`)
    pub fn attr(&self, name: &str) -> String {
        format!("${{{}.{}}}", self.logical_id, name)
    }

    /// `{"Ref": ...}` intrinsic, for non-string positions
    pub fn ref_value(&self) -> serde_json::Value {
        serde_json::json!({ "Ref": self.logical_id })
    }

    /// `{"Fn::GetAtt": [...]}` intrinsic, for list-typed attributes
    pub fn get_att(&self, name: &str) -> serde_json::Value {
        serde_json::json!({ "Fn::GetAtt": [self.logical_id, name] })
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.logical_id, self.resource_type)
    }
}

/// Zero-argument accessor yielding a resolved identifier token
pub type Accessor = Box<dyn Fn() -> Result<String>>;

/// Single-assignment reference cell
///
/// Lets a rule table name a resource that does not exist yet. The cell is
/// filled once, when the owning resource is declared, and read when the rule
/// is realized.
#[derive(Debug, Clone)]
pub struct Deferred {
    name: Rc<str>,
    cell: Rc<OnceCell<ResourceRef>>,
}

impl Deferred {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: Rc::from(name.as_ref()),
            cell: Rc::new(OnceCell::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn assign(&self, reference: ResourceRef) -> Result<()> {
        self.cell
            .set(reference)
            .map_err(|_| CloudError::AlreadyAssigned(self.name.to_string()))
    }

    pub fn is_assigned(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn get(&self) -> Result<&ResourceRef> {
        self.cell
            .get()
            .ok_or_else(|| CloudError::Unassigned(self.name.to_string()))
    }

    /// Accessor for the referenced resource's identifier token
    pub fn id_accessor(&self) -> Accessor {
        let this = self.clone();
        Box::new(move || this.get().map(ResourceRef::id))
    }

    /// Accessor for one of the referenced resource's attributes
    pub fn attr_accessor(&self, attr: &str) -> Accessor {
        let this = self.clone();
        let attr = attr.to_string();
        Box::new(move || this.get().map(|r| r.attr(&attr)))
    }
}

/// Result of building a descriptor table: descriptor key to reference
#[derive(Debug, Clone)]
pub struct RefMap<K: Ord> {
    entries: BTreeMap<K, ResourceRef>,
}

impl<K: Ord + fmt::Debug> RefMap<K> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, key: K, reference: ResourceRef) -> Result<()> {
        if self.entries.contains_key(&key) {
            return Err(CloudError::DuplicateLogicalId(format!("{:?}", key)));
        }
        self.entries.insert(key, reference);
        Ok(())
    }

    pub fn get(&self, key: &K) -> Result<&ResourceRef> {
        self.entries
            .get(key)
            .ok_or_else(|| CloudError::Unassigned(format!("{:?}", key)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &ResourceRef)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Ord + fmt::Debug> Default for RefMap<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Build an ordered descriptor table
///
/// Descriptors are built in slice order; the returned map replaces
/// per-descriptor assignment callbacks.
pub fn build_table<K, D, F>(descriptors: &[D], mut build: F) -> Result<RefMap<K>>
where
    K: Ord + fmt::Debug,
    F: FnMut(&D) -> Result<(K, ResourceRef)>,
{
    let mut map = RefMap::new();
    for descriptor in descriptors {
        let (key, reference) = build(descriptor)?;
        map.insert(key, reference)?;
    }
    Ok(map)
}

/// Convert a hyphenated resource name into a template-safe logical ID
///
/// `subnet-public-1a` becomes `SubnetPublic1a`.
pub fn to_logical_id(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_tokens() {
        let r = ResourceRef::new("VpcMain", "AWS::EC2::VPC");
        assert_eq!(r.id(), "${VpcMain}");
        assert_eq!(r.attr("CidrBlock"), "${VpcMain.CidrBlock}");
        assert_eq!(r.ref_value(), serde_json::json!({"Ref": "VpcMain"}));
    }

    #[test]
    fn test_deferred_single_assignment() {
        let cell = Deferred::new("edge");
        let accessor = cell.id_accessor();
        assert!(accessor().is_err());

        cell.assign(ResourceRef::new("EdgeSg", "AWS::EC2::SecurityGroup"))
            .unwrap();
        assert_eq!(accessor().unwrap(), "${EdgeSg}");

        let second = cell.assign(ResourceRef::new("Other", "AWS::EC2::SecurityGroup"));
        assert!(matches!(second, Err(CloudError::AlreadyAssigned(_))));
        assert_eq!(cell.get().unwrap().logical_id(), "EdgeSg");
    }

    #[test]
    fn test_build_table_rejects_duplicate_keys() {
        let descriptors = ["a", "b", "a"];
        let result = build_table(&descriptors, |d| {
            Ok((d.to_string(), ResourceRef::new(d.to_uppercase(), "T")))
        });
        assert!(matches!(result, Err(CloudError::DuplicateLogicalId(_))));
    }

    #[test]
    fn test_to_logical_id() {
        assert_eq!(to_logical_id("subnet-public-1a"), "SubnetPublic1a");
        assert_eq!(to_logical_id("/acme-alb-sg/sg-id"), "AcmeAlbSgSgId");
        assert_eq!(to_logical_id("vpc"), "Vpc");
    }
}
