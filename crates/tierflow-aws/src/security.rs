//! Security groups and the edge → compute → data ingress chain
//!
//! Group-sourced rules name their source through a [`Deferred`] cell, so the
//! rule table can be written before any group exists. Rules are realized
//! after every group has been declared; declaration order of the groups
//! themselves does not matter.

use crate::error::Result;
use crate::naming::{StackContext, name_tag};
use crate::network::Vpc;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;
use tierflow_cloud::{
    Accessor, CloudError, Deferred, RefMap, Resource, ResourceGraph, ResourceRef, to_logical_id,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupRole {
    /// Load balancer
    Edge,
    /// Container service
    Compute,
    /// Database
    Data,
}

impl GroupRole {
    pub const ALL: [GroupRole; 3] = [GroupRole::Edge, GroupRole::Compute, GroupRole::Data];

    /// `alb-sg`, `ecs-sg`, `rds-sg`
    pub fn logical_name(&self) -> &'static str {
        match self {
            GroupRole::Edge => "alb-sg",
            GroupRole::Compute => "ecs-sg",
            GroupRole::Data => "rds-sg",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            GroupRole::Edge => "alb",
            GroupRole::Compute => "ecs",
            GroupRole::Data => "rds",
        }
    }
}

impl fmt::Display for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.logical_name())
    }
}

/// Service ports opened along the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServicePorts {
    pub compute: u16,
    pub data: u16,
}

impl Default for ServicePorts {
    fn default() -> Self {
        Self {
            compute: 3000,
            data: 3307,
        }
    }
}

/// Where an ingress rule accepts traffic from
pub enum IngressSource {
    Cidr(String),
    Group(Accessor),
}

impl fmt::Debug for IngressSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngressSource::Cidr(cidr) => f.debug_tuple("Cidr").field(cidr).finish(),
            IngressSource::Group(_) => f.write_str("Group(<deferred>)"),
        }
    }
}

#[derive(Debug)]
pub struct IngressRule {
    pub name: &'static str,
    pub group: GroupRole,
    pub protocol: &'static str,
    pub from_port: u16,
    pub to_port: u16,
    pub source: IngressSource,
}

impl IngressRule {
    fn tcp(name: &'static str, group: GroupRole, port: u16, source: IngressSource) -> Self {
        Self {
            name,
            group,
            protocol: "tcp",
            from_port: port,
            to_port: port,
            source,
        }
    }
}

/// Ingress rule after realization, with its source resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredIngress {
    pub logical_id: String,
    pub group: GroupRole,
    pub port: u16,
    /// CIDR or group ID token
    pub source: String,
}

fn cell(cells: &BTreeMap<GroupRole, Deferred>, role: GroupRole) -> Result<&Deferred> {
    Ok(cells
        .get(&role)
        .ok_or_else(|| CloudError::Unassigned(role.to_string()))?)
}

/// The standard rule table
pub fn ingress_rules(
    cells: &BTreeMap<GroupRole, Deferred>,
    ports: ServicePorts,
) -> Result<Vec<IngressRule>> {
    let anywhere = || IngressSource::Cidr("0.0.0.0/0".to_string());

    Ok(vec![
        IngressRule::tcp("http", GroupRole::Edge, 80, anywhere()),
        IngressRule::tcp("https", GroupRole::Edge, 443, anywhere()),
        IngressRule::tcp(
            "api",
            GroupRole::Compute,
            ports.compute,
            IngressSource::Group(cell(cells, GroupRole::Edge)?.attr_accessor("GroupId")),
        ),
        IngressRule::tcp(
            "mysql",
            GroupRole::Data,
            ports.data,
            IngressSource::Group(cell(cells, GroupRole::Compute)?.attr_accessor("GroupId")),
        ),
    ])
}

#[derive(Debug, Clone)]
pub struct SecurityGroups {
    groups: RefMap<GroupRole>,
    ingress: Vec<DeclaredIngress>,
}

impl SecurityGroups {
    pub fn build(ctx: &StackContext, graph: &mut ResourceGraph, vpc: &Vpc) -> Result<Self> {
        Self::build_with(ctx, graph, vpc, &GroupRole::ALL, ServicePorts::default())
    }

    /// Declare the groups in `order`, then realize the rule table
    pub fn build_with(
        ctx: &StackContext,
        graph: &mut ResourceGraph,
        vpc: &Vpc,
        order: &[GroupRole],
        ports: ServicePorts,
    ) -> Result<Self> {
        let cells: BTreeMap<GroupRole, Deferred> = GroupRole::ALL
            .iter()
            .map(|role| (*role, Deferred::new(role.logical_name())))
            .collect();
        let rules = ingress_rules(&cells, ports)?;

        let mut groups = RefMap::new();
        for role in order {
            let name = ctx.resource_name(role.logical_name());
            let group = graph.declare(Resource::new(
                to_logical_id(role.logical_name()),
                "AWS::EC2::SecurityGroup",
                json!({
                    "GroupDescription": role.description(),
                    "GroupName": name,
                    "VpcId": vpc.vpc.id(),
                    "Tags": name_tag(&name),
                }),
            ))?;

            graph.exports_mut().export_from(
                &group,
                ctx.export_path(role.logical_name(), "sg-id"),
                group.attr("GroupId"),
            );

            if let Some(cell) = cells.get(role) {
                cell.assign(group.clone())?;
            }
            groups.insert(*role, group)?;
        }

        let mut ingress = Vec::new();
        for rule in rules {
            let target = groups.get(&rule.group)?;
            let logical_id = format!(
                "{}Ingress{}",
                target.logical_id(),
                to_logical_id(rule.name)
            );

            let mut props = Map::new();
            props.insert("GroupId".to_string(), json!(target.attr("GroupId")));
            props.insert("IpProtocol".to_string(), json!(rule.protocol));
            props.insert("FromPort".to_string(), json!(rule.from_port));
            props.insert("ToPort".to_string(), json!(rule.to_port));
            let source = match &rule.source {
                IngressSource::Cidr(cidr) => {
                    props.insert("CidrIp".to_string(), json!(cidr));
                    cidr.clone()
                }
                IngressSource::Group(accessor) => {
                    let id = accessor()?;
                    props.insert("SourceSecurityGroupId".to_string(), json!(id));
                    id
                }
            };

            graph.declare(Resource::new(
                &logical_id,
                "AWS::EC2::SecurityGroupIngress",
                Value::Object(props),
            ))?;
            ingress.push(DeclaredIngress {
                logical_id,
                group: rule.group,
                port: rule.from_port,
                source,
            });
        }

        Ok(Self { groups, ingress })
    }

    pub fn group(&self, role: GroupRole) -> Result<&ResourceRef> {
        Ok(self.groups.get(&role)?)
    }

    pub fn ingress(&self) -> &[DeclaredIngress] {
        &self.ingress
    }

    pub fn ingress_of(&self, role: GroupRole) -> Vec<&DeclaredIngress> {
        self.ingress.iter().filter(|i| i.group == role).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::test_support::acme;

    fn build(order: &[GroupRole]) -> (ResourceGraph, SecurityGroups) {
        let ctx = acme();
        let mut graph = ResourceGraph::new();
        let vpc = Vpc::build(&ctx, &mut graph).unwrap();
        let groups =
            SecurityGroups::build_with(&ctx, &mut graph, &vpc, order, ServicePorts::default())
                .unwrap();
        (graph, groups)
    }

    fn assert_chain(groups: &SecurityGroups) {
        let edge = groups.group(GroupRole::Edge).unwrap().attr("GroupId");
        let compute = groups.group(GroupRole::Compute).unwrap().attr("GroupId");

        let compute_rules = groups.ingress_of(GroupRole::Compute);
        assert_eq!(compute_rules.len(), 1);
        assert_eq!(compute_rules[0].source, edge);
        assert_eq!(compute_rules[0].port, 3000);

        let data_rules = groups.ingress_of(GroupRole::Data);
        assert_eq!(data_rules.len(), 1);
        assert_eq!(data_rules[0].source, compute);
        assert_eq!(data_rules[0].port, 3307);
    }

    #[test]
    fn test_chain_in_natural_order() {
        let (_, groups) = build(&GroupRole::ALL);
        assert_chain(&groups);
    }

    #[test]
    fn test_chain_in_reverse_order() {
        let (_, groups) = build(&[GroupRole::Data, GroupRole::Compute, GroupRole::Edge]);
        assert_chain(&groups);
    }

    #[test]
    fn test_edge_open_to_web() {
        let (graph, groups) = build(&GroupRole::ALL);
        let ports: Vec<u16> = groups
            .ingress_of(GroupRole::Edge)
            .iter()
            .map(|i| i.port)
            .collect();
        assert_eq!(ports, vec![80, 443]);

        let https = graph.get("AlbSgIngressHttps").unwrap();
        assert_eq!(https.properties["CidrIp"], "0.0.0.0/0");
        assert_eq!(https.properties["GroupId"], "${AlbSg.GroupId}");
    }

    #[test]
    fn test_missing_group_leaves_rule_unresolved() {
        let ctx = acme();
        let mut graph = ResourceGraph::new();
        let vpc = Vpc::build(&ctx, &mut graph).unwrap();
        let result = SecurityGroups::build_with(
            &ctx,
            &mut graph,
            &vpc,
            &[GroupRole::Compute, GroupRole::Data],
            ServicePorts::default(),
        );
        assert!(result.unwrap_err().is_dependency_order());
    }

    #[test]
    fn test_group_id_export() {
        let (graph, _) = build(&GroupRole::ALL);
        let export = graph.exports().get("/acme-alb-sg/sg-id").unwrap();
        assert_eq!(export.value, "${AlbSg.GroupId}");
        assert_eq!(export.source.as_deref(), Some("AlbSg"));
    }
}
