//! IAM roles for the container tasks

use crate::error::Result;
use crate::naming::{StackContext, name_tag};
use serde_json::{Value, json};
use std::fmt;
use tierflow_cloud::{RefMap, Resource, ResourceGraph, ResourceRef, build_table, to_logical_id};

const POLICY_VERSION: &str = "2012-10-17";
const TASK_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoleKind {
    /// Used by the agent to pull images and ship logs
    TaskExecution,
    /// Assumed by the application itself
    Task,
}

impl RoleKind {
    pub const ALL: [RoleKind; 2] = [RoleKind::TaskExecution, RoleKind::Task];

    pub fn logical_name(&self) -> &'static str {
        match self {
            RoleKind::TaskExecution => "task-execution-role",
            RoleKind::Task => "task-role",
        }
    }

    fn managed_policies(&self) -> &'static [&'static str] {
        match self {
            RoleKind::TaskExecution => &["service-role/AmazonECSTaskExecutionRolePolicy"],
            RoleKind::Task => &[],
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.logical_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
        }
    }
}

/// A single IAM policy statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyStatement {
    pub effect: Effect,
    pub actions: Vec<String>,
    pub resources: Vec<String>,
}

impl PolicyStatement {
    pub fn allow<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            effect: Effect::Allow,
            actions: actions.into_iter().map(Into::into).collect(),
            resources: resources.into_iter().map(Into::into).collect(),
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "Effect": self.effect.as_str(),
            "Action": self.actions,
            "Resource": self.resources,
        })
    }
}

/// Execution role and task role
#[derive(Debug, Clone)]
pub struct Roles {
    roles: RefMap<RoleKind>,
    policies: Vec<(RoleKind, ResourceRef)>,
}

impl Roles {
    pub fn build(ctx: &StackContext, graph: &mut ResourceGraph) -> Result<Self> {
        let roles = build_table(&RoleKind::ALL, |kind| {
            let name = ctx.resource_name(kind.logical_name());
            let managed: Vec<String> = kind
                .managed_policies()
                .iter()
                .map(|p| format!("arn:${{AWS::Partition}}:iam::aws:policy/{}", p))
                .collect();

            let role = graph.declare(Resource::new(
                to_logical_id(kind.logical_name()),
                "AWS::IAM::Role",
                json!({
                    "RoleName": name,
                    "AssumeRolePolicyDocument": {
                        "Version": POLICY_VERSION,
                        "Statement": [{
                            "Effect": "Allow",
                            "Principal": { "Service": TASK_PRINCIPAL },
                            "Action": "sts:AssumeRole",
                        }],
                    },
                    "ManagedPolicyArns": managed,
                    "Tags": name_tag(&name),
                }),
            ))?;

            graph.exports_mut().export_from(
                &role,
                ctx.export_path(kind.logical_name(), "arn"),
                role.attr("Arn"),
            );
            Ok((*kind, role))
        })?;

        Ok(Self {
            roles,
            policies: Vec::new(),
        })
    }

    pub fn role(&self, kind: RoleKind) -> Result<&ResourceRef> {
        Ok(self.roles.get(&kind)?)
    }

    /// Declare an inline policy bound to `kind`
    ///
    /// `name` is a logical name (`app-service-logs-policy`). The statement
    /// applies to resources declared after the returned reference.
    pub fn attach_policy(
        &mut self,
        ctx: &StackContext,
        graph: &mut ResourceGraph,
        kind: RoleKind,
        name: &str,
        statement: PolicyStatement,
    ) -> Result<ResourceRef> {
        let role = self.role(kind)?.clone();
        let policy = graph.declare(Resource::new(
            to_logical_id(name),
            "AWS::IAM::Policy",
            json!({
                "PolicyName": ctx.resource_name(name),
                "PolicyDocument": {
                    "Version": POLICY_VERSION,
                    "Statement": [statement.to_value()],
                },
                "Roles": [role.id()],
            }),
        ))?;
        tracing::debug!("Attached {} to {}", policy.logical_id(), kind);
        self.policies.push((kind, policy.clone()));
        Ok(policy)
    }

    /// Inline policies attached to `kind`, attachment order
    pub fn policies(&self, kind: RoleKind) -> Vec<&ResourceRef> {
        self.policies
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, p)| p)
            .collect()
    }
}
