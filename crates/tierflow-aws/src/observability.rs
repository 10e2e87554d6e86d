//! CloudWatch log groups

use crate::error::Result;
use crate::identity::{PolicyStatement, RoleKind, Roles};
use crate::naming::StackContext;
use serde_json::json;
use tierflow_cloud::{RefMap, RemovalPolicy, Resource, ResourceGraph, ResourceRef, to_logical_id};

pub const RETENTION_DAYS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogKind {
    /// Cluster execute-command sessions
    EcsExec,
    /// Application container output
    AppService,
}

impl LogKind {
    pub fn logical_name(&self) -> &'static str {
        match self {
            LogKind::EcsExec => "ecs-exec",
            LogKind::AppService => "app-service",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LogGroupDescriptor {
    kind: LogKind,
    retention_days: u32,
    removal_policy: RemovalPolicy,
    /// Role allowed to write; its presence also publishes the group name
    writer: Option<RoleKind>,
}

const LOG_GROUPS: [LogGroupDescriptor; 2] = [
    LogGroupDescriptor {
        kind: LogKind::EcsExec,
        retention_days: RETENTION_DAYS,
        removal_policy: RemovalPolicy::RetainOnUpdateOrDelete,
        writer: None,
    },
    LogGroupDescriptor {
        kind: LogKind::AppService,
        retention_days: RETENTION_DAYS,
        removal_policy: RemovalPolicy::RetainOnUpdateOrDelete,
        writer: Some(RoleKind::TaskExecution),
    },
];

#[derive(Debug, Clone)]
pub struct LogGroups {
    groups: RefMap<LogKind>,
    names: Vec<(LogKind, String)>,
}

impl LogGroups {
    pub fn build(ctx: &StackContext, graph: &mut ResourceGraph, roles: &mut Roles) -> Result<Self> {
        let mut groups = RefMap::new();
        let mut names = Vec::new();

        for descriptor in LOG_GROUPS {
            let base = ctx.resource_name(descriptor.kind.logical_name());
            let group_name = format!("/ecs/{}/logs", base);
            let group = graph.declare(
                Resource::new(
                    format!("{}LogGroup", to_logical_id(descriptor.kind.logical_name())),
                    "AWS::Logs::LogGroup",
                    json!({
                        "LogGroupName": group_name,
                        "RetentionInDays": descriptor.retention_days,
                    }),
                )
                .with_removal_policy(descriptor.removal_policy),
            )?;

            if let Some(writer) = descriptor.writer {
                let logical = format!("{}-logs", descriptor.kind.logical_name());
                roles.attach_policy(
                    ctx,
                    graph,
                    writer,
                    &format!("{}-policy", logical),
                    PolicyStatement::allow(
                        ["logs:CreateLogStream", "logs:PutLogEvents"],
                        [group.attr("Arn")],
                    ),
                )?;
                graph.exports_mut().export_from(
                    &group,
                    ctx.export_path(&logical, "log-group-name"),
                    group_name.clone(),
                );
            }

            names.push((descriptor.kind, group_name));
            groups.insert(descriptor.kind, group)?;
        }

        Ok(Self { groups, names })
    }

    pub fn group(&self, kind: LogKind) -> Result<&ResourceRef> {
        Ok(self.groups.get(&kind)?)
    }

    /// Literal log group name
    pub fn name(&self, kind: LogKind) -> Option<&str> {
        self.names
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, n)| n.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::test_support::acme;

    fn build() -> (ResourceGraph, Roles, LogGroups) {
        let ctx = acme();
        let mut graph = ResourceGraph::new();
        let mut roles = Roles::build(&ctx, &mut graph).unwrap();
        let logs = LogGroups::build(&ctx, &mut graph, &mut roles).unwrap();
        (graph, roles, logs)
    }

    #[test]
    fn test_retention_and_retain_policy() {
        let (graph, _, logs) = build();
        let exec = graph.get(logs.group(LogKind::EcsExec).unwrap().logical_id()).unwrap();
        assert_eq!(exec.properties["RetentionInDays"], 30);
        assert_eq!(exec.properties["LogGroupName"], "/ecs/acme-ecs-exec/logs");

        let rendered = exec.to_template();
        assert_eq!(rendered["DeletionPolicy"], "RetainExceptOnCreate");
        assert_eq!(rendered["UpdateReplacePolicy"], "Retain");
    }

    #[test]
    fn test_writer_grant_and_export() {
        let (graph, roles, logs) = build();
        let policies = roles.policies(RoleKind::TaskExecution);
        assert_eq!(policies.len(), 1);

        let policy = graph.get(policies[0].logical_id()).unwrap();
        let statement = &policy.properties["PolicyDocument"]["Statement"][0];
        assert_eq!(
            statement["Action"],
            json!(["logs:CreateLogStream", "logs:PutLogEvents"])
        );
        assert_eq!(statement["Resource"], json!(["${AppServiceLogGroup.Arn}"]));

        assert_eq!(
            graph.exports().value("/acme-app-service-logs/log-group-name"),
            logs.name(LogKind::AppService)
        );
        assert!(graph
            .exports()
            .value("/acme-app-service/log-group-name")
            .is_none());
        assert_eq!(graph.exports().len(), 3);
    }
}
