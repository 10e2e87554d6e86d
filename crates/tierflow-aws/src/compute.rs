//! ECS cluster

use crate::error::{AwsError, Result};
use crate::naming::{StackContext, name_tag};
use crate::observability::{LogGroups, LogKind};
use serde_json::json;
use tierflow_cloud::{Resource, ResourceGraph, ResourceRef};

const SERVICE_CONNECT_NAMESPACE: &str = "app";

#[derive(Debug, Clone)]
pub struct Cluster {
    pub cluster: ResourceRef,
}

impl Cluster {
    pub fn build(ctx: &StackContext, graph: &mut ResourceGraph, logs: &LogGroups) -> Result<Self> {
        let name = ctx.resource_name("app-cluster");
        let exec_log = logs.group(LogKind::EcsExec)?;
        let exec_log_name = logs.name(LogKind::EcsExec).ok_or(AwsError::MissingComponent {
            requester: "compute-cluster",
            missing: "ecs-exec log group",
        })?;

        // log group is passed by name, so the dependency is not implied
        let cluster = graph.declare(
            Resource::new(
                "AppCluster",
                "AWS::ECS::Cluster",
                json!({
                    "ClusterName": name,
                    "ServiceConnectDefaults": { "Namespace": SERVICE_CONNECT_NAMESPACE },
                    "Configuration": {
                        "ExecuteCommandConfiguration": {
                            "Logging": "OVERRIDE",
                            "LogConfiguration": {
                                "CloudWatchLogGroupName": exec_log_name,
                                "CloudWatchEncryptionEnabled": true,
                            },
                        },
                    },
                    "Tags": name_tag(&name),
                }),
            )
            .depends_on(exec_log),
        )?;

        Ok(Self { cluster })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Roles;
    use crate::naming::test_support::acme;

    #[test]
    fn test_cluster_depends_on_exec_log_group() {
        let ctx = acme();
        let mut graph = ResourceGraph::new();
        let mut roles = Roles::build(&ctx, &mut graph).unwrap();
        let logs = LogGroups::build(&ctx, &mut graph, &mut roles).unwrap();
        let cluster = Cluster::build(&ctx, &mut graph, &logs).unwrap();

        let declared = graph.get(cluster.cluster.logical_id()).unwrap();
        assert_eq!(declared.depends_on, vec!["EcsExecLogGroup"]);
        assert_eq!(declared.properties["ClusterName"], "acme-app-cluster");
        let exec = &declared.properties["Configuration"]["ExecuteCommandConfiguration"];
        assert_eq!(exec["Logging"], "OVERRIDE");
        assert_eq!(
            exec["LogConfiguration"]["CloudWatchLogGroupName"],
            "/ecs/acme-ecs-exec/logs"
        );

        let order = graph.deployment_order().unwrap();
        let pos = |id: &str| order.iter().position(|x| x == id).unwrap();
        assert!(pos("EcsExecLogGroup") < pos("AppCluster"));
    }
}
