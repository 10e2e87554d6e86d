//! Container image repository

use crate::error::Result;
use crate::identity::{PolicyStatement, RoleKind, Roles};
use crate::naming::{StackContext, name_tag};
use serde_json::json;
use tierflow_cloud::{RemovalPolicy, Resource, ResourceGraph, ResourceRef};

const REPOSITORY: &str = "app-repository";

/// Images kept by the lifecycle rule
pub const RETAINED_IMAGES: u32 = 20;

const PULL_ACTIONS: [&str; 3] = [
    "ecr:GetDownloadUrlForLayer",
    "ecr:BatchGetImage",
    "ecr:BatchCheckLayerAvailability",
];

fn lifecycle_policy_text() -> String {
    json!({
        "rules": [{
            "rulePriority": 1,
            "description": format!("Keep last {} images", RETAINED_IMAGES),
            "selection": {
                "tagStatus": "any",
                "countType": "imageCountMoreThan",
                "countNumber": RETAINED_IMAGES,
            },
            "action": { "type": "expire" },
        }]
    })
    .to_string()
}

/// Registry URI of a repository: `{account}.dkr.ecr.{region}.amazonaws.com/{name}`
pub fn repository_uri(ctx: &StackContext, repository_name: &str) -> String {
    format!(
        "{}.dkr.ecr.{}.amazonaws.com/{}",
        ctx.account(),
        ctx.region(),
        repository_name
    )
}

#[derive(Debug, Clone)]
pub struct Repository {
    pub repository: ResourceRef,
    pub uri: String,
}

impl Repository {
    pub fn build(ctx: &StackContext, graph: &mut ResourceGraph, roles: &mut Roles) -> Result<Self> {
        let name = ctx.resource_name(REPOSITORY);
        let repository = graph.declare(
            Resource::new(
                "AppRepository",
                "AWS::ECR::Repository",
                json!({
                    "RepositoryName": name,
                    "EncryptionConfiguration": { "EncryptionType": "KMS" },
                    // scan on push is deprecated; always off
                    "ImageScanningConfiguration": { "ScanOnPush": false },
                    "LifecyclePolicy": { "LifecyclePolicyText": lifecycle_policy_text() },
                    "Tags": name_tag(&name),
                }),
            )
            .with_removal_policy(RemovalPolicy::RetainOnUpdateOrDelete),
        )?;

        roles.attach_policy(
            ctx,
            graph,
            RoleKind::Task,
            "app-repository-pull-policy",
            PolicyStatement::allow(PULL_ACTIONS, [repository.attr("Arn")]),
        )?;

        let uri = repository_uri(ctx, &name);
        graph
            .exports_mut()
            .export_from(&repository, ctx.export_path(REPOSITORY, "uri"), uri.clone());

        Ok(Self { repository, uri })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::test_support::acme;

    #[test]
    fn test_repository_uri_export() {
        let ctx = acme();
        let mut graph = ResourceGraph::new();
        let mut roles = Roles::build(&ctx, &mut graph).unwrap();
        let repo = Repository::build(&ctx, &mut graph, &mut roles).unwrap();

        let uri = graph.exports().value("/acme-app-repository/uri").unwrap();
        assert_eq!(
            uri,
            "111111111111.dkr.ecr.ap-northeast-1.amazonaws.com/acme-app-repository"
        );
        assert_eq!(uri, repo.uri);
    }

    #[test]
    fn test_lifecycle_and_pull_grant() {
        let ctx = acme();
        let mut graph = ResourceGraph::new();
        let mut roles = Roles::build(&ctx, &mut graph).unwrap();
        Repository::build(&ctx, &mut graph, &mut roles).unwrap();

        let repo = graph.get("AppRepository").unwrap();
        let text = repo.properties["LifecyclePolicy"]["LifecyclePolicyText"]
            .as_str()
            .unwrap();
        let policy: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(policy["rules"][0]["selection"]["countNumber"], 20);
        assert_eq!(repo.properties["ImageScanningConfiguration"]["ScanOnPush"], false);

        let pull = roles.policies(RoleKind::Task);
        assert_eq!(pull.len(), 1);
        let statement = &graph.get(pull[0].logical_id()).unwrap().properties["PolicyDocument"]
            ["Statement"][0];
        assert_eq!(statement["Action"].as_array().unwrap().len(), 3);
        assert_eq!(statement["Resource"], json!(["${AppRepository.Arn}"]));
    }
}
