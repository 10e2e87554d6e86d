//! Database subnet group and the load balancer log bucket

use crate::error::Result;
use crate::naming::{StackContext, name_tag};
use crate::network::{Subnets, Tier};
use serde_json::json;
use tierflow_cloud::{RemovalPolicy, Resource, ResourceGraph, ResourceRef};

/// Days before log objects move to STANDARD_IA
pub const TRANSITION_DAYS: u32 = 30;

/// DB subnet group over the database tier
#[derive(Debug, Clone)]
pub struct DataTier {
    pub subnet_group: ResourceRef,
}

impl DataTier {
    pub fn build(ctx: &StackContext, graph: &mut ResourceGraph, subnets: &Subnets) -> Result<Self> {
        let name = ctx.resource_name("rds-subnet-group");
        let db: Vec<String> = subnets.tier(Tier::Db).iter().map(|s| s.id()).collect();

        let subnet_group = graph.declare(Resource::new(
            "RdsSubnetGroup",
            "AWS::RDS::DBSubnetGroup",
            json!({
                "DBSubnetGroupName": name,
                "DBSubnetGroupDescription": "Subnet Group for RDS",
                "SubnetIds": db,
                "Tags": name_tag(&name),
            }),
        ))?;

        graph.exports_mut().export_from(
            &subnet_group,
            ctx.export_path("rds-subnet-group", "name"),
            subnet_group.id(),
        );
        Ok(Self { subnet_group })
    }
}

/// Encrypted, private bucket for load balancer access logs
#[derive(Debug, Clone)]
pub struct LogArchive {
    pub bucket: ResourceRef,
}

impl LogArchive {
    pub fn build(ctx: &StackContext, graph: &mut ResourceGraph) -> Result<Self> {
        let name = ctx.resource_name("elb-log-bucket");
        let bucket = graph.declare(
            Resource::new(
                "ElbLogBucket",
                "AWS::S3::Bucket",
                json!({
                    "BucketName": name,
                    "BucketEncryption": {
                        "ServerSideEncryptionConfiguration": [{
                            "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" },
                        }],
                    },
                    "PublicAccessBlockConfiguration": {
                        "BlockPublicAcls": true,
                        "BlockPublicPolicy": true,
                        "IgnorePublicAcls": true,
                        "RestrictPublicBuckets": true,
                    },
                    "LifecycleConfiguration": {
                        "Rules": [{
                            "Status": "Enabled",
                            "Transitions": [{
                                "StorageClass": "STANDARD_IA",
                                "TransitionInDays": TRANSITION_DAYS,
                            }],
                        }],
                    },
                    "LoggingConfiguration": { "LogFilePrefix": "access-logs/" },
                    "Tags": name_tag(&name),
                }),
            )
            .with_removal_policy(RemovalPolicy::RetainOnUpdateOrDelete),
        )?;

        graph.exports_mut().export_from(
            &bucket,
            ctx.export_path("elb-log-bucket", "name"),
            bucket.id(),
        );
        Ok(Self { bucket })
    }
}
