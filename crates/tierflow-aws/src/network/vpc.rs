use crate::error::Result;
use crate::naming::{StackContext, name_tag};
use serde_json::json;
use tierflow_cloud::{Resource, ResourceGraph, ResourceRef};

pub const VPC_CIDR: &str = "10.0.0.0/16";

/// The VPC and its Amazon-provided IPv6 association
#[derive(Debug, Clone)]
pub struct Vpc {
    pub vpc: ResourceRef,

    /// Allocated asynchronously; anything addressed from the IPv6 block must
    /// depend on this resource explicitly.
    pub ipv6_cidr_block: ResourceRef,
}

impl Vpc {
    pub fn build(ctx: &StackContext, graph: &mut ResourceGraph) -> Result<Self> {
        let vpc = graph.declare(Resource::new(
            "Vpc",
            "AWS::EC2::VPC",
            json!({
                "CidrBlock": VPC_CIDR,
                "EnableDnsHostnames": true,
                "EnableDnsSupport": true,
                "InstanceTenancy": "default",
                "Tags": name_tag(&ctx.resource_name("vpc")),
            }),
        ))?;

        let ipv6_cidr_block = graph.declare(Resource::new(
            "VpcIpv6CidrBlock",
            "AWS::EC2::VPCCidrBlock",
            json!({
                "VpcId": vpc.id(),
                "AmazonProvidedIpv6CidrBlock": true,
            }),
        ))?;

        Ok(Self {
            vpc,
            ipv6_cidr_block,
        })
    }
}
