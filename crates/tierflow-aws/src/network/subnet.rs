use super::ipv6::{Ipv6Block, subdivision_expr, subdivision_index};
use super::{SubnetKey, Tier, Vpc, Zone};
use crate::error::Result;
use crate::naming::{StackContext, name_tag};
use serde_json::json;
use tierflow_cloud::{RefMap, Resource, ResourceGraph, ResourceRef, build_table, to_logical_id};

/// One row of the subnet table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubnetDescriptor {
    pub key: SubnetKey,
    pub cidr: &'static str,
}

impl SubnetDescriptor {
    pub const fn new(tier: Tier, zone: Zone, cidr: &'static str) -> Self {
        Self {
            key: SubnetKey { tier, zone },
            cidr,
        }
    }

    /// `subnet-public-1a`
    pub fn logical_name(&self) -> String {
        format!("subnet-{}", self.key)
    }

    /// Only the public tier hands out public addresses
    pub fn is_public(&self) -> bool {
        self.key.tier == Tier::Public
    }
}

const SUBNET_TABLE: [SubnetDescriptor; 6] = [
    SubnetDescriptor::new(Tier::Public, Zone::A, "10.0.11.0/24"),
    SubnetDescriptor::new(Tier::Public, Zone::C, "10.0.12.0/24"),
    SubnetDescriptor::new(Tier::App, Zone::A, "10.0.21.0/24"),
    SubnetDescriptor::new(Tier::App, Zone::C, "10.0.22.0/24"),
    SubnetDescriptor::new(Tier::Db, Zone::A, "10.0.31.0/24"),
    SubnetDescriptor::new(Tier::Db, Zone::C, "10.0.32.0/24"),
];

/// The standard three-tier, two-zone subnet table
pub fn subnet_table() -> &'static [SubnetDescriptor] {
    &SUBNET_TABLE
}

/// Declared subnets keyed by (tier, zone)
#[derive(Debug, Clone)]
pub struct Subnets {
    refs: RefMap<SubnetKey>,
}

impl Subnets {
    pub fn build(ctx: &StackContext, graph: &mut ResourceGraph, vpc: &Vpc) -> Result<Self> {
        Self::build_from(ctx, graph, vpc, subnet_table())
    }

    pub fn build_from(
        ctx: &StackContext,
        graph: &mut ResourceGraph,
        vpc: &Vpc,
        descriptors: &[SubnetDescriptor],
    ) -> Result<Self> {
        let refs = build_table(descriptors, |d| {
            let name = d.logical_name();
            let public = d.is_public();
            let subnet = graph.declare(
                Resource::new(
                    to_logical_id(&name),
                    "AWS::EC2::Subnet",
                    json!({
                        "VpcId": vpc.vpc.id(),
                        "CidrBlock": d.cidr,
                        "AvailabilityZone": d.key.zone.availability_zone(ctx.region()),
                        "Ipv6CidrBlock": subdivision_expr(&vpc.vpc, subdivision_index(d.key)),
                        "MapPublicIpOnLaunch": public,
                        "AssignIpv6AddressOnCreation": public,
                        "Tags": name_tag(&ctx.resource_name(&name)),
                    }),
                )
                .depends_on(&vpc.ipv6_cidr_block),
            )?;

            let arn = format!(
                "arn:aws:ec2:{}:{}:subnet/{}",
                ctx.region(),
                ctx.account(),
                subnet.id()
            );
            graph
                .exports_mut()
                .export_from(&subnet, ctx.export_path(&name, "arn"), arn);

            Ok((d.key, subnet))
        })?;

        Ok(Self { refs })
    }

    pub fn get(&self, tier: Tier, zone: Zone) -> Result<&ResourceRef> {
        Ok(self.refs.get(&SubnetKey::new(tier, zone))?)
    }

    /// Subnets of one tier, zone order
    pub fn tier(&self, tier: Tier) -> Vec<&ResourceRef> {
        self.refs
            .iter()
            .filter(|(key, _)| key.tier == tier)
            .map(|(_, r)| r)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SubnetKey, &ResourceRef)> {
        self.refs.iter()
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

/// Concrete /64 per subnet for a known VPC allocation
pub fn ipv6_plan(allocation: &Ipv6Block) -> Result<Vec<(SubnetDescriptor, Ipv6Block)>> {
    subnet_table()
        .iter()
        .map(|d| Ok((*d, allocation.subdivide(subdivision_index(d.key))?)))
        .collect()
}
