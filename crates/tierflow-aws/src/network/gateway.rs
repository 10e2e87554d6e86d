use super::{Subnets, Tier, Vpc, Zone};
use crate::error::Result;
use crate::naming::{StackContext, name_tag};
use serde_json::json;
use tierflow_cloud::{RefMap, Resource, ResourceGraph, ResourceRef, build_table, to_logical_id};

/// Internet gateway plus its VPC attachment
#[derive(Debug, Clone)]
pub struct InternetGateway {
    pub igw: ResourceRef,

    /// Routes through the gateway are only accepted once this exists
    pub attachment: ResourceRef,
}

impl InternetGateway {
    pub fn build(ctx: &StackContext, graph: &mut ResourceGraph, vpc: &Vpc) -> Result<Self> {
        let igw = graph.declare(Resource::new(
            "InternetGateway",
            "AWS::EC2::InternetGateway",
            json!({ "Tags": name_tag(&ctx.resource_name("igw")) }),
        ))?;

        let attachment = graph.declare(Resource::new(
            "InternetGatewayAttachment",
            "AWS::EC2::VPCGatewayAttachment",
            json!({
                "VpcId": vpc.vpc.id(),
                "InternetGatewayId": igw.id(),
            }),
        ))?;

        Ok(Self { igw, attachment })
    }
}

/// IPv6 egress for the application tier
#[derive(Debug, Clone)]
pub struct EgressOnlyInternetGateway {
    pub eigw: ResourceRef,
}

impl EgressOnlyInternetGateway {
    pub fn build(graph: &mut ResourceGraph, vpc: &Vpc) -> Result<Self> {
        // EgressOnlyInternetGateway takes no Tags
        let eigw = graph.declare(Resource::new(
            "EgressOnlyInternetGateway",
            "AWS::EC2::EgressOnlyInternetGateway",
            json!({ "VpcId": vpc.vpc.id() }),
        ))?;
        Ok(Self { eigw })
    }
}

/// One NAT gateway per zone, each in that zone's public subnet
#[derive(Debug, Clone)]
pub struct NatGateways {
    eips: RefMap<Zone>,
    gateways: RefMap<Zone>,
}

impl NatGateways {
    pub fn build(ctx: &StackContext, graph: &mut ResourceGraph, subnets: &Subnets) -> Result<Self> {
        let eips = build_table(&Zone::ALL, |zone| {
            let name = format!("eip-{}", zone.suffix());
            let eip = graph.declare(Resource::new(
                to_logical_id(&name),
                "AWS::EC2::EIP",
                json!({
                    "Domain": "vpc",
                    "Tags": name_tag(&ctx.resource_name(&name)),
                }),
            ))?;
            Ok((*zone, eip))
        })?;

        let mut gateways = RefMap::new();
        for zone in Zone::ALL {
            let name = format!("nat-gateway-{}", zone.suffix());
            let eip = eips.get(&zone)?;
            let subnet = subnets.get(Tier::Public, zone)?;
            let gateway = graph.declare(Resource::new(
                to_logical_id(&name),
                "AWS::EC2::NatGateway",
                json!({
                    "AllocationId": eip.attr("AllocationId"),
                    "SubnetId": subnet.id(),
                    "Tags": name_tag(&ctx.resource_name(&name)),
                }),
            ))?;
            gateways.insert(zone, gateway)?;
        }

        Ok(Self { eips, gateways })
    }

    pub fn gateway(&self, zone: Zone) -> Result<&ResourceRef> {
        Ok(self.gateways.get(&zone)?)
    }

    pub fn eip(&self, zone: Zone) -> Result<&ResourceRef> {
        Ok(self.eips.get(&zone)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::test_support::acme;

    #[test]
    fn test_nat_gateway_per_zone() {
        let ctx = acme();
        let mut graph = ResourceGraph::new();
        let vpc = Vpc::build(&ctx, &mut graph).unwrap();
        let subnets = Subnets::build(&ctx, &mut graph, &vpc).unwrap();
        let nat = NatGateways::build(&ctx, &mut graph, &subnets).unwrap();

        let ngw_c = graph.get(nat.gateway(Zone::C).unwrap().logical_id()).unwrap();
        assert_eq!(ngw_c.properties["SubnetId"], "${SubnetPublic1c}");
        assert_eq!(ngw_c.properties["AllocationId"], "${Eip1c.AllocationId}");
        assert_eq!(nat.eip(Zone::A).unwrap().logical_id(), "Eip1a");
        assert_eq!(graph.by_type("AWS::EC2::EIP").len(), 2);
    }

    #[test]
    fn test_internet_gateway_attachment() {
        let ctx = acme();
        let mut graph = ResourceGraph::new();
        let vpc = Vpc::build(&ctx, &mut graph).unwrap();
        let igw = InternetGateway::build(&ctx, &mut graph, &vpc).unwrap();

        let deps = graph.dependencies_of(igw.attachment.logical_id()).unwrap();
        assert!(deps.contains("Vpc"));
        assert!(deps.contains("InternetGateway"));
    }
}
