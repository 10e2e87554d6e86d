//! Route tables, routes and subnet associations
//!
//! Routing per tier:
//!
//! | tier   | IPv4 `0.0.0.0/0`      | IPv6 `::/0`         |
//! |--------|-----------------------|---------------------|
//! | public | internet gateway      | internet gateway    |
//! | app    | NAT gateway (zone)    | egress-only gateway |
//! | db     | -                     | -                   |

use super::{
    EgressOnlyInternetGateway, InternetGateway, NatGateways, SubnetKey, Subnets, Tier, Vpc,
};
use crate::error::{AwsError, Result};
use crate::naming::{StackContext, name_tag};
use serde_json::{Map, Value, json};
use std::fmt;
use tierflow_cloud::{RefMap, Resource, ResourceGraph, ResourceRef, to_logical_id};

pub const IPV4_DEFAULT: &str = "0.0.0.0/0";
pub const IPV6_DEFAULT: &str = "::/0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Ipv4(String),
    Ipv6(String),
}

impl Destination {
    pub fn ipv4_default() -> Self {
        Destination::Ipv4(IPV4_DEFAULT.to_string())
    }

    pub fn ipv6_default() -> Self {
        Destination::Ipv6(IPV6_DEFAULT.to_string())
    }

    pub fn is_default(&self) -> bool {
        match self {
            Destination::Ipv4(cidr) => cidr == IPV4_DEFAULT,
            Destination::Ipv6(cidr) => cidr == IPV6_DEFAULT,
        }
    }

    pub fn is_ipv6(&self) -> bool {
        matches!(self, Destination::Ipv6(_))
    }

    fn suffix(&self) -> &'static str {
        match self {
            Destination::Ipv4(_) => "Ipv4",
            Destination::Ipv6(_) => "Ipv6",
        }
    }

    fn property(&self) -> (&'static str, &str) {
        match self {
            Destination::Ipv4(cidr) => ("DestinationCidrBlock", cidr),
            Destination::Ipv6(cidr) => ("DestinationIpv6CidrBlock", cidr),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Ipv4(cidr) | Destination::Ipv6(cidr) => write!(f, "{}", cidr),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    InternetGateway(ResourceRef),
    NatGateway(ResourceRef),
    EgressOnlyInternetGateway(ResourceRef),
}

impl RouteTarget {
    pub fn reference(&self) -> &ResourceRef {
        match self {
            RouteTarget::InternetGateway(r)
            | RouteTarget::NatGateway(r)
            | RouteTarget::EgressOnlyInternetGateway(r) => r,
        }
    }

    fn property(&self) -> &'static str {
        match self {
            RouteTarget::InternetGateway(_) => "GatewayId",
            RouteTarget::NatGateway(_) => "NatGatewayId",
            RouteTarget::EgressOnlyInternetGateway(_) => "EgressOnlyInternetGatewayId",
        }
    }
}

/// A route as declared, kept for inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredRoute {
    pub table: SubnetKey,
    pub logical_id: String,
    pub destination: Destination,
    pub target: RouteTarget,
}

/// Gateways the routes point at
pub struct RouteTargets<'a> {
    pub igw: &'a InternetGateway,
    pub eigw: &'a EgressOnlyInternetGateway,
    pub nat: &'a NatGateways,
}

/// Routes for a subnet's table
pub fn routes_for(
    key: SubnetKey,
    targets: &RouteTargets<'_>,
) -> Result<Vec<(Destination, RouteTarget)>> {
    let routes = match key.tier {
        Tier::Public => vec![
            (
                Destination::ipv4_default(),
                RouteTarget::InternetGateway(targets.igw.igw.clone()),
            ),
            (
                Destination::ipv6_default(),
                RouteTarget::InternetGateway(targets.igw.igw.clone()),
            ),
        ],
        Tier::App => vec![
            (
                Destination::ipv4_default(),
                RouteTarget::NatGateway(targets.nat.gateway(key.zone)?.clone()),
            ),
            (
                Destination::ipv6_default(),
                RouteTarget::EgressOnlyInternetGateway(targets.eigw.eigw.clone()),
            ),
        ],
        Tier::Db => Vec::new(),
    };
    Ok(routes)
}

/// At most one default route per address family
pub fn validate_routes(table: &str, routes: &[(Destination, RouteTarget)]) -> Result<()> {
    for ipv6 in [false, true] {
        let defaults = routes
            .iter()
            .filter(|(d, _)| d.is_ipv6() == ipv6 && d.is_default())
            .count();
        if defaults > 1 {
            return Err(AwsError::InvalidRoute {
                table: table.to_string(),
                reason: format!(
                    "{} default {} routes",
                    defaults,
                    if ipv6 { "IPv6" } else { "IPv4" }
                ),
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct RouteTables {
    tables: RefMap<SubnetKey>,
    routes: Vec<DeclaredRoute>,
}

impl RouteTables {
    pub fn build(
        ctx: &StackContext,
        graph: &mut ResourceGraph,
        vpc: &Vpc,
        subnets: &Subnets,
        targets: &RouteTargets<'_>,
    ) -> Result<Self> {
        let mut tables = RefMap::new();
        let mut declared = Vec::new();

        for (key, subnet) in subnets.iter() {
            let key = *key;
            let routes = routes_for(key, targets)?;
            let table_name = format!("route-table-{}", key);
            validate_routes(&table_name, &routes)?;

            let table_id = to_logical_id(&table_name);
            let table = graph.declare(Resource::new(
                &table_id,
                "AWS::EC2::RouteTable",
                json!({
                    "VpcId": vpc.vpc.id(),
                    "Tags": name_tag(&ctx.resource_name(&format!(
                        "{}-route-table-{}",
                        key.tier.name(),
                        key.zone.suffix()
                    ))),
                }),
            ))?;

            for (destination, target) in routes {
                let logical_id = format!(
                    "Route{}{}",
                    to_logical_id(&key.to_string()),
                    destination.suffix()
                );
                let mut props = Map::new();
                props.insert("RouteTableId".to_string(), json!(table.id()));
                let (dest_key, cidr) = destination.property();
                props.insert(dest_key.to_string(), json!(cidr));
                props.insert(target.property().to_string(), json!(target.reference().id()));

                let mut route = Resource::new(&logical_id, "AWS::EC2::Route", Value::Object(props));
                if let RouteTarget::InternetGateway(_) = target {
                    route = route.depends_on(&targets.igw.attachment);
                }
                graph.declare(route)?;

                declared.push(DeclaredRoute {
                    table: key,
                    logical_id,
                    destination,
                    target,
                });
            }

            graph.declare(Resource::new(
                format!("{}Association", table_id),
                "AWS::EC2::SubnetRouteTableAssociation",
                json!({
                    "RouteTableId": table.id(),
                    "SubnetId": subnet.id(),
                }),
            ))?;

            tables.insert(key, table)?;
        }

        tracing::debug!("Declared {} route tables, {} routes", tables.len(), declared.len());
        Ok(Self {
            tables,
            routes: declared,
        })
    }

    pub fn table(&self, key: SubnetKey) -> Result<&ResourceRef> {
        Ok(self.tables.get(&key)?)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// All declared routes, table order
    pub fn routes(&self) -> &[DeclaredRoute] {
        &self.routes
    }

    pub fn routes_of(&self, key: SubnetKey) -> Vec<&DeclaredRoute> {
        self.routes.iter().filter(|r| r.table == key).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::test_support::acme;
    use crate::network::Zone;

    fn build() -> (ResourceGraph, RouteTables) {
        let ctx = acme();
        let mut graph = ResourceGraph::new();
        let vpc = Vpc::build(&ctx, &mut graph).unwrap();
        let subnets = Subnets::build(&ctx, &mut graph, &vpc).unwrap();
        let nat = NatGateways::build(&ctx, &mut graph, &subnets).unwrap();
        let igw = InternetGateway::build(&ctx, &mut graph, &vpc).unwrap();
        let eigw = EgressOnlyInternetGateway::build(&mut graph, &vpc).unwrap();
        let targets = RouteTargets {
            igw: &igw,
            eigw: &eigw,
            nat: &nat,
        };
        let tables = RouteTables::build(&ctx, &mut graph, &vpc, &subnets, &targets).unwrap();
        (graph, tables)
    }

    #[test]
    fn test_db_tables_have_no_routes() {
        let (graph, tables) = build();
        assert_eq!(tables.len(), 6);
        for zone in Zone::ALL {
            assert!(tables.routes_of(SubnetKey::new(Tier::Db, zone)).is_empty());
        }
        assert_eq!(graph.by_type("AWS::EC2::Route").len(), 8);
        assert_eq!(graph.by_type("AWS::EC2::SubnetRouteTableAssociation").len(), 6);
    }

    #[test]
    fn test_app_routes_use_zone_matched_nat() {
        let (graph, tables) = build();
        let routes = tables.routes_of(SubnetKey::new(Tier::App, Zone::C));
        assert_eq!(routes.len(), 2);
        assert_eq!(
            routes[0].target,
            RouteTarget::NatGateway(graph.reference("NatGateway1c").unwrap())
        );
        assert!(matches!(
            routes[1].target,
            RouteTarget::EgressOnlyInternetGateway(_)
        ));
    }

    #[test]
    fn test_public_routes_wait_for_attachment() {
        let (graph, _) = build();
        let route = graph.get("RoutePublic1aIpv6").unwrap();
        assert_eq!(route.depends_on, vec!["InternetGatewayAttachment"]);
        assert_eq!(route.properties["DestinationIpv6CidrBlock"], "::/0");
        assert_eq!(route.properties["GatewayId"], "${InternetGateway}");
    }

    #[test]
    fn test_duplicate_default_route_is_rejected() {
        let igw = build().0.reference("InternetGateway").unwrap();
        let routes = vec![
            (Destination::ipv4_default(), RouteTarget::InternetGateway(igw.clone())),
            (Destination::ipv4_default(), RouteTarget::InternetGateway(igw)),
        ];
        assert!(matches!(
            validate_routes("route-table-public-1a", &routes),
            Err(AwsError::InvalidRoute { .. })
        ));
    }
}
