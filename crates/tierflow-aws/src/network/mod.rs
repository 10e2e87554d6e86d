//! Dual-stack VPC, subnets, gateways and routing

pub mod gateway;
pub mod ipv6;
pub mod route_table;
pub mod subnet;
pub mod vpc;

pub use gateway::{EgressOnlyInternetGateway, InternetGateway, NatGateways};
pub use ipv6::{Ipv6Block, subdivision_expr, subdivision_index};
pub use route_table::{DeclaredRoute, Destination, RouteTables, RouteTarget, RouteTargets};
pub use subnet::{SubnetDescriptor, Subnets, ipv6_plan, subnet_table};
pub use vpc::Vpc;

use std::fmt;

/// Subnet tier; each tier has a fixed exposure and routing policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    Public,
    App,
    Db,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Public, Tier::App, Tier::Db];

    pub fn name(&self) -> &'static str {
        match self {
            Tier::Public => "public",
            Tier::App => "app",
            Tier::Db => "db",
        }
    }

    pub fn index(&self) -> u8 {
        match self {
            Tier::Public => 0,
            Tier::App => 1,
            Tier::Db => 2,
        }
    }
}

/// Availability zone slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Zone {
    A,
    C,
}

impl Zone {
    pub const ALL: [Zone; 2] = [Zone::A, Zone::C];

    /// Suffix used in resource names (`subnet-public-1a`)
    pub fn suffix(&self) -> &'static str {
        match self {
            Zone::A => "1a",
            Zone::C => "1c",
        }
    }

    pub fn index(&self) -> u8 {
        match self {
            Zone::A => 0,
            Zone::C => 1,
        }
    }

    /// Concrete availability zone in `region`
    pub fn availability_zone(&self, region: &str) -> String {
        match self {
            Zone::A => format!("{}a", region),
            Zone::C => format!("{}c", region),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubnetKey {
    pub tier: Tier,
    pub zone: Zone,
}

impl SubnetKey {
    pub fn new(tier: Tier, zone: Zone) -> Self {
        Self { tier, zone }
    }
}

impl fmt::Display for SubnetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.tier.name(), self.zone.suffix())
    }
}
