//! IPv6 subdivision of the VPC allocation
//!
//! The VPC receives a /56 from Amazon. Subnets take /64 blocks out of it,
//! selected by an index derived from the subnet's tier and zone rather than
//! its position in the subnet table, so reordering the table never moves a
//! subnet to a different block.

use super::SubnetKey;
use crate::error::{AwsError, Result};
use serde_json::{Value, json};
use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;
use tierflow_cloud::ResourceRef;

/// Prefix length of the Amazon-provided VPC allocation
pub const VPC_IPV6_PREFIX: u8 = 56;
/// Prefix length of each subnet block
pub const SUBNET_IPV6_PREFIX: u8 = 64;
/// Number of /64 blocks carved out of the allocation
pub const SUBDIVISION_COUNT: u8 = 64;

/// Subdivision index for a subnet: one nibble for the tier, one for the zone
///
/// public-1a → 0x00, public-1c → 0x01, app-1a → 0x10, ... db-1c → 0x21.
pub fn subdivision_index(key: SubnetKey) -> u8 {
    key.tier.index() * 16 + key.zone.index()
}

/// Template expression selecting block `index` of the VPC's IPv6 allocation
pub fn subdivision_expr(vpc: &ResourceRef, index: u8) -> Value {
    json!({
        "Fn::Select": [
            index,
            {
                "Fn::Cidr": [
                    { "Fn::Select": [0, vpc.get_att("Ipv6CidrBlocks")] },
                    SUBDIVISION_COUNT,
                    (128 - SUBNET_IPV6_PREFIX).to_string(),
                ]
            }
        ]
    })
}

/// IPv6 network block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv6Block {
    network: Ipv6Addr,
    prefix_len: u8,
}

impl Ipv6Block {
    pub fn new(network: Ipv6Addr, prefix_len: u8) -> Result<Self> {
        if prefix_len > 128 {
            return Err(AwsError::InvalidIpv6Block(format!(
                "prefix length {} exceeds 128",
                prefix_len
            )));
        }
        let host_mask = u128::MAX.checked_shr(prefix_len as u32).unwrap_or(0);
        if u128::from(network) & host_mask != 0 {
            return Err(AwsError::InvalidIpv6Block(format!(
                "{}/{} has host bits set",
                network, prefix_len
            )));
        }
        Ok(Self {
            network,
            prefix_len,
        })
    }

    pub fn network(&self) -> Ipv6Addr {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// The `index`-th /64 of a /56 allocation
    pub fn subdivide(&self, index: u8) -> Result<Ipv6Block> {
        if self.prefix_len != VPC_IPV6_PREFIX {
            return Err(AwsError::InvalidIpv6Block(format!(
                "expected a /{} allocation, got /{}",
                VPC_IPV6_PREFIX, self.prefix_len
            )));
        }
        if index >= SUBDIVISION_COUNT {
            return Err(AwsError::InvalidIpv6Block(format!(
                "subdivision index {} out of range (0..{})",
                index, SUBDIVISION_COUNT
            )));
        }
        let base = u128::from(self.network);
        let offset = (index as u128) << (128 - SUBNET_IPV6_PREFIX as u32);
        Ipv6Block::new(Ipv6Addr::from(base | offset), SUBNET_IPV6_PREFIX)
    }
}

impl fmt::Display for Ipv6Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl FromStr for Ipv6Block {
    type Err = AwsError;

    fn from_str(s: &str) -> Result<Self> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| AwsError::InvalidIpv6Block(format!("missing prefix: {}", s)))?;
        let network = addr
            .parse::<Ipv6Addr>()
            .map_err(|_| AwsError::InvalidIpv6Block(format!("invalid address: {}", addr)))?;
        let prefix_len = prefix
            .parse::<u8>()
            .map_err(|_| AwsError::InvalidIpv6Block(format!("invalid prefix: {}", prefix)))?;
        Ipv6Block::new(network, prefix_len)
    }
}
