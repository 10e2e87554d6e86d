//! tierflow AWS topology
//!
//! Resource components for a dual-stack, three-tier AWS network and the
//! container platform on top of it, composed by [`TopologyOrchestrator`].
//!
//! ```text
//! Vpc ─► Subnets ─► NatGateways / InternetGateway / EgressOnly ─► RouteTables
//!  │        ├─────────────────────────────┐
//!  └─► SecurityGroups ─► LoadBalancer ─► TargetGroups (+ listeners)
//! Roles ─► Repository / LogGroups ─► Cluster
//! Subnets ─► DataTier        LogArchive
//! ```

pub mod compute;
pub mod edge;
pub mod error;
pub mod identity;
pub mod naming;
pub mod network;
pub mod observability;
pub mod orchestrator;
pub mod repository;
pub mod security;
pub mod storage;

pub use error::{AwsError, Result};
pub use naming::{Naming, StackContext};
pub use orchestrator::{Component, Synthesis, Topology, TopologyOrchestrator};
