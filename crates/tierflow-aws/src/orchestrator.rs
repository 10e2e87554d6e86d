//! Component orchestration
//!
//! Every component is a node in an explicit dependency DAG. The orchestrator
//! sorts the DAG, runs a configuration preflight and then builds each
//! component into one shared [`ResourceGraph`], handing it the outputs of the
//! components it depends on.

use crate::compute::Cluster;
use crate::edge::{LoadBalancer, TargetGroups};
use crate::error::{AwsError, Result};
use crate::identity::Roles;
use crate::naming::StackContext;
use crate::network::{
    EgressOnlyInternetGateway, InternetGateway, NatGateways, RouteTables, RouteTargets, Subnets,
    Vpc,
};
use crate::observability::LogGroups;
use crate::repository::Repository;
use crate::security::SecurityGroups;
use crate::storage::{DataTier, LogArchive};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tierflow_cloud::{CloudError, Dag, ExportRegistry, ResourceGraph};
use tierflow_config::EnvironmentContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    Vpc,
    Subnets,
    NatGateways,
    InternetGateway,
    EgressOnlyInternetGateway,
    RouteTables,
    SecurityGroups,
    Roles,
    Repository,
    LogGroups,
    LoadBalancer,
    TargetGroups,
    Cluster,
    DataTier,
    LogArchive,
}

impl Component {
    /// Registration order
    pub const ALL: [Component; 15] = [
        Component::Vpc,
        Component::Subnets,
        Component::NatGateways,
        Component::InternetGateway,
        Component::EgressOnlyInternetGateway,
        Component::RouteTables,
        Component::SecurityGroups,
        Component::Roles,
        Component::Repository,
        Component::LogGroups,
        Component::LoadBalancer,
        Component::TargetGroups,
        Component::Cluster,
        Component::DataTier,
        Component::LogArchive,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Component::Vpc => "vpc",
            Component::Subnets => "subnets",
            Component::NatGateways => "nat-gateways",
            Component::InternetGateway => "internet-gateway",
            Component::EgressOnlyInternetGateway => "egress-only-internet-gateway",
            Component::RouteTables => "route-tables",
            Component::SecurityGroups => "security-groups",
            Component::Roles => "roles",
            Component::Repository => "repository",
            Component::LogGroups => "log-groups",
            Component::LoadBalancer => "load-balancer",
            Component::TargetGroups => "target-groups",
            Component::Cluster => "cluster",
            Component::DataTier => "data-tier",
            Component::LogArchive => "log-archive",
        }
    }

    /// Components whose outputs this one consumes
    pub fn depends_on(&self) -> &'static [Component] {
        use Component::*;
        match self {
            Vpc => &[],
            Subnets => &[Vpc],
            NatGateways => &[Subnets],
            InternetGateway => &[Vpc, Subnets],
            EgressOnlyInternetGateway => &[Vpc, Subnets],
            RouteTables => &[
                Vpc,
                Subnets,
                NatGateways,
                InternetGateway,
                EgressOnlyInternetGateway,
            ],
            SecurityGroups => &[Vpc],
            Roles => &[],
            Repository => &[Roles],
            LogGroups => &[Roles],
            LoadBalancer => &[Subnets, SecurityGroups],
            TargetGroups => &[Vpc, LoadBalancer],
            Cluster => &[LogGroups],
            DataTier => &[Subnets],
            LogArchive => &[],
        }
    }

    /// Components that must be built first without handing over outputs
    ///
    /// Only constrains the order between selected components; `only` does
    /// not pull these in.
    pub fn after(&self) -> &'static [Component] {
        use Component::*;
        match self {
            SecurityGroups => &[RouteTables],
            Roles => &[SecurityGroups],
            LoadBalancer => &[Repository, LogGroups],
            Cluster => &[TargetGroups],
            DataTier => &[Cluster],
            LogArchive => &[Cluster],
            _ => &[],
        }
    }

    /// Needs `certificateArn` from the environment
    pub fn requires_certificate(&self) -> bool {
        matches!(self, Component::TargetGroups)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Component {
    type Err = AwsError;

    fn from_str(s: &str) -> Result<Self> {
        Component::ALL
            .iter()
            .find(|c| c.name() == s)
            .copied()
            .ok_or_else(|| CloudError::NodeNotFound(s.to_string()).into())
    }
}

/// Outputs of the components built so far
#[derive(Debug, Default)]
pub struct Topology {
    pub vpc: Option<Vpc>,
    pub subnets: Option<Subnets>,
    pub nat_gateways: Option<NatGateways>,
    pub internet_gateway: Option<InternetGateway>,
    pub egress_only_internet_gateway: Option<EgressOnlyInternetGateway>,
    pub route_tables: Option<RouteTables>,
    pub security_groups: Option<SecurityGroups>,
    pub roles: Option<Roles>,
    pub repository: Option<Repository>,
    pub log_groups: Option<LogGroups>,
    pub load_balancer: Option<LoadBalancer>,
    pub target_groups: Option<TargetGroups>,
    pub cluster: Option<Cluster>,
    pub data_tier: Option<DataTier>,
    pub log_archive: Option<LogArchive>,
}

fn require<T>(slot: Option<T>, requester: Component, missing: Component) -> Result<T> {
    slot.ok_or(AwsError::MissingComponent {
        requester: requester.name(),
        missing: missing.name(),
    })
}

impl Topology {
    /// Build one component from the outputs already present
    pub fn build_component(
        &mut self,
        component: Component,
        ctx: &StackContext,
        graph: &mut ResourceGraph,
    ) -> Result<()> {
        use Component as C;
        let me = component;
        match component {
            C::Vpc => self.vpc = Some(Vpc::build(ctx, graph)?),
            C::Subnets => {
                let vpc = require(self.vpc.as_ref(), me, C::Vpc)?;
                self.subnets = Some(Subnets::build(ctx, graph, vpc)?);
            }
            C::NatGateways => {
                let subnets = require(self.subnets.as_ref(), me, C::Subnets)?;
                self.nat_gateways = Some(NatGateways::build(ctx, graph, subnets)?);
            }
            C::InternetGateway => {
                let vpc = require(self.vpc.as_ref(), me, C::Vpc)?;
                self.internet_gateway = Some(InternetGateway::build(ctx, graph, vpc)?);
            }
            C::EgressOnlyInternetGateway => {
                let vpc = require(self.vpc.as_ref(), me, C::Vpc)?;
                self.egress_only_internet_gateway =
                    Some(EgressOnlyInternetGateway::build(graph, vpc)?);
            }
            C::RouteTables => {
                let vpc = require(self.vpc.as_ref(), me, C::Vpc)?;
                let subnets = require(self.subnets.as_ref(), me, C::Subnets)?;
                let targets = RouteTargets {
                    igw: require(self.internet_gateway.as_ref(), me, C::InternetGateway)?,
                    eigw: require(
                        self.egress_only_internet_gateway.as_ref(),
                        me,
                        C::EgressOnlyInternetGateway,
                    )?,
                    nat: require(self.nat_gateways.as_ref(), me, C::NatGateways)?,
                };
                self.route_tables = Some(RouteTables::build(ctx, graph, vpc, subnets, &targets)?);
            }
            C::SecurityGroups => {
                let vpc = require(self.vpc.as_ref(), me, C::Vpc)?;
                self.security_groups = Some(SecurityGroups::build(ctx, graph, vpc)?);
            }
            C::Roles => self.roles = Some(Roles::build(ctx, graph)?),
            C::Repository => {
                let roles = require(self.roles.as_mut(), me, C::Roles)?;
                self.repository = Some(Repository::build(ctx, graph, roles)?);
            }
            C::LogGroups => {
                let roles = require(self.roles.as_mut(), me, C::Roles)?;
                self.log_groups = Some(LogGroups::build(ctx, graph, roles)?);
            }
            C::LoadBalancer => {
                let subnets = require(self.subnets.as_ref(), me, C::Subnets)?;
                let security = require(self.security_groups.as_ref(), me, C::SecurityGroups)?;
                self.load_balancer = Some(LoadBalancer::build(ctx, graph, subnets, security)?);
            }
            C::TargetGroups => {
                let vpc = require(self.vpc.as_ref(), me, C::Vpc)?;
                let lb = require(self.load_balancer.as_mut(), me, C::LoadBalancer)?;
                self.target_groups = Some(TargetGroups::build(ctx, graph, vpc, lb)?);
            }
            C::Cluster => {
                let logs = require(self.log_groups.as_ref(), me, C::LogGroups)?;
                self.cluster = Some(Cluster::build(ctx, graph, logs)?);
            }
            C::DataTier => {
                let subnets = require(self.subnets.as_ref(), me, C::Subnets)?;
                self.data_tier = Some(DataTier::build(ctx, graph, subnets)?);
            }
            C::LogArchive => self.log_archive = Some(LogArchive::build(ctx, graph)?),
        }
        Ok(())
    }
}

/// Result of one orchestration run
#[derive(Debug)]
pub struct Synthesis {
    pub order: Vec<Component>,
    pub graph: ResourceGraph,
    pub topology: Topology,
}

impl Synthesis {
    pub fn exports(&self) -> &ExportRegistry {
        self.graph.exports()
    }

    pub fn template(&self) -> Result<Value> {
        Ok(self.graph.to_template()?)
    }
}

pub struct TopologyOrchestrator {
    ctx: StackContext,
    selected: BTreeSet<Component>,
}

impl TopologyOrchestrator {
    pub fn new(env: EnvironmentContext) -> Self {
        Self {
            ctx: StackContext::new(env),
            selected: Component::ALL.into_iter().collect(),
        }
    }

    pub fn context(&self) -> &StackContext {
        &self.ctx
    }

    /// Restrict the run to `components` and everything they depend on
    pub fn only(mut self, components: &[Component]) -> Self {
        let mut selected = BTreeSet::new();
        let mut stack: Vec<Component> = components.to_vec();
        while let Some(component) = stack.pop() {
            if selected.insert(component) {
                stack.extend(component.depends_on().iter().copied());
            }
        }
        self.selected = selected;
        self
    }

    pub fn selected(&self) -> impl Iterator<Item = Component> + '_ {
        Component::ALL
            .into_iter()
            .filter(|c| self.selected.contains(c))
    }

    fn component_dag(&self) -> Result<Dag<Component>> {
        let mut dag = Dag::new();
        for component in self.selected() {
            dag.add_node(component);
        }
        for component in self.selected() {
            for dependency in component.depends_on() {
                dag.add_dependency(dependency, &component)?;
            }
            for earlier in component.after() {
                if self.selected.contains(earlier) {
                    dag.add_dependency(earlier, &component)?;
                }
            }
        }
        Ok(dag)
    }

    /// Build order of the selected components
    pub fn component_order(&self) -> Result<Vec<Component>> {
        Ok(self.component_dag()?.toposort()?)
    }

    /// Configuration checks that must pass before anything is declared
    pub fn preflight(&self) -> Result<()> {
        for component in self.selected() {
            if component.requires_certificate() {
                self.ctx.certificate_arn()?;
            }
        }
        Ok(())
    }

    pub fn synthesize(&self) -> Result<Synthesis> {
        self.preflight()?;
        let order = self.component_order()?;

        let env = self.ctx.env();
        let mut graph = ResourceGraph::new().with_description(format!(
            "{} multi-tier network ({}, {})",
            env.system_name, env.env, env.region
        ));
        let mut topology = Topology::default();

        for component in &order {
            let before = graph.len();
            topology.build_component(*component, &self.ctx, &mut graph)?;
            tracing::info!(
                "Built {} ({} resources)",
                component,
                graph.len() - before
            );
        }

        Ok(Synthesis {
            order,
            graph,
            topology,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::test_support::{acme, acme_env};

    #[test]
    fn test_full_order_follows_construction_chain() {
        let order = TopologyOrchestrator::new(acme_env()).component_order().unwrap();
        assert_eq!(
            order,
            vec![
                Component::Vpc,
                Component::Subnets,
                Component::NatGateways,
                Component::InternetGateway,
                Component::EgressOnlyInternetGateway,
                Component::RouteTables,
                Component::SecurityGroups,
                Component::Roles,
                Component::Repository,
                Component::LogGroups,
                Component::LoadBalancer,
                Component::TargetGroups,
                Component::Cluster,
                Component::DataTier,
                Component::LogArchive,
            ]
        );
    }

    #[test]
    fn test_ordering_edges_do_not_widen_selection() {
        let orchestrator = TopologyOrchestrator::new(acme_env()).only(&[Component::LogArchive]);
        assert_eq!(
            orchestrator.component_order().unwrap(),
            vec![Component::LogArchive]
        );

        let orchestrator =
            TopologyOrchestrator::new(acme_env()).only(&[Component::SecurityGroups, Component::Roles]);
        assert_eq!(
            orchestrator.component_order().unwrap(),
            vec![Component::Vpc, Component::SecurityGroups, Component::Roles]
        );
    }

    #[test]
    fn test_only_pulls_in_dependencies() {
        let orchestrator = TopologyOrchestrator::new(acme_env()).only(&[Component::Cluster]);
        let order = orchestrator.component_order().unwrap();
        assert_eq!(
            order,
            vec![Component::Roles, Component::LogGroups, Component::Cluster]
        );
    }

    #[test]
    fn test_missing_component_output() {
        let ctx = acme();
        let mut graph = ResourceGraph::new();
        let mut topology = Topology::default();
        let err = topology
            .build_component(Component::Subnets, &ctx, &mut graph)
            .unwrap_err();
        assert!(matches!(
            err,
            AwsError::MissingComponent {
                requester: "subnets",
                missing: "vpc"
            }
        ));
        assert!(err.is_dependency_order());
        assert!(graph.is_empty());
    }

    #[test]
    fn test_preflight_fails_before_any_declaration() {
        let mut env = acme_env();
        env.certificate_arn = None;
        let orchestrator = TopologyOrchestrator::new(env);
        assert!(matches!(orchestrator.preflight(), Err(AwsError::Config(_))));
        assert!(matches!(orchestrator.synthesize(), Err(AwsError::Config(_))));

        let mut env = acme_env();
        env.certificate_arn = None;
        let network_only = TopologyOrchestrator::new(env).only(&[Component::RouteTables]);
        assert!(network_only.synthesize().is_ok());
    }

    #[test]
    fn test_component_from_str() {
        assert_eq!("route-tables".parse::<Component>().unwrap(), Component::RouteTables);
        assert!("nope".parse::<Component>().is_err());
    }
}
