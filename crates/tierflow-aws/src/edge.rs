//! Application load balancer, listeners and target groups
//!
//! Listeners that forward to a target group can only be declared once the
//! target group exists. Each target group descriptor therefore carries an
//! `attach_listener` hook that runs right after the group is declared and
//! returns the listeners to add to the load balancer.

use crate::error::Result;
use crate::naming::{StackContext, name_tag};
use crate::network::{Subnets, Tier, Vpc};
use crate::security::{GroupRole, SecurityGroups};
use serde_json::{Map, Value, json};
use std::fmt;
use tierflow_cloud::{Resource, ResourceGraph, ResourceRef, to_logical_id};

/// TLS policy for HTTPS listeners
pub const SSL_POLICY: &str = "ELBSecurityPolicy-TLS13-1-2-2021-06";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerProtocol {
    Http,
    Https,
}

impl ListenerProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerProtocol::Http => "HTTP",
            ListenerProtocol::Https => "HTTPS",
        }
    }
}

impl fmt::Display for ListenerProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerAction {
    Redirect {
        protocol: ListenerProtocol,
        port: u16,
        status_code: &'static str,
    },
    Forward {
        target_group: ResourceRef,
    },
}

impl ListenerAction {
    /// Permanent redirect to HTTPS on 443
    pub fn redirect_to_https() -> Self {
        ListenerAction::Redirect {
            protocol: ListenerProtocol::Https,
            port: 443,
            status_code: "HTTP_301",
        }
    }

    fn to_value(&self) -> Value {
        match self {
            ListenerAction::Redirect {
                protocol,
                port,
                status_code,
            } => json!({
                "Type": "redirect",
                "RedirectConfig": {
                    "Protocol": protocol.as_str(),
                    "Port": port.to_string(),
                    "StatusCode": status_code,
                },
            }),
            ListenerAction::Forward { target_group } => json!({
                "Type": "forward",
                "TargetGroupArn": target_group.id(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerSpec {
    pub port: u16,
    pub protocol: ListenerProtocol,
    pub action: ListenerAction,
}

/// A listener as declared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredListener {
    pub listener: ResourceRef,
    pub spec: ListenerSpec,
}

#[derive(Debug, Clone)]
pub struct LoadBalancer {
    pub lb: ResourceRef,
    listeners: Vec<DeclaredListener>,
}

impl LoadBalancer {
    /// Dual-stack, internet-facing, in the public subnets behind the edge group
    pub fn build(
        ctx: &StackContext,
        graph: &mut ResourceGraph,
        subnets: &Subnets,
        security: &SecurityGroups,
    ) -> Result<Self> {
        let name = ctx.resource_name("alb");
        let public: Vec<String> = subnets.tier(Tier::Public).iter().map(|s| s.id()).collect();
        let edge = security.group(GroupRole::Edge)?;

        let lb = graph.declare(Resource::new(
            "Alb",
            "AWS::ElasticLoadBalancingV2::LoadBalancer",
            json!({
                "Name": name,
                "Type": "application",
                "Scheme": "internet-facing",
                "IpAddressType": "dualstack",
                "Subnets": public,
                "SecurityGroups": [edge.attr("GroupId")],
                "Tags": name_tag(&name),
            }),
        ))?;

        Ok(Self {
            lb,
            listeners: Vec::new(),
        })
    }

    pub fn add_listener(
        &mut self,
        ctx: &StackContext,
        graph: &mut ResourceGraph,
        spec: ListenerSpec,
    ) -> Result<ResourceRef> {
        let mut props = Map::new();
        props.insert("LoadBalancerArn".to_string(), json!(self.lb.id()));
        props.insert("Port".to_string(), json!(spec.port));
        props.insert("Protocol".to_string(), json!(spec.protocol.as_str()));
        props.insert("DefaultActions".to_string(), json!([spec.action.to_value()]));
        if spec.protocol == ListenerProtocol::Https {
            props.insert("SslPolicy".to_string(), json!(SSL_POLICY));
            props.insert(
                "Certificates".to_string(),
                json!([{ "CertificateArn": ctx.certificate_arn()? }]),
            );
        }

        let listener = graph.declare(Resource::new(
            format!("Listener{}", spec.port),
            "AWS::ElasticLoadBalancingV2::Listener",
            Value::Object(props),
        ))?;
        tracing::debug!("Listener :{} {} -> {:?}", spec.port, spec.protocol, spec.action);

        self.listeners.push(DeclaredListener {
            listener: listener.clone(),
            spec,
        });
        Ok(listener)
    }

    pub fn listeners(&self) -> &[DeclaredListener] {
        &self.listeners
    }

    pub fn listener(&self, port: u16) -> Option<&DeclaredListener> {
        self.listeners.iter().find(|l| l.spec.port == port)
    }
}

/// Listeners to add once the target group exists
pub type AttachListener = fn(&ResourceRef) -> Vec<ListenerSpec>;

#[derive(Debug, Clone, Copy)]
pub struct TargetGroupDescriptor {
    pub logical_name: &'static str,
    pub port: u16,
    pub protocol: ListenerProtocol,
    pub attach_listener: Option<AttachListener>,
}

/// :80 redirects, :443 terminates TLS and forwards to `target_group`
pub fn app_listeners(target_group: &ResourceRef) -> Vec<ListenerSpec> {
    vec![
        ListenerSpec {
            port: 80,
            protocol: ListenerProtocol::Http,
            action: ListenerAction::redirect_to_https(),
        },
        ListenerSpec {
            port: 443,
            protocol: ListenerProtocol::Https,
            action: ListenerAction::Forward {
                target_group: target_group.clone(),
            },
        },
    ]
}

const TARGET_GROUPS: [TargetGroupDescriptor; 1] = [TargetGroupDescriptor {
    logical_name: "app-target-group",
    port: 80,
    protocol: ListenerProtocol::Http,
    attach_listener: Some(app_listeners),
}];

#[derive(Debug, Clone)]
pub struct TargetGroups {
    groups: Vec<(&'static str, ResourceRef)>,
}

impl TargetGroups {
    pub fn build(
        ctx: &StackContext,
        graph: &mut ResourceGraph,
        vpc: &Vpc,
        lb: &mut LoadBalancer,
    ) -> Result<Self> {
        Self::build_from(ctx, graph, vpc, lb, &TARGET_GROUPS)
    }

    pub fn build_from(
        ctx: &StackContext,
        graph: &mut ResourceGraph,
        vpc: &Vpc,
        lb: &mut LoadBalancer,
        descriptors: &[TargetGroupDescriptor],
    ) -> Result<Self> {
        let mut groups = Vec::new();
        for descriptor in descriptors {
            let name = ctx.resource_name(descriptor.logical_name);
            let target_group = graph.declare(Resource::new(
                to_logical_id(descriptor.logical_name),
                "AWS::ElasticLoadBalancingV2::TargetGroup",
                json!({
                    "Name": name,
                    "Port": descriptor.port,
                    "Protocol": descriptor.protocol.as_str(),
                    "TargetType": "ip",
                    "HealthCheckPath": "/",
                    "HealthCheckProtocol": "HTTP",
                    "HealthCheckPort": "traffic-port",
                    "VpcId": vpc.vpc.id(),
                    "Tags": name_tag(&name),
                }),
            ))?;

            if let Some(attach) = descriptor.attach_listener {
                for spec in attach(&target_group) {
                    lb.add_listener(ctx, graph, spec)?;
                }
            }

            // Ref on a target group yields its ARN
            graph.exports_mut().export_from(
                &target_group,
                ctx.export_path(descriptor.logical_name, "arn"),
                target_group.id(),
            );
            groups.push((descriptor.logical_name, target_group));
        }
        Ok(Self { groups })
    }

    pub fn get(&self, logical_name: &str) -> Option<&ResourceRef> {
        self.groups
            .iter()
            .find(|(n, _)| *n == logical_name)
            .map(|(_, r)| r)
    }

    /// The application target group
    pub fn app(&self) -> Option<&ResourceRef> {
        self.get("app-target-group")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::test_support::{acme, acme_env};

    fn build(ctx: &StackContext) -> Result<(ResourceGraph, LoadBalancer, TargetGroups)> {
        let mut graph = ResourceGraph::new();
        let vpc = Vpc::build(ctx, &mut graph)?;
        let subnets = Subnets::build(ctx, &mut graph, &vpc)?;
        let security = SecurityGroups::build(ctx, &mut graph, &vpc)?;
        let mut lb = LoadBalancer::build(ctx, &mut graph, &subnets, &security)?;
        let tgs = TargetGroups::build(ctx, &mut graph, &vpc, &mut lb)?;
        Ok((graph, lb, tgs))
    }

    #[test]
    fn test_listener_wiring() {
        let (graph, lb, tgs) = build(&acme()).unwrap();
        let tg = tgs.app().unwrap();

        let http = lb.listener(80).unwrap();
        assert_eq!(http.listener.logical_id(), "Listener80");
        assert_eq!(
            http.spec.action,
            ListenerAction::Redirect {
                protocol: ListenerProtocol::Https,
                port: 443,
                status_code: "HTTP_301"
            }
        );

        let https = lb.listener(443).unwrap();
        assert_eq!(
            https.spec.action,
            ListenerAction::Forward {
                target_group: tg.clone()
            }
        );

        let declared = graph.get("Listener443").unwrap();
        assert_eq!(declared.properties["SslPolicy"], SSL_POLICY);
        assert_eq!(
            declared.properties["DefaultActions"][0]["TargetGroupArn"],
            "${AppTargetGroup}"
        );
        assert_eq!(
            declared.properties["Certificates"][0]["CertificateArn"],
            "arn:aws:acm:ap-northeast-1:111111111111:certificate/test"
        );
        assert!(graph.get("Listener80").unwrap().properties.get("SslPolicy").is_none());
    }

    #[test]
    fn test_load_balancer_placement() {
        let (graph, _, _) = build(&acme()).unwrap();
        let alb = graph.get("Alb").unwrap();
        assert_eq!(
            alb.properties["Subnets"],
            json!(["${SubnetPublic1a}", "${SubnetPublic1c}"])
        );
        assert_eq!(alb.properties["IpAddressType"], "dualstack");
        assert_eq!(alb.properties["SecurityGroups"], json!(["${AlbSg.GroupId}"]));
    }

    #[test]
    fn test_target_group_export() {
        let (graph, _, _) = build(&acme()).unwrap();
        assert_eq!(
            graph.exports().value("/acme-app-target-group/arn"),
            Some("${AppTargetGroup}")
        );
        let tg = graph.get("AppTargetGroup").unwrap();
        assert_eq!(tg.properties["TargetType"], "ip");
        assert_eq!(tg.properties["HealthCheckPort"], "traffic-port");
    }

    #[test]
    fn test_https_listener_requires_certificate() {
        let mut env = acme_env();
        env.certificate_arn = None;
        let err = build(&StackContext::new(env)).unwrap_err();
        assert!(matches!(err, crate::AwsError::Config(_)));
    }
}
