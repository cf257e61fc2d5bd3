//! Edge layer: load balancer, target group, and listener.
//!
//! The three resources hold a 1:1:1 relationship and are declared in
//! dependency order. The load balancer spans every public subnet so the
//! edge stays available when a zone fails; the target group uses IP targets
//! because the workload runs without fixed instance identity.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::naming::Namer;
use crate::perimeter::SecurityPerimeter;
use crate::plan::{Declaration, Plan, PlanError, Reference, ResourceKind, Value};

/// Port the listener accepts traffic on. Forwarding is unconditional; this
/// is a single-service topology with no rule evaluation.
pub const LISTENER_PORT: u16 = 80;

/// Errors raised while building the edge layer.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum EdgeError {
    /// Raised when no public subnets are supplied; a load balancer without
    /// subnets cannot exist.
    #[error("edge layer requires at least one public subnet")]
    NoPublicSubnets,
    /// Raised when a declaration cannot be pushed into the plan.
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// References into the declared edge layer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EdgeLayer {
    /// Load balancer ARN.
    pub load_balancer: Reference,
    /// Target group ARN, consumed by the workload's service binding.
    pub target_group: Reference,
    /// Externally resolvable DNS name, exported as the stack's sole output.
    pub dns_name: Reference,
}

/// Declares the load balancer, target group, and listener.
///
/// The load balancer must reference *all* public subnets, not a subset, to
/// remain highly available across zones.
///
/// # Errors
///
/// Returns [`EdgeError::NoPublicSubnets`] for an empty subnet sequence and
/// [`EdgeError::Plan`] when a declaration cannot be pushed.
pub fn build_edge(
    plan: &mut Plan,
    namer: &Namer,
    perimeter: &SecurityPerimeter,
    public_subnets: &[Reference],
    vpc: &Reference,
    target_port: u16,
) -> Result<EdgeLayer, EdgeError> {
    if public_subnets.is_empty() {
        return Err(EdgeError::NoPublicSubnets);
    }

    let balancer_name = namer.name("alb");
    plan.declare(
        Declaration::new(&balancer_name, ResourceKind::LoadBalancer)
            .property("name", balancer_name.clone())
            .property(
                "security_groups",
                Value::List(vec![Value::Ref(perimeter.group.clone())]),
            )
            .property(
                "subnets",
                Value::List(
                    public_subnets
                        .iter()
                        .cloned()
                        .map(Value::Ref)
                        .collect(),
                ),
            )
            .tags(namer.tags(&balancer_name)),
    )?;

    let target_group_name = namer.name("tg");
    plan.declare(
        Declaration::new(&target_group_name, ResourceKind::TargetGroup)
            .property("name_prefix", namer.short_prefix())
            .property("port", i64::from(target_port))
            .property("protocol", "HTTP")
            .property("target_type", "ip")
            .property("vpc_id", vpc.clone())
            .tags(namer.tags(&target_group_name)),
    )?;

    let listener_name = namer.name("listener");
    plan.declare(
        Declaration::new(&listener_name, ResourceKind::Listener)
            .property("load_balancer_arn", Reference::arn(&balancer_name))
            .property("port", i64::from(LISTENER_PORT))
            .property(
                "default_actions",
                Value::List(vec![Value::Map(BTreeMap::from([
                    (String::from("type"), Value::str("forward")),
                    (
                        String::from("target_group_arn"),
                        Value::Ref(Reference::arn(&target_group_name)),
                    ),
                ]))]),
            )
            .tags(namer.tags(&listener_name)),
    )?;

    Ok(EdgeLayer {
        load_balancer: Reference::arn(&balancer_name),
        target_group: Reference::arn(target_group_name),
        dns_name: Reference::new(balancer_name, "dns_name"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn seeded_plan() -> (Plan, Namer, SecurityPerimeter) {
        let mut plan = Plan::new();
        let namer = Namer::new("lab", "lb", "Lab");
        plan.declare(Declaration::new("lab-vpc", ResourceKind::Vpc))
            .expect("vpc");
        plan.declare(Declaration::new("lab-sg", ResourceKind::SecurityGroup))
            .expect("sg");
        let perimeter = SecurityPerimeter {
            group: Reference::id("lab-sg"),
        };
        (plan, namer, perimeter)
    }

    #[rstest]
    fn build_edge_rejects_empty_subnet_sequence() {
        let (mut plan, namer, perimeter) = seeded_plan();
        let err = build_edge(
            &mut plan,
            &namer,
            &perimeter,
            &[],
            &Reference::id("lab-vpc"),
            80,
        )
        .expect_err("empty subnets should fail");
        assert_eq!(err, EdgeError::NoPublicSubnets);
    }

    #[rstest]
    fn load_balancer_spans_every_public_subnet() {
        let (mut plan, namer, perimeter) = seeded_plan();
        for index in 0..3u8 {
            plan.declare(Declaration::new(
                format!("lab-public-subnet-{index}"),
                ResourceKind::Subnet,
            ))
            .expect("subnet");
        }
        let subnets: Vec<Reference> = (0..3u8)
            .map(|index| Reference::id(format!("lab-public-subnet-{index}")))
            .collect();

        let edge = build_edge(
            &mut plan,
            &namer,
            &perimeter,
            &subnets,
            &Reference::id("lab-vpc"),
            8080,
        )
        .expect("edge should build");

        let balancer = plan.get("lab-alb").expect("alb declared");
        let Some(Value::List(spanned)) = balancer.properties.get("subnets") else {
            panic!("subnets property missing");
        };
        assert_eq!(spanned.len(), 3);

        let listener = plan.get("lab-listener").expect("listener declared");
        assert_eq!(
            listener.properties.get("port"),
            Some(&Value::Int(i64::from(LISTENER_PORT)))
        );
        let target_group = plan.get("lab-tg").expect("target group declared");
        assert_eq!(target_group.properties.get("port"), Some(&Value::Int(8080)));
        assert_eq!(edge.dns_name, Reference::new("lab-alb", "dns_name"));
    }
}
