//! Security perimeter shared by the edge layer and the workload.

use std::collections::BTreeMap;

use crate::naming::Namer;
use crate::plan::{Declaration, Plan, PlanError, Reference, ResourceKind, Value};

/// Reference to the declared security group.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SecurityPerimeter {
    /// Security group identifier.
    pub group: Reference,
}

/// Declares one security group permitting inbound HTTP and unrestricted
/// outbound traffic, scoped to the network boundary.
///
/// # Errors
///
/// Returns [`PlanError`] when the declaration cannot be pushed into the
/// plan.
pub fn build_perimeter(
    plan: &mut Plan,
    namer: &Namer,
    vpc: &Reference,
    ingress_port: u16,
) -> Result<SecurityPerimeter, PlanError> {
    let name = namer.name("sg");
    plan.declare(
        Declaration::new(&name, ResourceKind::SecurityGroup)
            .property("vpc_id", vpc.clone())
            .property("description", "Enable HTTP access")
            .property(
                "ingress",
                Value::List(vec![permission("tcp", 0, i64::from(ingress_port))]),
            )
            .property("egress", Value::List(vec![permission("-1", 0, 0)]))
            .tags(namer.tags(&name)),
    )?;

    Ok(SecurityPerimeter {
        group: Reference::id(name),
    })
}

/// Builds an any-source permission block for the given protocol and port
/// range.
fn permission(protocol: &str, from_port: i64, to_port: i64) -> Value {
    Value::Map(BTreeMap::from([
        (String::from("protocol"), Value::str(protocol)),
        (String::from("from_port"), Value::Int(from_port)),
        (String::from("to_port"), Value::Int(to_port)),
        (
            String::from("cidr_blocks"),
            Value::List(vec![Value::str("0.0.0.0/0")]),
        ),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn perimeter_scopes_ingress_to_the_listener_port() {
        let mut plan = Plan::new();
        let namer = Namer::new("lab", "lb", "Lab");
        plan.declare(Declaration::new("lab-vpc", ResourceKind::Vpc))
            .expect("vpc");

        let perimeter = build_perimeter(&mut plan, &namer, &Reference::id("lab-vpc"), 80)
            .expect("perimeter should build");
        assert_eq!(perimeter.group, Reference::id("lab-sg"));

        let group = plan.get("lab-sg").expect("security group declared");
        let ingress = group.properties.get("ingress").expect("ingress declared");
        let Value::List(rules) = ingress else {
            panic!("ingress should be a list: {ingress:?}");
        };
        let Some(Value::Map(rule)) = rules.first() else {
            panic!("ingress should hold one rule: {rules:?}");
        };
        assert_eq!(rule.get("to_port"), Some(&Value::Int(80)));
        assert_eq!(rule.get("protocol"), Some(&Value::str("tcp")));
    }
}
