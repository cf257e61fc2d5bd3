//! Unit tests for stack request validation and assembly.

use super::*;
use rstest::rstest;

fn request() -> StackRequest {
    StackRequest::new(
        "lab",
        "lb",
        "Lab",
        TopologyRequest::new("eu-west-1", 2),
        WorkloadRequest::new("nginx", "app", 256, 512, 80),
    )
}

#[rstest]
fn validate_rejects_empty_prefix() {
    let mut invalid = request();
    invalid.prefix = String::new();
    assert_eq!(invalid.validate(), Err(StackError::EmptyPrefix));
}

#[rstest]
#[case("")]
#[case("toolong!")]
fn validate_rejects_bad_short_prefixes(#[case] short_prefix: &str) {
    let mut invalid = request();
    invalid.short_prefix = short_prefix.to_owned();
    assert_eq!(
        invalid.validate(),
        Err(StackError::InvalidShortPrefix {
            length: short_prefix.len()
        })
    );
}

#[rstest]
fn build_stack_exports_the_load_balancer_dns_name() {
    let plan = build_stack(&request()).expect("stack should build");
    let output = plan.outputs().get(OUTPUT_URL).expect("url exported");
    assert_eq!(output.attribute, "dns_name");
    assert_eq!(output.resource, "lab-alb");
}

#[rstest]
fn build_stack_declares_the_resource_group_with_the_project_marker() {
    let plan = build_stack(&request()).expect("stack should build");
    let group = plan.get("lab-resource-group").expect("group declared");
    let Some(crate::plan::Value::Str(query)) = group.properties.get("resource_query") else {
        panic!("resource query missing");
    };
    assert!(query.contains("\"Lab\""));
}

#[rstest]
fn build_stack_fails_before_declaring_on_invalid_topology() {
    let mut invalid = request();
    invalid.topology.az_count = 0;
    let err = build_stack(&invalid).expect_err("zero zones should fail");
    assert!(matches!(
        err,
        StackError::Topology(TopologyError::NoZones)
    ));
}

#[rstest]
fn build_stack_fails_on_container_name_mismatch() {
    let mut invalid = request();
    invalid.workload = invalid.workload.binding(crate::workload::TargetBinding {
        container_name: String::from("web"),
        container_port: 80,
    });
    let err = build_stack(&invalid).expect_err("mismatch should fail");
    assert!(matches!(
        err,
        StackError::Workload(WorkloadError::ContainerNameMismatch { .. })
    ));
}
