//! Determinism and change-isolation tests for assembled plans.

use netloom::{Plan, StackRequest, TopologyRequest, WorkloadRequest, build_stack};
use rstest::rstest;

fn request(image_uri: &str, desired_count: u32) -> StackRequest {
    StackRequest::new(
        "lab",
        "lb",
        "Lab",
        TopologyRequest::new("eu-west-1", 2),
        WorkloadRequest::new(image_uri, "app", 256, 512, 80).desired_count(desired_count),
    )
}

fn changed_declarations(left: &Plan, right: &Plan) -> Vec<String> {
    assert_eq!(left.declarations().len(), right.declarations().len());
    left.declarations()
        .iter()
        .zip(right.declarations())
        .filter(|(a, b)| a != b)
        .map(|(a, _)| a.name.clone())
        .collect()
}

#[rstest]
fn identical_input_produces_byte_identical_plans() {
    let first = build_stack(&request("nginx", 1)).expect("first build");
    let second = build_stack(&request("nginx", 1)).expect("second build");

    let first_json = serde_json::to_string(&first).expect("first serializes");
    let second_json = serde_json::to_string(&second).expect("second serializes");
    assert_eq!(first_json, second_json);
}

#[rstest]
fn changing_the_image_touches_only_the_task_definition() {
    let before = build_stack(&request("nginx", 1)).expect("baseline build");
    let after = build_stack(&request("nginx:1.27", 1)).expect("updated build");

    assert_eq!(
        changed_declarations(&before, &after),
        ["lab-app-task-definition"]
    );
    assert_eq!(before.outputs(), after.outputs());
}

#[rstest]
fn changing_the_desired_count_touches_only_the_service() {
    let before = build_stack(&request("nginx", 1)).expect("baseline build");
    let after = build_stack(&request("nginx", 4)).expect("scaled build");

    assert_eq!(changed_declarations(&before, &after), ["lab-service"]);
}
