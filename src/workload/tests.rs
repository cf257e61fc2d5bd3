//! Unit tests for workload validation and declaration shape.

use super::*;
use rstest::rstest;

fn request() -> WorkloadRequest {
    WorkloadRequest::new("nginx", "app", 256, 512, 80)
}

fn seeded() -> (Plan, Namer, SecurityPerimeter, ExecutionIdentity) {
    let mut plan = Plan::new();
    let namer = Namer::new("lab", "lb", "Lab");
    plan.declare(Declaration::new("lab-sg", ResourceKind::SecurityGroup))
        .expect("sg");
    plan.declare(Declaration::new("lab-tg", ResourceKind::TargetGroup))
        .expect("tg");
    plan.declare(Declaration::new("lab-task-exec-role", ResourceKind::Role))
        .expect("role");
    plan.declare(Declaration::new(
        "lab-private-subnet-0",
        ResourceKind::Subnet,
    ))
    .expect("subnet");
    let perimeter = SecurityPerimeter {
        group: Reference::id("lab-sg"),
    };
    let identity = ExecutionIdentity {
        role: Reference::arn("lab-task-exec-role"),
    };
    (plan, namer, perimeter, identity)
}

#[rstest]
fn validate_accepts_matching_binding() {
    let checked = request()
        .binding(TargetBinding {
            container_name: String::from("app"),
            container_port: 80,
        })
        .validate();
    assert_eq!(checked, Ok(()));
}

#[rstest]
fn validate_rejects_container_name_mismatch() {
    let err = request()
        .binding(TargetBinding {
            container_name: String::from("web"),
            container_port: 80,
        })
        .validate()
        .expect_err("mismatched binding should fail");
    assert_eq!(
        err,
        WorkloadError::ContainerNameMismatch {
            declared: String::from("app"),
            bound: String::from("web"),
        }
    );
}

#[rstest]
fn validate_rejects_binding_port_mismatch() {
    let err = request()
        .binding(TargetBinding {
            container_name: String::from("app"),
            container_port: 8080,
        })
        .validate()
        .expect_err("mismatched port should fail");
    assert_eq!(
        err,
        WorkloadError::BindingPortMismatch {
            declared: 80,
            bound: 8080,
        }
    );
}

#[rstest]
#[case::empty_image("  ", "app", 256, 80, WorkloadError::MissingImage)]
#[case::empty_container("nginx", " ", 256, 80, WorkloadError::MissingContainerName)]
#[case::zero_cpu("nginx", "app", 0, 80, WorkloadError::InvalidSizing { cpu: 0, memory: 512 })]
#[case::zero_port("nginx", "app", 256, 0, WorkloadError::InvalidPort)]
fn validate_rejects_incomplete_requests(
    #[case] image_uri: &str,
    #[case] container_name: &str,
    #[case] cpu: u32,
    #[case] container_port: u16,
    #[case] expected: WorkloadError,
) {
    let err = WorkloadRequest::new(image_uri, container_name, cpu, 512, container_port)
        .validate()
        .expect_err("request should be rejected");
    assert_eq!(err, expected);
}

#[rstest]
fn build_workload_requires_private_subnets() {
    let (mut plan, namer, perimeter, identity) = seeded();
    let err = build_workload(
        &mut plan,
        &namer,
        &request(),
        &[],
        &perimeter,
        &Reference::arn("lab-tg"),
        &identity,
    )
    .expect_err("empty private pool should fail");
    assert_eq!(err, WorkloadError::NoPrivateSubnets);
}

#[rstest]
fn service_launches_into_private_subnets_without_public_addresses() {
    let (mut plan, namer, perimeter, identity) = seeded();
    build_workload(
        &mut plan,
        &namer,
        &request(),
        &[Reference::id("lab-private-subnet-0")],
        &perimeter,
        &Reference::arn("lab-tg"),
        &identity,
    )
    .expect("workload should build");

    let service = plan.get("lab-service").expect("service declared");
    let Some(Value::Map(network)) = service.properties.get("network_configuration") else {
        panic!("network configuration missing");
    };
    assert_eq!(network.get("assign_public_ip"), Some(&Value::Bool(false)));
    let Some(Value::List(subnets)) = network.get("subnets") else {
        panic!("subnets missing");
    };
    assert_eq!(
        subnets.first(),
        Some(&Value::Ref(Reference::id("lab-private-subnet-0")))
    );
}

#[rstest]
fn binding_container_name_matches_task_definition() {
    let (mut plan, namer, perimeter, identity) = seeded();
    build_workload(
        &mut plan,
        &namer,
        &request(),
        &[Reference::id("lab-private-subnet-0")],
        &perimeter,
        &Reference::arn("lab-tg"),
        &identity,
    )
    .expect("workload should build");

    let task = plan
        .get("lab-app-task-definition")
        .expect("task definition declared");
    let Some(Value::Str(definitions)) = task.properties.get("container_definitions") else {
        panic!("container definitions missing");
    };
    let parsed: serde_json::Value =
        serde_json::from_str(definitions).expect("definitions should parse");
    let declared_name = parsed
        .pointer("/0/name")
        .and_then(serde_json::Value::as_str)
        .expect("container name declared");

    let service = plan.get("lab-service").expect("service declared");
    let Some(Value::List(bindings)) = service.properties.get("load_balancers") else {
        panic!("load balancer bindings missing");
    };
    let Some(Value::Map(binding)) = bindings.first() else {
        panic!("binding missing");
    };
    assert_eq!(binding.get("container_name"), Some(&Value::str(declared_name)));
}

#[rstest]
fn desired_count_is_declared_on_the_service_only() {
    let (mut plan, namer, perimeter, identity) = seeded();
    build_workload(
        &mut plan,
        &namer,
        &request().desired_count(3),
        &[Reference::id("lab-private-subnet-0")],
        &perimeter,
        &Reference::arn("lab-tg"),
        &identity,
    )
    .expect("workload should build");

    let service = plan.get("lab-service").expect("service declared");
    assert_eq!(
        service.properties.get("desired_count"),
        Some(&Value::Int(3))
    );
    let task = plan
        .get("lab-app-task-definition")
        .expect("task definition declared");
    assert!(!task.properties.contains_key("desired_count"));
}
