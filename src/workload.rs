//! Workload layer: cluster, task definition, and service.
//!
//! The task definition is immutable: changing the image or sizing produces
//! a new revision at the provider, while the service is a mutable
//! desired-count wrapper that can be re-applied without touching the task
//! definition. Tasks always launch into the private subnet pool; inbound
//! traffic enters only through the edge layer.

use std::collections::BTreeMap;

use serde_json::json;
use thiserror::Error;

use crate::identity::ExecutionIdentity;
use crate::naming::Namer;
use crate::perimeter::SecurityPerimeter;
use crate::plan::{Declaration, Plan, PlanError, Reference, ResourceKind, Value};

/// Binding between the service's load-balancer registration and the task
/// definition's container.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TargetBinding {
    /// Container name the service registers against the target group.
    pub container_name: String,
    /// Container port registered against the target group.
    pub container_port: u16,
}

/// Inputs to the workload builder.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WorkloadRequest {
    /// Container image reference.
    pub image_uri: String,
    /// Name of the single container in the task definition.
    pub container_name: String,
    /// Task CPU units.
    pub cpu: u32,
    /// Task memory in MiB.
    pub memory: u32,
    /// Port exposed by the container.
    pub container_port: u16,
    /// Number of task copies the service keeps running. Mutable across
    /// applies without recreating the task definition.
    pub desired_count: u32,
    /// Explicit load-balancer binding. Defaults to the task definition's
    /// own container name and port when absent.
    pub binding: Option<TargetBinding>,
}

impl WorkloadRequest {
    /// Creates a request with a desired count of one and a derived binding,
    /// trimming string fields.
    #[must_use]
    pub fn new(
        image_uri: impl Into<String>,
        container_name: impl Into<String>,
        cpu: u32,
        memory: u32,
        container_port: u16,
    ) -> Self {
        Self {
            image_uri: image_uri.into().trim().to_owned(),
            container_name: container_name.into().trim().to_owned(),
            cpu,
            memory,
            container_port,
            desired_count: 1,
            binding: None,
        }
    }

    /// Sets the desired task count.
    #[must_use]
    pub const fn desired_count(mut self, value: u32) -> Self {
        self.desired_count = value;
        self
    }

    /// Sets an explicit load-balancer binding.
    #[must_use]
    pub fn binding(mut self, value: TargetBinding) -> Self {
        self.binding = Some(value);
        self
    }

    /// Validates sizing, the image reference, and binding consistency
    /// before any declaration is emitted.
    ///
    /// # Errors
    ///
    /// Returns [`WorkloadError`] when a field is empty or zero, or when the
    /// binding disagrees with the task definition's container.
    pub fn validate(&self) -> Result<(), WorkloadError> {
        if self.image_uri.is_empty() {
            return Err(WorkloadError::MissingImage);
        }
        if self.container_name.is_empty() {
            return Err(WorkloadError::MissingContainerName);
        }
        if self.cpu == 0 || self.memory == 0 {
            return Err(WorkloadError::InvalidSizing {
                cpu: self.cpu,
                memory: self.memory,
            });
        }
        if self.container_port == 0 {
            return Err(WorkloadError::InvalidPort);
        }
        if let Some(binding) = &self.binding {
            if binding.container_name != self.container_name {
                return Err(WorkloadError::ContainerNameMismatch {
                    declared: self.container_name.clone(),
                    bound: binding.container_name.clone(),
                });
            }
            if binding.container_port != self.container_port {
                return Err(WorkloadError::BindingPortMismatch {
                    declared: self.container_port,
                    bound: binding.container_port,
                });
            }
        }
        Ok(())
    }

    /// Returns the binding the service will register, derived from the task
    /// definition when no explicit binding was supplied.
    fn effective_binding(&self) -> TargetBinding {
        self.binding.clone().unwrap_or_else(|| TargetBinding {
            container_name: self.container_name.clone(),
            container_port: self.container_port,
        })
    }
}

/// Errors raised while validating or building the workload layer.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum WorkloadError {
    /// Raised when the image reference is empty.
    #[error("image_uri must not be empty")]
    MissingImage,
    /// Raised when the container name is empty.
    #[error("container_name must not be empty")]
    MissingContainerName,
    /// Raised when CPU units or memory are zero.
    #[error("task sizing must be non-zero (cpu {cpu}, memory {memory})")]
    InvalidSizing {
        /// Requested CPU units.
        cpu: u32,
        /// Requested memory in MiB.
        memory: u32,
    },
    /// Raised when the container port is zero.
    #[error("container_port must be non-zero")]
    InvalidPort,
    /// Raised when the load-balancer binding names a container other than
    /// the one declared in the task definition. The provisioning runtime
    /// would otherwise reject the service or silently fail to register
    /// targets.
    #[error("binding container `{bound}` does not match declared container `{declared}`")]
    ContainerNameMismatch {
        /// Container name declared in the task definition.
        declared: String,
        /// Container name referenced by the binding.
        bound: String,
    },
    /// Raised when the binding port disagrees with the container's port
    /// mapping.
    #[error("binding port {bound} does not match declared container port {declared}")]
    BindingPortMismatch {
        /// Port declared in the task definition's port mapping.
        declared: u16,
        /// Port referenced by the binding.
        bound: u16,
    },
    /// Raised when no private subnets are supplied for task placement.
    #[error("workload requires at least one private subnet")]
    NoPrivateSubnets,
    /// Raised when a declaration cannot be pushed into the plan.
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// References into the declared workload layer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Workload {
    /// Cluster ARN.
    pub cluster: Reference,
    /// Task definition ARN.
    pub task_definition: Reference,
    /// Service name.
    pub service: Reference,
}

/// Declares the cluster, task definition, and service.
///
/// Tasks launch into the private subnet pool without public addresses and
/// register against the target group using the container name and port
/// from the task definition.
///
/// # Errors
///
/// Returns [`WorkloadError`] when validation fails or a declaration cannot
/// be pushed. Validation runs before anything is declared.
pub fn build_workload(
    plan: &mut Plan,
    namer: &Namer,
    request: &WorkloadRequest,
    private_subnets: &[Reference],
    perimeter: &SecurityPerimeter,
    target_group: &Reference,
    identity: &ExecutionIdentity,
) -> Result<Workload, WorkloadError> {
    request.validate()?;
    if private_subnets.is_empty() {
        return Err(WorkloadError::NoPrivateSubnets);
    }

    let cluster_name = namer.name("ecs-cluster");
    plan.declare(
        Declaration::new(&cluster_name, ResourceKind::Cluster)
            .property("name", cluster_name.clone())
            .tags(namer.tags(&cluster_name)),
    )?;

    let task_name = namer.name("app-task-definition");
    plan.declare(
        Declaration::new(&task_name, ResourceKind::TaskDefinition)
            .property("family", task_name.clone())
            .property("cpu", request.cpu.to_string())
            .property("memory", request.memory.to_string())
            .property("network_mode", "awsvpc")
            .property(
                "requires_compatibilities",
                Value::List(vec![Value::str("FARGATE")]),
            )
            .property("execution_role_arn", identity.role.clone())
            .property("container_definitions", container_definitions(request))
            .tags(namer.tags(&task_name)),
    )?;

    let binding = request.effective_binding();
    let service_name = namer.name("service");
    plan.declare(
        Declaration::new(&service_name, ResourceKind::Service)
            .property("cluster", Reference::arn(&cluster_name))
            .property("task_definition", Reference::arn(&task_name))
            .property("desired_count", i64::from(request.desired_count))
            .property("launch_type", "FARGATE")
            .property(
                "network_configuration",
                Value::Map(BTreeMap::from([
                    (
                        String::from("subnets"),
                        Value::List(private_subnets.iter().cloned().map(Value::Ref).collect()),
                    ),
                    (String::from("assign_public_ip"), Value::Bool(false)),
                    (
                        String::from("security_groups"),
                        Value::List(vec![Value::Ref(perimeter.group.clone())]),
                    ),
                ])),
            )
            .property(
                "load_balancers",
                Value::List(vec![Value::Map(BTreeMap::from([
                    (
                        String::from("container_name"),
                        Value::str(binding.container_name),
                    ),
                    (
                        String::from("container_port"),
                        Value::Int(i64::from(binding.container_port)),
                    ),
                    (
                        String::from("target_group_arn"),
                        Value::Ref(target_group.clone()),
                    ),
                ]))]),
            )
            .tags(namer.tags(&service_name)),
    )?;

    Ok(Workload {
        cluster: Reference::arn(cluster_name),
        task_definition: Reference::arn(task_name),
        service: Reference::new(service_name, "name"),
    })
}

/// Renders the single-container definition document.
fn container_definitions(request: &WorkloadRequest) -> String {
    json!([{
        "name": request.container_name,
        "image": request.image_uri,
        "portMappings": [{
            "containerPort": request.container_port,
            "hostPort": request.container_port,
            "protocol": "tcp",
        }],
    }])
    .to_string()
}

#[cfg(test)]
mod tests;
