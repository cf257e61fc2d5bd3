//! Execution identity: role and managed policy attachment.
//!
//! The role is an execution-time bootstrap identity only: the container
//! execution service assumes it to pull images and write logs. It never
//! carries in-container application permissions.

use serde_json::json;

use crate::naming::Namer;
use crate::plan::{Declaration, Plan, PlanError, Reference, ResourceKind};

/// Service principal permitted to assume the execution role.
pub const EXECUTION_SERVICE_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";

/// Managed policy granting image pull and log delivery permissions.
pub const EXECUTION_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AmazonECSTaskExecutionRolePolicy";

/// References into the declared execution identity.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutionIdentity {
    /// Execution role ARN, referenced by the task definition.
    pub role: Reference,
}

/// Declares the execution role and its single policy attachment.
///
/// The trust policy permits only the container execution service principal
/// to assume the role. This builder only assembles a syntactically valid
/// document; the provisioning runtime rejects malformed principals or
/// policy ARNs at create time.
///
/// # Errors
///
/// Returns [`PlanError`] when a declaration cannot be pushed into the plan.
pub fn build_identity(plan: &mut Plan, namer: &Namer) -> Result<ExecutionIdentity, PlanError> {
    let role_name = namer.name("task-exec-role");
    plan.declare(
        Declaration::new(&role_name, ResourceKind::Role)
            .property("assume_role_policy", trust_policy().to_string())
            .tags(namer.tags(&role_name)),
    )?;

    let attachment_name = namer.name("task-exec-policy");
    plan.declare(
        Declaration::new(&attachment_name, ResourceKind::RolePolicyAttachment)
            .property("role", Reference::new(&role_name, "name"))
            .property("policy_arn", EXECUTION_POLICY_ARN),
    )?;

    Ok(ExecutionIdentity {
        role: Reference::arn(role_name),
    })
}

/// Assembles the trust policy document for the execution role.
fn trust_policy() -> serde_json::Value {
    json!({
        "Version": "2008-10-17",
        "Statement": [{
            "Sid": "",
            "Effect": "Allow",
            "Principal": { "Service": EXECUTION_SERVICE_PRINCIPAL },
            "Action": "sts:AssumeRole",
        }],
    })
}
