//! Top-level stack assembly.
//!
//! Runs the builders in dependency order against a single plan: network
//! topology first, then the shared security perimeter, the edge layer and
//! execution identity (independent of each other), and finally the
//! workload joining all three. The load balancer's DNS name is exported as
//! the stack's sole output.

use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::edge::{self, EdgeError, LISTENER_PORT};
use crate::identity;
use crate::naming::{Namer, PROJECT_TAG_KEY};
use crate::perimeter;
use crate::plan::{Declaration, Plan, PlanError, ResourceKind};
use crate::topology::{self, TopologyError, TopologyRequest};
use crate::workload::{self, WorkloadError, WorkloadRequest};

/// Output key under which the load balancer's DNS name is exported.
pub const OUTPUT_URL: &str = "url";

/// Longest short prefix the provider accepts for name-prefixed resources.
pub const SHORT_PREFIX_MAX: usize = 6;

/// Full set of inputs required to assemble a stack plan.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StackRequest {
    /// Stack-wide naming prefix.
    pub prefix: String,
    /// Length-constrained naming root.
    pub short_prefix: String,
    /// Project marker applied to every resource's tags.
    pub project: String,
    /// Network topology inputs.
    pub topology: TopologyRequest,
    /// Workload inputs.
    pub workload: WorkloadRequest,
}

impl StackRequest {
    /// Creates a request, trimming the naming fields.
    #[must_use]
    pub fn new(
        prefix: impl Into<String>,
        short_prefix: impl Into<String>,
        project: impl Into<String>,
        topology: TopologyRequest,
        workload: WorkloadRequest,
    ) -> Self {
        Self {
            prefix: prefix.into().trim().to_owned(),
            short_prefix: short_prefix.into().trim().to_owned(),
            project: project.into().trim().to_owned(),
            topology,
            workload,
        }
    }

    /// Validates the naming fields. Topology and workload inputs are
    /// validated by their own builders before they declare anything.
    ///
    /// # Errors
    ///
    /// Returns [`StackError`] when a naming field is empty or the short
    /// prefix exceeds the provider's length cap.
    pub fn validate(&self) -> Result<(), StackError> {
        if self.prefix.is_empty() {
            return Err(StackError::EmptyPrefix);
        }
        if self.short_prefix.is_empty() || self.short_prefix.len() > SHORT_PREFIX_MAX {
            return Err(StackError::InvalidShortPrefix {
                length: self.short_prefix.len(),
            });
        }
        if self.project.is_empty() {
            return Err(StackError::EmptyProject);
        }
        Ok(())
    }
}

/// Errors raised while assembling a stack plan.
///
/// Every variant is a validation-time failure: nothing is handed to the
/// provisioning runtime when assembly fails.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum StackError {
    /// Raised when the stack prefix is empty.
    #[error("prefix must not be empty")]
    EmptyPrefix,
    /// Raised when the short prefix is empty or too long for the provider.
    #[error("short_prefix must be 1 to {SHORT_PREFIX_MAX} characters (got {length})")]
    InvalidShortPrefix {
        /// Length of the rejected short prefix.
        length: usize,
    },
    /// Raised when the project marker is empty.
    #[error("project must not be empty")]
    EmptyProject,
    /// Raised by the network topology builder.
    #[error(transparent)]
    Topology(#[from] TopologyError),
    /// Raised by the edge layer builder.
    #[error(transparent)]
    Edge(#[from] EdgeError),
    /// Raised by the workload builder.
    #[error(transparent)]
    Workload(#[from] WorkloadError),
    /// Raised when a declaration cannot be pushed into the plan.
    #[error(transparent)]
    Plan(#[from] PlanError),
}

/// Assembles the full declaration graph for one deployment.
///
/// Re-running with identical input produces a byte-identical plan, so a
/// partially applied graph converges when the runtime retries only the
/// unmaterialized nodes.
///
/// # Errors
///
/// Returns [`StackError`] when any validation fails; no partial plan
/// escapes this function.
pub fn build_stack(request: &StackRequest) -> Result<Plan, StackError> {
    request.validate()?;
    let namer = Namer::new(&request.prefix, &request.short_prefix, &request.project);
    let mut plan = Plan::new();

    declare_resource_group(&mut plan, &namer)?;

    let network = topology::build_network(&mut plan, &namer, &request.topology)?;
    let boundary = perimeter::build_perimeter(&mut plan, &namer, &network.vpc, LISTENER_PORT)?;
    let edge_layer = edge::build_edge(
        &mut plan,
        &namer,
        &boundary,
        &network.public_subnets,
        &network.vpc,
        request.workload.container_port,
    )?;
    let execution = identity::build_identity(&mut plan, &namer)?;
    workload::build_workload(
        &mut plan,
        &namer,
        &request.workload,
        &network.private_subnets,
        &boundary,
        &edge_layer.target_group,
        &execution,
    )?;

    plan.export(OUTPUT_URL, edge_layer.dns_name)?;

    info!(
        zones = request.topology.az_count,
        declarations = plan.declarations().len(),
        "assembled stack plan"
    );
    Ok(plan)
}

/// Declares the tag-query resource group used for out-of-band discovery of
/// everything carrying the project marker.
fn declare_resource_group(plan: &mut Plan, namer: &Namer) -> Result<(), PlanError> {
    let name = namer.name("resource-group");
    let query = json!({
        "ResourceTypeFilters": ["AWS::AllSupported"],
        "TagFilters": [{
            "Key": PROJECT_TAG_KEY,
            "Values": [namer.project()],
        }],
    });
    plan.declare(
        Declaration::new(&name, ResourceKind::ResourceGroup)
            .property("name", name.clone())
            .property("resource_query", query.to_string())
            .tags(namer.tags(&name)),
    )
}

#[cfg(test)]
mod tests;
