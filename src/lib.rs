//! Core library for the netloom topology builder.
//!
//! netloom expands a small set of scalar parameters (region, zone count,
//! sizing, image reference) into a complete multi-AZ network topology and
//! a load-balanced container service, expressed as a deterministic
//! declaration graph. An external provisioning runtime, abstracted behind
//! [`runtime::ProvisioningRuntime`], materializes the graph in topological
//! order; the core never performs provider calls itself.

pub mod config;
pub mod edge;
pub mod identity;
pub mod naming;
pub mod perimeter;
pub mod plan;
pub mod runtime;
pub mod stack;
pub mod test_support;
pub mod topology;
pub mod workload;

pub use config::{ConfigError, StackConfig, StackOverrides};
pub use edge::{EdgeError, EdgeLayer, LISTENER_PORT};
pub use identity::ExecutionIdentity;
pub use naming::Namer;
pub use perimeter::SecurityPerimeter;
pub use plan::{Declaration, Plan, PlanError, Reference, ResourceKind, Value};
pub use runtime::{
    ApplyDriver, ApplyError, ApplyOutcome, Materialized, ProvisioningRuntime, RuntimeFuture,
};
pub use stack::{OUTPUT_URL, StackError, StackRequest, build_stack};
pub use topology::{BOUNDARY_CIDR, MAX_ZONES, NetworkTopology, TopologyError, TopologyRequest};
pub use workload::{TargetBinding, Workload, WorkloadError, WorkloadRequest};
