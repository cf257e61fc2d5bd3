//! Declaration-graph data model consumed by the provisioning runtime.
//!
//! A [`Plan`] is an ordered set of typed resource declarations plus the
//! reference edges between them. Declarations may only reference resources
//! declared earlier, so insertion order is always a valid topological order
//! and the runtime never has to sort the graph itself. All collections are
//! ordered maps, so serializing the same plan twice yields byte-identical
//! output.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resource types the core knows how to declare.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Tag-query resource group used for out-of-band discovery.
    ResourceGroup,
    /// Network boundary owning all subnets.
    Vpc,
    /// Public or private subnet within one availability zone.
    Subnet,
    /// Internet gateway terminating the shared ingress path.
    InternetGateway,
    /// Elastic address bound to a NAT gateway.
    ElasticIp,
    /// Per-zone NAT gateway anchoring an egress path.
    NatGateway,
    /// Route table (shared public or per-zone private).
    RouteTable,
    /// Association linking a subnet to a route table.
    RouteTableAssociation,
    /// Security group scoping inbound HTTP and unrestricted outbound.
    SecurityGroup,
    /// Load balancer spanning every public subnet.
    LoadBalancer,
    /// IP-target group scoped to the network boundary.
    TargetGroup,
    /// Listener binding the load balancer to the target group.
    Listener,
    /// Execution role assumed by the container execution service.
    Role,
    /// Managed policy attachment on the execution role.
    RolePolicyAttachment,
    /// Container cluster hosting the workload service.
    Cluster,
    /// Immutable task definition for the workload container.
    TaskDefinition,
    /// Mutable desired-count wrapper binding the workload together.
    Service,
}

/// Reference to an attribute of another declaration.
///
/// References stand in for values that only exist once the provisioning
/// runtime has materialized the target resource; until then they are the
/// pending half of the pending/resolved pair.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Reference {
    /// Name of the declaration being referenced.
    pub resource: String,
    /// Attribute of the materialized resource (for example `id` or `arn`).
    pub attribute: String,
}

impl Reference {
    /// Creates a reference to an arbitrary attribute.
    #[must_use]
    pub fn new(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            attribute: attribute.into(),
        }
    }

    /// Creates a reference to the target's provider identifier.
    #[must_use]
    pub fn id(resource: impl Into<String>) -> Self {
        Self::new(resource, "id")
    }

    /// Creates a reference to the target's provider ARN.
    #[must_use]
    pub fn arn(resource: impl Into<String>) -> Self {
        Self::new(resource, "arn")
    }
}

/// Attribute value carried by a declaration.
///
/// Literal values are known at build time; [`Value::Ref`] values resolve
/// only once the referenced resource has been materialized by the runtime.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean literal.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// String literal.
    Str(String),
    /// Reference to a not-yet-materialized attribute.
    Ref(Reference),
    /// Ordered list of values.
    List(Vec<Value>),
    /// Ordered map of values (nested blocks such as routes).
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Convenience constructor for string literals.
    #[must_use]
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    /// Collects every reference reachable from this value.
    pub(crate) fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        match self {
            Self::Ref(reference) => out.push(reference),
            Self::List(items) => {
                for item in items {
                    item.collect_references(out);
                }
            }
            Self::Map(entries) => {
                for item in entries.values() {
                    item.collect_references(out);
                }
            }
            Self::Bool(_) | Self::Int(_) | Self::Str(_) => {}
        }
    }
}

impl From<Reference> for Value {
    fn from(value: Reference) -> Self {
        Self::Ref(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// A single typed resource declaration.
///
/// Identity is the assigned name; declarations are immutable once pushed
/// into a [`Plan`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    /// Stack-unique name assigned by the naming module.
    pub name: String,
    /// Resource type.
    pub kind: ResourceKind,
    /// Declared attributes, literal or referencing earlier declarations.
    pub properties: BTreeMap<String, Value>,
    /// Provider tags (always carrying `Name` and `Project`).
    pub tags: BTreeMap<String, String>,
    /// Ordering edges with no attribute dependency.
    pub depends_on: BTreeSet<String>,
}

impl Declaration {
    /// Creates an empty declaration of the given kind.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            properties: BTreeMap::new(),
            tags: BTreeMap::new(),
            depends_on: BTreeSet::new(),
        }
    }

    /// Sets one declared attribute.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Replaces the tag map.
    #[must_use]
    pub fn tags(mut self, tags: BTreeMap<String, String>) -> Self {
        self.tags = tags;
        self
    }

    /// Adds an ordering edge to a resource this declaration must follow.
    #[must_use]
    pub fn requires(mut self, resource: impl Into<String>) -> Self {
        self.depends_on.insert(resource.into());
        self
    }

    /// Returns every reference carried by this declaration's properties.
    #[must_use]
    pub fn references(&self) -> Vec<&Reference> {
        let mut out = Vec::new();
        for value in self.properties.values() {
            value.collect_references(&mut out);
        }
        out
    }
}

/// Errors raised while assembling a plan.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PlanError {
    /// Raised when two declarations share a name.
    #[error("duplicate resource name: {name}")]
    DuplicateName {
        /// Name that was declared twice.
        name: String,
    },
    /// Raised when a declaration references a resource that has not been
    /// declared yet. Forward references would break the structural
    /// topological ordering.
    #[error("declaration `{resource}` references unknown resource `{target}`")]
    UnknownReference {
        /// Name of the declaration carrying the dangling edge.
        resource: String,
        /// Name the edge points at.
        target: String,
    },
    /// Raised when an exported output references an undeclared resource.
    #[error("output `{output}` references unknown resource `{target}`")]
    UnknownOutput {
        /// Output key being exported.
        output: String,
        /// Name the output points at.
        target: String,
    },
}

/// Ordered, reference-checked set of declarations plus exported outputs.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Plan {
    declarations: Vec<Declaration>,
    outputs: BTreeMap<String, Reference>,
    #[serde(skip)]
    names: BTreeSet<String>,
}

impl Plan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a declaration, enforcing name uniqueness and that every
    /// reference and ordering edge targets an earlier declaration.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::DuplicateName`] when the name is already taken
    /// and [`PlanError::UnknownReference`] when an edge dangles.
    pub fn declare(&mut self, declaration: Declaration) -> Result<(), PlanError> {
        if self.names.contains(&declaration.name) {
            return Err(PlanError::DuplicateName {
                name: declaration.name,
            });
        }
        for reference in declaration.references() {
            if !self.names.contains(&reference.resource) {
                return Err(PlanError::UnknownReference {
                    resource: declaration.name.clone(),
                    target: reference.resource.clone(),
                });
            }
        }
        for target in &declaration.depends_on {
            if !self.names.contains(target) {
                return Err(PlanError::UnknownReference {
                    resource: declaration.name.clone(),
                    target: target.clone(),
                });
            }
        }
        self.names.insert(declaration.name.clone());
        self.declarations.push(declaration);
        Ok(())
    }

    /// Exports a named output resolving to an attribute of a declared
    /// resource.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::UnknownOutput`] when the reference targets an
    /// undeclared resource.
    pub fn export(
        &mut self,
        output: impl Into<String>,
        reference: Reference,
    ) -> Result<(), PlanError> {
        let key = output.into();
        if !self.names.contains(&reference.resource) {
            return Err(PlanError::UnknownOutput {
                output: key,
                target: reference.resource,
            });
        }
        self.outputs.insert(key, reference);
        Ok(())
    }

    /// Returns the declarations in topological (insertion) order.
    #[must_use]
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Looks up a declaration by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|decl| decl.name == name)
    }

    /// Returns every declaration of the given kind, in declaration order.
    #[must_use]
    pub fn of_kind(&self, kind: ResourceKind) -> Vec<&Declaration> {
        self.declarations
            .iter()
            .filter(|decl| decl.kind == kind)
            .collect()
    }

    /// Returns the exported outputs.
    #[must_use]
    pub const fn outputs(&self) -> &BTreeMap<String, Reference> {
        &self.outputs
    }
}
