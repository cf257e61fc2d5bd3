//! Boundary with the external provisioning runtime.
//!
//! The core emits declarations; a [`ProvisioningRuntime`] knows how to
//! create, read, update, and delete them against a real provider. The
//! [`ApplyDriver`] walks a plan in topological order, substituting
//! materialized attributes for pending references before each call. The
//! driver has no retry policy of its own: a failed apply reports the
//! failing resource and stops, and re-running the same plan converges by
//! reusing whatever already exists.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tracing::{debug, info};

use crate::plan::{Declaration, Plan, Reference, ResourceKind, Value};

/// Future returned by runtime operations.
pub type RuntimeFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Attributes of a resource the runtime has materialized.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Materialized {
    /// Declaration name this record belongs to.
    pub name: String,
    /// Provider attributes (for example `id`, `arn`, `dns_name`).
    pub attributes: BTreeMap<String, String>,
}

impl Materialized {
    /// Creates an empty record for the named declaration.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Adds one materialized attribute.
    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Looks up a materialized attribute.
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.attributes.get(attribute).map(String::as_str)
    }
}

/// Minimal interface implemented by provisioning runtimes.
///
/// Implementations own credentials, transport, and per-resource API
/// mechanics; the core never sees any of that.
pub trait ProvisioningRuntime {
    /// Provider-specific error type returned by the runtime.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Creates the resource described by a fully resolved declaration and
    /// returns its materialized attributes.
    fn create<'a>(
        &'a self,
        declaration: &'a Declaration,
    ) -> RuntimeFuture<'a, Materialized, Self::Error>;

    /// Reads the resource with the given name, returning `None` when it
    /// does not exist.
    fn read<'a>(
        &'a self,
        name: &'a str,
        kind: ResourceKind,
    ) -> RuntimeFuture<'a, Option<Materialized>, Self::Error>;

    /// Re-applies a fully resolved declaration to an existing resource,
    /// converging mutable attributes such as a service's desired count.
    fn update<'a>(
        &'a self,
        declaration: &'a Declaration,
    ) -> RuntimeFuture<'a, Materialized, Self::Error>;

    /// Deletes the resource with the given name.
    fn delete<'a>(
        &'a self,
        name: &'a str,
        kind: ResourceKind,
    ) -> RuntimeFuture<'a, (), Self::Error>;
}

/// Raised when a reference points at an attribute the runtime has not
/// materialized.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("declaration `{resource}` references `{target}.{attribute}` which is not materialized")]
pub struct UnresolvedReference {
    /// Declaration carrying the pending reference.
    pub resource: String,
    /// Referenced resource name.
    pub target: String,
    /// Referenced attribute.
    pub attribute: String,
}

/// Errors surfaced while driving a plan through a runtime.
///
/// Failures are reported per resource; already-materialized branches are
/// left in place for a later re-run to converge.
#[derive(Debug, Error)]
pub enum ApplyError<RuntimeError>
where
    RuntimeError: std::error::Error + 'static,
{
    /// Raised when creating a resource fails.
    #[error("failed to create `{name}`: {source}")]
    Create {
        /// Declaration that failed to create.
        name: String,
        /// Provider-specific error.
        #[source]
        source: RuntimeError,
    },
    /// Raised when reading a resource's current state fails.
    #[error("failed to read `{name}`: {source}")]
    Read {
        /// Declaration whose state could not be read.
        name: String,
        /// Provider-specific error.
        #[source]
        source: RuntimeError,
    },
    /// Raised when re-applying a declaration to an existing resource fails.
    #[error("failed to update `{name}`: {source}")]
    Update {
        /// Declaration that failed to update.
        name: String,
        /// Provider-specific error.
        #[source]
        source: RuntimeError,
    },
    /// Raised when deleting a resource fails.
    #[error("failed to delete `{name}`: {source}")]
    Delete {
        /// Declaration that failed to delete.
        name: String,
        /// Provider-specific error.
        #[source]
        source: RuntimeError,
    },
    /// Raised when a declaration references an unmaterialized attribute.
    #[error(transparent)]
    Unresolved(#[from] UnresolvedReference),
    /// Raised when an exported output cannot be resolved after apply.
    #[error("output `{output}` references `{target}.{attribute}` which is not materialized")]
    UnresolvedOutput {
        /// Output key being resolved.
        output: String,
        /// Referenced resource name.
        target: String,
        /// Referenced attribute.
        attribute: String,
    },
}

/// Result of a successful apply.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ApplyOutcome {
    /// Names of resources created by this run, in creation order.
    pub created: Vec<String>,
    /// Names of resources that already existed and were re-applied.
    pub updated: Vec<String>,
    /// Exported outputs resolved to their materialized values.
    pub outputs: BTreeMap<String, String>,
}

/// Walks plans through a provisioning runtime in topological order.
#[derive(Debug)]
pub struct ApplyDriver<R: ProvisioningRuntime> {
    runtime: R,
}

impl<R: ProvisioningRuntime> ApplyDriver<R> {
    /// Creates a driver over the given runtime.
    #[must_use]
    pub const fn new(runtime: R) -> Self {
        Self { runtime }
    }

    /// Materializes every declaration in plan order.
    ///
    /// Declarations whose resources already exist are re-applied through
    /// [`ProvisioningRuntime::update`], which converges mutable attributes
    /// and makes a re-run after a partial failure pick up where it
    /// stopped.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError`] naming the first resource that failed; the
    /// error leaves earlier materializations in place.
    pub async fn apply(&self, plan: &Plan) -> Result<ApplyOutcome, ApplyError<R::Error>> {
        let mut materialized: BTreeMap<String, Materialized> = BTreeMap::new();
        let mut outcome = ApplyOutcome::default();

        for declaration in plan.declarations() {
            let resolved = resolve_declaration(declaration, &materialized)?;
            let existing = self
                .runtime
                .read(&declaration.name, declaration.kind)
                .await
                .map_err(|source| ApplyError::Read {
                    name: declaration.name.clone(),
                    source,
                })?;

            let record = if existing.is_some() {
                debug!(name = %declaration.name, "resource exists; re-applying");
                let record = self.runtime.update(&resolved).await.map_err(|source| {
                    ApplyError::Update {
                        name: declaration.name.clone(),
                        source,
                    }
                })?;
                outcome.updated.push(declaration.name.clone());
                record
            } else {
                info!(name = %declaration.name, kind = ?declaration.kind, "creating resource");
                let record = self.runtime.create(&resolved).await.map_err(|source| {
                    ApplyError::Create {
                        name: declaration.name.clone(),
                        source,
                    }
                })?;
                outcome.created.push(declaration.name.clone());
                record
            };
            materialized.insert(declaration.name.clone(), record);
        }

        for (output, reference) in plan.outputs() {
            let value = materialized
                .get(&reference.resource)
                .and_then(|record| record.get(&reference.attribute))
                .ok_or_else(|| ApplyError::UnresolvedOutput {
                    output: output.clone(),
                    target: reference.resource.clone(),
                    attribute: reference.attribute.clone(),
                })?;
            outcome.outputs.insert(output.clone(), value.to_owned());
        }

        Ok(outcome)
    }

    /// Deletes every existing resource in reverse plan order and returns
    /// the deleted names.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError`] naming the first resource that failed to
    /// read or delete.
    pub async fn destroy(&self, plan: &Plan) -> Result<Vec<String>, ApplyError<R::Error>> {
        let mut deleted = Vec::new();
        for declaration in plan.declarations().iter().rev() {
            let existing = self
                .runtime
                .read(&declaration.name, declaration.kind)
                .await
                .map_err(|source| ApplyError::Read {
                    name: declaration.name.clone(),
                    source,
                })?;
            if existing.is_none() {
                continue;
            }
            info!(name = %declaration.name, "deleting resource");
            self.runtime
                .delete(&declaration.name, declaration.kind)
                .await
                .map_err(|source| ApplyError::Delete {
                    name: declaration.name.clone(),
                    source,
                })?;
            deleted.push(declaration.name.clone());
        }
        Ok(deleted)
    }
}

/// Substitutes materialized attributes for every reference in the
/// declaration's properties.
fn resolve_declaration(
    declaration: &Declaration,
    materialized: &BTreeMap<String, Materialized>,
) -> Result<Declaration, UnresolvedReference> {
    let properties = declaration
        .properties
        .iter()
        .map(|(key, value)| {
            resolve_value(&declaration.name, value, materialized)
                .map(|resolved_value| (key.clone(), resolved_value))
        })
        .collect::<Result<BTreeMap<String, Value>, UnresolvedReference>>()?;
    let mut resolved = declaration.clone();
    resolved.properties = properties;
    Ok(resolved)
}

/// Recursively resolves one value against the materialized records.
fn resolve_value(
    owner: &str,
    value: &Value,
    materialized: &BTreeMap<String, Materialized>,
) -> Result<Value, UnresolvedReference> {
    match value {
        Value::Ref(reference) => resolve_reference(owner, reference, materialized),
        Value::List(items) => items
            .iter()
            .map(|item| resolve_value(owner, item, materialized))
            .collect::<Result<Vec<Value>, UnresolvedReference>>()
            .map(Value::List),
        Value::Map(entries) => entries
            .iter()
            .map(|(key, item)| {
                resolve_value(owner, item, materialized).map(|resolved| (key.clone(), resolved))
            })
            .collect::<Result<BTreeMap<String, Value>, UnresolvedReference>>()
            .map(Value::Map),
        Value::Bool(_) | Value::Int(_) | Value::Str(_) => Ok(value.clone()),
    }
}

/// Resolves a single pending reference to its materialized value.
fn resolve_reference(
    owner: &str,
    reference: &Reference,
    materialized: &BTreeMap<String, Materialized>,
) -> Result<Value, UnresolvedReference> {
    materialized
        .get(&reference.resource)
        .and_then(|record| record.get(&reference.attribute))
        .map(Value::str)
        .ok_or_else(|| UnresolvedReference {
            resource: owner.to_owned(),
            target: reference.resource.clone(),
            attribute: reference.attribute.clone(),
        })
}
