//! Test support utilities shared across unit and integration tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::plan::{Declaration, ResourceKind};
use crate::runtime::{Materialized, ProvisioningRuntime, RuntimeFuture};

/// Operation recorded by [`RecordingRuntime`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RuntimeOperation {
    /// A create call.
    Create,
    /// A read call.
    Read,
    /// An update call.
    Update,
    /// A delete call.
    Delete,
}

/// One recorded runtime invocation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RuntimeCall {
    /// Operation performed.
    pub operation: RuntimeOperation,
    /// Resource name the operation targeted.
    pub name: String,
}

/// Errors raised by the recording runtime.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RecordingRuntimeError {
    /// Raised when a test scripted this resource to fail.
    #[error("scripted failure creating `{name}`")]
    Scripted {
        /// Resource the failure was scripted for.
        name: String,
    },
    /// Raised when a declaration reaches the runtime with pending
    /// references; the driver must resolve them first.
    #[error("declaration `{name}` still carries pending references")]
    PendingReference {
        /// Declaration carrying an unresolved reference.
        name: String,
    },
}

#[derive(Debug, Default)]
struct State {
    existing: BTreeMap<String, Materialized>,
    fail_create: Option<String>,
    sequence: u64,
    calls: Vec<RuntimeCall>,
}

/// In-memory provisioning runtime that materializes fake attributes and
/// records every invocation.
///
/// Used to drive deterministic apply/destroy outcomes without any provider
/// API. State is shared, so cloning yields a handle onto the same runtime.
#[derive(Clone, Debug, Default)]
pub struct RecordingRuntime {
    state: Arc<Mutex<State>>,
}

impl RecordingRuntime {
    /// Creates a runtime with no pre-existing resources.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a pre-existing materialized resource, as if an earlier apply
    /// had created it.
    pub fn seed(&self, record: Materialized) {
        let mut state = self.lock();
        state.existing.insert(record.name.clone(), record);
    }

    /// Scripts the create call for the named resource to fail.
    pub fn fail_create_on(&self, name: impl Into<String>) {
        self.lock().fail_create = Some(name.into());
    }

    /// Returns a snapshot of every recorded invocation.
    #[must_use]
    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.lock().calls.clone()
    }

    /// Returns the currently materialized resource names.
    #[must_use]
    pub fn existing(&self) -> Vec<String> {
        self.lock().existing.keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, operation: RuntimeOperation, name: &str) {
        self.lock().calls.push(RuntimeCall {
            operation,
            name: name.to_owned(),
        });
    }
}

/// Synthesizes provider attributes for a created resource.
fn materialize(declaration: &Declaration, sequence: u64) -> Materialized {
    let mut record = Materialized::new(&declaration.name)
        .attribute("id", format!("res-{sequence:04}"))
        .attribute("arn", format!("arn:aws:fake:::{}", declaration.name))
        .attribute("name", declaration.name.clone());
    if declaration.kind == ResourceKind::LoadBalancer {
        record = record.attribute(
            "dns_name",
            format!("{}.lb.internal.example", declaration.name),
        );
    }
    record
}

impl ProvisioningRuntime for RecordingRuntime {
    type Error = RecordingRuntimeError;

    fn create<'a>(
        &'a self,
        declaration: &'a Declaration,
    ) -> RuntimeFuture<'a, Materialized, Self::Error> {
        Box::pin(async move {
            self.record(RuntimeOperation::Create, &declaration.name);
            if !declaration.references().is_empty() {
                return Err(RecordingRuntimeError::PendingReference {
                    name: declaration.name.clone(),
                });
            }
            let mut state = self.lock();
            if state.fail_create.as_deref() == Some(declaration.name.as_str()) {
                return Err(RecordingRuntimeError::Scripted {
                    name: declaration.name.clone(),
                });
            }
            state.sequence += 1;
            let record = materialize(declaration, state.sequence);
            state
                .existing
                .insert(declaration.name.clone(), record.clone());
            Ok(record)
        })
    }

    fn read<'a>(
        &'a self,
        name: &'a str,
        _kind: ResourceKind,
    ) -> RuntimeFuture<'a, Option<Materialized>, Self::Error> {
        Box::pin(async move {
            self.record(RuntimeOperation::Read, name);
            Ok(self.lock().existing.get(name).cloned())
        })
    }

    fn update<'a>(
        &'a self,
        declaration: &'a Declaration,
    ) -> RuntimeFuture<'a, Materialized, Self::Error> {
        Box::pin(async move {
            self.record(RuntimeOperation::Update, &declaration.name);
            if !declaration.references().is_empty() {
                return Err(RecordingRuntimeError::PendingReference {
                    name: declaration.name.clone(),
                });
            }
            let mut state = self.lock();
            state.sequence += 1;
            let record = state
                .existing
                .get(&declaration.name)
                .cloned()
                .unwrap_or_else(|| materialize(declaration, state.sequence));
            state
                .existing
                .insert(declaration.name.clone(), record.clone());
            Ok(record)
        })
    }

    fn delete<'a>(
        &'a self,
        name: &'a str,
        _kind: ResourceKind,
    ) -> RuntimeFuture<'a, (), Self::Error> {
        Box::pin(async move {
            self.record(RuntimeOperation::Delete, name);
            self.lock().existing.remove(name);
            Ok(())
        })
    }
}
