//! Mock dynamic client for testing
//!
//! Keeps objects in memory and mimics the parts of API server behaviour the
//! handlers depend on: server-populated metadata, objects lingering for a few
//! reads after DELETE (finalizers), status appearing after some reads, and
//! injected failures.

use async_trait::async_trait;
use crdform_core::{ObjectRef, ResourceIdentity};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::{Value as JsonValue, json};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use crate::client::{ApplyParams, DynamicClient};
use crate::error::{KubeError, Result};

/// Operation kinds, for counting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Apply,
    Delete,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub gets: usize,
    pub applies: usize,
    pub deletes: usize,
}

type Key = (String, String);

#[derive(Default)]
struct Stored {
    object: JsonValue,
    /// Reads left before a deleted object disappears
    deleting: Option<usize>,
    /// Status to install after that many more reads
    pending_status: Option<(usize, JsonValue)>,
}

#[derive(Default)]
struct MockState {
    objects: HashMap<Key, Stored>,
    operations: OperationCounts,
    last_apply: Option<ApplyParams>,
    failures: HashMap<Operation, (u16, String)>,
    deletion_reads: usize,
    next_uid: u64,
    resource_version: u64,
}

/// In-memory [`DynamicClient`] for testing
#[derive(Clone, Default)]
pub struct MockDynamicClient {
    state: Arc<RwLock<MockState>>,
}

fn key(identity: &ResourceIdentity, object: &ObjectRef) -> Key {
    (identity.type_name(), object.id())
}

impl MockDynamicClient {
    /// Create a new empty mock client
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> RwLockWriteGuard<'_, MockState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deleted objects stay visible for `reads` more GETs
    pub fn with_deletion_delay(self, reads: usize) -> Self {
        self.state().deletion_reads = reads;
        self
    }

    /// Store an object as-is
    pub fn insert(&self, identity: &ResourceIdentity, object: &ObjectRef, value: JsonValue) {
        self.state().objects.insert(
            key(identity, object),
            Stored {
                object: value,
                ..Default::default()
            },
        );
    }

    /// Current stored object
    pub fn object(&self, identity: &ResourceIdentity, object: &ObjectRef) -> Option<JsonValue> {
        self.state()
            .objects
            .get(&key(identity, object))
            .map(|stored| stored.object.clone())
    }

    /// Install `status` once the object has been read `after_reads` more times
    pub fn set_status_after(
        &self,
        identity: &ResourceIdentity,
        object: &ObjectRef,
        after_reads: usize,
        status: JsonValue,
    ) {
        let mut state = self.state();
        if let Some(stored) = state.objects.get_mut(&key(identity, object)) {
            if after_reads == 0 {
                stored.object["status"] = status;
            } else {
                stored.pending_status = Some((after_reads, status));
            }
        }
    }

    /// Make the next call of `operation` fail with an API error
    pub fn fail_next(&self, operation: Operation, code: u16, message: &str) {
        self.state()
            .failures
            .insert(operation, (code, message.to_string()));
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.state().operations.clone()
    }

    /// Reset operation counts
    pub fn reset_counts(&self) {
        self.state().operations = OperationCounts::default();
    }

    /// Parameters of the most recent apply
    pub fn last_apply(&self) -> Option<ApplyParams> {
        self.state().last_apply.clone()
    }
}

impl MockState {
    fn take_failure(&mut self, operation: Operation) -> Result<()> {
        match self.failures.remove(&operation) {
            Some((code, message)) => Err(KubeError::Api(kube::Error::Api(
                kube::core::ErrorResponse {
                    status: "Failure".to_string(),
                    message,
                    reason: reason_for(code).to_string(),
                    code,
                },
            ))),
            None => Ok(()),
        }
    }

    fn not_found(identity: &ResourceIdentity, object: &ObjectRef) -> KubeError {
        KubeError::NotFound {
            kind: identity.kind.clone(),
            name: object.id(),
        }
    }

    /// Merge an applied body into the stored object, filling server-side metadata
    fn merge(&mut self, existing: Option<JsonValue>, body: &JsonValue) -> Result<JsonValue> {
        let mut merged = existing.unwrap_or_else(|| json!({}));

        let mut meta: ObjectMeta =
            serde_json::from_value(merged.get("metadata").cloned().unwrap_or(json!({})))?;
        let applied: ObjectMeta =
            serde_json::from_value(body.get("metadata").cloned().unwrap_or(json!({})))?;

        meta.name = applied.name.or(meta.name);
        meta.namespace = applied.namespace.or(meta.namespace);
        meta.labels = applied.labels;
        meta.annotations = applied.annotations;
        if meta.uid.is_none() {
            self.next_uid += 1;
            meta.uid = Some(format!("00000000-0000-0000-0000-{:012x}", self.next_uid));
        }
        self.resource_version += 1;
        meta.resource_version = Some(self.resource_version.to_string());
        meta.generation = Some(meta.generation.unwrap_or(0) + 1);

        if let (Some(target), Some(fields)) = (merged.as_object_mut(), body.as_object()) {
            for (k, v) in fields {
                if k != "metadata" && k != "status" {
                    target.insert(k.clone(), v.clone());
                }
            }
            target.insert("metadata".to_string(), serde_json::to_value(&meta)?);
        }
        Ok(merged)
    }
}

fn reason_for(code: u16) -> &'static str {
    match code {
        403 => "Forbidden",
        404 => "NotFound",
        409 => "Conflict",
        422 => "Invalid",
        _ => "InternalError",
    }
}

#[async_trait]
impl DynamicClient for MockDynamicClient {
    async fn get(&self, identity: &ResourceIdentity, object: &ObjectRef) -> Result<JsonValue> {
        let mut state = self.state();
        state.operations.gets += 1;
        state.take_failure(Operation::Get)?;

        let key = key(identity, object);
        let Some(stored) = state.objects.get_mut(&key) else {
            return Err(MockState::not_found(identity, object));
        };

        if let Some(remaining) = stored.deleting {
            if remaining == 0 {
                state.objects.remove(&key);
                return Err(MockState::not_found(identity, object));
            }
            stored.deleting = Some(remaining - 1);
        }

        if let Some((reads, status)) = stored.pending_status.take() {
            if reads <= 1 {
                stored.object["status"] = status;
            } else {
                stored.pending_status = Some((reads - 1, status));
            }
        }

        Ok(stored.object.clone())
    }

    async fn apply(
        &self,
        identity: &ResourceIdentity,
        object: &ObjectRef,
        body: &JsonValue,
        params: &ApplyParams,
    ) -> Result<JsonValue> {
        let mut state = self.state();
        state.operations.applies += 1;
        state.last_apply = Some(params.clone());
        state.take_failure(Operation::Apply)?;

        let key = key(identity, object);
        let existing = state.objects.remove(&key);
        let (previous, pending_status) = match existing {
            Some(stored) => (Some(stored.object), stored.pending_status),
            None => (None, None),
        };
        let merged = state.merge(previous, body)?;
        state.objects.insert(
            key,
            Stored {
                object: merged.clone(),
                deleting: None,
                pending_status,
            },
        );
        Ok(merged)
    }

    async fn delete(&self, identity: &ResourceIdentity, object: &ObjectRef) -> Result<()> {
        let mut state = self.state();
        state.operations.deletes += 1;
        state.take_failure(Operation::Delete)?;

        let key = key(identity, object);
        let delay = state.deletion_reads;
        match state.objects.get_mut(&key) {
            None => Err(MockState::not_found(identity, object)),
            Some(stored) if delay > 0 => {
                stored.deleting.get_or_insert(delay);
                Ok(())
            }
            Some(_) => {
                state.objects.remove(&key);
                Ok(())
            }
        }
    }
}
