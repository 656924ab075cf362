//! Dynamic Kubernetes client
//!
//! Handlers only ever need three calls against a single object: GET,
//! server-side apply PATCH and DELETE. [`DynamicClient`] abstracts exactly
//! those so the handlers can run against [`KubeDynamicClient`] in production
//! and [`MockDynamicClient`](crate::MockDynamicClient) in tests.

use async_trait::async_trait;
use crdform_core::{ObjectRef, ResourceIdentity};
use kube::api::{Api, DeleteParams, DynamicObject, GroupVersionKind, Patch, PatchParams};
use kube::discovery::ApiResource;
use serde_json::Value as JsonValue;

use crate::error::{KubeError, Result};

/// Server-side apply parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyParams {
    pub field_manager: String,
    pub force: bool,
}

/// Object-level operations against the API server
///
/// Implementations must be Send + Sync for use across async tasks.
#[async_trait]
pub trait DynamicClient: Send + Sync {
    /// GET one object
    async fn get(&self, identity: &ResourceIdentity, object: &ObjectRef) -> Result<JsonValue>;

    /// Server-side apply `body` and return the object the server stored
    async fn apply(
        &self,
        identity: &ResourceIdentity,
        object: &ObjectRef,
        body: &JsonValue,
        params: &ApplyParams,
    ) -> Result<JsonValue>;

    /// DELETE one object
    async fn delete(&self, identity: &ResourceIdentity, object: &ObjectRef) -> Result<()>;
}

/// [`DynamicClient`] backed by a `kube::Client`
#[derive(Clone)]
pub struct KubeDynamicClient {
    client: kube::Client,
}

impl KubeDynamicClient {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    /// Get the underlying Kubernetes client
    pub fn kube_client(&self) -> &kube::Client {
        &self.client
    }

    /// Create an Api client scoped to the object's namespace (or the cluster)
    fn api(&self, identity: &ResourceIdentity, object: &ObjectRef) -> Api<DynamicObject> {
        let api_resource = api_resource(identity);
        match object.namespace.as_deref() {
            Some(ns) if identity.namespaced => {
                Api::namespaced_with(self.client.clone(), ns, &api_resource)
            }
            _ => Api::all_with(self.client.clone(), &api_resource),
        }
    }
}

/// ApiResource for a resource identity, without discovery
pub fn api_resource(identity: &ResourceIdentity) -> ApiResource {
    let gvk = GroupVersionKind::gvk(&identity.group, &identity.version, &identity.kind);
    ApiResource::from_gvk_with_plural(&gvk, &identity.plural)
}

#[async_trait]
impl DynamicClient for KubeDynamicClient {
    async fn get(&self, identity: &ResourceIdentity, object: &ObjectRef) -> Result<JsonValue> {
        tracing::debug!(resource = %identity, object = %object, "GET");
        let obj = self.api(identity, object).get(&object.name).await?;
        Ok(serde_json::to_value(obj)?)
    }

    async fn apply(
        &self,
        identity: &ResourceIdentity,
        object: &ObjectRef,
        body: &JsonValue,
        params: &ApplyParams,
    ) -> Result<JsonValue> {
        tracing::debug!(
            resource = %identity,
            object = %object,
            field_manager = %params.field_manager,
            force = params.force,
            "PATCH (server-side apply)"
        );
        let mut patch_params = PatchParams::apply(&params.field_manager);
        patch_params.force = params.force;

        let obj = self
            .api(identity, object)
            .patch(&object.name, &patch_params, &Patch::Apply(body))
            .await?;
        Ok(serde_json::to_value(obj)?)
    }

    async fn delete(&self, identity: &ResourceIdentity, object: &ObjectRef) -> Result<()> {
        tracing::debug!(resource = %identity, object = %object, "DELETE");
        let params = DeleteParams {
            propagation_policy: Some(kube::api::PropagationPolicy::Background),
            ..Default::default()
        };
        self.api(identity, object)
            .delete(&object.name, &params)
            .await
            .map(|_| ())
            .map_err(KubeError::Api)
    }
}
