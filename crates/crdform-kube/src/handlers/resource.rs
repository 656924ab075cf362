//! Resource handler: full lifecycle through server-side apply

use crdform_core::schema::{self, Attribute};
use crdform_core::wait::{DeleteWait, WaitCondition};
use crdform_core::{
    AttributePath, Diagnostics, JsonPath, ResourceType, Value, Variant, parse_import_id,
};
use std::sync::Arc;

use super::{build_object, merge_response, object_ref};
use crate::client::ApplyParams;
use crate::error::{HandlerError, HandlerResult};
use crate::provider::ProviderData;
use crate::wait::{wait_for_conditions, wait_for_deletion};

/// Result of refreshing a resource
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    /// Object exists; carries the refreshed state
    Present(Value),
    /// Object is gone and should be dropped from state
    Gone,
}

pub struct ResourceHandler {
    resource_type: Arc<ResourceType>,
    provider: Option<Arc<ProviderData>>,
}

impl ResourceHandler {
    pub fn new(resource_type: Arc<ResourceType>) -> Self {
        Self {
            resource_type,
            provider: None,
        }
    }

    pub fn type_name(&self) -> String {
        self.resource_type.type_name(Variant::Resource)
    }

    pub fn schema(&self) -> Vec<Attribute> {
        self.resource_type.schema(Variant::Resource)
    }

    /// Attach provider data. Resources cannot be managed offline.
    pub fn configure(&mut self, provider: Arc<ProviderData>) -> HandlerResult<()> {
        if provider.offline {
            return Err(HandlerError::Offline {
                operation: "managing resources",
            });
        }
        self.provider = Some(provider);
        Ok(())
    }

    fn provider(&self) -> HandlerResult<&ProviderData> {
        self.provider
            .as_deref()
            .ok_or_else(|| HandlerError::Unconfigured {
                type_name: self.type_name(),
            })
    }

    /// Plan-time validation: schema checks plus the wait blocks
    pub fn validate_config(&self, config: &Value) -> Diagnostics {
        let mut diags = schema::validate_config(&self.schema(), config);

        let upsert = config.get("wait_for_upsert");
        match WaitCondition::list_from_value(upsert) {
            Ok(conditions) => {
                for (i, condition) in conditions.iter().enumerate() {
                    if let Err(e) = JsonPath::parse(&condition.jsonpath) {
                        diags.add_attribute_error(
                            AttributePath::root()
                                .attribute("wait_for_upsert")
                                .index(i)
                                .attribute("jsonpath"),
                            "Invalid wait configuration",
                            e.to_string(),
                        );
                    }
                }
            }
            Err(e) => diags.add_attribute_error(
                AttributePath::root().attribute("wait_for_upsert"),
                "Invalid wait configuration",
                e.to_string(),
            ),
        }
        if let Err(e) = DeleteWait::from_value(config.get("wait_for_delete")) {
            diags.add_attribute_error(
                AttributePath::root().attribute("wait_for_delete"),
                "Invalid wait configuration",
                e.to_string(),
            );
        }
        diags
    }

    pub async fn create(&self, plan: &Value) -> HandlerResult<Value> {
        let id = object_ref(&self.resource_type, plan)?.id();
        self.upsert(plan, id).await
    }

    /// Same patch semantics as create; `id` is carried over from prior state.
    ///
    /// Name and namespace are immutable: a plan that moves the object fails
    /// instead of applying a second object next to the tracked one.
    pub async fn update(&self, plan: &Value, prior: &Value) -> HandlerResult<Value> {
        let target = object_ref(&self.resource_type, plan)?;
        if let Ok(current) = object_ref(&self.resource_type, prior) {
            if current != target {
                return Err(HandlerError::RequiresReplacement {
                    from: current.id(),
                    to: target.id(),
                });
            }
        }
        let id = match prior.get("id").as_str() {
            Some(id) => id.to_string(),
            None => target.id(),
        };
        self.upsert(plan, id).await
    }

    async fn upsert(&self, plan: &Value, id: String) -> HandlerResult<Value> {
        let provider = self.provider()?;
        let client = provider.client("apply")?;
        let identity = &self.resource_type.identity;

        let conditions = WaitCondition::list_from_value(plan.get("wait_for_upsert"))
            .map_err(HandlerError::InvalidWait)?;
        let object = object_ref(&self.resource_type, plan)?;
        let body = build_object(&self.resource_type, Variant::Resource, plan)?;
        let params = ApplyParams {
            field_manager: provider.field_manager_for(plan.get("field_manager")),
            force: provider.force_conflicts_for(plan.get("force_conflicts")),
        };
        tracing::debug!(
            type_name = %self.type_name(),
            object = %object,
            field_manager = %params.field_manager,
            force = params.force,
            "applying resource"
        );

        let response = client
            .apply(identity, &object, &body, &params)
            .await
            .map_err(HandlerError::Patch)?;
        let latest = wait_for_conditions(client, identity, &object, &conditions)
            .await?
            .unwrap_or(response);

        let mut state = self.stamp(plan, id);
        merge_response(&self.resource_type, Variant::Resource, &mut state, &latest)?;
        Ok(state)
    }

    /// State for a plan before any cluster response is merged into it
    pub fn planned_state(&self, plan: &Value) -> HandlerResult<Value> {
        let id = object_ref(&self.resource_type, plan)?.id();
        Ok(self.stamp(plan, id))
    }

    fn stamp(&self, plan: &Value, id: String) -> Value {
        let identity = &self.resource_type.identity;
        let mut state = plan.clone();
        state.set("id", Value::String(id));
        state.set("api_version", Value::String(identity.api_version()));
        state.set("kind", Value::String(identity.kind.clone()));
        state
    }

    /// Refresh state from the cluster. NotFound means the object is gone.
    pub async fn read(&self, state: &Value) -> HandlerResult<ReadOutcome> {
        let client = self.provider()?.client("read")?;
        let object = object_ref(&self.resource_type, state)?;
        tracing::debug!(type_name = %self.type_name(), object = %object, "reading resource");

        let response = match client.get(&self.resource_type.identity, &object).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => {
                tracing::info!(object = %object, "resource no longer exists, removing from state");
                return Ok(ReadOutcome::Gone);
            }
            Err(e) => return Err(HandlerError::Get(e)),
        };

        let mut refreshed = state.clone();
        if refreshed.get("id").is_null() {
            refreshed.set("id", Value::String(object.id()));
        }
        merge_response(&self.resource_type, Variant::Resource, &mut refreshed, &response)?;
        Ok(ReadOutcome::Present(refreshed))
    }

    /// DELETE, then optionally wait for the object to disappear
    pub async fn delete(&self, state: &Value) -> HandlerResult<()> {
        let client = self.provider()?.client("delete")?;
        let identity = &self.resource_type.identity;
        let wait = DeleteWait::from_value(state.get("wait_for_delete"))
            .map_err(HandlerError::InvalidWait)?;
        let object = object_ref(&self.resource_type, state)?;
        tracing::debug!(type_name = %self.type_name(), object = %object, "deleting resource");

        match client.delete(identity, &object).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!(object = %object, "already deleted");
                return Ok(());
            }
            Err(e) => return Err(HandlerError::Delete(e)),
        }

        match wait {
            Some(wait) => wait_for_deletion(client, identity, &object, &wait).await,
            None => Ok(()),
        }
    }

    /// Seed state from an import id
    pub fn import_state(&self, id: &str) -> HandlerResult<Value> {
        let object = parse_import_id(id, self.resource_type.identity.namespaced)
            .map_err(HandlerError::ImportState)?;

        let mut metadata = Value::object();
        metadata.set("name", Value::String(object.name.clone()));
        if let Some(namespace) = &object.namespace {
            metadata.set("namespace", Value::String(namespace.clone()));
        }

        let mut state = Value::object();
        state.set("id", Value::String(object.id()));
        state.set("metadata", metadata);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDynamicClient, Operation};
    use crate::provider::ProviderConfig;
    use crdform_core::ObjectRef;
    use crdform_core::builtin::{certificate, cluster_issuer};
    use serde_json::json;
    use std::time::Duration;

    fn handler_with(client: &MockDynamicClient, config: &ProviderConfig) -> ResourceHandler {
        let mut handler = ResourceHandler::new(Arc::new(certificate()));
        let provider = ProviderData::with_client(Arc::new(client.clone()), config);
        handler.configure(Arc::new(provider)).unwrap();
        handler
    }

    fn handler(client: &MockDynamicClient) -> ResourceHandler {
        handler_with(client, &ProviderConfig::default())
    }

    fn web() -> ObjectRef {
        ObjectRef::namespaced("default", "web")
    }

    fn plan() -> Value {
        Value::from(json!({
            "metadata": {"name": "web", "namespace": "default"},
            "spec": {
                "secret_name": "web-tls",
                "dns_names": ["web.example.com"],
                "issuer_ref": {"name": "letsencrypt", "kind": "ClusterIssuer"}
            }
        }))
    }

    #[tokio::test]
    async fn test_create_applies_and_fills_state() {
        let client = MockDynamicClient::new();
        let handler = handler(&client);

        let state = handler.create(&plan()).await.unwrap();

        assert_eq!(state.get("id").as_str(), Some("default/web"));
        assert_eq!(state.get("api_version").as_str(), Some("cert-manager.io/v1"));
        assert_eq!(state.get("kind").as_str(), Some("Certificate"));
        assert!(state.get_path("metadata.uid").as_str().is_some());
        assert_eq!(state.get_path("spec.secret_name").as_str(), Some("web-tls"));

        let stored = client.object(&certificate().identity, &web()).unwrap();
        assert_eq!(stored["apiVersion"], "cert-manager.io/v1");
        assert_eq!(stored["spec"]["dnsNames"][0], "web.example.com");
        assert_eq!(
            client.last_apply(),
            Some(ApplyParams {
                field_manager: "crdform".to_string(),
                force: false
            })
        );
    }

    #[tokio::test]
    async fn test_resource_overrides_provider_defaults() {
        let client = MockDynamicClient::new();
        let config = ProviderConfig {
            field_manager: "platform".to_string(),
            force_conflicts: true,
            ..Default::default()
        };
        let handler = handler_with(&client, &config);

        let mut plan = plan();
        plan.set("field_manager", Value::from("team-a"));
        plan.set("force_conflicts", Value::Bool(false));
        handler.create(&plan).await.unwrap();

        assert_eq!(
            client.last_apply(),
            Some(ApplyParams {
                field_manager: "team-a".to_string(),
                force: false
            })
        );
    }

    #[tokio::test]
    async fn test_patch_error_is_reported_verbatim() {
        let client = MockDynamicClient::new();
        client.fail_next(Operation::Apply, 409, "Apply failed with 1 conflict");
        let handler = handler(&client);

        let err = handler.create(&plan()).await.unwrap_err();
        assert_eq!(err.summary(), "Unable to PATCH resource");
        assert!(err.to_string().contains("Apply failed with 1 conflict"));
        assert_eq!(client.operation_counts().applies, 1);
    }

    #[tokio::test]
    async fn test_update_keeps_prior_id() {
        let client = MockDynamicClient::new();
        let handler = handler(&client);
        let created = handler.create(&plan()).await.unwrap();

        let mut prior = created.clone();
        prior.set("id", Value::from("legacy-id"));
        let mut next = plan();
        next.object_mut("spec")
            .unwrap()
            .set("secret_name", Value::from("web-tls-2"));

        let updated = handler.update(&next, &prior).await.unwrap();
        assert_eq!(updated.get("id").as_str(), Some("legacy-id"));
        assert_eq!(updated.get_path("spec.secret_name").as_str(), Some("web-tls-2"));
        assert_eq!(updated.get_path("metadata.uid"), created.get_path("metadata.uid"));
        assert_eq!(client.operation_counts().applies, 2);
    }

    #[tokio::test]
    async fn test_update_rejects_rename() {
        let client = MockDynamicClient::new();
        let handler = handler(&client);
        let created = handler.create(&plan()).await.unwrap();

        let mut renamed = plan();
        renamed
            .object_mut("metadata")
            .unwrap()
            .set("name", Value::from("web2"));
        let err = handler.update(&renamed, &created).await.unwrap_err();
        assert_eq!(err.summary(), "Resource Requires Replacement");
        assert!(err.to_string().contains("default/web2"), "{err}");

        let mut moved = plan();
        moved
            .object_mut("metadata")
            .unwrap()
            .set("namespace", Value::from("cert-manager"));
        assert!(handler.update(&moved, &created).await.is_err());

        assert_eq!(client.operation_counts().applies, 1);
        let identity = certificate().identity;
        assert!(client.object(&identity, &web()).is_some());
        assert!(client.object(&identity, &ObjectRef::namespaced("default", "web2")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_waits_for_upsert_condition() {
        let client = MockDynamicClient::new();
        let handler = handler(&client);
        let mut plan = plan();
        plan.set(
            "wait_for_upsert",
            Value::from(json!([{
                "jsonpath": "{.status.conditions[?(@.type==\"Ready\")].status}",
                "value": "True",
                "poll_interval": "1s"
            }])),
        );

        let identity = certificate().identity;
        let waiter = {
            let client = client.clone();
            tokio::spawn(async move {
                // let the apply land before scheduling the status
                while client.object(&identity, &web()).is_none() {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                client.set_status_after(
                    &identity,
                    &web(),
                    2,
                    json!({"conditions": [{"type": "Ready", "status": "True"}]}),
                );
            })
        };

        let state = handler.create(&plan).await.unwrap();
        waiter.await.unwrap();
        assert_eq!(state.get("id").as_str(), Some("default/web"));
        assert!(client.operation_counts().gets >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upsert_timeout_after_mutation() {
        let client = MockDynamicClient::new();
        let handler = handler(&client);
        let mut plan = plan();
        plan.set(
            "wait_for_upsert",
            Value::from(json!([{"jsonpath": ".status.phase", "value": "Issued", "timeout": "0s"}])),
        );

        let err = handler.create(&plan).await.unwrap_err();
        assert_eq!(err.summary(), "Timed out waiting for condition");
        // the object was applied regardless
        assert!(client.object(&certificate().identity, &web()).is_some());
        assert_eq!(client.operation_counts().gets, 1);
    }

    #[tokio::test]
    async fn test_read_present_and_gone() {
        let client = MockDynamicClient::new();
        let handler = handler(&client);
        let state = handler.create(&plan()).await.unwrap();

        client.set_status_after(&certificate().identity, &web(), 0, json!({"ready": true}));
        match handler.read(&state).await.unwrap() {
            ReadOutcome::Present(refreshed) => {
                assert_eq!(refreshed.get("id").as_str(), Some("default/web"))
            }
            ReadOutcome::Gone => panic!("expected object to be present"),
        }

        handler.delete(&state).await.unwrap();
        assert_eq!(handler.read(&state).await.unwrap(), ReadOutcome::Gone);
    }

    #[tokio::test]
    async fn test_read_other_errors_are_reported() {
        let client = MockDynamicClient::new();
        client.fail_next(Operation::Get, 403, "forbidden");
        let handler = handler(&client);

        let err = handler.read(&plan()).await.unwrap_err();
        assert_eq!(err.summary(), "Unable to GET resource");
    }

    #[tokio::test]
    async fn test_delete_not_found_is_success() {
        let client = MockDynamicClient::new();
        let handler = handler(&client);
        handler.delete(&plan()).await.unwrap();
        assert_eq!(client.operation_counts().deletes, 1);
        assert_eq!(client.operation_counts().gets, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_waits_when_configured() {
        let client = MockDynamicClient::new().with_deletion_delay(3);
        let handler = handler(&client);
        let mut state = handler.create(&plan()).await.unwrap();
        state.set(
            "wait_for_delete",
            Value::from(json!({"timeout": "1m", "poll_interval": "2s"})),
        );

        handler.delete(&state).await.unwrap();
        assert_eq!(client.operation_counts().gets, 4);
    }

    #[tokio::test]
    async fn test_delete_without_wait_does_not_poll() {
        let client = MockDynamicClient::new().with_deletion_delay(3);
        let handler = handler(&client);
        let state = handler.create(&plan()).await.unwrap();

        handler.delete(&state).await.unwrap();
        assert_eq!(client.operation_counts().gets, 0);
    }

    #[test]
    fn test_import_state() {
        let handler = ResourceHandler::new(Arc::new(certificate()));
        let state = handler.import_state("cert-manager/web").unwrap();
        assert_eq!(state.get("id").as_str(), Some("cert-manager/web"));
        assert_eq!(state.get_path("metadata.namespace").as_str(), Some("cert-manager"));
        assert_eq!(state.get_path("metadata.name").as_str(), Some("web"));

        for bad in ["web", "a/b/c", "/web", "ns/", ""] {
            let err = handler.import_state(bad).unwrap_err();
            assert_eq!(err.summary(), "Error during ImportState", "{}", bad);
        }
    }

    #[test]
    fn test_import_cluster_scoped() {
        let handler = ResourceHandler::new(Arc::new(cluster_issuer()));
        let state = handler.import_state("letsencrypt").unwrap();
        assert_eq!(state.get("id").as_str(), Some("letsencrypt"));
        assert!(state.get_path("metadata.namespace").is_null());
        assert!(handler.import_state("ns/letsencrypt").is_err());
    }

    #[tokio::test]
    async fn test_unconfigured_and_offline() {
        let handler = ResourceHandler::new(Arc::new(certificate()));
        let err = handler.create(&plan()).await.unwrap_err();
        assert_eq!(err.summary(), "Unexpected Resource Configure Type");

        let mut handler = ResourceHandler::new(Arc::new(certificate()));
        let offline = ProviderData::offline(&ProviderConfig::default());
        let err = handler.configure(Arc::new(offline)).unwrap_err();
        assert_eq!(err.summary(), "Provider in Offline Mode");
    }

    #[test]
    fn test_validate_config() {
        let handler = ResourceHandler::new(Arc::new(certificate()));
        assert!(!handler.validate_config(&plan()).has_error());

        let mut bad = plan();
        bad.set(
            "wait_for_upsert",
            Value::from(json!([{"jsonpath": "status", "value": "x"}])),
        );
        bad.set("wait_for_delete", Value::from(json!({"timeout": "soon"})));
        let diags = handler.validate_config(&bad);
        let summaries: Vec<_> = diags.errors().map(|d| d.to_string()).collect();
        assert_eq!(summaries.len(), 2, "{:?}", summaries);
        assert!(summaries[0].starts_with("Invalid wait configuration (wait_for_upsert[0].jsonpath)"));
        assert!(summaries[1].starts_with("Invalid wait configuration (wait_for_delete)"));
    }
}
