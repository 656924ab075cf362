//! Manifest handler: renders YAML without a cluster

use crdform_core::schema::Attribute;
use crdform_core::{CoreError, ResourceType, Value, Variant};
use std::sync::Arc;

use super::{build_object, object_ref};
use crate::error::{HandlerError, HandlerResult};

pub struct ManifestHandler {
    resource_type: Arc<ResourceType>,
}

impl ManifestHandler {
    pub fn new(resource_type: Arc<ResourceType>) -> Self {
        Self { resource_type }
    }

    pub fn type_name(&self) -> String {
        self.resource_type.type_name(Variant::Manifest)
    }

    pub fn schema(&self) -> Vec<Attribute> {
        self.resource_type.schema(Variant::Manifest)
    }

    /// Render the plan as a manifest and store it in `yaml`
    pub fn read(&self, plan: &Value) -> HandlerResult<Value> {
        let object = object_ref(&self.resource_type, plan)?;
        let manifest = build_object(&self.resource_type, Variant::Manifest, plan)?;
        let yaml = serde_yaml::to_string(&manifest).map_err(|e| {
            HandlerError::Marshal(CoreError::Marshal {
                path: "yaml".to_string(),
                message: e.to_string(),
            })
        })?;
        tracing::debug!(type_name = %self.type_name(), object = %object, "rendered manifest");

        let mut state = plan.clone();
        state.set("id", Value::String(object.id()));
        state.set("yaml", Value::String(yaml));
        Ok(state)
    }
}
