//! Generic handlers driven by a [`ResourceType`]
//!
//! - [`ResourceHandler`]: create/read/update/delete/import through server-side apply
//! - [`DataSourceHandler`]: read only
//! - [`ManifestHandler`]: renders YAML, never touches the cluster

mod data_source;
mod manifest;
mod resource;

pub use data_source::DataSourceHandler;
pub use manifest::ManifestHandler;
pub use resource::{ReadOutcome, ResourceHandler};

use crdform_core::marshal;
use crdform_core::schema::Attribute;
use crdform_core::{CoreError, ObjectRef, ResourceType, Value, Variant};
use serde_json::{Map, Value as JsonValue};

use crate::error::{HandlerError, HandlerResult};

/// Namespace and name of the object a plan or state value describes
pub(crate) fn object_ref(resource_type: &ResourceType, value: &Value) -> HandlerResult<ObjectRef> {
    let metadata = value.get("metadata");
    let name = metadata
        .get("name")
        .as_str()
        .ok_or_else(|| missing("metadata.name"))?;

    if !resource_type.identity.namespaced {
        return Ok(ObjectRef::cluster(name));
    }
    let namespace = metadata
        .get("namespace")
        .as_str()
        .ok_or_else(|| missing("metadata.namespace"))?;
    Ok(ObjectRef::namespaced(namespace, name))
}

fn missing(field: &str) -> HandlerError {
    HandlerError::Marshal(CoreError::MissingField {
        field: field.to_string(),
    })
}

/// Metadata attributes a client may send
fn writable_metadata(resource_type: &ResourceType, variant: Variant) -> Vec<Attribute> {
    resource_type
        .metadata_attribute(variant)
        .attributes()
        .unwrap_or_default()
        .iter()
        .filter(|a| !a.is_read_only())
        .cloned()
        .collect()
}

/// Kubernetes JSON object for a plan: apiVersion/kind stamped, metadata and body marshaled
pub(crate) fn build_object(
    resource_type: &ResourceType,
    variant: Variant,
    plan: &Value,
) -> HandlerResult<JsonValue> {
    let identity = &resource_type.identity;
    let metadata = marshal::to_json(&writable_metadata(resource_type, variant), plan.get("metadata"))
        .map_err(HandlerError::Marshal)?;
    let body = marshal::to_json(&resource_type.body, plan).map_err(HandlerError::Marshal)?;

    let mut object = Map::new();
    object.insert("apiVersion".to_string(), JsonValue::String(identity.api_version()));
    object.insert("kind".to_string(), JsonValue::String(identity.kind.clone()));
    object.insert("metadata".to_string(), JsonValue::Object(metadata));
    object.extend(body);
    Ok(JsonValue::Object(object))
}

/// Overwrite metadata and body attributes of `state` from an API response
pub(crate) fn merge_response(
    resource_type: &ResourceType,
    variant: Variant,
    state: &mut Value,
    response: &JsonValue,
) -> HandlerResult<()> {
    let metadata_attr = resource_type.metadata_attribute(variant);
    let metadata_json = response
        .get("metadata")
        .cloned()
        .unwrap_or_else(|| JsonValue::Object(Map::new()));
    let metadata = marshal::from_json(metadata_attr.attributes().unwrap_or_default(), &metadata_json)
        .map_err(HandlerError::Unmarshal)?;

    let body = marshal::from_json(&resource_type.body, response).map_err(HandlerError::Unmarshal)?;

    state.set("metadata", metadata);
    if let Value::Object(fields) = body {
        for (name, value) in fields {
            state.set(name, value);
        }
    }
    Ok(())
}
