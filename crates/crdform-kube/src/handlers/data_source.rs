//! Data source handler: read-only view of one object

use crdform_core::schema::Attribute;
use crdform_core::{ResourceType, Value, Variant};
use std::sync::Arc;

use super::{merge_response, object_ref};
use crate::error::{HandlerError, HandlerResult};
use crate::provider::ProviderData;

pub struct DataSourceHandler {
    resource_type: Arc<ResourceType>,
    provider: Option<Arc<ProviderData>>,
}

impl DataSourceHandler {
    pub fn new(resource_type: Arc<ResourceType>) -> Self {
        Self {
            resource_type,
            provider: None,
        }
    }

    pub fn type_name(&self) -> String {
        self.resource_type.type_name(Variant::DataSource)
    }

    pub fn schema(&self) -> Vec<Attribute> {
        self.resource_type.schema(Variant::DataSource)
    }

    pub fn configure(&mut self, provider: Arc<ProviderData>) -> HandlerResult<()> {
        if provider.offline {
            return Err(HandlerError::Offline {
                operation: "reading data sources",
            });
        }
        self.provider = Some(provider);
        Ok(())
    }

    /// GET the object named in `config` and fill every computed attribute.
    ///
    /// Unlike the resource read, NotFound is an error here.
    pub async fn read(&self, config: &Value) -> HandlerResult<Value> {
        let provider = self
            .provider
            .as_deref()
            .ok_or_else(|| HandlerError::Unconfigured {
                type_name: self.type_name(),
            })?;
        let client = provider.client("read")?;
        let object = object_ref(&self.resource_type, config)?;
        tracing::debug!(type_name = %self.type_name(), object = %object, "reading data source");

        let response = client
            .get(&self.resource_type.identity, &object)
            .await
            .map_err(HandlerError::Get)?;

        let mut state = config.clone();
        state.set("id", Value::String(object.id()));
        merge_response(&self.resource_type, Variant::DataSource, &mut state, &response)?;
        Ok(state)
    }
}
