//! CRD YAML parser
//!
//! Parses CustomResourceDefinition manifests into a structured [`CrdSchema`].

use serde::Deserialize;
use serde_json::Value;

use super::schema::{
    AdditionalProperties, CrdNames, CrdSchema, CrdScope, CrdVersionSchema, OpenApiSchema,
    PropertyType, SchemaProperty,
};
use crate::error::{CoreError, Result};

/// Parser for CRD YAML manifests
pub struct CrdParser;

impl CrdParser {
    /// Parse every CRD in a (possibly multi-document) YAML stream.
    ///
    /// Documents of other kinds are skipped.
    pub fn parse_all(yaml: &str) -> Result<Vec<CrdSchema>> {
        let mut crds = Vec::new();
        for document in serde_yaml::Deserializer::from_str(yaml) {
            let value = Value::deserialize(document)?;
            if value.is_null() {
                continue;
            }
            if value.get("kind").and_then(Value::as_str) == Some("CustomResourceDefinition") {
                crds.push(Self::parse_value(&value)?);
            }
        }
        Ok(crds)
    }

    /// Parse a single CRD manifest
    pub fn parse(yaml: &str) -> Result<CrdSchema> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::parse_value(&value)
    }

    /// Parse from a serde_json::Value (useful for dynamic objects)
    pub fn parse_value(value: &Value) -> Result<CrdSchema> {
        let kind = value
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("Missing 'kind' field"))?;

        if kind != "CustomResourceDefinition" {
            return Err(invalid(&format!(
                "Expected CustomResourceDefinition, got {}",
                kind
            )));
        }

        let name = value
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("Missing 'metadata.name' field"))?
            .to_string();

        let spec = value
            .get("spec")
            .ok_or_else(|| invalid("Missing 'spec' field"))?;

        let group = spec
            .get("group")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("Missing 'spec.group' field"))?
            .to_string();

        let scope = match spec.get("scope").and_then(Value::as_str) {
            Some("Cluster") => CrdScope::Cluster,
            _ => CrdScope::Namespaced,
        };

        let names = Self::parse_names(spec.get("names"))?;
        let versions = Self::parse_versions(spec.get("versions"))?;

        Ok(CrdSchema {
            name,
            group,
            scope,
            names,
            versions,
        })
    }

    fn parse_names(names_value: Option<&Value>) -> Result<CrdNames> {
        let names = names_value.ok_or_else(|| invalid("Missing 'spec.names' field"))?;

        let kind = names
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("Missing 'spec.names.kind' field"))?
            .to_string();
        let plural = names
            .get("plural")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("Missing 'spec.names.plural' field"))?
            .to_string();

        Ok(CrdNames {
            kind,
            plural,
            singular: names
                .get("singular")
                .and_then(Value::as_str)
                .map(String::from),
            short_names: string_list(names.get("shortNames")).unwrap_or_default(),
        })
    }

    fn parse_versions(versions_value: Option<&Value>) -> Result<Vec<CrdVersionSchema>> {
        let versions = versions_value
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("Missing 'spec.versions' array"))?;

        versions.iter().map(Self::parse_version).collect()
    }

    fn parse_version(version: &Value) -> Result<CrdVersionSchema> {
        let name = version
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("Version missing 'name' field"))?
            .to_string();

        let schema = version
            .get("schema")
            .and_then(|s| s.get("openAPIV3Schema"))
            .map(Self::parse_openapi_schema);

        Ok(CrdVersionSchema {
            name,
            served: version
                .get("served")
                .and_then(Value::as_bool)
                .unwrap_or(true),
            storage: version
                .get("storage")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            deprecated: version
                .get("deprecated")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            deprecation_warning: version
                .get("deprecationWarning")
                .and_then(Value::as_str)
                .map(String::from),
            schema,
        })
    }

    fn parse_openapi_schema(schema: &Value) -> OpenApiSchema {
        OpenApiSchema {
            properties: schema
                .get("properties")
                .and_then(Value::as_object)
                .map(|obj| {
                    obj.iter()
                        .map(|(k, v)| (k.clone(), Self::parse_schema_property(v)))
                        .collect()
                })
                .unwrap_or_default(),
            required: string_list(schema.get("required")).unwrap_or_default(),
            x_preserve_unknown: flag(schema, "x-kubernetes-preserve-unknown-fields"),
        }
    }

    /// Parse a single schema property (recursive)
    fn parse_schema_property(prop: &Value) -> SchemaProperty {
        let type_ = prop
            .get("type")
            .and_then(Value::as_str)
            .map(PropertyType::parse)
            .unwrap_or_default();

        let properties = prop
            .get("properties")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| (k.clone(), Self::parse_schema_property(v)))
                    .collect()
            });

        let items = prop
            .get("items")
            .map(|v| Box::new(Self::parse_schema_property(v)));

        let additional_properties = prop.get("additionalProperties").map(|v| match v {
            Value::Bool(true) => AdditionalProperties::Allowed,
            Value::Bool(false) => AdditionalProperties::Denied,
            schema => AdditionalProperties::Schema(Box::new(Self::parse_schema_property(schema))),
        });

        // oneOf: [{required: [a]}, {required: [b]}]
        let one_of_required = prop
            .get("oneOf")
            .and_then(Value::as_array)
            .map(|alternatives| {
                alternatives
                    .iter()
                    .filter_map(|alt| string_list(alt.get("required")))
                    .filter(|required| !required.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        SchemaProperty {
            type_,
            description: prop
                .get("description")
                .and_then(Value::as_str)
                .map(String::from),
            default: prop.get("default").cloned(),
            format: prop.get("format").and_then(Value::as_str).map(String::from),
            pattern: prop
                .get("pattern")
                .and_then(Value::as_str)
                .map(String::from),
            enum_values: prop.get("enum").and_then(Value::as_array).cloned(),
            minimum: prop.get("minimum").and_then(Value::as_f64),
            maximum: prop.get("maximum").and_then(Value::as_f64),
            min_length: prop.get("minLength").and_then(Value::as_u64),
            max_length: prop.get("maxLength").and_then(Value::as_u64),
            min_items: prop.get("minItems").and_then(Value::as_u64),
            max_items: prop.get("maxItems").and_then(Value::as_u64),
            nullable: flag(prop, "nullable"),
            properties,
            required: string_list(prop.get("required")),
            items,
            additional_properties,
            one_of_required,
            x_preserve_unknown: flag(prop, "x-kubernetes-preserve-unknown-fields"),
            x_int_or_string: flag(prop, "x-kubernetes-int-or-string"),
        }
    }
}

fn invalid(message: &str) -> CoreError {
    CoreError::InvalidCrd {
        message: message.to_string(),
    }
}

fn flag(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    value.and_then(Value::as_array).map(|arr| {
        arr.iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect()
    })
}
