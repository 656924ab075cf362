//! Schema-driven conversion between plan/state values and Kubernetes JSON
//!
//! Marshaling walks the schema, renames attributes to their JSON field names and
//! drops null and unknown values (the `omitempty` behaviour the API server
//! expects for server-side apply). Unmarshaling walks the same schema over a
//! JSON object and ignores fields the schema does not declare.

use serde_json::{Map, Number, Value as JsonValue};
use std::collections::BTreeMap;

use crate::diagnostics::AttributePath;
use crate::error::{CoreError, Result};
use crate::schema::{Attribute, AttributeType};
use crate::value::Value;

/// Marshal an object value into a JSON object
pub fn to_json(attributes: &[Attribute], value: &Value) -> Result<Map<String, JsonValue>> {
    marshal_object(attributes, value, &AttributePath::root())
}

/// Unmarshal a JSON object into an object value
pub fn from_json(attributes: &[Attribute], json: &JsonValue) -> Result<Value> {
    unmarshal_object(attributes, json, &AttributePath::root())
}

fn marshal_object(
    attributes: &[Attribute],
    value: &Value,
    path: &AttributePath,
) -> Result<Map<String, JsonValue>> {
    let mut out = Map::new();
    if !value.is_known() {
        return Ok(out);
    }
    let Some(fields) = value.as_object() else {
        return Err(marshal_error(path, "expected an object"));
    };

    for attribute in attributes {
        let Some(field) = fields.get(&attribute.name) else {
            continue;
        };
        if !field.is_known() {
            continue;
        }
        let attr_path = path.attribute(&attribute.name);
        out.insert(
            attribute.json_name.clone(),
            marshal_value(&attribute.ty, field, &attr_path)?,
        );
    }
    Ok(out)
}

fn marshal_value(ty: &AttributeType, value: &Value, path: &AttributePath) -> Result<JsonValue> {
    match (ty, value) {
        (_, Value::Null | Value::Unknown) => Ok(JsonValue::Null),
        (AttributeType::String, Value::String(s)) => Ok(JsonValue::String(s.clone())),
        (AttributeType::Int64, Value::Number(n)) if n.is_i64() => Ok(JsonValue::Number(n.clone())),
        (AttributeType::Float64, Value::Number(n)) => Ok(JsonValue::Number(n.clone())),
        (AttributeType::Bool, Value::Bool(b)) => Ok(JsonValue::Bool(*b)),
        (AttributeType::Dynamic, v) => Ok(v.to_json()),
        (AttributeType::List { element }, Value::List(items)) => items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_known())
            .map(|(i, item)| marshal_value(element, item, &path.index(i)))
            .collect::<Result<Vec<_>>>()
            .map(JsonValue::Array),
        (AttributeType::Map { element }, Value::Object(map)) => map
            .iter()
            .filter(|(_, item)| item.is_known())
            .map(|(k, item)| Ok((k.clone(), marshal_value(element, item, &path.key(k))?)))
            .collect::<Result<Map<_, _>>>()
            .map(JsonValue::Object),
        (AttributeType::Object { attributes }, Value::Object(_)) => {
            marshal_object(attributes, value, path).map(JsonValue::Object)
        }
        (ty, _) => Err(marshal_error(path, &format!("expected {}", ty.describe()))),
    }
}

fn unmarshal_object(
    attributes: &[Attribute],
    json: &JsonValue,
    path: &AttributePath,
) -> Result<Value> {
    let Some(fields) = json.as_object() else {
        return Err(unmarshal_error(path, "expected an object"));
    };

    let mut out = BTreeMap::new();
    for attribute in attributes {
        let attr_path = path.attribute(&attribute.name);
        let value = match fields.get(&attribute.json_name) {
            Some(field) => unmarshal_value(&attribute.ty, field, &attr_path)?,
            None => Value::Null,
        };
        out.insert(attribute.name.clone(), value);
    }
    Ok(Value::Object(out))
}

fn unmarshal_value(ty: &AttributeType, json: &JsonValue, path: &AttributePath) -> Result<Value> {
    match (ty, json) {
        (_, JsonValue::Null) => Ok(Value::Null),
        (AttributeType::String, JsonValue::String(s)) => Ok(Value::String(s.clone())),
        // int-or-string fields are declared as strings
        (AttributeType::String, JsonValue::Number(n)) => Ok(Value::String(n.to_string())),
        (AttributeType::Int64, JsonValue::Number(n)) if n.is_i64() => Ok(Value::Number(n.clone())),
        (AttributeType::Int64, JsonValue::Number(n)) => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| Value::Number(Number::from(f as i64)))
            .ok_or_else(|| unmarshal_error(path, &format!("{} is not an int64", n))),
        (AttributeType::Float64, JsonValue::Number(n)) => Ok(Value::Number(n.clone())),
        (AttributeType::Bool, JsonValue::Bool(b)) => Ok(Value::Bool(*b)),
        (AttributeType::Dynamic, json) => Ok(Value::from(json.clone())),
        (AttributeType::List { element }, JsonValue::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| unmarshal_value(element, item, &path.index(i)))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        (AttributeType::Map { element }, JsonValue::Object(map)) => map
            .iter()
            .map(|(k, item)| Ok((k.clone(), unmarshal_value(element, item, &path.key(k))?)))
            .collect::<Result<BTreeMap<_, _>>>()
            .map(Value::Object),
        (AttributeType::Object { attributes }, JsonValue::Object(_)) => {
            unmarshal_object(attributes, json, path)
        }
        (ty, json) => Err(unmarshal_error(
            path,
            &format!("expected {}, got {}", ty.describe(), json_kind(json)),
        )),
    }
}

fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn marshal_error(path: &AttributePath, message: &str) -> CoreError {
    CoreError::Marshal {
        path: path.to_string(),
        message: message.to_string(),
    }
}

fn unmarshal_error(path: &AttributePath, message: &str) -> CoreError {
    CoreError::Unmarshal {
        path: path.to_string(),
        message: message.to_string(),
    }
}
