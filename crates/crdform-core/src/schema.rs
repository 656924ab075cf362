//! Schema declaration and validation
//!
//! A resource type's schema is a tree of [`Attribute`]s. Each attribute binds a
//! snake_case attribute name to the JSON field name used by the Kubernetes API,
//! declares its type and required/optional/computed flags, and carries the
//! validators applied to configuration at plan time.
//!
//! Two independent checks live here:
//! - [`validate_implementation`] checks that a declared schema is internally
//!   consistent (the equivalent of the framework's `ValidateImplementation`).
//! - [`validate_config`] checks a plan value against a schema.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::diagnostics::{AttributePath, Diagnostics};
use crate::value::Value;

/// Names Terraform reserves at the root of a resource schema
pub const RESERVED_ROOT_NAMES: &[&str] = &[
    "connection",
    "count",
    "depends_on",
    "for_each",
    "lifecycle",
    "provider",
    "provisioner",
];

/// Attribute type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeType {
    String,
    Int64,
    Float64,
    Bool,
    /// Arbitrary JSON, used for `x-kubernetes-preserve-unknown-fields`
    Dynamic,
    List { element: Box<AttributeType> },
    Map { element: Box<AttributeType> },
    Object { attributes: Vec<Attribute> },
}

impl AttributeType {
    pub fn list(element: AttributeType) -> Self {
        AttributeType::List {
            element: Box::new(element),
        }
    }

    pub fn map(element: AttributeType) -> Self {
        AttributeType::Map {
            element: Box::new(element),
        }
    }

    /// Short type name used in messages
    pub fn describe(&self) -> String {
        match self {
            AttributeType::String => "string".to_string(),
            AttributeType::Int64 => "int64".to_string(),
            AttributeType::Float64 => "float64".to_string(),
            AttributeType::Bool => "bool".to_string(),
            AttributeType::Dynamic => "dynamic".to_string(),
            AttributeType::List { element } => format!("list of {}", element.describe()),
            AttributeType::Map { element } => format!("map of {}", element.describe()),
            AttributeType::Object { .. } => "object".to_string(),
        }
    }

    /// Check a JSON default value against this type
    fn accepts_json(&self, json: &serde_json::Value) -> bool {
        use serde_json::Value as J;
        match (self, json) {
            (_, J::Null) => true,
            (AttributeType::String, J::String(_)) => true,
            (AttributeType::Int64, J::Number(n)) => n.is_i64(),
            (AttributeType::Float64, J::Number(_)) => true,
            (AttributeType::Bool, J::Bool(_)) => true,
            (AttributeType::Dynamic, _) => true,
            (AttributeType::List { element }, J::Array(items)) => {
                items.iter().all(|item| element.accepts_json(item))
            }
            (AttributeType::Map { element }, J::Object(map)) => {
                map.values().all(|item| element.accepts_json(item))
            }
            (AttributeType::Object { attributes }, J::Object(map)) => map.iter().all(|(k, v)| {
                attributes
                    .iter()
                    .find(|a| &a.name == k)
                    .is_some_and(|a| a.ty.accepts_json(v))
            }),
            _ => false,
        }
    }
}

/// Plan-time validator attached to an attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "validator", content = "args", rename_all = "snake_case")]
pub enum Validator {
    /// String must be one of the listed values
    OneOf(Vec<String>),
    /// String length in characters
    LengthBetween { min: Option<u64>, max: Option<u64> },
    /// String must match the regular expression
    RegexMatches(String),
    Int64Between { min: Option<i64>, max: Option<i64> },
    /// Number of list or map elements
    SizeBetween { min: Option<u64>, max: Option<u64> },
    /// Exactly one of this attribute and the named siblings must be set
    ExactlyOneOf(Vec<String>),
    /// None of the named siblings may be set together with this attribute
    ConflictsWith(Vec<String>),
}

impl Validator {
    fn name(&self) -> &'static str {
        match self {
            Validator::OneOf(_) => "one_of",
            Validator::LengthBetween { .. } => "length_between",
            Validator::RegexMatches(_) => "regex_matches",
            Validator::Int64Between { .. } => "int64_between",
            Validator::SizeBetween { .. } => "size_between",
            Validator::ExactlyOneOf(_) => "exactly_one_of",
            Validator::ConflictsWith(_) => "conflicts_with",
        }
    }
}

/// A single schema attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// snake_case attribute name
    pub name: String,
    /// Field name in the Kubernetes JSON object
    pub json_name: String,
    #[serde(flatten)]
    pub ty: AttributeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub computed: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
}

fn is_false(b: &bool) -> bool {
    !b
}

impl Attribute {
    pub fn new(name: impl Into<String>, json_name: impl Into<String>, ty: AttributeType) -> Self {
        Self {
            name: name.into(),
            json_name: json_name.into(),
            ty,
            description: None,
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            default: None,
            validators: Vec::new(),
        }
    }

    pub fn string(name: &str, json_name: &str) -> Self {
        Self::new(name, json_name, AttributeType::String)
    }

    pub fn int64(name: &str, json_name: &str) -> Self {
        Self::new(name, json_name, AttributeType::Int64)
    }

    pub fn bool(name: &str, json_name: &str) -> Self {
        Self::new(name, json_name, AttributeType::Bool)
    }

    pub fn dynamic(name: &str, json_name: &str) -> Self {
        Self::new(name, json_name, AttributeType::Dynamic)
    }

    pub fn object(name: &str, json_name: &str, attributes: Vec<Attribute>) -> Self {
        Self::new(name, json_name, AttributeType::Object { attributes })
    }

    pub fn list(name: &str, json_name: &str, element: AttributeType) -> Self {
        Self::new(name, json_name, AttributeType::list(element))
    }

    pub fn map(name: &str, json_name: &str, element: AttributeType) -> Self {
        Self::new(name, json_name, AttributeType::map(element))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Read-only attribute: computed and not settable in configuration
    pub fn is_read_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }

    /// Nested attributes of an object attribute
    pub fn attributes(&self) -> Option<&[Attribute]> {
        match &self.ty {
            AttributeType::Object { attributes } => Some(attributes),
            _ => None,
        }
    }

    /// Copy of this attribute with every flag turned into computed-only.
    ///
    /// Used for data source schemas where the whole body is read from the cluster.
    pub fn into_computed(mut self) -> Self {
        self.required = false;
        self.optional = false;
        self.computed = true;
        self.default = None;
        self.validators.clear();
        self.ty = computed_type(self.ty);
        self
    }
}

fn computed_type(ty: AttributeType) -> AttributeType {
    match ty {
        AttributeType::Object { attributes } => AttributeType::Object {
            attributes: attributes.into_iter().map(Attribute::into_computed).collect(),
        },
        AttributeType::List { element } => AttributeType::list(computed_type(*element)),
        AttributeType::Map { element } => AttributeType::map(computed_type(*element)),
        other => other,
    }
}

/// Find an attribute by name
pub fn find<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a Attribute> {
    attributes.iter().find(|a| a.name == name)
}

// ========== Implementation validation ==========

/// Check that a schema is internally consistent
pub fn validate_implementation(attributes: &[Attribute]) -> Diagnostics {
    let mut diags = Diagnostics::new();
    for attribute in attributes {
        if RESERVED_ROOT_NAMES.contains(&attribute.name.as_str()) {
            diags.add_attribute_error(
                AttributePath::root().attribute(&attribute.name),
                "Reserved Root Attribute Name",
                format!(
                    "\"{}\" is a reserved root attribute name and cannot be used by a resource",
                    attribute.name
                ),
            );
        }
    }
    check_attributes(attributes, &AttributePath::root(), &mut diags);
    diags
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn check_attributes(attributes: &[Attribute], path: &AttributePath, diags: &mut Diagnostics) {
    let mut names = HashSet::new();
    let mut json_names = HashSet::new();

    for attribute in attributes {
        let attr_path = path.attribute(&attribute.name);

        if !is_valid_identifier(&attribute.name) {
            diags.add_attribute_error(
                attr_path.clone(),
                "Invalid Attribute Name",
                format!(
                    "\"{}\" must contain only lowercase alphanumeric characters or underscores and start with a letter or underscore",
                    attribute.name
                ),
            );
        }
        if !names.insert(attribute.name.as_str()) {
            diags.add_attribute_error(
                attr_path.clone(),
                "Duplicate Attribute Name",
                format!("\"{}\" is declared more than once", attribute.name),
            );
        }
        if attribute.json_name.is_empty() {
            diags.add_attribute_error(
                attr_path.clone(),
                "Missing JSON Field Name",
                "every attribute must map to a JSON field",
            );
        } else if !json_names.insert(attribute.json_name.as_str()) {
            diags.add_attribute_error(
                attr_path.clone(),
                "Duplicate JSON Field Name",
                format!(
                    "JSON field \"{}\" is bound by more than one attribute",
                    attribute.json_name
                ),
            );
        }

        check_flags(attribute, &attr_path, diags);
        check_default(attribute, &attr_path, diags);
        check_validators(attribute, attributes, &attr_path, diags);
        check_type(&attribute.ty, &attr_path, diags);
    }
}

fn check_flags(attribute: &Attribute, path: &AttributePath, diags: &mut Diagnostics) {
    let Attribute {
        required,
        optional,
        computed,
        ..
    } = *attribute;

    if !required && !optional && !computed {
        diags.add_attribute_error(
            path.clone(),
            "Invalid Attribute Definition",
            "attribute must be required, optional, or computed",
        );
    }
    if required && (optional || computed) {
        diags.add_attribute_error(
            path.clone(),
            "Invalid Attribute Definition",
            "required attributes cannot also be optional or computed",
        );
    }
}

fn check_default(attribute: &Attribute, path: &AttributePath, diags: &mut Diagnostics) {
    let Some(default) = &attribute.default else {
        return;
    };

    if !attribute.computed || attribute.required {
        diags.add_attribute_error(
            path.clone(),
            "Schema Using Attribute Default For Non-Computed Attribute",
            "attributes with a default must be computed and must not be required",
        );
    }
    if !attribute.ty.accepts_json(default) {
        diags.add_attribute_error(
            path.clone(),
            "Invalid Attribute Default",
            format!(
                "default {} does not match attribute type {}",
                default,
                attribute.ty.describe()
            ),
        );
    }
}

fn check_validators(
    attribute: &Attribute,
    siblings: &[Attribute],
    path: &AttributePath,
    diags: &mut Diagnostics,
) {
    for validator in &attribute.validators {
        let type_ok = match validator {
            Validator::OneOf(_) | Validator::LengthBetween { .. } | Validator::RegexMatches(_) => {
                attribute.ty == AttributeType::String
            }
            Validator::Int64Between { .. } => attribute.ty == AttributeType::Int64,
            Validator::SizeBetween { .. } => matches!(
                attribute.ty,
                AttributeType::List { .. } | AttributeType::Map { .. }
            ),
            Validator::ExactlyOneOf(_) | Validator::ConflictsWith(_) => true,
        };
        if !type_ok {
            diags.add_attribute_error(
                path.clone(),
                "Invalid Validator",
                format!(
                    "validator {} cannot be used on a {} attribute",
                    validator.name(),
                    attribute.ty.describe()
                ),
            );
            continue;
        }

        match validator {
            Validator::OneOf(values) if values.is_empty() => {
                diags.add_attribute_error(
                    path.clone(),
                    "Invalid Validator",
                    "one_of requires at least one allowed value",
                );
            }
            Validator::LengthBetween {
                min: Some(min),
                max: Some(max),
            }
            | Validator::SizeBetween {
                min: Some(min),
                max: Some(max),
            } if min > max => {
                diags.add_attribute_error(
                    path.clone(),
                    "Invalid Validator",
                    format!("{}: min {} exceeds max {}", validator.name(), min, max),
                );
            }
            Validator::Int64Between {
                min: Some(min),
                max: Some(max),
            } if min > max => {
                diags.add_attribute_error(
                    path.clone(),
                    "Invalid Validator",
                    format!("int64_between: min {} exceeds max {}", min, max),
                );
            }
            Validator::RegexMatches(pattern) => {
                if let Err(e) = Regex::new(pattern) {
                    diags.add_attribute_error(
                        path.clone(),
                        "Invalid Validator",
                        format!("regex_matches: {}", e),
                    );
                }
            }
            Validator::ExactlyOneOf(others) | Validator::ConflictsWith(others) => {
                for other in others {
                    match find(siblings, other) {
                        None => diags.add_attribute_error(
                            path.clone(),
                            "Invalid Validator",
                            format!(
                                "{} references unknown sibling attribute \"{}\"",
                                validator.name(),
                                other
                            ),
                        ),
                        Some(sibling) if sibling.required => diags.add_attribute_error(
                            path.clone(),
                            "Invalid Validator",
                            format!(
                                "{} references required attribute \"{}\"",
                                validator.name(),
                                other
                            ),
                        ),
                        Some(_) => {}
                    }
                }
                if attribute.required {
                    diags.add_attribute_error(
                        path.clone(),
                        "Invalid Validator",
                        format!("{} cannot be used on a required attribute", validator.name()),
                    );
                }
            }
            _ => {}
        }
    }
}

fn check_type(ty: &AttributeType, path: &AttributePath, diags: &mut Diagnostics) {
    match ty {
        AttributeType::Object { attributes } => {
            if attributes.is_empty() {
                diags.add_attribute_error(
                    path.clone(),
                    "Invalid Nested Attribute",
                    "nested objects must declare at least one attribute",
                );
            }
            check_attributes(attributes, path, diags);
        }
        AttributeType::List { element } | AttributeType::Map { element } => {
            if **element == AttributeType::Dynamic {
                diags.add_attribute_error(
                    path.clone(),
                    "Invalid Collection Element",
                    "collections cannot contain dynamic elements",
                );
            }
            check_type(element, path, diags);
        }
        _ => {}
    }
}

// ========== Configuration validation ==========

/// Validate a configuration value against a schema
pub fn validate_config(attributes: &[Attribute], config: &Value) -> Diagnostics {
    let mut diags = Diagnostics::new();
    validate_object(attributes, config, &AttributePath::root(), &mut diags);
    diags
}

fn validate_object(
    attributes: &[Attribute],
    object: &Value,
    path: &AttributePath,
    diags: &mut Diagnostics,
) {
    if let Some(map) = object.as_object() {
        for key in map.keys() {
            if find(attributes, key).is_none() {
                diags.add_attribute_error(
                    path.attribute(key),
                    "Unsupported Attribute",
                    format!("an attribute named \"{}\" is not expected here", key),
                );
            }
        }
    }

    for attribute in attributes {
        let attr_path = path.attribute(&attribute.name);
        let value = object.get(&attribute.name);

        check_relations(attribute, object, &attr_path, diags);

        if value.is_unknown() {
            continue;
        }
        if value.is_null() {
            if attribute.required {
                diags.add_attribute_error(
                    attr_path,
                    "Missing Configuration for Required Attribute",
                    format!(
                        "Must set a configuration value for the {} attribute",
                        attribute.name
                    ),
                );
            }
            continue;
        }
        if attribute.is_read_only() {
            diags.add_attribute_error(
                attr_path,
                "Invalid Configuration for Read-Only Attribute",
                format!(
                    "Cannot set value for this attribute as the provider has marked it as read-only. Remove the configuration line setting the value for {}",
                    attribute.name
                ),
            );
            continue;
        }

        if validate_value(&attribute.ty, value, &attr_path, diags) {
            for validator in &attribute.validators {
                apply_validator(validator, value, &attr_path, diags);
            }
        }
    }
}

/// Type-check a known value; returns false on mismatch
fn validate_value(
    ty: &AttributeType,
    value: &Value,
    path: &AttributePath,
    diags: &mut Diagnostics,
) -> bool {
    if !value.is_known() {
        return true;
    }
    let ok = match (ty, value) {
        (AttributeType::String, Value::String(_)) => true,
        (AttributeType::Int64, Value::Number(n)) => n.is_i64(),
        (AttributeType::Float64, Value::Number(_)) => true,
        (AttributeType::Bool, Value::Bool(_)) => true,
        (AttributeType::Dynamic, _) => true,
        (AttributeType::List { element }, Value::List(items)) => {
            for (i, item) in items.iter().enumerate() {
                validate_value(element, item, &path.index(i), diags);
            }
            true
        }
        (AttributeType::Map { element }, Value::Object(map)) => {
            for (key, item) in map {
                validate_value(element, item, &path.key(key), diags);
            }
            true
        }
        (AttributeType::Object { attributes }, Value::Object(_)) => {
            validate_object(attributes, value, path, diags);
            true
        }
        _ => false,
    };
    if !ok {
        diags.add_attribute_error(
            path.clone(),
            "Incorrect Attribute Value Type",
            format!("expected {}", ty.describe()),
        );
    }
    ok
}

fn apply_validator(
    validator: &Validator,
    value: &Value,
    path: &AttributePath,
    diags: &mut Diagnostics,
) {
    match validator {
        Validator::OneOf(allowed) => {
            if let Some(s) = value.as_str() {
                if !allowed.iter().any(|a| a == s) {
                    let quoted: Vec<String> = allowed.iter().map(|a| format!("{a:?}")).collect();
                    diags.add_attribute_error(
                        path.clone(),
                        "Invalid Attribute Value Match",
                        format!("value must be one of: [{}], got: {:?}", quoted.join(" "), s),
                    );
                }
            }
        }
        Validator::LengthBetween { min, max } => {
            if let Some(s) = value.as_str() {
                let len = s.chars().count() as u64;
                if min.is_some_and(|m| len < m) || max.is_some_and(|m| len > m) {
                    diags.add_attribute_error(
                        path.clone(),
                        "Invalid Attribute Value Length",
                        format!("string length must be {}, got: {}", bounds(min, max), len),
                    );
                }
            }
        }
        Validator::RegexMatches(pattern) => {
            if let (Some(s), Ok(re)) = (value.as_str(), Regex::new(pattern)) {
                if !re.is_match(s) {
                    diags.add_attribute_error(
                        path.clone(),
                        "Invalid Attribute Value Match",
                        format!("value must match regular expression '{}', got: {:?}", pattern, s),
                    );
                }
            }
        }
        Validator::Int64Between { min, max } => {
            if let Some(n) = value.as_i64() {
                if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
                    diags.add_attribute_error(
                        path.clone(),
                        "Invalid Attribute Value",
                        format!("value must be {}, got: {}", bounds(min, max), n),
                    );
                }
            }
        }
        Validator::SizeBetween { min, max } => {
            let size = match value {
                Value::List(items) => Some(items.len() as u64),
                Value::Object(map) => Some(map.len() as u64),
                _ => None,
            };
            if let Some(size) = size {
                if min.is_some_and(|m| size < m) || max.is_some_and(|m| size > m) {
                    diags.add_attribute_error(
                        path.clone(),
                        "Invalid Attribute Value",
                        format!("size must be {}, got: {}", bounds(min, max), size),
                    );
                }
            }
        }
        // Evaluated by check_relations
        Validator::ExactlyOneOf(_) | Validator::ConflictsWith(_) => {}
    }
}

fn bounds<T: std::fmt::Display>(min: &Option<T>, max: &Option<T>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("between {} and {}", min, max),
        (Some(min), None) => format!("at least {}", min),
        (None, Some(max)) => format!("at most {}", max),
        (None, None) => "unbounded".to_string(),
    }
}

/// Sibling constraints. These run whether or not the attribute itself is set.
fn check_relations(
    attribute: &Attribute,
    object: &Value,
    path: &AttributePath,
    diags: &mut Diagnostics,
) {
    if !object.is_known() {
        return;
    }
    let own = object.get(&attribute.name);

    for validator in &attribute.validators {
        match validator {
            Validator::ExactlyOneOf(others) => {
                let group: BTreeSet<&str> = others
                    .iter()
                    .map(String::as_str)
                    .chain(std::iter::once(attribute.name.as_str()))
                    .collect();
                if group.iter().any(|name| object.get(name).is_unknown()) {
                    continue;
                }
                let set: Vec<&str> = group
                    .iter()
                    .copied()
                    .filter(|name| !object.get(name).is_null())
                    .collect();
                let listed = group
                    .iter()
                    .map(|name| path.sibling(name).to_string())
                    .collect::<Vec<_>>()
                    .join(",");

                if set.is_empty() {
                    // Report a missing union once, on its first member
                    if group.iter().next() == Some(&attribute.name.as_str()) {
                        diags.add_attribute_error(
                            path.clone(),
                            "Invalid Attribute Combination",
                            format!(
                                "No attribute specified when one (and only one) of [{}] is required",
                                listed
                            ),
                        );
                    }
                } else if set.len() > 1 && !own.is_null() {
                    diags.add_attribute_error(
                        path.clone(),
                        "Invalid Attribute Combination",
                        format!(
                            "{} attributes specified when one (and only one) of [{}] is required",
                            set.len(),
                            listed
                        ),
                    );
                }
            }
            Validator::ConflictsWith(others) => {
                if own.is_null() {
                    continue;
                }
                for other in others {
                    if !object.get(other).is_null() {
                        diags.add_attribute_error(
                            path.clone(),
                            "Invalid Attribute Combination",
                            format!(
                                "Attribute \"{}\" cannot be specified when \"{}\" is specified",
                                path.sibling(other),
                                path
                            ),
                        );
                    }
                }
            }
            _ => {}
        }
    }
}

// ========== Defaults ==========

/// Fill null optional+computed attributes that declare a default
pub fn apply_defaults(attributes: &[Attribute], value: &mut Value) {
    if !value.is_known() {
        return;
    }
    for attribute in attributes {
        let current = value.get(&attribute.name);
        if current.is_null() {
            if let Some(default) = &attribute.default {
                value.set(attribute.name.clone(), Value::from(default.clone()));
            }
            continue;
        }
        if let (Some(nested), Value::Object(map)) = (attribute.attributes(), &mut *value) {
            if let Some(child) = map.get_mut(&attribute.name) {
                apply_defaults(nested, child);
            }
        }
    }
}
