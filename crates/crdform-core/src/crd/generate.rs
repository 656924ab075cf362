//! Resource type generation from CRDs
//!
//! Each served version of a CRD becomes one [`ResourceType`]. The OpenAPI
//! property tree is mapped onto attributes; constraints that have a plan-time
//! validator equivalent are carried over, everything else is left to the API
//! server.

use regex::Regex;
use std::collections::{BTreeMap, HashSet};

use super::schema::{AdditionalProperties, CrdSchema, CrdVersionSchema, PropertyType, SchemaProperty};
use crate::diagnostics::{AttributePath, Diagnostic, Diagnostics};
use crate::identity::{ResourceIdentity, to_snake_case};
use crate::resource_type::{COMMON_ATTRIBUTES, ResourceType};
use crate::schema::{Attribute, AttributeType, RESERVED_ROOT_NAMES, Validator};

/// Root properties managed outside the body
const SKIPPED_ROOT_PROPERTIES: &[&str] = &["apiVersion", "kind", "metadata", "status"];

/// Generate one resource type per served version.
///
/// Lossy mappings (uncompilable patterns, unusable `oneOf` groups, versions
/// without a schema) are reported as warnings.
pub fn resource_types(crd: &CrdSchema) -> (Vec<ResourceType>, Diagnostics) {
    let mut diags = Diagnostics::new();
    let types = crd
        .served_versions()
        .map(|version| resource_type(crd, version, &mut diags))
        .collect();
    (types, diags)
}

fn resource_type(crd: &CrdSchema, version: &CrdVersionSchema, diags: &mut Diagnostics) -> ResourceType {
    let identity = ResourceIdentity::new(
        &crd.group,
        &version.name,
        &crd.names.kind,
        &crd.names.plural,
        crd.is_namespaced(),
    );
    tracing::debug!(crd = %crd.name, version = %version.name, "generating resource type");

    if version.deprecated {
        diags.push(Diagnostic::warning(
            "Deprecated API Version",
            version
                .deprecation_warning
                .clone()
                .unwrap_or_else(|| format!("{} is deprecated", identity.api_version())),
        ));
    }

    let body = match &version.schema {
        Some(schema) => {
            let properties: BTreeMap<String, SchemaProperty> = schema
                .properties
                .iter()
                .filter(|(name, _)| !SKIPPED_ROOT_PROPERTIES.contains(&name.as_str()))
                .map(|(name, prop)| (name.clone(), prop.clone()))
                .collect();
            let mut taken: HashSet<String> = COMMON_ATTRIBUTES
                .iter()
                .chain(RESERVED_ROOT_NAMES)
                .map(|s| s.to_string())
                .collect();
            let mut generator = Generator { diags };
            generator.attributes(&properties, &schema.required, &[], &AttributePath::root(), &mut taken)
        }
        None => {
            diags.push(Diagnostic::warning(
                "Missing Version Schema",
                format!(
                    "{} has no openAPIV3Schema; spec is exposed as a dynamic attribute",
                    identity.api_version()
                ),
            ));
            vec![Attribute::dynamic("spec", "spec").optional()]
        }
    };

    let description = format!("{} ({}) generated from CRD {}", identity.kind, identity.api_version(), crd.name);
    ResourceType::new(identity, body).with_description(description)
}

struct Generator<'a> {
    diags: &'a mut Diagnostics,
}

impl Generator<'_> {
    fn attributes(
        &mut self,
        properties: &BTreeMap<String, SchemaProperty>,
        required: &[String],
        one_of: &[Vec<String>],
        path: &AttributePath,
        taken: &mut HashSet<String>,
    ) -> Vec<Attribute> {
        let mut names = BTreeMap::new();
        let mut attrs: Vec<Attribute> = properties
            .iter()
            .map(|(json_name, prop)| {
                let name = unique_name(json_name, taken);
                names.insert(json_name.clone(), name.clone());
                self.attribute(name, json_name, prop, required.contains(json_name), path)
            })
            .collect();

        self.exactly_one_of(&mut attrs, &names, one_of, path);
        attrs
    }

    fn attribute(
        &mut self,
        name: String,
        json_name: &str,
        prop: &SchemaProperty,
        required: bool,
        path: &AttributePath,
    ) -> Attribute {
        let attr_path = path.attribute(&name);
        let ty = self.attribute_type(prop, &attr_path);
        let mut attribute = Attribute::new(name, json_name, ty);
        attribute = if required { attribute.required() } else { attribute.optional() };
        if let Some(description) = &prop.description {
            attribute = attribute.describe(description.clone());
        }
        for validator in self.validators(prop, &attribute.ty, &attr_path) {
            attribute = attribute.validate(validator);
        }
        attribute
    }

    fn attribute_type(&mut self, prop: &SchemaProperty, path: &AttributePath) -> AttributeType {
        if prop.x_int_or_string {
            return AttributeType::String;
        }
        if prop.x_preserve_unknown {
            return AttributeType::Dynamic;
        }

        match &prop.type_ {
            PropertyType::String => AttributeType::String,
            PropertyType::Integer => AttributeType::Int64,
            PropertyType::Number => AttributeType::Float64,
            PropertyType::Boolean => AttributeType::Bool,
            PropertyType::Array => match &prop.items {
                Some(items) => match self.attribute_type(items, path) {
                    AttributeType::Dynamic => AttributeType::Dynamic,
                    element => AttributeType::list(element),
                },
                None => AttributeType::Dynamic,
            },
            PropertyType::Object => {
                if let Some(properties) = prop.properties.as_ref().filter(|p| !p.is_empty()) {
                    let mut taken = HashSet::new();
                    let attributes = self.attributes(
                        properties,
                        prop.required.as_deref().unwrap_or_default(),
                        &prop.one_of_required,
                        path,
                        &mut taken,
                    );
                    AttributeType::Object { attributes }
                } else if let Some(AdditionalProperties::Schema(element)) = &prop.additional_properties {
                    match self.attribute_type(element, path) {
                        AttributeType::Dynamic => AttributeType::Dynamic,
                        element => AttributeType::map(element),
                    }
                } else {
                    AttributeType::Dynamic
                }
            }
            PropertyType::Unknown(other) => {
                tracing::debug!(path = %path, property_type = %other, "unknown property type, using dynamic");
                AttributeType::Dynamic
            }
        }
    }

    fn validators(&mut self, prop: &SchemaProperty, ty: &AttributeType, path: &AttributePath) -> Vec<Validator> {
        let mut validators = Vec::new();
        match ty {
            AttributeType::String => {
                if let Some(values) = &prop.enum_values {
                    let allowed: Vec<String> = values
                        .iter()
                        .filter_map(|v| v.as_str().map(String::from))
                        .collect();
                    if !allowed.is_empty() && !prop.x_int_or_string {
                        validators.push(Validator::OneOf(allowed));
                    }
                }
                if prop.min_length.is_some() || prop.max_length.is_some() {
                    validators.push(Validator::LengthBetween {
                        min: prop.min_length,
                        max: prop.max_length,
                    });
                }
                if let Some(pattern) = &prop.pattern {
                    match Regex::new(pattern) {
                        Ok(_) => validators.push(Validator::RegexMatches(pattern.clone())),
                        Err(e) => {
                            tracing::warn!(path = %path, pattern = %pattern, "skipping pattern: {}", e);
                            self.diags.push(
                                Diagnostic::warning(
                                    "Unsupported Pattern",
                                    format!("pattern {:?} is not a supported regular expression and will only be enforced by the API server", pattern),
                                )
                                .at(path.clone()),
                            );
                        }
                    }
                }
            }
            AttributeType::Int64 => {
                if prop.minimum.is_some() || prop.maximum.is_some() {
                    validators.push(Validator::Int64Between {
                        min: prop.minimum.map(|m| m.ceil() as i64),
                        max: prop.maximum.map(|m| m.floor() as i64),
                    });
                }
            }
            AttributeType::List { .. } => {
                if prop.min_items.is_some() || prop.max_items.is_some() {
                    validators.push(Validator::SizeBetween {
                        min: prop.min_items,
                        max: prop.max_items,
                    });
                }
            }
            _ => {}
        }
        validators
    }

    /// Turn `oneOf: [{required: [a]}, {required: [b]}]` into exactly-one-of validators
    fn exactly_one_of(
        &mut self,
        attrs: &mut [Attribute],
        names: &BTreeMap<String, String>,
        one_of: &[Vec<String>],
        path: &AttributePath,
    ) {
        if one_of.is_empty() {
            return;
        }

        let usable = one_of.len() > 1
            && one_of.iter().all(|group| {
                group.len() == 1
                    && names.contains_key(&group[0])
                    && attrs
                        .iter()
                        .any(|a| a.json_name == group[0] && !a.required)
            });
        if !usable {
            self.diags.push(
                Diagnostic::warning(
                    "Unsupported oneOf",
                    "only oneOf alternatives that each require a single optional field are validated at plan time",
                )
                .at(path.clone()),
            );
            return;
        }

        let members: Vec<&String> = one_of.iter().filter_map(|g| names.get(&g[0])).collect();
        for attribute in attrs.iter_mut() {
            if !members.contains(&&attribute.name) {
                continue;
            }
            let others = members
                .iter()
                .filter(|m| ***m != attribute.name)
                .map(|m| m.to_string())
                .collect();
            attribute.validators.push(Validator::ExactlyOneOf(others));
        }
    }
}

/// snake_case attribute name for a JSON field, unique among `taken`
fn unique_name(json_name: &str, taken: &mut HashSet<String>) -> String {
    let mut base: String = to_snake_case(json_name)
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else if c.is_ascii_uppercase() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if base.is_empty() || base.starts_with(|c: char| c.is_ascii_digit()) {
        base.insert(0, '_');
    }

    let mut name = base.clone();
    let mut n = 2;
    while taken.contains(&name) {
        name = format!("{}_{}", base, n);
        n += 1;
    }
    taken.insert(name.clone());
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::CrdParser;
    use crate::schema::{find, validate_implementation};
    use crate::resource_type::Variant;

    const BACKUP_CRD: &str = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: backups.example.com
spec:
  group: example.com
  scope: Namespaced
  names:
    kind: Backup
    plural: backups
  versions:
    - name: v1
      served: true
      storage: true
      schema:
        openAPIV3Schema:
          type: object
          required: [spec]
          properties:
            apiVersion: {type: string}
            kind: {type: string}
            metadata: {type: object}
            status:
              type: object
              properties:
                phase: {type: string}
            spec:
              type: object
              required: [schedule]
              oneOf:
                - required: [s3]
                - required: [gcs]
              properties:
                schedule:
                  type: string
                  minLength: 1
                  pattern: '^(@(daily|hourly)|[0-9*/, -]+)$'
                retention:
                  type: integer
                  minimum: 1
                  maximum: 365
                mode:
                  type: string
                  enum: [Full, Incremental]
                s3:
                  type: object
                  properties:
                    bucket: {type: string}
                    endpointURL: {type: string}
                gcs:
                  type: object
                  properties:
                    bucket: {type: string}
                port:
                  x-kubernetes-int-or-string: true
                labels:
                  type: object
                  additionalProperties:
                    type: string
                targets:
                  type: array
                  maxItems: 3
                  items:
                    type: object
                    properties:
                      name: {type: string}
                extra:
                  type: object
                  x-kubernetes-preserve-unknown-fields: true
                lookahead:
                  type: string
                  pattern: '^(?=a)'
    - name: v1alpha1
      served: true
      storage: false
      deprecated: true
"#;

    fn backup_types() -> (Vec<ResourceType>, Diagnostics) {
        resource_types(&CrdParser::parse(BACKUP_CRD).unwrap())
    }

    fn spec_attributes(rt: &ResourceType) -> &[Attribute] {
        find(&rt.body, "spec").unwrap().attributes().unwrap()
    }

    #[test]
    fn test_one_type_per_served_version() {
        let (types, _) = backup_types();
        let names: Vec<_> = types.iter().map(|t| t.identity.type_name()).collect();
        assert_eq!(names, vec!["example_com_backup_v1", "example_com_backup_v1alpha1"]);
    }

    #[test]
    fn test_root_properties() {
        let (types, _) = backup_types();
        let body: Vec<_> = types[0].body.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(body, vec!["spec"]);
        assert!(types[0].body[0].required);
    }

    #[test]
    fn test_property_mapping() {
        let (types, _) = backup_types();
        let spec = spec_attributes(&types[0]);

        assert_eq!(find(spec, "port").unwrap().ty, AttributeType::String);
        assert_eq!(find(spec, "extra").unwrap().ty, AttributeType::Dynamic);
        assert_eq!(
            find(spec, "labels").unwrap().ty,
            AttributeType::map(AttributeType::String)
        );
        assert!(matches!(find(spec, "targets").unwrap().ty, AttributeType::List { .. }));

        let s3 = find(spec, "s3").unwrap().attributes().unwrap();
        let endpoint = find(s3, "endpoint_url").unwrap();
        assert_eq!(endpoint.json_name, "endpointURL");
        assert!(endpoint.optional);
    }

    #[test]
    fn test_validators() {
        let (types, _) = backup_types();
        let spec = spec_attributes(&types[0]);

        let schedule = find(spec, "schedule").unwrap();
        assert!(schedule.required);
        assert_eq!(schedule.validators.len(), 2);
        assert_eq!(
            find(spec, "retention").unwrap().validators,
            vec![Validator::Int64Between {
                min: Some(1),
                max: Some(365)
            }]
        );
        assert_eq!(
            find(spec, "mode").unwrap().validators,
            vec![Validator::OneOf(vec!["Full".to_string(), "Incremental".to_string()])]
        );
        assert_eq!(
            find(spec, "targets").unwrap().validators,
            vec![Validator::SizeBetween { min: None, max: Some(3) }]
        );
        assert_eq!(
            find(spec, "s3").unwrap().validators,
            vec![Validator::ExactlyOneOf(vec!["gcs".to_string()])]
        );
    }

    #[test]
    fn test_unsupported_pattern_is_skipped_with_warning() {
        let (types, diags) = backup_types();
        let spec = spec_attributes(&types[0]);
        assert!(find(spec, "lookahead").unwrap().validators.is_empty());
        assert!(!diags.has_error());
        assert!(diags.iter().any(|d| d.summary == "Unsupported Pattern"));
    }

    #[test]
    fn test_version_without_schema() {
        let (types, diags) = backup_types();
        assert_eq!(types[1].body, vec![Attribute::dynamic("spec", "spec").optional()]);
        assert!(diags.iter().any(|d| d.summary == "Deprecated API Version"));
        assert!(diags.iter().any(|d| d.summary == "Missing Version Schema"));
    }

    #[test]
    fn test_generated_schemas_are_valid() {
        let (types, _) = backup_types();
        for rt in &types {
            for variant in Variant::ALL {
                let diags = validate_implementation(&rt.schema(variant));
                assert!(!diags.has_error(), "{} {}: {:?}", rt.identity, variant, diags);
            }
        }
    }

    #[test]
    fn test_unique_name() {
        let mut taken: HashSet<String> = ["metadata".to_string()].into_iter().collect();
        assert_eq!(unique_name("fooBar", &mut taken), "foo_bar");
        assert_eq!(unique_name("foo_bar", &mut taken), "foo_bar_2");
        assert_eq!(unique_name("metadata", &mut taken), "metadata_2");
        assert_eq!(unique_name("x-forwarded", &mut taken), "x_forwarded");
        assert_eq!(unique_name("3d", &mut taken), "_3d");
    }
}
