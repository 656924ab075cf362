//! Resource types and their three schema variants
//!
//! A [`ResourceType`] is the declarative table entry for one Kind/Version: its
//! identity plus the body attributes mirroring the CRD (usually just `spec`).
//! The common knobs every variant carries (`id`, `metadata`, wait blocks, server
//! side apply overrides) are added here so that a single generic engine can
//! serve every type.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::diagnostics::Diagnostics;
use crate::identity::ResourceIdentity;
use crate::schema::{self, Attribute, AttributeType, Validator};

/// Attribute names owned by the engine; body attributes may not reuse them
pub const COMMON_ATTRIBUTES: &[&str] = &[
    "id",
    "api_version",
    "kind",
    "yaml",
    "force_conflicts",
    "field_manager",
    "wait_for_upsert",
    "wait_for_delete",
    "metadata",
];

/// Which flavour of handler a schema is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Full CRUD against the cluster
    Resource,
    /// Read only
    DataSource,
    /// Renders YAML, never touches the cluster
    Manifest,
}

impl Variant {
    pub const ALL: [Variant; 3] = [Variant::Resource, Variant::DataSource, Variant::Manifest];
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Resource => write!(f, "resource"),
            Variant::DataSource => write!(f, "data source"),
            Variant::Manifest => write!(f, "manifest"),
        }
    }
}

/// Declarative description of one Kind/Version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceType {
    #[serde(flatten)]
    pub identity: ResourceIdentity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Root-level fields of the object besides apiVersion/kind/metadata/status
    pub body: Vec<Attribute>,
}

impl ResourceType {
    pub fn new(identity: ResourceIdentity, body: Vec<Attribute>) -> Self {
        Self {
            identity,
            description: None,
            body,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Name under which a variant is registered
    pub fn type_name(&self, variant: Variant) -> String {
        match variant {
            Variant::Resource | Variant::DataSource => self.identity.type_name(),
            Variant::Manifest => self.identity.manifest_type_name(),
        }
    }

    /// Full attribute list of a variant
    pub fn schema(&self, variant: Variant) -> Vec<Attribute> {
        let mut attrs = vec![
            Attribute::string("id", "id")
                .computed()
                .describe("Identifier of the object: <namespace>/<name>, or <name> for cluster-scoped kinds."),
        ];

        match variant {
            Variant::Resource => {
                attrs.push(Attribute::string("api_version", "apiVersion").computed());
                attrs.push(Attribute::string("kind", "kind").computed());
                attrs.extend(apply_knobs());
                attrs.push(self.metadata_attribute(variant));
                attrs.extend(self.body.iter().cloned());
            }
            Variant::DataSource => {
                attrs.push(self.metadata_attribute(variant));
                attrs.extend(self.body.iter().cloned().map(Attribute::into_computed));
            }
            Variant::Manifest => {
                attrs.push(
                    Attribute::string("yaml", "yaml")
                        .computed()
                        .describe("The generated manifest in YAML format."),
                );
                attrs.push(self.metadata_attribute(variant));
                attrs.extend(self.body.iter().cloned());
            }
        }
        attrs
    }

    /// The `metadata` block of a variant
    pub fn metadata_attribute(&self, variant: Variant) -> Attribute {
        let mut fields = vec![
            Attribute::string("name", "name")
                .required()
                .describe("Unique name of the object within its namespace.")
                .validate(Validator::LengthBetween {
                    min: Some(1),
                    max: Some(253),
                }),
        ];
        if self.identity.namespaced {
            fields.push(
                Attribute::string("namespace", "namespace")
                    .required()
                    .validate(Validator::LengthBetween {
                        min: Some(1),
                        max: Some(63),
                    }),
            );
        }

        let labels = Attribute::map("labels", "labels", AttributeType::String);
        let annotations = Attribute::map("annotations", "annotations", AttributeType::String);
        match variant {
            Variant::DataSource => {
                fields.push(labels.computed());
                fields.push(annotations.computed());
            }
            Variant::Resource | Variant::Manifest => {
                fields.push(labels.optional());
                fields.push(annotations.optional());
            }
        }
        if variant != Variant::Manifest {
            fields.push(Attribute::string("uid", "uid").computed());
            fields.push(Attribute::string("resource_version", "resourceVersion").computed());
        }

        Attribute::object("metadata", "metadata", fields).required()
    }

    /// Run the consistency checks over every variant's schema
    pub fn validate_implementation(&self) -> Vec<(Variant, Diagnostics)> {
        let mut results = Vec::new();
        for variant in Variant::ALL {
            let mut diags = schema::validate_implementation(&self.schema(variant));
            for attribute in &self.body {
                if COMMON_ATTRIBUTES.contains(&attribute.name.as_str()) {
                    diags.add_attribute_error(
                        crate::diagnostics::AttributePath::root().attribute(&attribute.name),
                        "Duplicate Attribute Name",
                        format!(
                            "\"{}\" is reserved for the engine and cannot be used as a body attribute",
                            attribute.name
                        ),
                    );
                }
            }
            results.push((variant, diags));
        }
        results
    }
}

/// Server-side apply overrides and wait blocks of the resource variant
fn apply_knobs() -> Vec<Attribute> {
    vec![
        Attribute::bool("force_conflicts", "forceConflicts")
            .optional()
            .describe("Force changes against conflicts. Defaults to the provider setting."),
        Attribute::string("field_manager", "fieldManager")
            .optional()
            .describe("The name of the manager used to track field ownership. Defaults to the provider setting."),
        Attribute::list(
            "wait_for_upsert",
            "waitForUpsert",
            AttributeType::Object {
                attributes: vec![
                    Attribute::string("jsonpath", "jsonpath").required(),
                    Attribute::string("value", "value").required(),
                    Attribute::string("timeout", "timeout").optional(),
                    Attribute::string("poll_interval", "pollInterval").optional(),
                ],
            },
        )
        .optional()
        .describe("Conditions to wait for after create or update."),
        Attribute::object(
            "wait_for_delete",
            "waitForDelete",
            vec![
                Attribute::string("timeout", "timeout").optional(),
                Attribute::string("poll_interval", "pollInterval").optional(),
            ],
        )
        .optional()
        .describe("Wait for the object to disappear after deletion."),
    ]
}
