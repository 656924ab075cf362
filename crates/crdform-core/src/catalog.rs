//! Registry of resource types by type name

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::builtin::builtin_types;
use crate::crd::{CrdParser, resource_types};
use crate::diagnostics::Diagnostics;
use crate::error::{CoreError, Result};
use crate::resource_type::{ResourceType, Variant};

/// Maximum edit distance for "did you mean" suggestions
const MAX_SUGGESTION_DISTANCE: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    types: BTreeMap<String, Arc<ResourceType>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-populated with the built-in declarations
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for rt in builtin_types() {
            catalog.types.insert(rt.identity.type_name(), Arc::new(rt));
        }
        catalog
    }

    pub fn insert(&mut self, resource_type: ResourceType) -> Result<()> {
        let name = resource_type.identity.type_name();
        if self.types.contains_key(&name) {
            return Err(CoreError::DuplicateType { name });
        }
        tracing::debug!(type_name = %name, "registered resource type");
        self.types.insert(name, Arc::new(resource_type));
        Ok(())
    }

    /// Generate and register resource types from a CRD YAML stream.
    ///
    /// Returns the generation warnings.
    pub fn load_crds(&mut self, yaml: &str) -> Result<Diagnostics> {
        let mut diags = Diagnostics::new();
        for crd in CrdParser::parse_all(yaml)? {
            let (types, warnings) = resource_types(&crd);
            diags.extend(warnings);
            for rt in types {
                self.insert(rt)?;
            }
        }
        Ok(diags)
    }

    /// Register serialized resource type definitions.
    ///
    /// Accepts either a YAML sequence or a multi-document stream of definitions.
    pub fn load_definitions(&mut self, yaml: &str) -> Result<usize> {
        use serde::Deserialize;

        let mut count = 0;
        for document in serde_yaml::Deserializer::from_str(yaml) {
            let value = serde_yaml::Value::deserialize(document)?;
            let definitions: Vec<ResourceType> = match value {
                serde_yaml::Value::Null => continue,
                serde_yaml::Value::Sequence(_) => serde_yaml::from_value(value)?,
                other => vec![serde_yaml::from_value(other)?],
            };
            for rt in definitions {
                self.insert(rt)?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Look up a type by its resource type name
    pub fn get(&self, name: &str) -> Result<Arc<ResourceType>> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| self.unknown(name))
    }

    /// Look up a resource or manifest type name.
    ///
    /// `<type>_manifest` resolves to the manifest variant of `<type>`; every
    /// other name resolves to `default_variant`.
    pub fn resolve(&self, name: &str, default_variant: Variant) -> Result<(Arc<ResourceType>, Variant)> {
        if let Some(rt) = self.types.get(name) {
            return Ok((Arc::clone(rt), default_variant));
        }
        if let Some(rt) = name.strip_suffix("_manifest").and_then(|base| self.types.get(base)) {
            return Ok((Arc::clone(rt), Variant::Manifest));
        }
        Err(self.unknown(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ResourceType>> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn unknown(&self, name: &str) -> CoreError {
        let suggestion = self
            .types
            .values()
            .flat_map(|rt| [rt.type_name(Variant::Resource), rt.type_name(Variant::Manifest)])
            .map(|candidate| (strsim::levenshtein(name, &candidate), candidate))
            .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, candidate)| candidate);

        CoreError::UnknownType {
            name: name.to_string(),
            suggestion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDGET_CRD: &str = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: widgets.example.com
spec:
  group: example.com
  scope: Namespaced
  names:
    kind: Widget
    plural: widgets
  versions:
    - name: v1
      served: true
      storage: true
      schema:
        openAPIV3Schema:
          type: object
          properties:
            spec:
              type: object
              properties:
                size: {type: integer}
"#;

    #[test]
    fn test_builtin_lookup() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.len(), 2);
        let rt = catalog.get("cert_manager_io_certificate_v1").unwrap();
        assert_eq!(rt.identity.kind, "Certificate");
    }

    #[test]
    fn test_resolve_manifest_suffix() {
        let catalog = Catalog::builtin();
        let (rt, variant) = catalog
            .resolve("cert_manager_io_cluster_issuer_v1_manifest", Variant::Resource)
            .unwrap();
        assert_eq!(rt.identity.kind, "ClusterIssuer");
        assert_eq!(variant, Variant::Manifest);

        let (_, variant) = catalog
            .resolve("cert_manager_io_certificate_v1", Variant::DataSource)
            .unwrap();
        assert_eq!(variant, Variant::DataSource);
    }

    #[test]
    fn test_unknown_type_suggestion() {
        let err = Catalog::builtin().get("cert_manager_io_certificat_v1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown resource type 'cert_manager_io_certificat_v1', did you mean 'cert_manager_io_certificate_v1'?"
        );

        let err = Catalog::builtin().get("widgets").unwrap_err();
        assert_eq!(err.to_string(), "Unknown resource type 'widgets'");
    }

    #[test]
    fn test_load_crds() {
        let mut catalog = Catalog::new();
        let diags = catalog.load_crds(WIDGET_CRD).unwrap();
        assert!(diags.is_empty());
        assert!(catalog.get("example_com_widget_v1").is_ok());

        let err = catalog.load_crds(WIDGET_CRD).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateType { .. }));
    }

    #[test]
    fn test_definitions_round_trip() {
        let types = builtin_types();
        let yaml = serde_yaml::to_string(&types).unwrap();

        let mut catalog = Catalog::new();
        assert_eq!(catalog.load_definitions(&yaml).unwrap(), types.len());
        for rt in &types {
            let name = rt.identity.type_name();
            assert_eq!(*catalog.get(&name).unwrap(), *rt, "{name}");
        }
    }
}
