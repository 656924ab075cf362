//! Resource identity and import ids
//!
//! A [`ResourceIdentity`] addresses a kind of object (group, version, kind and
//! its plural resource name); an [`ObjectRef`] addresses one object of that kind.
//! Ids are always `<namespace>/<name>` for namespaced kinds and `<name>` for
//! cluster-scoped kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::diagnostics::Diagnostic;

/// Group/version/kind of a resource type, plus the REST resource name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceIdentity {
    /// API group, empty for the core group
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
    /// Plural REST resource name (e.g. "certificates")
    pub plural: String,
    #[serde(default = "default_true")]
    pub namespaced: bool,
}

fn default_true() -> bool {
    true
}

impl ResourceIdentity {
    pub fn new(group: &str, version: &str, kind: &str, plural: &str, namespaced: bool) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
            plural: plural.to_string(),
            namespaced,
        }
    }

    /// `apiVersion` as written in manifests
    ///
    /// - group "apps", version "v1" -> "apps/v1"
    /// - core group, version "v1" -> "v1"
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Type name of the resource variant, e.g. `cert_manager_io_certificate_v1`
    pub fn type_name(&self) -> String {
        let group = self.group.replace(['.', '-'], "_");
        let kind = to_snake_case(&self.kind);
        if group.is_empty() {
            format!("{}_{}", kind, self.version)
        } else {
            format!("{}_{}_{}", group, kind, self.version)
        }
    }

    /// Type name of the manifest variant
    pub fn manifest_type_name(&self) -> String {
        format!("{}_manifest", self.type_name())
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version(), self.kind)
    }
}

/// Namespace and name of a single object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// None for cluster-scoped objects
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectRef {
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    /// State id of this object
    pub fn id(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}/{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

/// Parse an import id.
///
/// Namespaced kinds need `namespace/name` with exactly one `/` and two non-empty
/// segments; cluster-scoped kinds need a bare, non-empty `name`.
pub fn parse_import_id(id: &str, namespaced: bool) -> Result<ObjectRef, Diagnostic> {
    if namespaced {
        let parts: Vec<&str> = id.split('/').collect();
        match parts.as_slice() {
            [namespace, name] if !namespace.is_empty() && !name.is_empty() => {
                Ok(ObjectRef::namespaced(*namespace, *name))
            }
            _ => Err(Diagnostic::error(
                "Error during ImportState",
                format!(
                    "Unable to parse import identifier.\n\nExpected: <namespace>/<name>\nGot: {}",
                    id
                ),
            )),
        }
    } else if id.is_empty() || id.contains('/') {
        Err(Diagnostic::error(
            "Error during ImportState",
            format!(
                "Unable to parse import identifier.\n\nExpected: <name>\nGot: {}",
                id
            ),
        ))
    } else {
        Ok(ObjectRef::cluster(id))
    }
}

/// Convert a camelCase or PascalCase identifier to snake_case.
///
/// Acronym runs stay together: `ClusterIP` -> `cluster_ip`,
/// `URLPath` -> `url_path`, `caBundle` -> `ca_bundle`.
pub fn to_snake_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                None => false,
                Some(p) if p == '_' || p == '-' => false,
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                Some(_) => false,
            };
            if boundary {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn certificate() -> ResourceIdentity {
        ResourceIdentity::new("cert-manager.io", "v1", "Certificate", "certificates", true)
    }

    #[test]
    fn test_api_version() {
        assert_eq!(certificate().api_version(), "cert-manager.io/v1");
        let core = ResourceIdentity::new("", "v1", "ConfigMap", "configmaps", true);
        assert_eq!(core.api_version(), "v1");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(certificate().type_name(), "cert_manager_io_certificate_v1");
        assert_eq!(
            certificate().manifest_type_name(),
            "cert_manager_io_certificate_v1_manifest"
        );
        let issuer =
            ResourceIdentity::new("cert-manager.io", "v1", "ClusterIssuer", "clusterissuers", false);
        assert_eq!(issuer.type_name(), "cert_manager_io_cluster_issuer_v1");
    }

    #[test]
    fn test_import_id_valid() {
        let object = parse_import_id("ns/name", true).unwrap();
        assert_eq!(object.namespace.as_deref(), Some("ns"));
        assert_eq!(object.name, "name");
        assert_eq!(object.id(), "ns/name");
    }

    #[test]
    fn test_import_id_invalid() {
        for id in ["", "name", "/name", "ns/", "/", "a/b/c", "ns//name"] {
            let err = parse_import_id(id, true).unwrap_err();
            assert_eq!(err.summary, "Error during ImportState", "id {:?}", id);
            assert!(err.detail.contains(&format!("Got: {}", id)));
        }
    }

    #[test]
    fn test_import_id_cluster_scoped() {
        assert_eq!(parse_import_id("letsencrypt", false).unwrap().id(), "letsencrypt");
        assert!(parse_import_id("ns/letsencrypt", false).is_err());
        assert!(parse_import_id("", false).is_err());
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("secretName"), "secret_name");
        assert_eq!(to_snake_case("ClusterIssuer"), "cluster_issuer");
        assert_eq!(to_snake_case("clusterIP"), "cluster_ip");
        assert_eq!(to_snake_case("URLPath"), "url_path");
        assert_eq!(to_snake_case("ipv4Address"), "ipv4_address");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case("x509Subject"), "x509_subject");
    }
}
