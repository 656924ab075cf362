//! Built-in resource type declarations
//!
//! Hand-written tables for the cert-manager kinds most configurations need
//! without shipping CRD files.

use crate::identity::ResourceIdentity;
use crate::resource_type::ResourceType;
use crate::schema::{Attribute, AttributeType, Validator};

const CERT_MANAGER_GROUP: &str = "cert-manager.io";

pub fn builtin_types() -> Vec<ResourceType> {
    vec![certificate(), cluster_issuer()]
}

fn strings(name: &str, json_name: &str) -> Attribute {
    Attribute::list(name, json_name, AttributeType::String)
}

fn one_of(values: &[&str]) -> Validator {
    Validator::OneOf(values.iter().map(|v| v.to_string()).collect())
}

fn secret_ref(name: &str, json_name: &str) -> Attribute {
    Attribute::object(
        name,
        json_name,
        vec![
            Attribute::string("name", "name").required(),
            Attribute::string("key", "key").optional(),
        ],
    )
}

/// cert-manager.io/v1 Certificate
pub fn certificate() -> ResourceType {
    let issuer_ref = Attribute::object(
        "issuer_ref",
        "issuerRef",
        vec![
            Attribute::string("name", "name").required(),
            Attribute::string("kind", "kind").optional(),
            Attribute::string("group", "group").optional(),
        ],
    )
    .required()
    .describe("Reference to the issuer responsible for issuing the certificate.");

    let private_key = Attribute::object(
        "private_key",
        "privateKey",
        vec![
            Attribute::string("algorithm", "algorithm")
                .optional()
                .validate(one_of(&["RSA", "ECDSA", "Ed25519"])),
            Attribute::string("encoding", "encoding")
                .optional()
                .validate(one_of(&["PKCS1", "PKCS8"])),
            Attribute::string("rotation_policy", "rotationPolicy")
                .optional()
                .validate(one_of(&["Never", "Always"])),
            Attribute::int64("size", "size").optional(),
        ],
    )
    .optional();

    let spec = Attribute::object(
        "spec",
        "spec",
        vec![
            Attribute::string("secret_name", "secretName")
                .required()
                .describe("Name of the Secret resource that will hold the issued certificate.")
                .validate(Validator::LengthBetween {
                    min: Some(1),
                    max: Some(253),
                }),
            issuer_ref,
            Attribute::string("common_name", "commonName")
                .optional()
                .validate(Validator::LengthBetween {
                    min: None,
                    max: Some(64),
                }),
            strings("dns_names", "dnsNames").optional(),
            strings("ip_addresses", "ipAddresses").optional(),
            strings("uris", "uris").optional(),
            strings("email_addresses", "emailAddresses").optional(),
            Attribute::string("duration", "duration").optional(),
            Attribute::string("renew_before", "renewBefore").optional(),
            Attribute::int64("revision_history_limit", "revisionHistoryLimit")
                .optional()
                .validate(Validator::Int64Between {
                    min: Some(1),
                    max: None,
                }),
            Attribute::bool("is_ca", "isCA").optional(),
            strings("usages", "usages").optional(),
            private_key,
            Attribute::object(
                "secret_template",
                "secretTemplate",
                vec![
                    Attribute::map("labels", "labels", AttributeType::String).optional(),
                    Attribute::map("annotations", "annotations", AttributeType::String).optional(),
                ],
            )
            .optional(),
        ],
    )
    .required()
    .describe("Desired state of the Certificate resource.");

    ResourceType::new(
        ResourceIdentity::new(CERT_MANAGER_GROUP, "v1", "Certificate", "certificates", true),
        vec![spec],
    )
    .with_description("A Certificate resource requests a signed certificate from an Issuer.")
}

/// cert-manager.io/v1 ClusterIssuer
pub fn cluster_issuer() -> ResourceType {
    let issuers = ["acme", "ca", "self_signed", "vault"];
    let exclusive = |me: &str| {
        Validator::ExactlyOneOf(
            issuers
                .iter()
                .filter(|other| **other != me)
                .map(|other| other.to_string())
                .collect(),
        )
    };

    let spec = Attribute::object(
        "spec",
        "spec",
        vec![
            Attribute::object(
                "acme",
                "acme",
                vec![
                    Attribute::string("server", "server")
                        .required()
                        .validate(Validator::RegexMatches("^https://".to_string())),
                    Attribute::string("email", "email").optional(),
                    secret_ref("private_key_secret_ref", "privateKeySecretRef").required(),
                    Attribute::bool("skip_tls_verify", "skipTLSVerify").optional(),
                    Attribute::dynamic("solvers", "solvers").optional(),
                ],
            )
            .optional()
            .validate(exclusive("acme")),
            Attribute::object(
                "ca",
                "ca",
                vec![
                    Attribute::string("secret_name", "secretName").required(),
                    strings("crl_distribution_points", "crlDistributionPoints").optional(),
                ],
            )
            .optional()
            .validate(exclusive("ca")),
            Attribute::object(
                "self_signed",
                "selfSigned",
                vec![
                    strings("crl_distribution_points", "crlDistributionPoints").optional(),
                ],
            )
            .optional()
            .validate(exclusive("self_signed")),
            Attribute::object(
                "vault",
                "vault",
                vec![
                    Attribute::string("server", "server").required(),
                    Attribute::string("path", "path").required(),
                    Attribute::string("namespace", "namespace").optional(),
                    Attribute::string("ca_bundle", "caBundle").optional().sensitive(),
                    Attribute::dynamic("auth", "auth").required(),
                ],
            )
            .optional()
            .validate(exclusive("vault")),
        ],
    )
    .required();

    ResourceType::new(
        ResourceIdentity::new(CERT_MANAGER_GROUP, "v1", "ClusterIssuer", "clusterissuers", false),
        vec![spec],
    )
    .with_description("A ClusterIssuer represents a certificate issuing authority usable from any namespace.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource_type::Variant;
    use crate::schema::validate_config;
    use crate::value::Value;
    use serde_json::json;

    #[test]
    fn test_builtins_are_valid() {
        for rt in builtin_types() {
            for (variant, diags) in rt.validate_implementation() {
                assert!(!diags.has_error(), "{} {}: {:?}", rt.identity, variant, diags);
            }
        }
    }

    #[test]
    fn test_certificate_accepts_string_lists() {
        let rt = certificate();
        let plan = Value::from(json!({
            "metadata": {"name": "web", "namespace": "default"},
            "spec": {
                "secret_name": "web-tls",
                "issuer_ref": {"name": "letsencrypt", "kind": "ClusterIssuer"},
                "dns_names": ["example.com", "www.example.com"],
                "usages": ["server auth"]
            }
        }));
        let diags = validate_config(&rt.schema(Variant::Resource), &plan);
        assert!(diags.is_empty(), "{:?}", diags);

        let nested = Value::from(json!({
            "metadata": {"name": "web", "namespace": "default"},
            "spec": {
                "secret_name": "web-tls",
                "issuer_ref": {"name": "letsencrypt"},
                "dns_names": [["example.com"]]
            }
        }));
        let diags = validate_config(&rt.schema(Variant::Resource), &nested);
        assert_eq!(diags.errors().count(), 1);
        assert_eq!(
            diags.iter().next().map(|d| d.detail.as_str()),
            Some("expected string")
        );
    }

    #[test]
    fn test_scopes() {
        assert!(certificate().identity.namespaced);
        assert!(!cluster_issuer().identity.namespaced);
        assert_eq!(cluster_issuer().identity.type_name(), "cert_manager_io_cluster_issuer_v1");
    }
}
