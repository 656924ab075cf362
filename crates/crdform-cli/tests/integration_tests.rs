//! Integration tests for the offline CLI commands

use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to run crdform with a given argument list
fn crdform(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_crdform"))
        .args(args)
        .env_remove("CRDFORM_CONFIG")
        .env_remove("CRDFORM_OFFLINE")
        .env_remove("CRDFORM_CRDS")
        .env_remove("CRDFORM_SCHEMAS")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute crdform")
}

/// Get the fixtures path
fn fixtures_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures")
}

fn fixture(name: &str) -> String {
    format!("{}/{}", fixtures_path(), name)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

mod types_command {
    use super::*;

    #[test]
    fn test_lists_builtin_types() {
        let output = crdform(&["types"]);
        assert!(output.status.success());

        let out = stdout(&output);
        assert!(out.contains("cert_manager_io_certificate_v1"));
        assert!(out.contains("cert_manager_io_cluster_issuer_v1"));
        assert!(!out.contains("_manifest"));
    }

    #[test]
    fn test_lists_manifest_names() {
        let output = crdform(&["types", "--manifests"]);
        assert!(output.status.success());
        assert!(stdout(&output).contains("cert_manager_io_certificate_v1_manifest"));
    }

    #[test]
    fn test_registers_crd_types() {
        let crd = fixture("crds/backup.yaml");
        let output = crdform(&["types", "--crd", &crd]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert!(stdout(&output).contains("example_com_backup_v1"));
    }
}

mod schema_command {
    use super::*;

    #[test]
    fn test_resource_schema_tree() {
        let output = crdform(&["schema", "cert_manager_io_certificate_v1"]);
        assert!(output.status.success());

        let out = stdout(&output);
        assert!(out.contains("secret_name (string) [required]"));
        assert!(out.contains("wait_for_upsert"));
        assert!(out.contains("uid (string) [computed]"));
    }

    #[test]
    fn test_data_source_schema_is_computed() {
        let output = crdform(&[
            "schema",
            "cert_manager_io_certificate_v1",
            "--variant",
            "data-source",
        ]);
        assert!(output.status.success());

        let out = stdout(&output);
        assert!(out.contains("secret_name (string) [computed]"));
        assert!(!out.contains("wait_for_upsert"));
    }

    #[test]
    fn test_manifest_suffix_selects_manifest_variant() {
        let output = crdform(&["schema", "cert_manager_io_certificate_v1_manifest"]);
        assert!(output.status.success());

        let out = stdout(&output);
        assert!(out.contains("yaml (string) [computed]"));
        assert!(!out.contains("force_conflicts"));
    }

    #[test]
    fn test_yaml_format() {
        let output = crdform(&[
            "schema",
            "cert_manager_io_cluster_issuer_v1",
            "--format",
            "yaml",
        ]);
        assert!(output.status.success());

        let attrs: Vec<serde_yaml::Value> =
            serde_yaml::from_str(&stdout(&output)).expect("schema should be YAML");
        assert_eq!(attrs[0]["name"].as_str(), Some("id"));
        assert!(attrs.iter().any(|a| a["name"].as_str() == Some("spec")));
    }

    #[test]
    fn test_unknown_type_suggests_a_name() {
        let output = crdform(&["schema", "cert_manager_io_certificat_v1"]);
        assert_eq!(output.status.code(), Some(64));
        // the report wraps long lines, so only the suggested name is stable
        assert!(stderr(&output).contains("'cert_manager_io_certificate_v1'"));
    }
}

mod check_command {
    use super::*;

    #[test]
    fn test_builtin_schemas_are_valid() {
        let output = crdform(&["check"]);
        assert!(output.status.success(), "stdout: {}", stdout(&output));
        assert!(stdout(&output).contains("All schemas are valid"));
    }

    #[test]
    fn test_generated_schemas_are_valid() {
        let crd = fixture("crds/backup.yaml");
        let output = crdform(&["check", "--crd", &crd]);
        assert!(output.status.success(), "stdout: {}", stdout(&output));
        assert!(stdout(&output).contains("example_com_backup_v1_manifest"));
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn test_valid_plans() {
        let output = crdform(&[
            "validate",
            &fixture("plans/certificate.yaml"),
            &fixture("plans/cluster-issuer.yaml"),
            &fixture("plans/certificate-manifest.yaml"),
        ]);
        assert!(output.status.success(), "stdout: {}", stdout(&output));
        assert!(stdout(&output).contains("Validation passed"));
    }

    #[test]
    fn test_required_and_enum_violations() {
        let output = crdform(&["validate", &fixture("plans/certificate-invalid.yaml")]);
        assert_eq!(output.status.code(), Some(2));

        let out = stdout(&output);
        assert!(out.contains("Missing Configuration for Required Attribute"));
        assert!(out.contains("spec.secret_name"));
        assert!(out.contains("Invalid Attribute Value Match"));
        assert!(out.contains("\"DSA\""));
    }

    #[test]
    fn test_exactly_one_of_violation() {
        let output = crdform(&["validate", &fixture("plans/cluster-issuer-conflict.yaml")]);
        assert_eq!(output.status.code(), Some(2));
        assert!(stdout(&output).contains("Invalid Attribute Combination"));
    }

    #[test]
    fn test_crd_type_needs_the_crd() {
        let plan = fixture("plans/backup.yaml");
        let output = crdform(&["validate", &plan]);
        assert_eq!(output.status.code(), Some(64));

        let crd = fixture("crds/backup.yaml");
        let output = crdform(&["validate", "--crd", &crd, &plan]);
        assert!(output.status.success(), "stdout: {}", stdout(&output));
    }

    #[test]
    fn test_missing_plan_file() {
        let output = crdform(&["validate", &fixture("plans/nope.yaml")]);
        assert_eq!(output.status.code(), Some(5));
    }
}

mod render_command {
    use super::*;

    fn documents(yaml: &str) -> Vec<serde_json::Value> {
        use serde::Deserialize;
        serde_yaml::Deserializer::from_str(yaml)
            .map(|doc| serde_json::Value::deserialize(doc).expect("valid YAML document"))
            .collect()
    }

    #[test]
    fn test_render_manifest_plan() {
        let output = crdform(&["render", &fixture("plans/certificate-manifest.yaml")]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let docs = documents(&stdout(&output));
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["apiVersion"], "cert-manager.io/v1");
        assert_eq!(docs[0]["kind"], "Certificate");
        assert_eq!(docs[0]["metadata"]["namespace"], "prod");
        assert_eq!(docs[0]["spec"]["secretName"], "api-tls");
        assert_eq!(docs[0]["spec"]["issuerRef"]["kind"], "ClusterIssuer");
    }

    #[test]
    fn test_render_multiple_plans() {
        let output = crdform(&[
            "render",
            &fixture("plans/certificate-manifest.yaml"),
            &fixture("plans/cluster-issuer.yaml"),
        ]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let docs = documents(&stdout(&output));
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1]["kind"], "ClusterIssuer");
        assert!(docs[1]["metadata"].get("namespace").is_none());
        assert_eq!(docs[1]["spec"], serde_json::json!({"selfSigned": {}}));
    }

    #[test]
    fn test_render_crd_type() {
        let crd = fixture("crds/backup.yaml");
        let output = crdform(&["render", "--crd", &crd, &fixture("plans/backup.yaml")]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let docs = documents(&stdout(&output));
        assert_eq!(docs[0]["apiVersion"], "example.com/v1");
        assert_eq!(docs[0]["spec"]["storageClassName"], "standard");
        assert_eq!(docs[0]["spec"]["retention"], 30);
    }

    #[test]
    fn test_render_rejects_cluster_knobs() {
        // wait blocks belong to the resource variant only
        let output = crdform(&["render", &fixture("plans/certificate.yaml")]);
        assert_eq!(output.status.code(), Some(2));
        assert!(stderr(&output).contains("Unsupported Attribute"));
    }

    #[test]
    fn test_render_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.yaml");
        let output = crdform(&[
            "render",
            &fixture("plans/cluster-issuer.yaml"),
            "-o",
            path.to_str().unwrap(),
        ]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("kind: ClusterIssuer"));
    }
}

mod import_command {
    use super::*;

    #[test]
    fn test_offline_import_seeds_state() {
        let output = crdform(&[
            "--offline",
            "import",
            "cert_manager_io_certificate_v1",
            "default/web",
        ]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let doc: serde_json::Value = serde_yaml::from_str(&stdout(&output)).unwrap();
        assert_eq!(doc["type"], "cert_manager_io_certificate_v1");
        assert_eq!(doc["values"]["id"], "default/web");
        assert_eq!(doc["values"]["metadata"]["namespace"], "default");
        assert_eq!(doc["values"]["metadata"]["name"], "web");
    }

    #[test]
    fn test_cluster_scoped_import() {
        let output = crdform(&[
            "--offline",
            "import",
            "cert_manager_io_cluster_issuer_v1",
            "selfsigned",
        ]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let doc: serde_json::Value = serde_yaml::from_str(&stdout(&output)).unwrap();
        assert_eq!(doc["values"]["id"], "selfsigned");
        assert!(doc["values"]["metadata"].get("namespace").is_none());
    }

    #[test]
    fn test_malformed_ids() {
        for id in ["web", "a/b/c", "/web", "default/"] {
            let output = crdform(&["--offline", "import", "cert_manager_io_certificate_v1", id]);
            assert_eq!(output.status.code(), Some(2), "id {id:?}");
            assert!(stderr(&output).contains("Error during ImportState"), "id {id:?}");
        }

        let output = crdform(&[
            "--offline",
            "import",
            "cert_manager_io_cluster_issuer_v1",
            "default/selfsigned",
        ]);
        assert_eq!(output.status.code(), Some(2));
    }
}

mod offline_mode {
    use super::*;

    #[test]
    fn test_apply_is_rejected_offline() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join("web.state.yaml");
        let output = crdform(&[
            "--offline",
            "apply",
            &fixture("plans/certificate.yaml"),
            "--state",
            state.to_str().unwrap(),
        ]);
        assert_eq!(output.status.code(), Some(78));
        assert!(stderr(&output).contains("Provider in Offline Mode"));
        assert!(!state.exists());
    }

    #[test]
    fn test_get_is_rejected_offline() {
        let output = crdform(&["--offline", "get", "cert_manager_io_certificate_v1", "default/web"]);
        assert_eq!(output.status.code(), Some(78));
    }

    #[test]
    fn test_manifest_types_cannot_be_applied() {
        let output = crdform(&["--offline", "apply", &fixture("plans/certificate-manifest.yaml")]);
        assert_eq!(output.status.code(), Some(64));
        assert!(stderr(&output).contains("crdform render"));
    }
}

mod generate_command {
    use super::*;

    #[test]
    fn test_generated_definitions_load_back() {
        let dir = TempDir::new().unwrap();
        let definitions = dir.path().join("backup-types.yaml");
        let output = crdform(&[
            "generate",
            &fixture("crds/backup.yaml"),
            "-o",
            definitions.to_str().unwrap(),
        ]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));

        let defs = definitions.to_str().unwrap();
        let output = crdform(&["types", "--schemas", defs]);
        assert!(output.status.success(), "stderr: {}", stderr(&output));
        assert!(stdout(&output).contains("example_com_backup_v1"));

        let output = crdform(&["validate", "--schemas", defs, &fixture("plans/backup.yaml")]);
        assert!(output.status.success(), "stdout: {}", stdout(&output));
    }

    #[test]
    fn test_generate_to_stdout() {
        let output = crdform(&["generate", &fixture("crds/backup.yaml")]);
        assert!(output.status.success());

        let types: Vec<serde_json::Value> = serde_yaml::from_str(&stdout(&output)).unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0]["kind"], "Backup");
        assert_eq!(types[0]["group"], "example.com");
    }
}
