//! Shared command context: provider flags, catalog and plan/state documents

use clap::Args;
use console::style;
use crdform_core::{Catalog, ResourceType, Value, Variant};
use crdform_kube::{ProviderConfig, ProviderData};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::display::format_diagnostic;
use crate::error::{CliError, Result};

/// Provider flags, layered over the provider configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct ProviderArgs {
    /// Provider configuration file (default: <config dir>/crdform/provider.yaml)
    #[arg(long, global = true, env = "CRDFORM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Kubeconfig file
    #[arg(long, global = true, env = "CRDFORM_KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context
    #[arg(long, global = true, env = "CRDFORM_CONTEXT")]
    pub context: Option<String>,

    /// Server-side apply field manager
    #[arg(long, global = true, env = "CRDFORM_FIELD_MANAGER")]
    pub field_manager: Option<String>,

    /// Take ownership of conflicting fields on apply
    #[arg(long, global = true, env = "CRDFORM_FORCE_CONFLICTS")]
    pub force_conflicts: bool,

    /// Never contact a cluster (manifests only)
    #[arg(long, global = true, env = "CRDFORM_OFFLINE")]
    pub offline: bool,

    /// CRD file to register resource types from (repeatable)
    #[arg(long = "crd", global = true, env = "CRDFORM_CRDS", value_delimiter = ',')]
    pub crds: Vec<PathBuf>,

    /// Serialized resource type definitions (repeatable)
    #[arg(long = "schemas", global = true, env = "CRDFORM_SCHEMAS", value_delimiter = ',')]
    pub schemas: Vec<PathBuf>,
}

impl ProviderArgs {
    /// Configuration file (explicit or default location) with the flags on top
    pub fn provider_config(&self) -> Result<ProviderConfig> {
        let mut config = match &self.config {
            Some(path) => ProviderConfig::load_from(path)?,
            None => match ProviderConfig::default_path() {
                Ok(path) if path.exists() => ProviderConfig::load_from(&path)?,
                _ => ProviderConfig::default(),
            },
        };

        if let Some(kubeconfig) = &self.kubeconfig {
            config.kubeconfig = Some(kubeconfig.clone());
        }
        if let Some(context) = &self.context {
            config.context = Some(context.clone());
        }
        if let Some(field_manager) = &self.field_manager {
            config.field_manager = field_manager.clone();
        }
        config.force_conflicts |= self.force_conflicts;
        config.offline |= self.offline;
        config.crds.extend(self.crds.iter().cloned());
        config.schemas.extend(self.schemas.iter().cloned());
        Ok(config)
    }
}

pub struct Context {
    pub config: ProviderConfig,
    pub catalog: Catalog,
}

impl Context {
    /// Resolve the provider configuration and build the catalog.
    ///
    /// CRD generation warnings go to stderr.
    pub fn load(args: &ProviderArgs) -> Result<Self> {
        let config = args.provider_config()?;
        let mut catalog = Catalog::builtin();

        for path in &config.crds {
            let yaml = read_file(path)?;
            let warnings = catalog.load_crds(&yaml)?;
            for diag in warnings.iter() {
                eprintln!("{} {}", format_diagnostic(diag), style(path.display()).dim());
            }
        }
        for path in &config.schemas {
            let yaml = read_file(path)?;
            let count = catalog.load_definitions(&yaml)?;
            tracing::debug!(path = %path.display(), count, "loaded resource type definitions");
        }

        Ok(Self { config, catalog })
    }

    /// Resolve a type name, rejecting manifest names where a cluster type is needed
    pub fn cluster_type(&self, name: &str, variant: Variant) -> Result<Arc<ResourceType>> {
        let (rt, resolved) = self.catalog.resolve(name, variant)?;
        if resolved == Variant::Manifest {
            return Err(CliError::usage_with_help(
                format!("'{name}' is a manifest type and never touches the cluster"),
                "use `crdform render` for manifest types",
            ));
        }
        Ok(rt)
    }

    /// Connect to the cluster (or not, in offline mode)
    pub async fn provider(&self) -> Result<Arc<ProviderData>> {
        Ok(Arc::new(ProviderData::connect(&self.config).await?))
    }
}

/// Plan or state file: a type name plus the attribute values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub values: serde_json::Value,
}

impl Document {
    pub fn new(type_name: impl Into<String>, values: &Value) -> Self {
        Self {
            type_name: type_name.into(),
            values: values.to_json(),
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = read_file(path)?;
        serde_yaml::from_str(&content).map_err(|e| {
            CliError::validation(
                "Unable to parse input",
                format!("{}: {}", path.display(), e),
            )
        })
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_yaml()?).map_err(|e| CliError::io_at(path, e))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| CliError::validation("Unable to serialize state", e.to_string()))
    }

    pub fn value(&self) -> Value {
        Value::from(self.values.clone())
    }
}

/// `web.yaml` is tracked in `web.state.yaml`
pub fn default_state_path(plan: &Path) -> PathBuf {
    plan.with_extension("state.yaml")
}

pub fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| CliError::io_at(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("provider.yaml");
        fs::write(
            &path,
            "fieldManager: from-file\ncontext: kind-dev\nforceConflicts: false\n",
        )
        .unwrap();

        let args = ProviderArgs {
            config: Some(path),
            field_manager: Some("from-flag".to_string()),
            force_conflicts: true,
            ..Default::default()
        };
        let config = args.provider_config().unwrap();
        assert_eq!(config.field_manager, "from-flag");
        assert_eq!(config.context.as_deref(), Some("kind-dev"));
        assert!(config.force_conflicts);
        assert!(!config.offline);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = ProviderArgs {
            config: Some(PathBuf::from("/nonexistent/crdform.yaml")),
            ..Default::default()
        };
        assert!(args.provider_config().is_err());
    }

    #[test]
    fn test_document_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("web.state.yaml");
        let values = Value::from(serde_json::json!({
            "id": "default/web",
            "metadata": {"name": "web", "namespace": "default"}
        }));

        Document::new("cert_manager_io_certificate_v1", &values)
            .write(&path)
            .unwrap();
        let doc = Document::read(&path).unwrap();
        assert_eq!(doc.type_name, "cert_manager_io_certificate_v1");
        assert_eq!(doc.value().get("id").as_str(), Some("default/web"));
    }

    #[test]
    fn test_default_state_path() {
        assert_eq!(
            default_state_path(Path::new("plans/web.yaml")),
            PathBuf::from("plans/web.state.yaml")
        );
    }

    #[test]
    fn test_manifest_name_is_not_a_cluster_type() {
        let ctx = Context {
            config: ProviderConfig::default(),
            catalog: Catalog::builtin(),
        };
        assert!(ctx.cluster_type("cert_manager_io_certificate_v1", Variant::Resource).is_ok());
        let err = ctx
            .cluster_type("cert_manager_io_certificate_v1_manifest", Variant::Resource)
            .unwrap_err();
        assert_eq!(err.exit_code(), crate::exit_codes::USAGE_ERROR);
    }
}
