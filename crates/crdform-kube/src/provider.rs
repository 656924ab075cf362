//! Provider configuration and shared provider data
//!
//! Stores provider configuration in `~/.config/crdform/provider.yaml`. The
//! configuration is turned into [`ProviderData`] once, which every handler
//! then reads without mutation.

use crdform_core::Value;
use kube::config::{KubeConfigOptions, Kubeconfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::client::{DynamicClient, KubeDynamicClient};
use crate::error::{HandlerError, HandlerResult, KubeError, Result};

/// Field manager used when neither the provider nor the resource sets one
pub const DEFAULT_FIELD_MANAGER: &str = "crdform";

/// Provider configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Path to a kubeconfig file; the standard lookup is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use instead of the current one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(default = "default_field_manager")]
    pub field_manager: String,

    #[serde(default)]
    pub force_conflicts: bool,

    /// Never connect to a cluster; only manifests are available
    #[serde(default)]
    pub offline: bool,

    /// CRD files whose served versions are registered as resource types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub crds: Vec<PathBuf>,

    /// Serialized resource type definitions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<PathBuf>,
}

fn default_field_manager() -> String {
    DEFAULT_FIELD_MANAGER.to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            field_manager: default_field_manager(),
            force_conflicts: false,
            offline: false,
            crds: Vec::new(),
            schemas: Vec::new(),
        }
    }
}

impl ProviderConfig {
    /// Load configuration from default location
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded provider configuration");
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            KubeError::InvalidConfig("Could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("crdform").join("provider.yaml"))
    }

    /// Build a kube client from the kubeconfig settings
    pub async fn kube_client(&self) -> Result<kube::Client> {
        let options = KubeConfigOptions {
            context: self.context.clone(),
            ..Default::default()
        };
        let config = match (&self.kubeconfig, &self.context) {
            (Some(path), _) => {
                let kubeconfig = Kubeconfig::read_from(path)
                    .map_err(|e| KubeError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
                kube::Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(|e| KubeError::InvalidConfig(e.to_string()))?
            }
            (None, Some(_)) => kube::Config::from_kubeconfig(&options)
                .await
                .map_err(|e| KubeError::InvalidConfig(e.to_string()))?,
            (None, None) => kube::Config::infer()
                .await
                .map_err(|e| KubeError::InvalidConfig(e.to_string()))?,
        };
        Ok(kube::Client::try_from(config)?)
    }
}

/// Provider-wide data shared read-only by every handler
#[derive(Clone)]
pub struct ProviderData {
    client: Option<Arc<dyn DynamicClient>>,
    pub field_manager: String,
    pub force_conflicts: bool,
    pub offline: bool,
}

impl std::fmt::Debug for ProviderData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderData")
            .field("connected", &self.client.is_some())
            .field("field_manager", &self.field_manager)
            .field("force_conflicts", &self.force_conflicts)
            .field("offline", &self.offline)
            .finish()
    }
}

impl ProviderData {
    /// Connect to the cluster, unless the configuration is offline
    pub async fn connect(config: &ProviderConfig) -> Result<Self> {
        if config.offline {
            return Ok(Self::offline(config));
        }
        let client = KubeDynamicClient::new(config.kube_client().await?);
        Ok(Self::with_client(Arc::new(client), config))
    }

    /// Provider data without a cluster connection
    pub fn offline(config: &ProviderConfig) -> Self {
        Self {
            client: None,
            field_manager: config.field_manager.clone(),
            force_conflicts: config.force_conflicts,
            offline: true,
        }
    }

    /// Create with an existing client
    pub fn with_client(client: Arc<dyn DynamicClient>, config: &ProviderConfig) -> Self {
        Self {
            client: Some(client),
            field_manager: config.field_manager.clone(),
            force_conflicts: config.force_conflicts,
            offline: false,
        }
    }

    /// The cluster client, or an offline error naming the operation
    pub fn client(&self, operation: &'static str) -> HandlerResult<&dyn DynamicClient> {
        self.client
            .as_deref()
            .ok_or(HandlerError::Offline { operation })
    }

    /// Field manager for one resource: its own value when known, else the provider's
    pub fn field_manager_for(&self, value: &Value) -> String {
        resolve_field_manager(value, &self.field_manager)
    }

    /// Force flag for one resource: its own value when known, else the provider's
    pub fn force_conflicts_for(&self, value: &Value) -> bool {
        resolve_force_conflicts(value, self.force_conflicts)
    }
}

pub fn resolve_force_conflicts(value: &Value, provider_default: bool) -> bool {
    value.as_bool().unwrap_or(provider_default)
}

pub fn resolve_field_manager(value: &Value, provider_default: &str) -> String {
    value
        .as_str()
        .map(String::from)
        .unwrap_or_else(|| provider_default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDynamicClient;
    use tempfile::TempDir;

    #[test]
    fn test_force_conflicts_precedence() {
        let resource_values = [
            (Value::Null, None),
            (Value::Unknown, None),
            (Value::Bool(true), Some(true)),
            (Value::Bool(false), Some(false)),
        ];
        for (value, own) in &resource_values {
            for provider_default in [true, false] {
                let expected = own.unwrap_or(provider_default);
                assert_eq!(
                    resolve_force_conflicts(value, provider_default),
                    expected,
                    "resource {:?}, provider {}",
                    value,
                    provider_default
                );
            }
        }
    }

    #[test]
    fn test_field_manager_precedence() {
        let cases = [
            (Value::Null, "provider", "provider"),
            (Value::Unknown, "provider", "provider"),
            (Value::from("mine"), "provider", "mine"),
            (Value::from("mine"), DEFAULT_FIELD_MANAGER, "mine"),
            (Value::Null, DEFAULT_FIELD_MANAGER, "crdform"),
        ];
        for (value, provider_default, expected) in cases {
            assert_eq!(resolve_field_manager(&value, provider_default), expected);
        }
    }

    #[test]
    fn test_config_defaults() {
        let config: ProviderConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ProviderConfig::default());
        assert_eq!(config.field_manager, "crdform");
        assert!(!config.offline);
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("provider.yaml");

        let config = ProviderConfig {
            context: Some("kind-dev".to_string()),
            field_manager: "platform".to_string(),
            force_conflicts: true,
            crds: vec![PathBuf::from("crds/widgets.yaml")],
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("fieldManager: platform"));
        assert!(content.contains("forceConflicts: true"));

        let loaded = ProviderConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_offline_provider_has_no_client() {
        let config = ProviderConfig {
            offline: true,
            ..Default::default()
        };
        let data = ProviderData::connect(&config).await.unwrap();
        assert!(data.offline);
        let Err(err) = data.client("read") else {
            panic!("offline provider handed out a client");
        };
        assert_eq!(err.summary(), "Provider in Offline Mode");
    }

    #[test]
    fn test_provider_overrides() {
        let config = ProviderConfig {
            force_conflicts: true,
            ..Default::default()
        };
        let data = ProviderData::with_client(Arc::new(MockDynamicClient::new()), &config);
        assert!(data.client("create").is_ok());
        assert!(data.force_conflicts_for(&Value::Null));
        assert!(!data.force_conflicts_for(&Value::Bool(false)));
        assert_eq!(data.field_manager_for(&Value::Null), "crdform");
    }
}
