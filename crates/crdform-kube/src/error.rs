//! Error types for crdform-kube

use crdform_core::{CoreError, Diagnostic, Diagnostics};
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur talking to the API server
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Object does not exist
    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration (kubeconfig, context, provider file)
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for KubeError {
    fn from(e: serde_yaml::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl KubeError {
    /// Check if this is a Kubernetes 404 Not Found error
    pub fn is_not_found(&self) -> bool {
        match self {
            KubeError::NotFound { .. } => true,
            KubeError::Api(kube::Error::Api(resp)) => resp.code == 404,
            _ => false,
        }
    }

    /// Check if this is a conflict error (409)
    pub fn is_conflict(&self) -> bool {
        matches!(self, KubeError::Api(kube::Error::Api(resp)) if resp.code == 409)
    }
}

/// Errors reported by the resource, data source and manifest handlers.
///
/// Each variant maps onto one diagnostic summary; see [`HandlerError::summary`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HandlerError {
    /// Provider is in offline mode and the operation needs a cluster
    #[error("the provider is in offline mode; {operation} requires a cluster connection")]
    Offline { operation: &'static str },

    /// Handler used before the provider was configured
    #[error("expected configured provider data, got none; configure the provider before using {type_name}")]
    Unconfigured { type_name: String },

    #[error("{0}")]
    Get(#[source] KubeError),

    #[error("{0}")]
    Patch(#[source] KubeError),

    #[error("{0}")]
    Delete(#[source] KubeError),

    #[error("{0}")]
    Marshal(#[source] CoreError),

    #[error("{0}")]
    Unmarshal(#[source] CoreError),

    #[error("{id} still exists after {timeout}")]
    DeleteTimedOut { id: String, timeout: String },

    #[error("{jsonpath} on {id} did not become '{expected}' within {timeout} (last value: {last})")]
    UpsertTimedOut {
        id: String,
        jsonpath: String,
        expected: String,
        last: String,
        timeout: String,
    },

    #[error("{}", .0.detail)]
    ImportState(Diagnostic),

    /// The plan moves the object to another name or namespace
    #[error("{from} cannot be renamed to {to}; delete it and apply the plan again")]
    RequiresReplacement { from: String, to: String },

    #[error("{0}")]
    InvalidWait(#[source] CoreError),

    #[error("{} configuration error(s)", .0.errors().count())]
    InvalidConfiguration(Diagnostics),
}

impl HandlerError {
    /// Terraform-style diagnostic summary
    pub fn summary(&self) -> &str {
        match self {
            HandlerError::Offline { .. } => "Provider in Offline Mode",
            HandlerError::Unconfigured { .. } => "Unexpected Resource Configure Type",
            HandlerError::Get(_) => "Unable to GET resource",
            HandlerError::Patch(_) => "Unable to PATCH resource",
            HandlerError::Delete(_) => "Unable to DELETE resource",
            HandlerError::Marshal(_) => "Unable to marshal resource",
            HandlerError::Unmarshal(_) => "Unable to unmarshal resource",
            HandlerError::DeleteTimedOut { .. } => "Timed out waiting for deletion",
            HandlerError::UpsertTimedOut { .. } => "Timed out waiting for condition",
            HandlerError::ImportState(diag) => &diag.summary,
            HandlerError::RequiresReplacement { .. } => "Resource Requires Replacement",
            HandlerError::InvalidWait(_) => "Invalid wait configuration",
            HandlerError::InvalidConfiguration(_) => "Invalid configuration",
        }
    }

    /// Diagnostics describing this error
    pub fn to_diagnostics(&self) -> Diagnostics {
        match self {
            HandlerError::ImportState(diag) => diag.clone().into(),
            HandlerError::InvalidConfiguration(diags) => diags.clone(),
            other => Diagnostic::error(other.summary(), other.to_string()).into(),
        }
    }

    /// True for the API errors that mean the object is gone
    pub fn is_not_found(&self) -> bool {
        match self {
            HandlerError::Get(e) | HandlerError::Delete(e) | HandlerError::Patch(e) => e.is_not_found(),
            _ => false,
        }
    }
}

pub type HandlerResult<T> = std::result::Result<T, HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let err = KubeError::NotFound {
            kind: "Certificate".to_string(),
            name: "web".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
        assert!(HandlerError::Get(err).is_not_found());

        let err = KubeError::InvalidConfig("no context".to_string());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_diagnostic_summary() {
        let err = HandlerError::Patch(KubeError::Serialization("bad body".to_string()));
        let diags = err.to_diagnostics();
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.summary, "Unable to PATCH resource");
        assert_eq!(diag.detail, "serialization error: bad body");
    }
}
