//! CLI error types with exit code handling
//!
//! Library errors are folded into one [`CliError`] that renders through miette
//! and maps to an exit code.

use crdform_core::CoreError;
use crdform_kube::{HandlerError, KubeError};
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Plan, state or schema content is invalid
    #[error("{summary}: {message}")]
    #[diagnostic(code(crdform::cli::validation))]
    Validation {
        summary: String,
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Diagnostics were printed and at least one was an error
    #[error("{what} failed with {errors} error(s) and {warnings} warning(s)")]
    #[diagnostic(code(crdform::cli::diagnostics))]
    DiagnosticsFailed {
        what: &'static str,
        errors: usize,
        warnings: usize,
    },

    /// Unknown resource type or unusable argument
    #[error("{message}")]
    #[diagnostic(code(crdform::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The Kubernetes API failed a request
    #[error("{summary}: {message}")]
    #[diagnostic(code(crdform::cli::cluster))]
    Cluster { summary: String, message: String },

    /// A wait block ran out of time after the mutation happened
    #[error("{summary}: {message}")]
    #[diagnostic(
        code(crdform::cli::timeout),
        help("the change was applied; run `crdform refresh` to record the current state")
    )]
    Timeout { summary: String, message: String },

    /// Provider configuration cannot serve the command
    #[error("{summary}: {message}")]
    #[diagnostic(code(crdform::cli::config))]
    Config {
        summary: String,
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(crdform::cli::io))]
    Io { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } | CliError::DiagnosticsFailed { .. } => {
                exit_codes::VALIDATION_ERROR
            }
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::Timeout { .. } => exit_codes::TIMEOUT,
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
        }
    }

    pub fn validation(summary: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            summary: summary.into(),
            message: message.into(),
            help: None,
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: None,
        }
    }

    pub fn usage_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn diagnostics_failed(what: &'static str, errors: usize, warnings: usize) -> Self {
        Self::DiagnosticsFailed {
            what,
            errors,
            warnings,
        }
    }

    /// IO error with the offending path in the message
    pub fn io_at(path: &std::path::Path, err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{}: {}", path.display(), err),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownType { .. } => CliError::usage_with_help(
                err.to_string(),
                "run `crdform types` to list the registered resource types",
            ),
            CoreError::DuplicateType { .. } => CliError::Config {
                summary: "Conflicting resource types".to_string(),
                message: err.to_string(),
                help: Some("each CRD or schema file may register a type only once".to_string()),
            },
            CoreError::YamlParse(_) | CoreError::JsonParse(_) => {
                CliError::validation("Unable to parse input", err.to_string())
            }
            other => CliError::validation("Invalid input", other.to_string()),
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        match err {
            KubeError::InvalidConfig(message) => CliError::Config {
                summary: "Unable to configure provider".to_string(),
                message,
                help: Some("check --kubeconfig and --context, or pass --offline".to_string()),
            },
            KubeError::Io(e) => CliError::from(e),
            other => CliError::Cluster {
                summary: "Kubernetes API error".to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl From<HandlerError> for CliError {
    fn from(err: HandlerError) -> Self {
        let summary = err.summary().to_string();
        let message = err.to_string();
        match err {
            HandlerError::Offline { .. } => CliError::Config {
                summary,
                message,
                help: Some("drop --offline, or render a manifest with `crdform render`".to_string()),
            },
            HandlerError::Unconfigured { .. } => CliError::Config {
                summary,
                message,
                help: None,
            },
            HandlerError::Get(_) | HandlerError::Patch(_) | HandlerError::Delete(_) => {
                CliError::Cluster { summary, message }
            }
            HandlerError::DeleteTimedOut { .. } | HandlerError::UpsertTimedOut { .. } => {
                CliError::Timeout { summary, message }
            }
            HandlerError::ImportState(_) => CliError::Validation {
                summary,
                message,
                help: Some("namespaced kinds take <namespace>/<name>, cluster-scoped kinds take <name>".to_string()),
            },
            _ => CliError::Validation {
                summary,
                message,
                help: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crdform_core::Diagnostic;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::usage("x").exit_code(), exit_codes::USAGE_ERROR);
        assert_eq!(
            CliError::diagnostics_failed("Validation", 1, 0).exit_code(),
            exit_codes::VALIDATION_ERROR
        );
        assert_eq!(
            CliError::from(std::io::Error::other("boom")).exit_code(),
            exit_codes::IO_ERROR
        );
    }

    #[test]
    fn test_handler_errors_keep_their_summary() {
        let err = CliError::from(HandlerError::Offline {
            operation: "managing resources",
        });
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
        assert!(err.to_string().starts_with("Provider in Offline Mode: "));

        let err = CliError::from(HandlerError::ImportState(Diagnostic::error(
            "Error during ImportState",
            "expected <namespace>/<name>",
        )));
        assert_eq!(err.exit_code(), exit_codes::VALIDATION_ERROR);
        assert!(err.to_string().starts_with("Error during ImportState"));
    }

    #[test]
    fn test_unknown_type_is_a_usage_error() {
        let err = CliError::from(CoreError::UnknownType {
            name: "certificate".to_string(),
            suggestion: None,
        });
        assert_eq!(err.exit_code(), exit_codes::USAGE_ERROR);
    }

    #[test]
    fn test_invalid_kubeconfig_is_a_config_error() {
        let err = CliError::from(KubeError::InvalidConfig("no context".to_string()));
        assert_eq!(err.exit_code(), exit_codes::CONFIG_ERROR);
    }
}
