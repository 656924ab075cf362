//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid CRD: {message}")]
    InvalidCrd { message: String },

    #[error("Cannot marshal attribute '{path}': {message}")]
    Marshal { path: String, message: String },

    #[error("Cannot unmarshal field '{path}': {message}")]
    Unmarshal { path: String, message: String },

    #[error("Invalid duration '{value}': {message}")]
    InvalidDuration { value: String, message: String },

    #[error("Invalid JSONPath '{path}': {message}")]
    InvalidJsonPath { path: String, message: String },

    #[error("Unknown resource type '{name}'{}", suggestion.as_ref().map(|s| format!(", did you mean '{s}'?")).unwrap_or_default())]
    UnknownType {
        name: String,
        suggestion: Option<String>,
    },

    #[error("Duplicate resource type '{name}'")]
    DuplicateType { name: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
