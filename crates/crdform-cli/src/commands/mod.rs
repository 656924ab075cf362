//! CLI commands

// Offline: catalog, schemas and manifests
pub mod check;
pub mod generate;
pub mod render;
pub mod schema;
pub mod types;
pub mod validate;

// Cluster lifecycle
pub mod apply;
pub mod delete;
pub mod get;
pub mod import;
pub mod refresh;
