//! Kubernetes integration for crdform
//!
//! Key features:
//! - Dynamic client over GET / server-side apply / DELETE, with a kube-backed
//!   implementation and an in-memory mock
//! - Provider configuration and the read-only provider data shared by handlers
//! - Resource, data source and manifest handlers driven by a `ResourceType`
//! - Wait loops for `wait_for_upsert` and `wait_for_delete`

pub mod client;
pub mod error;
pub mod handlers;
pub mod mock;
pub mod provider;
pub mod wait;

pub use client::{ApplyParams, DynamicClient, KubeDynamicClient};
pub use error::{HandlerError, HandlerResult, KubeError, Result};
pub use handlers::{DataSourceHandler, ManifestHandler, ReadOutcome, ResourceHandler};
pub use mock::{MockDynamicClient, OperationCounts};
pub use provider::{DEFAULT_FIELD_MANAGER, ProviderConfig, ProviderData};
