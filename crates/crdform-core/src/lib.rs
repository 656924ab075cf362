//! crdform Core - schema and value layer for Kubernetes custom resources
//!
//! This crate provides the cluster-independent building blocks:
//! - `Value`: plan/state values with null and unknown
//! - `Attribute`/`Validator`: schema declaration, implementation and config validation
//! - `marshal`: schema-driven conversion to and from Kubernetes JSON
//! - `ResourceType`/`Catalog`: the declarative table of resource types
//! - `crd`: CRD parsing and resource type generation
//! - `wait`/`JsonPath`: wait block configuration and condition evaluation

pub mod builtin;
pub mod catalog;
pub mod crd;
pub mod diagnostics;
pub mod error;
pub mod identity;
pub mod jsonpath;
pub mod marshal;
pub mod resource_type;
pub mod schema;
pub mod value;
pub mod wait;

pub use catalog::Catalog;
pub use diagnostics::{AttributePath, Diagnostic, Diagnostics, Severity};
pub use error::{CoreError, Result};
pub use identity::{ObjectRef, ResourceIdentity, parse_import_id};
pub use jsonpath::JsonPath;
pub use resource_type::{ResourceType, Variant};
pub use schema::{Attribute, AttributeType, Validator};
pub use value::Value;
pub use wait::{DeleteWait, WaitCondition, WaitTimeout};
