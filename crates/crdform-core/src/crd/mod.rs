//! CRD (CustomResourceDefinition) handling
//!
//! - **Schema representation** (`schema`): structured types for CRD schemas
//! - **Parsing** (`parser`): parse CRD YAML into schema structures
//! - **Generation** (`generate`): derive resource types from a parsed CRD
//!
//! ```text
//!   CRD YAML ──► CrdParser ──► CrdSchema ──► resource_types() ──► ResourceType (per served version)
//! ```

mod generate;
mod parser;
mod schema;

pub use generate::resource_types;
pub use parser::CrdParser;
pub use schema::{
    AdditionalProperties, CrdNames, CrdSchema, CrdScope, CrdVersionSchema, OpenApiSchema,
    PropertyType, SchemaProperty,
};
