//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - plan or schema validation failed
pub const VALIDATION_ERROR: i32 = 2;

/// Cluster error - the Kubernetes API rejected or failed a request
pub const CLUSTER_ERROR: i32 = 3;

/// Timeout - a wait condition was not met in time
pub const TIMEOUT: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - unknown resource type or bad argument (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;

/// Configuration error - provider configuration cannot be used (sysexits.h EX_CONFIG)
pub const CONFIG_ERROR: i32 = 78;
