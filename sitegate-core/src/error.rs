//! Error types for SiteGate operations

use std::time::Duration;
use thiserror::Error;

/// Access store errors.
///
/// Every variant is recoverable by the callers in this workspace: the cache
/// turns them into a conservative deny and the resolver into admin-only.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Access store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Access store {operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Access store returned corrupt data for {what}: {reason}")]
    Corrupt { what: String, reason: String },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Tenant id must not be blank")]
    EmptyTenantId,

    #[error("Resource name must not be blank")]
    EmptyResource,

    #[error("Resource {resource} is declared more than once")]
    DuplicateResource { resource: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

/// Master error type for all SiteGate errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SiteGateError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for SiteGate operations.
pub type SiteGateResult<T> = Result<T, SiteGateError>;

// =============================================================================
// TESTS
// =============================================================================
