//! SiteGate Core - Decision Types
//!
//! Pure data structures and decision functions shared by every other crate.
//! Nothing in here performs I/O; the storage and API crates feed these types
//! with data and act on the answers.

pub mod access;
pub mod error;
pub mod subscription;

pub use access::{AccessMatrix, ResourceAccess, RoleGrants, ADMIN_ROLE};
pub use error::{ConfigError, SiteGateError, SiteGateResult, StoreError, ValidationError};
pub use subscription::{
    SubscriptionDecision, SubscriptionRecord, SubscriptionState, TenantLookup, TenantRecord,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Opaque identifier of a tenant.
///
/// In practice this is a phone-number-shaped string, but it is never parsed:
/// the only check performed is that it is not blank. It is used verbatim as
/// the subscription cache key and as the first path segment of the tenant's
/// published site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Create a tenant id, rejecting blank input.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(ValidationError::EmptyTenantId);
        }
        Ok(Self(raw))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier and return the owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for TenantId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
