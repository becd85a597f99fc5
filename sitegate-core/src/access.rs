//! Role/resource access matrix.
//!
//! The matrix is open-ended: tenants may define their own role names, so
//! role permissions are a string-keyed map rather than a fixed struct. Any
//! code that threads a role through must go via [`RoleGrants::is_granted`],
//! which treats missing and malformed values as "not granted".

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ValidationError;

/// The always-privileged role.
pub const ADMIN_ROLE: &str = "admin";

// ============================================================================
// ROLE GRANTS
// ============================================================================

/// Role name -> raw stored grant value.
///
/// Values are kept as raw JSON so that a malformed record (a string, a
/// number, null, a nested object) survives deserialization and is simply
/// read as a denial instead of failing the whole matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleGrants(BTreeMap<String, Value>);

impl RoleGrants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style grant/deny.
    pub fn with(mut self, role: impl Into<String>, allowed: bool) -> Self {
        self.set(role, allowed);
        self
    }

    pub fn set(&mut self, role: impl Into<String>, allowed: bool) {
        self.0.insert(role.into(), Value::Bool(allowed));
    }

    /// True only for an explicit JSON `true`.
    pub fn is_granted(&self, role: &str) -> bool {
        matches!(self.0.get(role), Some(Value::Bool(true)))
    }

    /// Role names present in the map, granted or not.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, bool)> for RoleGrants {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        let mut grants = Self::new();
        for (role, allowed) in iter {
            grants.set(role, allowed);
        }
        grants
    }
}

// ============================================================================
// MATRIX
// ============================================================================

/// One protected resource and its role grants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAccess {
    pub resource: String,
    #[serde(default)]
    pub roles: RoleGrants,
}

impl ResourceAccess {
    pub fn new(resource: impl Into<String>, roles: RoleGrants) -> Self {
        Self {
            resource: resource.into(),
            roles,
        }
    }
}

/// Ordered collection of resource entries.
///
/// Lookups are linear scans; the matrix holds tens of entries at most.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessMatrix {
    #[serde(default)]
    pub resources: Vec<ResourceAccess>,
}

impl AccessMatrix {
    pub fn new(resources: Vec<ResourceAccess>) -> Self {
        Self { resources }
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// First entry declared for `resource`.
    pub fn find(&self, resource: &str) -> Option<&ResourceAccess> {
        self.resources.iter().find(|entry| entry.resource == resource)
    }

    /// Decide whether `role` may use `resource`.
    ///
    /// - admin is always allowed, whatever the stored entry says
    /// - undeclared resources are admin-only
    /// - declared resources grant only explicit `true` values
    pub fn decide(&self, resource: &str, role: &str) -> bool {
        if role == ADMIN_ROLE {
            return true;
        }
        match self.find(resource) {
            Some(entry) => entry.roles.is_granted(role),
            None => false,
        }
    }

    /// Decision used when no matrix could be read at all.
    pub fn admin_only(role: &str) -> bool {
        role == ADMIN_ROLE
    }

    /// Reject blank and duplicated resource names.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::with_capacity(self.resources.len());
        for entry in &self.resources {
            if entry.resource.trim().is_empty() {
                return Err(ValidationError::EmptyResource);
            }
            if !seen.insert(entry.resource.as_str()) {
                return Err(ValidationError::DuplicateResource {
                    resource: entry.resource.clone(),
                });
            }
        }
        Ok(())
    }

    /// Force `admin: true` into every entry before it is stored.
    ///
    /// Decisions do not rely on this; [`AccessMatrix::decide`] short-circuits
    /// admin regardless of stored data.
    pub fn with_admin_granted(mut self) -> Self {
        for entry in &mut self.resources {
            entry.roles.set(ADMIN_ROLE, true);
        }
        self
    }

    /// Minimal starting matrix seeded into an empty store.
    pub fn default_seed() -> Self {
        let entry = |resource: &str, manager: bool, user: bool| {
            ResourceAccess::new(
                resource,
                RoleGrants::new()
                    .with(ADMIN_ROLE, true)
                    .with("manager", manager)
                    .with("user", user),
            )
        };

        Self::new(vec![
            entry("dashboard", true, true),
            entry("sites", true, true),
            entry("templates", true, false),
            entry("widgets", true, false),
            entry("subscriptions", true, false),
            entry("plans", false, false),
            entry("rbac", false, false),
            entry("system", false, false),
        ])
    }
}
