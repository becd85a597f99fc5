//! Subscription decision types.
//!
//! `SubscriptionDecision` is the value the status cache stores per tenant.
//! Whether a request may proceed is always derived from its three inputs via
//! [`SubscriptionDecision::should_allow_access`]; the answer is never stored
//! next to them.

use serde::{Deserialize, Serialize};

use crate::{TenantId, Timestamp};

// ============================================================================
// DECISION
// ============================================================================

/// Cached subscription decision for one tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionDecision {
    /// Whether the tenant is known to the access store.
    pub tenant_exists: bool,
    /// Whether the tenant is subject to subscription enforcement at all.
    pub check_required: bool,
    /// Whether the tenant holds a subscription in an allowed state.
    pub subscription_active: bool,
}

impl SubscriptionDecision {
    /// Unknown tenants are never blocked by this layer.
    pub const fn unknown_tenant() -> Self {
        Self {
            tenant_exists: false,
            check_required: false,
            subscription_active: false,
        }
    }

    /// Known tenant exempted from enforcement.
    pub const fn exempt() -> Self {
        Self {
            tenant_exists: true,
            check_required: false,
            subscription_active: false,
        }
    }

    /// Known tenant under enforcement.
    pub const fn enforced(subscription_active: bool) -> Self {
        Self {
            tenant_exists: true,
            check_required: true,
            subscription_active,
        }
    }

    /// Decision used when the access store could not be consulted.
    ///
    /// Treats the tenant as existing, enforced and inactive. `unknown_tenant`
    /// would allow access and is therefore not a safe fallback.
    pub const fn conservative_deny() -> Self {
        Self::enforced(false)
    }

    /// `!tenant_exists || !check_required || subscription_active`
    pub const fn should_allow_access(&self) -> bool {
        !self.tenant_exists || !self.check_required || self.subscription_active
    }
}

// ============================================================================
// SUBSCRIPTION STATE
// ============================================================================

/// Lifecycle state of a stored subscription record.
///
/// Unrecognised strings deserialize to [`SubscriptionState::Unknown`] so a
/// new upstream state can never be mistaken for an allowed one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SubscriptionState {
    Created,
    Authenticated,
    Active,
    Pending,
    Halted,
    Paused,
    Cancelled,
    Completed,
    Expired,
    Unknown(String),
}

impl SubscriptionState {
    /// States that count as an active subscription.
    pub const ALLOWED: [SubscriptionState; 2] =
        [SubscriptionState::Authenticated, SubscriptionState::Active];

    /// Returns true if this state grants site access.
    pub fn is_allowed(&self) -> bool {
        Self::ALLOWED.contains(self)
    }

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Authenticated => "authenticated",
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Halted => "halted",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for SubscriptionState {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "created" => Self::Created,
            "authenticated" => Self::Authenticated,
            "active" => Self::Active,
            "pending" => Self::Pending,
            "halted" => Self::Halted,
            "paused" => Self::Paused,
            "cancelled" | "canceled" => Self::Cancelled,
            "completed" => Self::Completed,
            "expired" => Self::Expired,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<&str> for SubscriptionState {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<SubscriptionState> for String {
    fn from(state: SubscriptionState) -> Self {
        state.as_str().to_string()
    }
}

// ============================================================================
// STORE RECORDS
// ============================================================================

/// Answer to a tenant lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantLookup {
    pub exists: bool,
    pub check_required: bool,
}

impl TenantLookup {
    pub const fn missing() -> Self {
        Self {
            exists: false,
            check_required: false,
        }
    }
}

/// Tenant as held by the access store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRecord {
    pub tenant_id: TenantId,
    /// Defaults to enforced; exemptions must be explicit.
    #[serde(default = "default_check_required")]
    pub check_required: bool,
}

fn default_check_required() -> bool {
    true
}

/// Subscription as held by the access store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub tenant_id: TenantId,
    pub state: SubscriptionState,
    #[serde(default = "chrono::Utc::now")]
    pub updated_at: Timestamp,
}
