//! Cache-facing traits and statistics.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sitegate_core::{SiteGateResult, SubscriptionDecision, TenantId};

/// Anything that can answer "what is this tenant's subscription decision".
///
/// The site gate depends on this rather than on the concrete cache so that
/// tests can count how often it is consulted.
#[async_trait]
pub trait SubscriptionStatusSource: Send + Sync {
    async fn subscription_status(&self, tenant_id: &TenantId)
        -> SiteGateResult<SubscriptionDecision>;
}

/// Point-in-time view of the cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Entries currently held, expired or not.
    pub total: usize,
    /// Entries that would be served as hits.
    pub live: usize,
    /// Entries past their expiry that have not been removed yet.
    pub expired: usize,
    pub max_entries: usize,
    pub ttl_secs: u64,
    pub hits: u64,
    pub misses: u64,
    /// Lookups answered with a conservative deny.
    pub store_failures: u64,
    /// Entries removed to respect the size bound.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
