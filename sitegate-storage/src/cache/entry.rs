use sitegate_core::SubscriptionDecision;
use tokio::time::Instant;

/// A cached decision and the instant it stops being served.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CacheEntry {
    pub decision: SubscriptionDecision,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn new(decision: SubscriptionDecision, expires_at: Instant) -> Self {
        Self {
            decision,
            expires_at,
        }
    }

    /// Live strictly before `expires_at`.
    pub fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}
