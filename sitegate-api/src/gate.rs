//! Tenant site gate.
//!
//! Applied only to the entry point of a tenant's published site. Asset
//! requests never pass through here.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sitegate_core::TenantId;
use sitegate_storage::SubscriptionStatusSource;
use tracing::{debug, warn};

use crate::telemetry::metrics;

/// Result of a gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateOutcome {
    pub allow: bool,
}

/// Subscription gate over a [`SubscriptionStatusSource`].
#[derive(Clone)]
pub struct SiteGate {
    source: Arc<dyn SubscriptionStatusSource>,
}

impl SiteGate {
    pub fn new(source: Arc<dyn SubscriptionStatusSource>) -> Self {
        Self { source }
    }

    /// Decide whether the tenant's site may be entered.
    ///
    /// Never fails: an error from the source is a deny.
    pub async fn check(&self, tenant_id: &TenantId) -> GateOutcome {
        let allow = match self.source.subscription_status(tenant_id).await {
            Ok(decision) => {
                debug!(
                    tenant_id = %tenant_id,
                    tenant_exists = decision.tenant_exists,
                    check_required = decision.check_required,
                    subscription_active = decision.subscription_active,
                    "Subscription gate decision"
                );
                decision.should_allow_access()
            }
            Err(err) => {
                warn!(tenant_id = %tenant_id, error = %err, "Subscription gate check failed, denying");
                false
            }
        };

        if let Some(metrics) = metrics() {
            metrics.record_gate_decision(allow);
        }
        GateOutcome { allow }
    }
}

impl std::fmt::Debug for SiteGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteGate").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitegate_core::SubscriptionDecision;
    use sitegate_test_utils::{fixtures::*, CountingStatusSource};

    #[tokio::test]
    async fn test_gate_follows_decision() {
        let source = Arc::new(
            CountingStatusSource::new()
                .with_answer(tenant(UNSUBSCRIBED_TENANT), SubscriptionDecision::enforced(false))
                .with_answer(tenant(SUBSCRIBED_TENANT), SubscriptionDecision::enforced(true))
                .with_answer(tenant(EXEMPT_TENANT), SubscriptionDecision::exempt()),
        );
        let gate = SiteGate::new(source.clone());

        assert!(gate.check(&tenant(UNKNOWN_TENANT)).await.allow);
        assert!(!gate.check(&tenant(UNSUBSCRIBED_TENANT)).await.allow);
        assert!(gate.check(&tenant(SUBSCRIBED_TENANT)).await.allow);
        assert!(gate.check(&tenant(EXEMPT_TENANT)).await.allow);
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test]
    async fn test_gate_fails_closed() {
        let source = Arc::new(CountingStatusSource::new().failing());
        let gate = SiteGate::new(source);
        assert_eq!(
            gate.check(&tenant(UNKNOWN_TENANT)).await,
            GateOutcome { allow: false }
        );
    }
}
