//! Subscription Service
//!
//! Every writer of tenant or subscription data goes through here: the store
//! is written first, then the tenant's cached decision is invalidated. The
//! reverse order would let a concurrent lookup re-cache the old state.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sitegate_core::{SubscriptionState, TenantId};
use sitegate_storage::{bounded, AccessStore, SubscriptionCache};
use tracing::info;

use crate::error::ApiResult;

/// Outcome of a subscription-affecting write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionChange {
    pub tenant_id: TenantId,
    /// Whether a cached decision was dropped.
    pub invalidated: bool,
}

#[derive(Clone)]
pub struct SubscriptionService {
    store: Arc<dyn AccessStore>,
    cache: Arc<SubscriptionCache>,
    timeout: Duration,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn AccessStore>, cache: Arc<SubscriptionCache>, timeout: Duration) -> Self {
        Self {
            store,
            cache,
            timeout,
        }
    }

    /// Drop the tenant's cached decision so the next gate check re-reads
    /// the store. Hook for payment events and admin actions.
    pub fn invalidate(&self, tenant_id: &TenantId) -> SubscriptionChange {
        SubscriptionChange {
            tenant_id: tenant_id.clone(),
            invalidated: self.cache.invalidate(tenant_id),
        }
    }

    /// Record a new subscription state, then invalidate.
    pub async fn record_state(
        &self,
        tenant_id: &TenantId,
        state: SubscriptionState,
    ) -> ApiResult<SubscriptionChange> {
        bounded(
            "record_subscription",
            self.timeout,
            self.store.record_subscription(tenant_id, state.clone()),
        )
        .await?;
        info!(tenant_id = %tenant_id, state = state.as_str(), "Recorded subscription state");
        Ok(self.invalidate(tenant_id))
    }

    /// Subject a tenant to, or exempt it from, enforcement, then invalidate.
    pub async fn set_enforcement(
        &self,
        tenant_id: &TenantId,
        check_required: bool,
    ) -> ApiResult<SubscriptionChange> {
        bounded(
            "set_check_required",
            self.timeout,
            self.store.set_check_required(tenant_id, check_required),
        )
        .await?;
        info!(tenant_id = %tenant_id, check_required, "Updated tenant enforcement");
        Ok(self.invalidate(tenant_id))
    }
}

impl std::fmt::Debug for SubscriptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionService")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use sitegate_storage::CacheConfig;
    use sitegate_test_utils::{fixtures::*, CountingAccessStore, FaultMode};

    async fn service_over(store: Arc<CountingAccessStore>) -> (SubscriptionService, Arc<SubscriptionCache>) {
        let cache = Arc::new(SubscriptionCache::new(
            store.clone(),
            CacheConfig::new().with_cleanup_probability(0.0),
        ));
        let service = SubscriptionService::new(store, cache.clone(), Duration::from_secs(1));
        (service, cache)
    }

    #[tokio::test]
    async fn test_record_state_flips_cached_decision() {
        let store = Arc::new(counting_store().await);
        let (service, cache) = service_over(store.clone()).await;
        let id = tenant(UNSUBSCRIBED_TENANT);

        assert!(!cache.get_status(&id).await.should_allow_access());

        let change = service
            .record_state(&id, SubscriptionState::Authenticated)
            .await
            .unwrap();
        assert!(change.invalidated);
        assert!(cache.get_status(&id).await.should_allow_access());
    }

    #[tokio::test]
    async fn test_set_enforcement_exempts_tenant() {
        let store = Arc::new(counting_store().await);
        let (service, cache) = service_over(store.clone()).await;
        let id = tenant(UNSUBSCRIBED_TENANT);

        assert!(!cache.get_status(&id).await.should_allow_access());
        service.set_enforcement(&id, false).await.unwrap();
        assert!(cache.get_status(&id).await.should_allow_access());
        assert_eq!(store.calls.find_active_subscription(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_keeps_cache() {
        let store = Arc::new(counting_store().await);
        let (service, cache) = service_over(store.clone()).await;
        let id = tenant(UNSUBSCRIBED_TENANT);
        cache.get_status(&id).await;

        store.set_mode(FaultMode::Failing);
        let err = service
            .record_state(&id, SubscriptionState::Active)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ServiceUnavailable);
        assert_eq!(cache.stats().total, 1);
    }

    #[tokio::test]
    async fn test_invalidate_reports_removal() {
        let store = Arc::new(counting_store().await);
        let (service, cache) = service_over(store).await;
        let id = tenant(EXEMPT_TENANT);

        assert!(!service.invalidate(&id).invalidated);
        cache.get_status(&id).await;
        assert!(service.invalidate(&id).invalidated);
    }
}
