//! Access store boundary.
//!
//! In production the store is a document database owned by the rest of the
//! platform. This crate only needs the handful of reads the cache and the
//! resolver perform, plus the write paths that must be followed by a cache
//! invalidation.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sitegate_core::{AccessMatrix, StoreError, SubscriptionState, TenantId, TenantLookup};

/// Result type alias for store round-trips.
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable record of tenants, subscriptions and the access matrix.
///
/// Implementations must be safe to share across request handlers.
#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Whether the tenant exists and whether it is subject to enforcement.
    async fn find_tenant(&self, tenant_id: &TenantId) -> StoreResult<TenantLookup>;

    /// True iff the tenant has a subscription in an allowed state.
    async fn find_active_subscription(&self, tenant_id: &TenantId) -> StoreResult<bool>;

    /// The stored matrix, or `None` if none was ever written.
    async fn access_matrix(&self) -> StoreResult<Option<AccessMatrix>>;

    /// Replace the stored matrix.
    async fn write_access_matrix(&self, matrix: AccessMatrix) -> StoreResult<()>;

    /// Write `matrix` only if no matrix exists yet. Returns true if written.
    ///
    /// The default is a read followed by a write; stores that can do this
    /// atomically should override it.
    async fn write_access_matrix_if_absent(&self, matrix: AccessMatrix) -> StoreResult<bool> {
        if self.access_matrix().await?.is_some() {
            return Ok(false);
        }
        self.write_access_matrix(matrix).await?;
        Ok(true)
    }

    /// Record the current state of a tenant's subscription.
    ///
    /// Callers must invalidate the tenant's cached decision afterwards.
    async fn record_subscription(
        &self,
        tenant_id: &TenantId,
        state: SubscriptionState,
    ) -> StoreResult<()>;

    /// Exempt a tenant from (or subject it to) enforcement, creating the
    /// tenant if needed.
    ///
    /// Callers must invalidate the tenant's cached decision afterwards.
    async fn set_check_required(&self, tenant_id: &TenantId, check_required: bool)
        -> StoreResult<()>;

    /// Cheap connectivity probe used by readiness checks.
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Run a store round-trip under a deadline.
///
/// An elapsed deadline becomes [`StoreError::Timeout`] so callers handle it
/// exactly like any other store failure.
pub async fn bounded<T, F>(operation: &'static str, timeout: Duration, fut: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout { operation, timeout }),
    }
}
