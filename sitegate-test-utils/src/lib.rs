//! SiteGate Test Utilities
//!
//! Shared test infrastructure for the SiteGate workspace:
//! - Counting test doubles for the access store and the status source
//! - Proptest generators for decision and matrix types
//! - Fixtures for the well-known tenants used across test suites

pub use sitegate_core::{
    AccessMatrix, ResourceAccess, RoleGrants, SiteGateError, SiteGateResult, StoreError,
    SubscriptionDecision, SubscriptionState, TenantId, TenantLookup, ADMIN_ROLE,
};
pub use sitegate_storage::{AccessStore, InMemoryAccessStore, StoreResult};

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

// ============================================================================
// COUNTING ACCESS STORE
// ============================================================================

/// How a [`CountingAccessStore`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultMode {
    /// Delegate to the in-memory store.
    #[default]
    Healthy,
    /// Every call fails with [`StoreError::Unavailable`].
    Failing,
    /// Every call waits forever; callers must apply their own deadline.
    Hanging,
}

/// Per-method call counts.
#[derive(Debug, Default)]
pub struct CallCounts {
    pub find_tenant: AtomicUsize,
    pub find_active_subscription: AtomicUsize,
    pub access_matrix: AtomicUsize,
    pub writes: AtomicUsize,
}

impl CallCounts {
    pub fn find_tenant(&self) -> usize {
        self.find_tenant.load(Ordering::SeqCst)
    }

    pub fn find_active_subscription(&self) -> usize {
        self.find_active_subscription.load(Ordering::SeqCst)
    }

    pub fn access_matrix(&self) -> usize {
        self.access_matrix.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

/// [`InMemoryAccessStore`] wrapper that counts calls and can be switched
/// into failure at runtime.
///
/// Counters are bumped before the fault mode is applied, so failed and
/// hanging calls are counted too.
#[derive(Debug, Default)]
pub struct CountingAccessStore {
    inner: InMemoryAccessStore,
    mode: Mutex<FaultMode>,
    pub calls: CallCounts,
}

impl CountingAccessStore {
    pub fn new(inner: InMemoryAccessStore) -> Self {
        Self {
            inner,
            mode: Mutex::new(FaultMode::Healthy),
            calls: CallCounts::default(),
        }
    }

    pub fn set_mode(&self, mode: FaultMode) {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner) = mode;
    }

    pub fn mode(&self) -> FaultMode {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Direct access to the wrapped store, bypassing counters and faults.
    pub fn inner(&self) -> &InMemoryAccessStore {
        &self.inner
    }

    async fn gate(&self, counter: &AtomicUsize) -> StoreResult<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        match self.mode() {
            FaultMode::Healthy => Ok(()),
            FaultMode::Failing => Err(StoreError::Unavailable {
                reason: "injected store failure".to_string(),
            }),
            FaultMode::Hanging => std::future::pending().await,
        }
    }
}

#[async_trait]
impl AccessStore for CountingAccessStore {
    async fn find_tenant(&self, tenant_id: &TenantId) -> StoreResult<TenantLookup> {
        self.gate(&self.calls.find_tenant).await?;
        self.inner.find_tenant(tenant_id).await
    }

    async fn find_active_subscription(&self, tenant_id: &TenantId) -> StoreResult<bool> {
        self.gate(&self.calls.find_active_subscription).await?;
        self.inner.find_active_subscription(tenant_id).await
    }

    async fn access_matrix(&self) -> StoreResult<Option<AccessMatrix>> {
        self.gate(&self.calls.access_matrix).await?;
        self.inner.access_matrix().await
    }

    async fn write_access_matrix(&self, matrix: AccessMatrix) -> StoreResult<()> {
        self.gate(&self.calls.writes).await?;
        self.inner.write_access_matrix(matrix).await
    }

    async fn write_access_matrix_if_absent(&self, matrix: AccessMatrix) -> StoreResult<bool> {
        self.gate(&self.calls.writes).await?;
        self.inner.write_access_matrix_if_absent(matrix).await
    }

    async fn record_subscription(
        &self,
        tenant_id: &TenantId,
        state: SubscriptionState,
    ) -> StoreResult<()> {
        self.gate(&self.calls.writes).await?;
        self.inner.record_subscription(tenant_id, state).await
    }

    async fn set_check_required(
        &self,
        tenant_id: &TenantId,
        check_required: bool,
    ) -> StoreResult<()> {
        self.gate(&self.calls.writes).await?;
        self.inner.set_check_required(tenant_id, check_required).await
    }

    async fn ping(&self) -> StoreResult<()> {
        match self.mode() {
            FaultMode::Healthy => Ok(()),
            _ => Err(StoreError::Unavailable {
                reason: "injected store failure".to_string(),
            }),
        }
    }
}

// ============================================================================
// COUNTING STATUS SOURCE
// ============================================================================

/// Fixed-answer [`SubscriptionStatusSource`] that records every tenant it
/// is asked about.
///
/// Tenants without a configured answer get
/// [`SubscriptionDecision::unknown_tenant`].
///
/// [`SubscriptionStatusSource`]: sitegate_storage::SubscriptionStatusSource
#[derive(Debug, Default)]
pub struct CountingStatusSource {
    answers: HashMap<TenantId, SubscriptionDecision>,
    failing: bool,
    asked: Mutex<Vec<TenantId>>,
}

impl CountingStatusSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(mut self, tenant_id: TenantId, decision: SubscriptionDecision) -> Self {
        self.answers.insert(tenant_id, decision);
        self
    }

    /// Make every call return a store error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Total number of calls.
    pub fn calls(&self) -> usize {
        self.asked().len()
    }

    /// Tenants asked about, in call order.
    pub fn asked(&self) -> Vec<TenantId> {
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl sitegate_storage::SubscriptionStatusSource for CountingStatusSource {
    async fn subscription_status(
        &self,
        tenant_id: &TenantId,
    ) -> SiteGateResult<SubscriptionDecision> {
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tenant_id.clone());
        if self.failing {
            return Err(StoreError::Unavailable {
                reason: "injected status failure".to_string(),
            }
            .into());
        }
        Ok(self
            .answers
            .get(tenant_id)
            .copied()
            .unwrap_or(SubscriptionDecision::unknown_tenant()))
    }
}

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for SiteGate types.

    use super::*;
    use proptest::prelude::*;

    /// Phone-number-shaped tenant ids.
    pub fn arb_tenant_id() -> impl Strategy<Value = TenantId> {
        "[1-9][0-9]{9}".prop_map(|raw| TenantId::new(raw).expect("pattern is never blank"))
    }

    pub fn arb_subscription_decision() -> impl Strategy<Value = SubscriptionDecision> {
        (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(tenant_exists, check_required, subscription_active)| SubscriptionDecision {
                tenant_exists,
                check_required,
                subscription_active,
            },
        )
    }

    pub fn arb_subscription_state() -> impl Strategy<Value = SubscriptionState> {
        prop_oneof![
            Just(SubscriptionState::Created),
            Just(SubscriptionState::Authenticated),
            Just(SubscriptionState::Active),
            Just(SubscriptionState::Pending),
            Just(SubscriptionState::Halted),
            Just(SubscriptionState::Paused),
            Just(SubscriptionState::Cancelled),
            Just(SubscriptionState::Completed),
            Just(SubscriptionState::Expired),
            "[a-z_]{3,12}".prop_map(SubscriptionState::from),
        ]
    }

    /// Any non-admin role name.
    pub fn arb_role() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("manager".to_string()),
            Just("user".to_string()),
            "[a-z]{3,10}",
        ]
        .prop_filter("admin is not a regular role", |role| role != ADMIN_ROLE)
    }

    pub fn arb_resource() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{2,15}"
    }

    /// Matrix with unique resource names and arbitrary boolean grants.
    pub fn arb_access_matrix() -> impl Strategy<Value = AccessMatrix> {
        prop::collection::btree_map(
            arb_resource(),
            prop::collection::btree_map(arb_role(), any::<bool>(), 0..4),
            0..8,
        )
        .prop_map(|resources| {
            AccessMatrix::new(
                resources
                    .into_iter()
                    .map(|(resource, grants)| {
                        ResourceAccess::new(resource, grants.into_iter().collect())
                    })
                    .collect(),
            )
        })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Well-known tenants shared by the test suites.

    use super::*;

    /// Not present in any fixture store.
    pub const UNKNOWN_TENANT: &str = "9999900000";
    /// Enforced, no subscription record.
    pub const UNSUBSCRIBED_TENANT: &str = "9876543210";
    /// Exempt from enforcement.
    pub const EXEMPT_TENANT: &str = "5550001111";
    /// Enforced, active subscription.
    pub const SUBSCRIBED_TENANT: &str = "1234567890";

    pub fn tenant(raw: &str) -> TenantId {
        TenantId::new(raw).expect("fixture tenant ids are never blank")
    }

    /// Store holding the three known fixture tenants and the default matrix.
    pub async fn seeded_store() -> InMemoryAccessStore {
        let store = InMemoryAccessStore::new();
        store
            .set_check_required(&tenant(UNSUBSCRIBED_TENANT), true)
            .await
            .expect("in-memory store write");
        store
            .set_check_required(&tenant(EXEMPT_TENANT), false)
            .await
            .expect("in-memory store write");
        store
            .set_check_required(&tenant(SUBSCRIBED_TENANT), true)
            .await
            .expect("in-memory store write");
        store
            .record_subscription(&tenant(SUBSCRIBED_TENANT), SubscriptionState::Active)
            .await
            .expect("in-memory store write");
        store
            .write_access_matrix(AccessMatrix::default_seed())
            .await
            .expect("in-memory store write");
        store
    }

    /// [`seeded_store`] wrapped for call counting.
    pub async fn counting_store() -> CountingAccessStore {
        CountingAccessStore::new(seeded_store().await)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use sitegate_storage::SubscriptionStatusSource;

    #[tokio::test]
    async fn test_counting_store_counts_failed_calls() {
        let store = counting_store().await;
        store.set_mode(FaultMode::Failing);
        assert!(store.find_tenant(&tenant(EXEMPT_TENANT)).await.is_err());
        assert_eq!(store.calls.find_tenant(), 1);
        assert!(store.ping().await.is_err());

        store.set_mode(FaultMode::Healthy);
        let lookup = store.find_tenant(&tenant(EXEMPT_TENANT)).await.unwrap();
        assert!(lookup.exists && !lookup.check_required);
        assert_eq!(store.calls.find_tenant(), 2);
    }

    #[tokio::test]
    async fn test_counting_status_source_records_tenants() {
        let source = CountingStatusSource::new()
            .with_answer(tenant(UNSUBSCRIBED_TENANT), SubscriptionDecision::enforced(false));

        let denied = source
            .subscription_status(&tenant(UNSUBSCRIBED_TENANT))
            .await
            .unwrap();
        assert!(!denied.should_allow_access());

        let unknown = source
            .subscription_status(&tenant(UNKNOWN_TENANT))
            .await
            .unwrap();
        assert_eq!(unknown, SubscriptionDecision::unknown_tenant());

        assert_eq!(
            source.asked(),
            vec![tenant(UNSUBSCRIBED_TENANT), tenant(UNKNOWN_TENANT)]
        );
    }
}
