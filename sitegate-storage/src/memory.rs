//! In-memory access store.
//!
//! Backs the standalone binary and the test suites. Data lives behind a
//! single `RwLock`; no lock is ever held across an await point.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sitegate_core::{
    AccessMatrix, ConfigError, StoreError, SubscriptionRecord, SubscriptionState, TenantId,
    TenantLookup, TenantRecord,
};
use tracing::info;

use crate::store::{AccessStore, StoreResult};

/// Initial contents for an [`InMemoryAccessStore`], usually read from JSON.
///
/// ```json
/// {
///   "tenants": [{ "tenant_id": "9876543210", "check_required": true }],
///   "subscriptions": [{ "tenant_id": "9876543210", "state": "active" }],
///   "access_matrix": { "resources": [] }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSeed {
    #[serde(default)]
    pub tenants: Vec<TenantRecord>,
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionRecord>,
    #[serde(default)]
    pub access_matrix: Option<AccessMatrix>,
}

#[derive(Debug, Default)]
struct StoreData {
    tenants: HashMap<TenantId, TenantRecord>,
    /// Latest known subscription per tenant.
    subscriptions: HashMap<TenantId, SubscriptionRecord>,
    matrix: Option<AccessMatrix>,
}

/// [`AccessStore`] held entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemoryAccessStore {
    data: RwLock<StoreData>,
}

impl InMemoryAccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: StoreSeed) -> Self {
        let mut data = StoreData {
            matrix: seed.access_matrix,
            ..StoreData::default()
        };
        for tenant in seed.tenants {
            data.tenants.insert(tenant.tenant_id.clone(), tenant);
        }
        for subscription in seed.subscriptions {
            data.subscriptions
                .insert(subscription.tenant_id.clone(), subscription);
        }
        Self {
            data: RwLock::new(data),
        }
    }

    /// Load a JSON seed file.
    pub async fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let unreadable = |reason: String| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason,
        };

        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| unreadable(e.to_string()))?;
        let seed: StoreSeed = serde_json::from_slice(&raw).map_err(|e| unreadable(e.to_string()))?;

        info!(
            path = %path.display(),
            tenants = seed.tenants.len(),
            subscriptions = seed.subscriptions.len(),
            has_matrix = seed.access_matrix.is_some(),
            "Loaded access store seed"
        );
        Ok(Self::from_seed(seed))
    }

    /// Insert or replace a tenant.
    pub fn insert_tenant(&self, tenant_id: TenantId, check_required: bool) -> StoreResult<()> {
        self.write()?.tenants.insert(
            tenant_id.clone(),
            TenantRecord {
                tenant_id,
                check_required,
            },
        );
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, StoreData>> {
        self.data.read().map_err(|_| poisoned())
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, StoreData>> {
        self.data.write().map_err(|_| poisoned())
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable {
        reason: "in-memory store lock poisoned".to_string(),
    }
}

#[async_trait]
impl AccessStore for InMemoryAccessStore {
    async fn find_tenant(&self, tenant_id: &TenantId) -> StoreResult<TenantLookup> {
        Ok(match self.read()?.tenants.get(tenant_id) {
            Some(record) => TenantLookup {
                exists: true,
                check_required: record.check_required,
            },
            None => TenantLookup::missing(),
        })
    }

    async fn find_active_subscription(&self, tenant_id: &TenantId) -> StoreResult<bool> {
        Ok(self
            .read()?
            .subscriptions
            .get(tenant_id)
            .is_some_and(|record| record.state.is_allowed()))
    }

    async fn access_matrix(&self) -> StoreResult<Option<AccessMatrix>> {
        Ok(self.read()?.matrix.clone())
    }

    async fn write_access_matrix(&self, matrix: AccessMatrix) -> StoreResult<()> {
        self.write()?.matrix = Some(matrix);
        Ok(())
    }

    async fn write_access_matrix_if_absent(&self, matrix: AccessMatrix) -> StoreResult<bool> {
        let mut data = self.write()?;
        if data.matrix.is_some() {
            return Ok(false);
        }
        data.matrix = Some(matrix);
        Ok(true)
    }

    async fn record_subscription(
        &self,
        tenant_id: &TenantId,
        state: SubscriptionState,
    ) -> StoreResult<()> {
        self.write()?.subscriptions.insert(
            tenant_id.clone(),
            SubscriptionRecord {
                tenant_id: tenant_id.clone(),
                state,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn set_check_required(
        &self,
        tenant_id: &TenantId,
        check_required: bool,
    ) -> StoreResult<()> {
        self.insert_tenant(tenant_id.clone(), check_required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn tenant(raw: &str) -> TenantId {
        TenantId::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_tenant_is_missing() {
        let store = InMemoryAccessStore::new();
        let lookup = store.find_tenant(&tenant("9999900000")).await.unwrap();
        assert_eq!(lookup, TenantLookup::missing());
        assert!(!store
            .find_active_subscription(&tenant("9999900000"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_latest_subscription_state_wins() {
        let store = InMemoryAccessStore::new();
        let id = tenant("9876543210");
        store.insert_tenant(id.clone(), true).unwrap();

        store
            .record_subscription(&id, SubscriptionState::Active)
            .await
            .unwrap();
        assert!(store.find_active_subscription(&id).await.unwrap());

        store
            .record_subscription(&id, SubscriptionState::Cancelled)
            .await
            .unwrap();
        assert!(!store.find_active_subscription(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_check_required_creates_tenant() {
        let store = InMemoryAccessStore::new();
        let id = tenant("1112223334");
        store.set_check_required(&id, false).await.unwrap();
        let lookup = store.find_tenant(&id).await.unwrap();
        assert!(lookup.exists);
        assert!(!lookup.check_required);
    }

    #[tokio::test]
    async fn test_write_matrix_if_absent_only_once() {
        let store = InMemoryAccessStore::new();
        assert!(store
            .write_access_matrix_if_absent(AccessMatrix::default_seed())
            .await
            .unwrap());
        assert!(!store
            .write_access_matrix_if_absent(AccessMatrix::default())
            .await
            .unwrap());
        assert_eq!(
            store.access_matrix().await.unwrap(),
            Some(AccessMatrix::default_seed())
        );
    }

    #[tokio::test]
    async fn test_from_seed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "tenants": [
                    {{ "tenant_id": "9876543210" }},
                    {{ "tenant_id": "5550001111", "check_required": false }}
                ],
                "subscriptions": [{{ "tenant_id": "9876543210", "state": "authenticated" }}]
            }}"#
        )
        .unwrap();

        let store = InMemoryAccessStore::from_seed_file(file.path()).await.unwrap();
        let enforced = store.find_tenant(&tenant("9876543210")).await.unwrap();
        assert!(enforced.exists && enforced.check_required);
        assert!(store
            .find_active_subscription(&tenant("9876543210"))
            .await
            .unwrap());

        let exempt = store.find_tenant(&tenant("5550001111")).await.unwrap();
        assert!(exempt.exists && !exempt.check_required);
        assert_eq!(store.access_matrix().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_from_seed_file_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = InMemoryAccessStore::from_seed_file(file.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }
}
