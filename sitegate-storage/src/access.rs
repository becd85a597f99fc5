//! Role-based access resolution over the stored matrix.

use std::sync::Arc;
use std::time::Duration;

use sitegate_core::{AccessMatrix, SiteGateResult, ADMIN_ROLE};
use tracing::{debug, info, warn};

use crate::store::{bounded, AccessStore};

/// Answers "may `role` use `resource`" against the access store.
///
/// The matrix is read from the store on every call; a replaced matrix is
/// therefore visible to the very next decision.
#[derive(Clone)]
pub struct AccessResolver {
    store: Arc<dyn AccessStore>,
    timeout: Duration,
}

impl AccessResolver {
    pub fn new(store: Arc<dyn AccessStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Decide access. Never fails.
    ///
    /// - admin is allowed without consulting the store
    /// - no stored matrix: every other role is denied
    /// - store error or timeout: admin-only
    pub async fn has_access(&self, resource: &str, role: &str) -> bool {
        if role == ADMIN_ROLE {
            return true;
        }

        match bounded("access_matrix", self.timeout, self.store.access_matrix()).await {
            Ok(Some(matrix)) => matrix.decide(resource, role),
            Ok(None) => {
                debug!(resource, role, "No access matrix stored, denying");
                false
            }
            Err(err) => {
                warn!(
                    resource,
                    role,
                    error = %err,
                    "Access matrix unavailable, falling back to admin-only"
                );
                AccessMatrix::admin_only(role)
            }
        }
    }

    /// Seed the default matrix if the store holds none.
    ///
    /// Idempotent; returns true only when the seed was written.
    pub async fn initialize_defaults(&self) -> SiteGateResult<bool> {
        let written = bounded(
            "write_access_matrix_if_absent",
            self.timeout,
            self.store
                .write_access_matrix_if_absent(AccessMatrix::default_seed()),
        )
        .await?;
        if written {
            info!("Seeded default access matrix");
        }
        Ok(written)
    }

    /// Current matrix; empty if none has been stored.
    pub async fn access_matrix(&self) -> SiteGateResult<AccessMatrix> {
        let matrix = bounded("access_matrix", self.timeout, self.store.access_matrix()).await?;
        Ok(matrix.unwrap_or_default())
    }

    /// Validate and store a new matrix, with admin granted on every entry.
    ///
    /// Returns the matrix as stored.
    pub async fn replace_matrix(&self, matrix: AccessMatrix) -> SiteGateResult<AccessMatrix> {
        matrix.validate()?;
        let matrix = matrix.with_admin_granted();
        bounded(
            "write_access_matrix",
            self.timeout,
            self.store.write_access_matrix(matrix.clone()),
        )
        .await?;
        info!(resources = matrix.resources.len(), "Replaced access matrix");
        Ok(matrix)
    }
}

impl std::fmt::Debug for AccessResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessResolver")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use sitegate_core::{
        ResourceAccess, RoleGrants, SiteGateError, StoreError, SubscriptionState, TenantId,
        TenantLookup, ValidationError,
    };

    use crate::memory::InMemoryAccessStore;
    use crate::store::StoreResult;

    /// Matrix-only store that can be switched into failure.
    #[derive(Default)]
    struct FlakyMatrixStore {
        inner: InMemoryAccessStore,
        failing: AtomicBool,
        reads: AtomicUsize,
    }

    impl FlakyMatrixStore {
        fn check(&self) -> StoreResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                Err(StoreError::Unavailable {
                    reason: "matrix collection offline".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl AccessStore for FlakyMatrixStore {
        async fn find_tenant(&self, tenant_id: &TenantId) -> StoreResult<TenantLookup> {
            self.inner.find_tenant(tenant_id).await
        }

        async fn find_active_subscription(&self, tenant_id: &TenantId) -> StoreResult<bool> {
            self.inner.find_active_subscription(tenant_id).await
        }

        async fn access_matrix(&self) -> StoreResult<Option<AccessMatrix>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            self.inner.access_matrix().await
        }

        async fn write_access_matrix(&self, matrix: AccessMatrix) -> StoreResult<()> {
            self.check()?;
            self.inner.write_access_matrix(matrix).await
        }

        async fn record_subscription(
            &self,
            tenant_id: &TenantId,
            state: SubscriptionState,
        ) -> StoreResult<()> {
            self.inner.record_subscription(tenant_id, state).await
        }

        async fn set_check_required(
            &self,
            tenant_id: &TenantId,
            check_required: bool,
        ) -> StoreResult<()> {
            self.inner.set_check_required(tenant_id, check_required).await
        }
    }

    fn resolver_over(store: &Arc<FlakyMatrixStore>) -> AccessResolver {
        AccessResolver::new(store.clone(), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_admin_never_touches_store() {
        let store = Arc::new(FlakyMatrixStore::default());
        store.failing.store(true, Ordering::SeqCst);
        let resolver = resolver_over(&store);

        assert!(resolver.has_access("system", ADMIN_ROLE).await);
        assert!(resolver.has_access("not-declared", ADMIN_ROLE).await);
        assert_eq!(store.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_matrix_denies_non_admin() {
        let store = Arc::new(FlakyMatrixStore::default());
        let resolver = resolver_over(&store);
        assert!(!resolver.has_access("dashboard", "user").await);
    }

    #[tokio::test]
    async fn test_store_failure_is_admin_only() {
        let store = Arc::new(FlakyMatrixStore::default());
        let resolver = resolver_over(&store);
        resolver.initialize_defaults().await.unwrap();
        assert!(resolver.has_access("dashboard", "user").await);

        store.failing.store(true, Ordering::SeqCst);
        assert!(!resolver.has_access("dashboard", "user").await);
        assert!(!resolver.has_access("dashboard", "manager").await);
        assert!(resolver.has_access("dashboard", ADMIN_ROLE).await);
    }

    #[tokio::test]
    async fn test_initialize_defaults_is_idempotent() {
        let store = Arc::new(FlakyMatrixStore::default());
        let resolver = resolver_over(&store);

        assert!(resolver.initialize_defaults().await.unwrap());
        assert!(!resolver.initialize_defaults().await.unwrap());
        assert_eq!(
            resolver.access_matrix().await.unwrap(),
            AccessMatrix::default_seed()
        );
    }

    #[tokio::test]
    async fn test_initialize_defaults_keeps_existing_matrix() {
        let store = Arc::new(FlakyMatrixStore::default());
        let resolver = resolver_over(&store);
        let custom = AccessMatrix::new(vec![ResourceAccess::new(
            "reports",
            RoleGrants::new().with("user", true),
        )]);
        resolver.replace_matrix(custom).await.unwrap();

        assert!(!resolver.initialize_defaults().await.unwrap());
        assert!(resolver.has_access("reports", "user").await);
        assert!(!resolver.has_access("dashboard", "user").await);
    }

    #[tokio::test]
    async fn test_replace_matrix_is_visible_immediately() {
        let store = Arc::new(FlakyMatrixStore::default());
        let resolver = resolver_over(&store);
        resolver.initialize_defaults().await.unwrap();
        assert!(!resolver.has_access("templates", "user").await);

        let mut matrix = resolver.access_matrix().await.unwrap();
        for entry in &mut matrix.resources {
            if entry.resource == "templates" {
                entry.roles.set("user", true);
                entry.roles.set(ADMIN_ROLE, false);
            }
        }
        let stored = resolver.replace_matrix(matrix).await.unwrap();

        assert!(resolver.has_access("templates", "user").await);
        let templates = stored.find("templates").unwrap();
        assert!(templates.roles.is_granted(ADMIN_ROLE));
    }

    #[tokio::test]
    async fn test_replace_matrix_rejects_duplicates() {
        let store = Arc::new(FlakyMatrixStore::default());
        let resolver = resolver_over(&store);
        let matrix = AccessMatrix::new(vec![
            ResourceAccess::new("sites", RoleGrants::new()),
            ResourceAccess::new("sites", RoleGrants::new()),
        ]);

        let err = resolver.replace_matrix(matrix).await.unwrap_err();
        assert!(matches!(
            err,
            SiteGateError::Validation(ValidationError::DuplicateResource { .. })
        ));
    }

    #[tokio::test]
    async fn test_admin_surface_propagates_store_errors() {
        let store = Arc::new(FlakyMatrixStore::default());
        store.failing.store(true, Ordering::SeqCst);
        let resolver = resolver_over(&store);

        assert!(matches!(
            resolver.access_matrix().await,
            Err(SiteGateError::Store(_))
        ));
        assert!(matches!(
            resolver.initialize_defaults().await,
            Err(SiteGateError::Store(_))
        ));
    }
}
