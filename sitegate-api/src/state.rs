//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use sitegate_storage::{AccessResolver, AccessStore, CacheConfig, SubscriptionCache};
use tower_http::services::ServeDir;

use crate::auth::AuthConfig;
use crate::config::ApiConfig;
use crate::gate::SiteGate;
use crate::services::SubscriptionService;

/// Application-wide state shared across all routes.
///
/// Everything is built around one [`AccessStore`] and one
/// [`SubscriptionCache`]; there is no process-global cache.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub auth: Arc<AuthConfig>,
    pub store: Arc<dyn AccessStore>,
    pub cache: Arc<SubscriptionCache>,
    pub resolver: AccessResolver,
    /// Reads through `cache` unless replaced with [`AppState::with_gate`].
    pub gate: SiteGate,
    pub subscriptions: SubscriptionService,
    /// Published tenant sites.
    pub sites: ServeDir,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<dyn AccessStore>,
        cache_config: CacheConfig,
        config: ApiConfig,
        auth: AuthConfig,
    ) -> Self {
        let store_timeout = cache_config.store_timeout;
        let cache = Arc::new(SubscriptionCache::new(store.clone(), cache_config));

        Self {
            sites: ServeDir::new(&config.sites_dir),
            config: Arc::new(config),
            auth: Arc::new(auth),
            resolver: AccessResolver::new(store.clone(), store_timeout),
            gate: SiteGate::new(cache.clone()),
            subscriptions: SubscriptionService::new(store.clone(), cache.clone(), store_timeout),
            store,
            cache,
            start_time: Instant::now(),
        }
    }

    /// Replace the gate, e.g. with one over a counting status source.
    pub fn with_gate(mut self, gate: SiteGate) -> Self {
        self.gate = gate;
        self
    }
}

crate::impl_from_ref!(Arc<ApiConfig>, config);
crate::impl_from_ref!(Arc<AuthConfig>, auth);
crate::impl_from_ref!(Arc<dyn AccessStore>, store);
crate::impl_from_ref!(Arc<SubscriptionCache>, cache);
crate::impl_from_ref!(AccessResolver, resolver);
crate::impl_from_ref!(SiteGate, gate);
crate::impl_from_ref!(SubscriptionService, subscriptions);
crate::impl_from_ref!(Instant, start_time);
