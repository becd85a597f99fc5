//! Subscription cache operations routes.

use std::sync::Arc;

use axum::{extract::State, middleware::from_fn_with_state, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use sitegate_storage::{AccessResolver, CacheStats, SubscriptionCache};

use crate::middleware::{require_access, AccessRequirement};
use crate::state::AppState;

pub const SYSTEM_RESOURCE: &str = "system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResponse {
    pub removed: usize,
}

pub fn create_router(resolver: AccessResolver) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/cache/subscriptions",
            get(cache_stats).delete(clear_cache),
        )
        .route_layer(from_fn_with_state(
            AccessRequirement::new(resolver, SYSTEM_RESOURCE),
            require_access,
        ))
}

async fn cache_stats(State(cache): State<Arc<SubscriptionCache>>) -> Json<CacheStats> {
    Json(cache.stats())
}

async fn clear_cache(State(cache): State<Arc<SubscriptionCache>>) -> Json<ClearResponse> {
    Json(ClearResponse {
        removed: cache.clear_all(),
    })
}
