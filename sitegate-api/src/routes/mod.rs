//! HTTP Routes Module
//!
//! Includes:
//! - Tenant site entry and asset routes (public, gated by subscription)
//! - Gate decision endpoint (public)
//! - Admin routes under /api/v1/* (API key + role/resource check)
//! - Health checks and Prometheus metrics (public)

pub mod access;
pub mod cache;
pub mod health;
pub mod site;
pub mod subscription;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::auth_middleware;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware, TelemetryConfig};

pub use access::create_router as access_router;
pub use cache::create_router as cache_router;
pub use health::create_router as health_router;
pub use site::create_router as site_router;
pub use subscription::create_router as subscription_router;

/// Admin routes. Every one of them needs an API key; each group then
/// checks its own resource against the access matrix.
fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(access::create_router(state.resolver.clone()))
        .merge(subscription::create_router(state.resolver.clone()))
        .merge(cache::create_router(state.resolver.clone()))
        .route_layer(from_fn_with_state(state.auth.clone(), auth_middleware))
}

/// Build the complete router.
///
/// # Middleware Order (outer to inner)
/// 1. Trace - request spans from tower-http
/// 2. Observability - per-route metrics and debug log
/// 3. Auth (admin routes only) - API key to role
/// 4. Access (per admin group) - role against resource
pub fn create_router(state: AppState, telemetry: &TelemetryConfig) -> Router {
    let mut router = Router::new()
        .merge(health::create_router())
        .merge(site::create_router(&state.config.site_prefix))
        .merge(admin_routes(&state));

    if telemetry.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router
        .layer(from_fn(observability_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
