//! SiteGate API Server Entry Point
//!
//! Loads configuration from the environment, builds the access store and
//! starts the Axum HTTP server.

use std::sync::Arc;

use sitegate_api::{create_router, ApiConfig, ApiError, ApiResult, AppState, AuthConfig};
use sitegate_api::telemetry::{init_tracer, TelemetryConfig};
use sitegate_storage::{AccessStore, CacheConfig, InMemoryAccessStore};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::from_env();
    init_tracer(&telemetry_config)?;

    let api_config = ApiConfig::from_env()?;
    let cache_config = CacheConfig::from_env();
    let auth_config = AuthConfig::from_env();
    if auth_config.is_empty() {
        tracing::warn!("SITEGATE_API_KEYS is empty; every admin route will answer 401");
    }

    let store: Arc<dyn AccessStore> = match &api_config.seed_file {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading access store seed");
            Arc::new(InMemoryAccessStore::from_seed_file(path).await?)
        }
        None => Arc::new(InMemoryAccessStore::new()),
    };

    let addr = api_config.socket_addr()?;
    let state = AppState::new(store, cache_config, api_config, auth_config);

    match state.resolver.initialize_defaults().await {
        Ok(true) => tracing::info!("Seeded default access matrix"),
        Ok(false) => tracing::debug!("Access matrix already present"),
        Err(e) => tracing::warn!(error = %e, "Could not seed default access matrix"),
    }

    let app = create_router(state, &telemetry_config);

    tracing::info!(%addr, "Starting SiteGate API server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
