//! Health Check Endpoints
//!
//! - /health/live - process is up
//! - /health/ready - access store answers a ping in time
//!
//! No authentication required for health endpoints.

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use sitegate_storage::bounded;

use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<ComponentHealth>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: HealthStatus,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
}

fn response(state: &AppState, status: HealthStatus, store: Option<ComponentHealth>) -> HealthResponse {
    HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        store,
    }
}

async fn liveness(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(response(&state, HealthStatus::Healthy, None))
}

async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let ping = bounded("ping", state.cache.config().store_timeout, state.store.ping()).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    match ping {
        Ok(()) => (
            StatusCode::OK,
            Json(response(
                &state,
                HealthStatus::Healthy,
                Some(ComponentHealth {
                    status: HealthStatus::Healthy,
                    latency_ms,
                    error: None,
                }),
            )),
        ),
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(response(
                    &state,
                    HealthStatus::Unhealthy,
                    Some(ComponentHealth {
                        status: HealthStatus::Unhealthy,
                        latency_ms,
                        error: Some(err.to_string()),
                    }),
                )),
            )
        }
    }
}
