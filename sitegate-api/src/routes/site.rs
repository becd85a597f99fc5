//! Tenant site routes.
//!
//! - `GET {prefix}/:tenant` is the only gated route. It redirects to the
//!   root document or to the unavailable document.
//! - `GET {prefix}/:tenant/*asset` serves published files and never
//!   consults the gate, so the unavailable document is always reachable.
//! - `GET /api/v1/gate/:tenant` exposes the gate decision to static-site
//!   layers running out of process.

use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::{header, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sitegate_core::TenantId;
use tower::ServiceExt;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::gate::GateOutcome;
use crate::state::AppState;

pub fn create_router(prefix: &str) -> Router<AppState> {
    Router::new()
        .route(&format!("{}/:tenant", prefix), get(enter_site))
        .route(&format!("{}/:tenant/*asset", prefix), get(serve_asset))
        .route("/api/v1/gate/:tenant", get(gate_decision))
}

/// Gate the tenant's site entry point.
async fn enter_site(State(state): State<AppState>, Path(tenant): Path<String>) -> ApiResult<Response> {
    let tenant_id = TenantId::new(tenant)?;
    let outcome = state.gate.check(&tenant_id).await;

    let document = if outcome.allow {
        &state.config.root_document
    } else {
        &state.config.unavailable_document
    };
    let location = state
        .config
        .site_document_path(tenant_id.as_str(), document);
    debug!(tenant_id = %tenant_id, allow = outcome.allow, location = %location, "Site entry");

    redirect(&location)
}

/// Temporary, uncacheable redirect: a decision may flip on the next request.
fn redirect(location: &str) -> ApiResult<Response> {
    let location = HeaderValue::from_str(location)
        .map_err(|_| ApiError::invalid_input("Tenant id is not usable in a URL"))?;
    Ok((
        StatusCode::TEMPORARY_REDIRECT,
        [
            (header::LOCATION, location),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
    )
        .into_response())
}

/// Serve a published file from `{sites_dir}/{tenant}/{asset}`.
async fn serve_asset(State(state): State<AppState>, request: Request) -> Response {
    let (mut parts, body) = request.into_parts();

    let path = parts.uri.path();
    let relative = path
        .strip_prefix(state.config.site_prefix.as_str())
        .unwrap_or(path);
    let rewritten = match parts.uri.query() {
        Some(query) => format!("{}?{}", relative, query),
        None => relative.to_string(),
    };
    parts.uri = match rewritten.parse::<Uri>() {
        Ok(uri) => uri,
        Err(_) => return ApiError::invalid_input("Malformed asset path").into_response(),
    };

    match state
        .sites
        .clone()
        .oneshot(Request::from_parts(parts, body))
        .await
    {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

async fn gate_decision(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
) -> ApiResult<Json<GateOutcome>> {
    let tenant_id = TenantId::new(tenant)?;
    Ok(Json(state.gate.check(&tenant_id).await))
}
