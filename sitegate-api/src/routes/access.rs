//! Access matrix routes.
//!
//! `check` only needs an authenticated caller: the admin UI calls it for
//! its own route guards. Reading and changing the matrix needs `rbac`.

use axum::{
    extract::{Query, State},
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sitegate_core::AccessMatrix;
use sitegate_storage::AccessResolver;

use crate::auth::AuthContext;
use crate::error::ApiResult;
use crate::middleware::{require_access, AccessRequirement};
use crate::state::AppState;

/// Resource guarding the matrix itself.
pub const RBAC_RESOURCE: &str = "rbac";

#[derive(Debug, Clone, Deserialize)]
pub struct AccessCheckQuery {
    pub resource: String,
    /// Defaults to the caller's own role.
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCheckResponse {
    pub resource: String,
    pub role: String,
    pub allowed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedResponse {
    pub seeded: bool,
}

pub fn create_router(resolver: AccessResolver) -> Router<AppState> {
    let matrix_routes = Router::new()
        .route("/api/v1/access/matrix", get(get_matrix).put(replace_matrix))
        .route("/api/v1/access/matrix/defaults", post(seed_defaults))
        .route_layer(from_fn_with_state(
            AccessRequirement::new(resolver, RBAC_RESOURCE),
            require_access,
        ));

    Router::new()
        .route("/api/v1/access/check", get(check_access))
        .merge(matrix_routes)
}

async fn check_access(
    State(resolver): State<AccessResolver>,
    auth: AuthContext,
    Query(query): Query<AccessCheckQuery>,
) -> Json<AccessCheckResponse> {
    let role = query.role.unwrap_or(auth.role);
    let allowed = resolver.has_access(&query.resource, &role).await;
    Json(AccessCheckResponse {
        resource: query.resource,
        role,
        allowed,
    })
}

async fn get_matrix(State(resolver): State<AccessResolver>) -> ApiResult<Json<AccessMatrix>> {
    Ok(Json(resolver.access_matrix().await?))
}

async fn replace_matrix(
    State(resolver): State<AccessResolver>,
    Json(matrix): Json<AccessMatrix>,
) -> ApiResult<Json<AccessMatrix>> {
    Ok(Json(resolver.replace_matrix(matrix).await?))
}

async fn seed_defaults(State(resolver): State<AccessResolver>) -> ApiResult<Json<SeedResponse>> {
    let seeded = resolver.initialize_defaults().await?;
    Ok(Json(SeedResponse { seeded }))
}
