//! Subscription and tenant enforcement routes.
//!
//! The invalidation endpoint is the hook payment-event handlers call after
//! they update a subscription record themselves.

use axum::{
    extract::{Path, State},
    middleware::from_fn_with_state,
    routing::{post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sitegate_core::{SubscriptionState, TenantId};
use sitegate_storage::AccessResolver;

use crate::error::ApiResult;
use crate::middleware::{require_access, AccessRequirement};
use crate::services::{SubscriptionChange, SubscriptionService};
use crate::state::AppState;

pub const SUBSCRIPTIONS_RESOURCE: &str = "subscriptions";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSubscriptionRequest {
    pub state: SubscriptionState,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpdateEnforcementRequest {
    pub check_required: bool,
}

pub fn create_router(resolver: AccessResolver) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/subscriptions/:tenant/invalidate",
            post(invalidate_subscription),
        )
        .route("/api/v1/subscriptions/:tenant", put(update_subscription))
        .route("/api/v1/tenants/:tenant/enforcement", put(update_enforcement))
        .route_layer(from_fn_with_state(
            AccessRequirement::new(resolver, SUBSCRIPTIONS_RESOURCE),
            require_access,
        ))
}

async fn invalidate_subscription(
    State(service): State<SubscriptionService>,
    Path(tenant): Path<String>,
) -> ApiResult<Json<SubscriptionChange>> {
    let tenant_id = TenantId::new(tenant)?;
    Ok(Json(service.invalidate(&tenant_id)))
}

async fn update_subscription(
    State(service): State<SubscriptionService>,
    Path(tenant): Path<String>,
    Json(request): Json<UpdateSubscriptionRequest>,
) -> ApiResult<Json<SubscriptionChange>> {
    let tenant_id = TenantId::new(tenant)?;
    Ok(Json(service.record_state(&tenant_id, request.state).await?))
}

async fn update_enforcement(
    State(service): State<SubscriptionService>,
    Path(tenant): Path<String>,
    Json(request): Json<UpdateEnforcementRequest>,
) -> ApiResult<Json<SubscriptionChange>> {
    let tenant_id = TenantId::new(tenant)?;
    Ok(Json(
        service
            .set_enforcement(&tenant_id, request.check_required)
            .await?,
    ))
}
