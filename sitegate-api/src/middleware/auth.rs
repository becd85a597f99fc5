//! Axum Middleware for Authentication and Authorization
//!
//! - `auth_middleware`: API key → [`AuthContext`], 401 on failure
//! - `require_access`: role/resource check through the access resolver,
//!   403 on denial

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sitegate_storage::AccessResolver;
use tracing::warn;

use crate::auth::{authenticate, AuthConfig, AuthContext, API_KEY_HEADER};
use crate::error::{ApiError, ApiResult};
use crate::telemetry::metrics;

/// Authenticate the request and inject its [`AuthContext`].
pub async fn auth_middleware(
    State(config): State<Arc<AuthConfig>>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let api_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    let auth_context = authenticate(&config, api_key)?;
    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}

/// State for [`require_access`]: the resolver and the resource a route
/// group belongs to.
#[derive(Debug, Clone)]
pub struct AccessRequirement {
    resolver: AccessResolver,
    resource: &'static str,
}

impl AccessRequirement {
    pub fn new(resolver: AccessResolver, resource: &'static str) -> Self {
        Self { resolver, resource }
    }
}

/// Reject callers whose role is not granted the route group's resource.
pub async fn require_access(
    State(requirement): State<AccessRequirement>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let role = request
        .extensions()
        .get::<AuthContext>()
        .map(|ctx| ctx.role.clone())
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let allowed = requirement
        .resolver
        .has_access(requirement.resource, &role)
        .await;
    if let Some(metrics) = metrics() {
        metrics.record_access_decision(requirement.resource, allowed);
    }

    if !allowed {
        warn!(resource = requirement.resource, role = %role, "Access denied");
        return Err(ApiError::forbidden(format!(
            "Role '{}' may not use '{}'",
            role, requirement.resource
        )));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use std::time::Duration;
    use tower::ServiceExt;

    use sitegate_test_utils::fixtures::counting_store;

    async fn app() -> Router {
        let store = Arc::new(counting_store().await);
        let resolver = AccessResolver::new(store, Duration::from_secs(1));
        let auth = Arc::new(
            AuthConfig::default()
                .with_api_key("k-admin", "admin")
                .with_api_key("k-manager", "manager")
                .with_api_key("k-user", "user"),
        );

        Router::new()
            .route("/templates", get(|| async { "ok" }))
            .route_layer(from_fn_with_state(
                AccessRequirement::new(resolver, "templates"),
                require_access,
            ))
            .route_layer(from_fn_with_state(auth, auth_middleware))
    }

    async fn status_for(key: Option<&str>) -> StatusCode {
        let mut request = HttpRequest::builder().uri("/templates");
        if let Some(key) = key {
            request = request.header(API_KEY_HEADER, key);
        }
        app()
            .await
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_missing_or_unknown_key_is_unauthorized() {
        assert_eq!(status_for(None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(Some("nope")).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_roles_are_checked_against_matrix() {
        assert_eq!(status_for(Some("k-admin")).await, StatusCode::OK);
        assert_eq!(status_for(Some("k-manager")).await, StatusCode::OK);
        assert_eq!(status_for(Some("k-user")).await, StatusCode::FORBIDDEN);
    }
}
