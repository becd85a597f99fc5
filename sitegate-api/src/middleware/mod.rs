//! Middleware modules for the SiteGate API
//!
//! # Middleware Order
//!
//! Authentication must run before authorization, since the latter reads the
//! [`AuthContext`](crate::auth::AuthContext) the former injects:
//!
//! ```ignore
//! Router::new()
//!     .route("/api/v1/access/matrix", get(handler))
//!     // Inner: role must be granted the resource
//!     .route_layer(middleware::from_fn_with_state(
//!         AccessRequirement::new(resolver, "rbac"),
//!         require_access,
//!     ))
//!     // Outer: API key must map to a role
//!     .route_layer(middleware::from_fn_with_state(auth_config, auth_middleware))
//! ```

mod auth;

pub use auth::{auth_middleware, require_access, AccessRequirement};
