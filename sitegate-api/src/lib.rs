//! SiteGate API - HTTP Layer
//!
//! Serves published tenant sites behind a subscription gate and exposes the
//! admin endpoints that manage the role/resource access matrix, tenant
//! subscriptions and the subscription cache.
//!
//! All state is built from one [`sitegate_storage::AccessStore`]; see
//! [`state::AppState`].

pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
mod macros;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use auth::{authenticate, AuthConfig, AuthContext, API_KEY_HEADER};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use gate::{GateOutcome, SiteGate};
pub use middleware::{auth_middleware, require_access, AccessRequirement};
pub use routes::create_router;
pub use services::{SubscriptionChange, SubscriptionService};
pub use state::AppState;
