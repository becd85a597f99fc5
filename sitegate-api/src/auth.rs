//! API key authentication.
//!
//! Each configured key maps to a role name. The role is what the access
//! resolver decides on; identity beyond that is out of scope here.

use std::collections::HashMap;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Key → role table.
#[derive(Clone, Default)]
pub struct AuthConfig {
    api_keys: HashMap<String, String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_keys", &format!("[{} keys]", self.api_keys.len()))
            .finish()
    }
}

impl AuthConfig {
    /// Load keys from `SITEGATE_API_KEYS`, formatted `key:role,key:role`.
    ///
    /// Entries without a role or with a blank key are skipped with a warning.
    pub fn from_env() -> Self {
        std::env::var("SITEGATE_API_KEYS")
            .map(|raw| Self::parse(&raw))
            .unwrap_or_default()
    }

    pub fn parse(raw: &str) -> Self {
        let mut config = Self::default();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            match entry.split_once(':') {
                Some((key, role)) if !key.trim().is_empty() && !role.trim().is_empty() => {
                    config.add_api_key(key.trim(), role.trim());
                }
                _ => tracing::warn!("Skipping malformed SITEGATE_API_KEYS entry"),
            }
        }
        config
    }

    /// Register a key for a role.
    pub fn add_api_key(&mut self, key: impl Into<String>, role: impl Into<String>) {
        self.api_keys.insert(key.into(), role.into());
    }

    pub fn with_api_key(mut self, key: impl Into<String>, role: impl Into<String>) -> Self {
        self.add_api_key(key, role);
        self
    }

    pub fn role_for(&self, key: &str) -> Option<&str> {
        self.api_keys.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.api_keys.is_empty()
    }
}

/// Authenticated caller, injected into request extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    pub role: String,
}

/// Resolve the caller's role from the API key header value.
pub fn authenticate(config: &AuthConfig, api_key: Option<&str>) -> ApiResult<AuthContext> {
    let key = api_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Missing API key"))?;

    config
        .role_for(key)
        .map(|role| AuthContext {
            role: role.to_string(),
        })
        .ok_or_else(|| ApiError::unauthorized("Invalid API key"))
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}
