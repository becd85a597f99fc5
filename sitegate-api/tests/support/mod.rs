//! Shared harness for the API integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde::de::DeserializeOwned;
use sitegate_api::{create_router, ApiConfig, AppState, AuthConfig, API_KEY_HEADER};
use sitegate_api::telemetry::TelemetryConfig;
use sitegate_storage::{AccessStore, CacheConfig};
use sitegate_test_utils::fixtures::{
    counting_store, EXEMPT_TENANT, SUBSCRIBED_TENANT, UNKNOWN_TENANT, UNSUBSCRIBED_TENANT,
};
use sitegate_test_utils::CountingAccessStore;
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN_KEY: &str = "test-admin-key";
pub const MANAGER_KEY: &str = "test-manager-key";
pub const USER_KEY: &str = "test-user-key";

pub const INDEX_BODY: &str = "<h1>published site</h1>";
pub const UNAVAILABLE_BODY: &str = "<h1>site unavailable</h1>";

/// A fully wired router over a counting store and a temporary sites
/// directory holding an index and an unavailable page per fixture tenant.
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<CountingAccessStore>,
    _sites: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_state(|state| state).await
    }

    /// Build the app, letting the caller adjust the state before routing.
    pub async fn with_state(adjust: impl FnOnce(AppState) -> AppState) -> Self {
        let sites = TempDir::new().expect("temp sites dir");
        for tenant in [UNKNOWN_TENANT, UNSUBSCRIBED_TENANT, EXEMPT_TENANT, SUBSCRIBED_TENANT] {
            let dir = sites.path().join(tenant);
            std::fs::create_dir_all(dir.join("css")).expect("tenant dir");
            std::fs::write(dir.join("index.html"), INDEX_BODY).expect("index");
            std::fs::write(dir.join("unavailable.html"), UNAVAILABLE_BODY).expect("unavailable");
            std::fs::write(dir.join("css/site.css"), "body { margin: 0; }").expect("css");
        }

        let store = Arc::new(counting_store().await);
        let config = ApiConfig {
            sites_dir: sites.path().to_path_buf(),
            ..ApiConfig::default()
        };
        let auth = AuthConfig::default()
            .with_api_key(ADMIN_KEY, "admin")
            .with_api_key(MANAGER_KEY, "manager")
            .with_api_key(USER_KEY, "user");
        let cache_config = CacheConfig::default().with_store_timeout(Duration::from_millis(200));

        let shared: Arc<dyn AccessStore> = store.clone();
        let state = adjust(AppState::new(shared, cache_config, config, auth));

        Self {
            state,
            store,
            _sites: sites,
        }
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone(), &TelemetryConfig::default())
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(request(Method::GET, uri, None, None)).await
    }

    pub async fn admin(
        &self,
        method: Method,
        uri: &str,
        key: &str,
        body: Option<serde_json::Value>,
    ) -> Response {
        self.send(request(method, uri, Some(key), body)).await
    }
}

pub fn request(
    method: Method,
    uri: &str,
    key: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("valid request")
}

pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get("location")
        .and_then(|value| value.to_str().ok())
        .expect("redirect carries a location")
}

pub async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn body_json<T: DeserializeOwned>(response: Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Follow the site entry redirect and return the landing page body.
pub async fn land(app: &TestApp, tenant: &str) -> String {
    let entry = app.get(&format!("/sites/{}", tenant)).await;
    assert_eq!(entry.status(), StatusCode::TEMPORARY_REDIRECT);
    let target = location(&entry).to_string();
    let page = app.get(&target).await;
    assert_eq!(page.status(), StatusCode::OK, "landing page {} missing", target);
    body_string(page).await
}
