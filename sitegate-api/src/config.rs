//! API server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use sitegate_core::ConfigError;

/// Configuration for the HTTP surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    /// Host to bind to.
    pub bind_host: String,
    /// Port to bind to.
    pub port: u16,
    /// Directory holding one sub-directory of published files per tenant.
    pub sites_dir: PathBuf,
    /// URL prefix of the site routes, without trailing slash (`/sites`).
    pub site_prefix: String,
    /// Document a tenant is sent to when access is allowed.
    pub root_document: String,
    /// Document a tenant is sent to when access is denied.
    pub unavailable_document: String,
    /// Optional JSON seed for the in-memory access store.
    pub seed_file: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 3000,
            sites_dir: PathBuf::from("sites"),
            site_prefix: "/sites".to_string(),
            root_document: "index.html".to_string(),
            unavailable_document: "unavailable.html".to_string(),
            seed_file: None,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SITEGATE_BIND`: Bind host (default: 0.0.0.0)
    /// - `PORT` or `SITEGATE_PORT`: Bind port (default: 3000)
    /// - `SITEGATE_SITES_DIR`: Published sites directory (default: sites)
    /// - `SITEGATE_SITE_PREFIX`: Site route prefix (default: /sites)
    /// - `SITEGATE_ROOT_DOCUMENT`: Allowed landing document (default: index.html)
    /// - `SITEGATE_UNAVAILABLE_DOCUMENT`: Denied landing document (default: unavailable.html)
    /// - `SITEGATE_SEED_FILE`: JSON seed for the access store (default: none)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("SITEGATE_PORT").ok())
        {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                field: "PORT".to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.port,
        };

        let config = Self {
            bind_host: std::env::var("SITEGATE_BIND").unwrap_or(defaults.bind_host),
            port,
            sites_dir: std::env::var("SITEGATE_SITES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.sites_dir),
            site_prefix: std::env::var("SITEGATE_SITE_PREFIX").unwrap_or(defaults.site_prefix),
            root_document: std::env::var("SITEGATE_ROOT_DOCUMENT")
                .unwrap_or(defaults.root_document),
            unavailable_document: std::env::var("SITEGATE_UNAVAILABLE_DOCUMENT")
                .unwrap_or(defaults.unavailable_document),
            seed_file: std::env::var("SITEGATE_SEED_FILE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        };
        config.normalized()
    }

    /// Canonicalise the prefix and document names, rejecting unusable ones.
    pub fn normalized(mut self) -> Result<Self, ConfigError> {
        self.site_prefix = normalize_prefix(&self.site_prefix)?;
        self.root_document = normalize_document("SITEGATE_ROOT_DOCUMENT", &self.root_document)?;
        self.unavailable_document =
            normalize_document("SITEGATE_UNAVAILABLE_DOCUMENT", &self.unavailable_document)?;
        Ok(self)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "SITEGATE_BIND".to_string(),
                value: addr.clone(),
                reason: e.to_string(),
            })
    }

    /// Public URL of a document inside a tenant's site.
    ///
    /// The tenant id is percent-encoded as a single path segment.
    pub fn site_document_path(&self, tenant: &str, document: &str) -> String {
        format!(
            "{}/{}/{}",
            self.site_prefix,
            urlencoding::encode(tenant),
            document
        )
    }
}

/// `sites/` and `/sites/` both become `/sites`.
///
/// The prefix may not be empty: site routes would then shadow `/api` and
/// `/health`.
fn normalize_prefix(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "SITEGATE_SITE_PREFIX".to_string(),
            value: raw.to_string(),
            reason: "site prefix must not be empty".to_string(),
        });
    }
    Ok(format!("/{}", trimmed))
}

fn normalize_document(field: &str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: raw.to_string(),
            reason: "document name must not be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_normalization() {
        assert_eq!(normalize_prefix("sites").unwrap(), "/sites");
        assert_eq!(normalize_prefix("/sites/").unwrap(), "/sites");
        assert_eq!(normalize_prefix("/tenants/live").unwrap(), "/tenants/live");
        assert!(normalize_prefix("/").is_err());
    }

    #[test]
    fn test_document_normalization() {
        let config = ApiConfig {
            root_document: "/home.html".to_string(),
            ..ApiConfig::default()
        }
        .normalized()
        .unwrap();
        assert_eq!(config.root_document, "home.html");

        let empty = ApiConfig {
            unavailable_document: " / ".to_string(),
            ..ApiConfig::default()
        }
        .normalized();
        assert!(matches!(empty, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_site_document_path() {
        let config = ApiConfig::default();
        assert_eq!(
            config.site_document_path("9876543210", "unavailable.html"),
            "/sites/9876543210/unavailable.html"
        );
        assert_eq!(
            config.site_document_path("a/b?c#d e", "index.html"),
            "/sites/a%2Fb%3Fc%23d%20e/index.html"
        );
    }

    #[test]
    fn test_socket_addr() {
        let config = ApiConfig {
            bind_host: "127.0.0.1".to_string(),
            port: 8080,
            ..ApiConfig::default()
        };
        assert_eq!(config.socket_addr().unwrap().port(), 8080);

        let bad = ApiConfig {
            bind_host: "not a host".to_string(),
            ..ApiConfig::default()
        };
        assert!(bad.socket_addr().is_err());
    }
}
