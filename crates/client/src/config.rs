//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `PEELOJUICE_API_URL` - Backend origin (default: `http://localhost:8000`);
//!   the REST root is `<origin>/api`
//! - `PEELOJUICE_STATE_DIR` - Directory for restart-durable state
//!   (default: `.peelojuice`)
//! - `PEELOJUICE_REQUEST_TIMEOUT_SECS` - HTTP timeout (default: 30)
//! - `PEELOJUICE_CATALOG_CACHE_TTL_SECS` - Branch/menu cache TTL (default: 300)
//! - `PEELOJUICE_TOAST_TTL_MS` - Toast auto-dismiss window (default: 3000)
//! - `RAZORPAY_KEY_ID` - Overrides the gateway key returned by the backend
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_STATE_DIR: &str = ".peelojuice";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin, e.g. `https://api.peelojuice.in`
    pub api_url: Url,
    /// Directory holding the restart-durable key-value file
    pub state_dir: PathBuf,
    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,
    /// How long branch lists and menus stay cached
    pub catalog_cache_ttl: Duration,
    /// How long a toast stays visible before auto-dismissal
    pub toast_ttl: Duration,
    /// Gateway key override (the backend normally supplies it)
    pub razorpay_key_id: Option<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(&get_env_or_default("PEELOJUICE_API_URL", DEFAULT_API_URL))?;
        let state_dir = PathBuf::from(get_env_or_default("PEELOJUICE_STATE_DIR", DEFAULT_STATE_DIR));
        let request_timeout =
            Duration::from_secs(get_parsed_or_default("PEELOJUICE_REQUEST_TIMEOUT_SECS", 30)?);
        let catalog_cache_ttl =
            Duration::from_secs(get_parsed_or_default("PEELOJUICE_CATALOG_CACHE_TTL_SECS", 300)?);
        let toast_ttl = Duration::from_millis(get_parsed_or_default("PEELOJUICE_TOAST_TTL_MS", 3000)?);

        Ok(Self {
            api_url,
            state_dir,
            request_timeout,
            catalog_cache_ttl,
            toast_ttl,
            razorpay_key_id: get_optional_env("RAZORPAY_KEY_ID"),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
        })
    }

    /// Configuration pointing at `api_url` with every other value defaulted.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `api_url` is not an http(s) URL.
    pub fn for_api_url(api_url: &str, state_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: parse_api_url(api_url)?,
            state_dir: state_dir.into(),
            request_timeout: Duration::from_secs(30),
            catalog_cache_ttl: Duration::from_secs(300),
            toast_ttl: Duration::from_millis(3000),
            razorpay_key_id: None,
            sentry_dsn: None,
        })
    }

    /// REST root, i.e. the origin with `/api` appended.
    #[must_use]
    pub fn api_root(&self) -> String {
        format!("{}/api", self.api_url.as_str().trim_end_matches('/'))
    }

    /// Path of the restart-durable key-value file.
    #[must_use]
    pub fn durable_store_path(&self) -> PathBuf {
        self.state_dir.join("storage.json")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse and validate the backend origin.
fn parse_api_url(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| {
        ConfigError::InvalidEnvVar("PEELOJUICE_API_URL".to_string(), e.to_string())
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "PEELOJUICE_API_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a numeric environment variable with a default value.
fn get_parsed_or_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_api_root_appends_api() {
        let config = ClientConfig::for_api_url("https://api.peelojuice.in/", "/tmp/pj").unwrap();
        assert_eq!(config.api_root(), "https://api.peelojuice.in/api");

        let config = ClientConfig::for_api_url("http://localhost:8000", "/tmp/pj").unwrap();
        assert_eq!(config.api_root(), "http://localhost:8000/api");
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let result = ClientConfig::for_api_url("ftp://example.com", "/tmp/pj");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_rejects_garbage_url() {
        assert!(ClientConfig::for_api_url("not a url", "/tmp/pj").is_err());
    }

    #[test]
    fn test_durable_store_path() {
        let config = ClientConfig::for_api_url("http://localhost:8000", "/tmp/pj").unwrap();
        assert_eq!(
            config.durable_store_path(),
            PathBuf::from("/tmp/pj/storage.json")
        );
    }
}
