//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `COURSEDECK_API_URL` - Base URL of the marketplace REST API
//!   (e.g., `https://api.coursedeck.example/api`)
//!
//! ## Optional
//! - `COURSEDECK_ASSET_URL` - Base URL for uploaded assets such as course
//!   thumbnails and profile pictures (default: the API URL's origin)
//! - `COURSEDECK_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 30)

use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client application configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the marketplace REST API.
    pub api_base_url: Url,
    /// Base URL uploaded asset paths are resolved against.
    pub asset_base_url: Url,
    /// Per-request HTTP timeout.
    pub http_timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration from an API base URL.
    ///
    /// The asset base defaults to the API URL's origin: uploaded files are
    /// served from the server root, not from under the API prefix.
    #[must_use]
    pub fn new(api_base_url: Url) -> Self {
        let asset_base_url = origin_of(&api_base_url);
        Self {
            api_base_url,
            asset_base_url,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }

    /// Override the per-request HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = get_required_env("COURSEDECK_API_URL")?
            .parse::<Url>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("COURSEDECK_API_URL".to_string(), e.to_string())
            })?;

        let asset_base_url = match get_optional_env("COURSEDECK_ASSET_URL") {
            Some(raw) => raw.parse::<Url>().map_err(|e| {
                ConfigError::InvalidEnvVar("COURSEDECK_ASSET_URL".to_string(), e.to_string())
            })?,
            None => origin_of(&api_base_url),
        };

        let http_timeout = Duration::from_secs(
            get_env_or_default(
                "COURSEDECK_HTTP_TIMEOUT_SECS",
                &DEFAULT_HTTP_TIMEOUT_SECS.to_string(),
            )
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar(
                    "COURSEDECK_HTTP_TIMEOUT_SECS".to_string(),
                    e.to_string(),
                )
            })?,
        );

        Ok(Self {
            api_base_url,
            asset_base_url,
            http_timeout,
        })
    }
}

/// The origin of a URL (scheme + host + port) with a root path.
fn origin_of(url: &Url) -> Url {
    let mut origin = url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    origin
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_base_defaults_to_api_origin() {
        let config =
            ClientConfig::new(Url::parse("https://api.coursedeck.example/api").unwrap());
        assert_eq!(
            config.asset_base_url.as_str(),
            "https://api.coursedeck.example/"
        );
    }

    #[test]
    fn test_origin_strips_path_and_query() {
        let url = Url::parse("https://host.example/api/v2?debug=1").unwrap();
        assert_eq!(origin_of(&url).as_str(), "https://host.example/");
    }

    #[test]
    fn test_default_timeout() {
        let config = ClientConfig::new(Url::parse("http://localhost:4000/api").unwrap());
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }
}
