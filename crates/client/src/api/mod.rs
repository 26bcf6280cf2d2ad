//! Marketplace REST API client.
//!
//! # Architecture
//!
//! - Plain JSON-over-HTTPS; one shared `reqwest` client behind an `Arc`
//! - The server is source of truth - no local sync, direct API calls
//! - In-memory caching via `moka` for catalog responses (5 minute TTL)
//! - The auth token is read from a [`TokenCell`] on every outbound request
//!   and written only by the session store
//! - Every 401 response emits [`AuthEvent::Unauthorized`] on the event bus
//!   before the error is returned to the caller; no retry layer anywhere
//!
//! # Example
//!
//! ```rust,ignore
//! use coursedeck_client::api::ApiClient;
//!
//! let api = ApiClient::new(&config, tokens, events)?;
//!
//! // Browse the catalog
//! let page = api.fetch_courses().await?;
//!
//! // Kick off a checkout
//! let key = api.fetch_provider_key().await?;
//! let order = api.create_order(&request).await?;
//! ```

mod auth;
mod catalog;
mod enrollment;
mod payment;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::ClientConfig;
use crate::events::{AuthEvent, EventBus};
use crate::store::session::TokenCell;

use types::{Category, Course, CourseList, User};

/// Header carrying the session token on every authenticated request.
const TOKEN_HEADER: &str = "x-access-token";

const CACHE_CAPACITY: u64 = 1000;
const CACHE_TTL: Duration = Duration::from_secs(300); // 5 minutes

/// Errors that can occur when talking to the marketplace API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP transport failed (connection, timeout, ...).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("json parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The server rejected the token (HTTP 401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found (HTTP 404); carries the server message.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success response.
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Cached catalog values.
#[derive(Debug, Clone)]
enum CacheValue {
    Courses(CourseList),
    Course(Box<Course>),
    Instructors(Vec<User>),
    Categories(Vec<Category>),
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the marketplace REST API.
///
/// Provides typed access to auth, catalog, enrollment, and payment
/// endpoints. Catalog reads are cached for 5 minutes.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base_url: String,
    asset_base: Url,
    tokens: TokenCell,
    events: EventBus,
    cache: Cache<String, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(
        config: &ClientConfig,
        tokens: TokenCell,
        events: EventBus,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url: config.api_base_url.as_str().trim_end_matches('/').to_owned(),
                asset_base: config.asset_base_url.clone(),
                tokens,
                events,
                cache,
            }),
        })
    }

    /// Build the absolute URL for an API path (`/courses`, `/login`, ...).
    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// Execute a GET request and parse the JSON response.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.inner.http.get(self.endpoint(path));
        self.send(request).await
    }

    /// Execute a POST request with a JSON body and parse the JSON response.
    pub(crate) async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.inner.http.post(self.endpoint(path)).json(body);
        self.send(request).await
    }

    /// Attach the session token, send, and decode one response.
    ///
    /// Responses are read as text first so parse failures can be logged with
    /// the offending body. Any 401 emits `AuthEvent::Unauthorized` before
    /// returning; the subscriber installed by `AppState` turns that into a
    /// forced logout, superseding whatever the caller does with the error.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let request = match self.inner.tokens.get() {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let response_text = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            self.inner.events.emit(AuthEvent::Unauthorized);
            return Err(ApiError::Unauthorized(extract_message(&response_text)));
        }

        if !status.is_success() {
            let message = extract_message(&response_text);
            if status == StatusCode::NOT_FOUND {
                return Err(ApiError::NotFound(message));
            }
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "API returned non-success status"
            );
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        match serde_json::from_str(&response_text) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Failed to parse API response"
                );
                Err(ApiError::Parse(e))
            }
        }
    }

    /// Rewrite a server-side upload path into an absolute asset URL.
    ///
    /// The server stores upload paths with Windows separators
    /// (`uploads\pic.jpg`); already-absolute URLs pass through unchanged.
    pub(crate) fn absolute_asset_url(&self, path: &str) -> String {
        let cleaned = path.replace('\\', "/");
        if cleaned.starts_with("http://") || cleaned.starts_with("https://") {
            return cleaned;
        }
        let relative = cleaned.trim_start_matches('/');
        self.inner
            .asset_base
            .join(relative)
            .map_or(cleaned, |url| url.to_string())
    }

    /// Normalize server-relative asset paths on a user record.
    pub(crate) fn normalize_user(&self, user: &mut User) {
        if let Some(picture) = user.profile_picture.take() {
            user.profile_picture = Some(self.absolute_asset_url(&picture));
        }
    }

    /// Normalize server-relative asset paths on a course record.
    pub(crate) fn normalize_course(&self, course: &mut Course) {
        if let Some(thumbnail) = course.thumbnail.take() {
            course.thumbnail = Some(self.absolute_asset_url(&thumbnail));
        }
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    async fn cache_get(&self, key: &str) -> Option<CacheValue> {
        self.inner.cache.get(key).await
    }

    async fn cache_insert(&self, key: String, value: CacheValue) {
        self.inner.cache.insert(key, value).await;
    }

    /// Invalidate the cached course listing (after a catalog mutation).
    pub(crate) async fn invalidate_course_listing(&self) {
        self.inner.cache.invalidate("courses").await;
    }

    /// Invalidate all cached catalog data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

/// Pull the `message` field out of a JSON error body, if any.
fn extract_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> ApiClient {
        let config = ClientConfig::new(
            Url::parse("https://api.coursedeck.example/api").expect("url"),
        );
        ApiClient::new(&config, TokenCell::new(), EventBus::new()).expect("client")
    }

    #[test]
    fn test_endpoint_building() {
        let api = test_client();
        assert_eq!(
            api.endpoint("/courses"),
            "https://api.coursedeck.example/api/courses"
        );
    }

    #[test]
    fn test_absolute_asset_url_rewrites_backslashes() {
        let api = test_client();
        assert_eq!(
            api.absolute_asset_url("uploads\\pics\\ada.jpg"),
            "https://api.coursedeck.example/uploads/pics/ada.jpg"
        );
    }

    #[test]
    fn test_absolute_asset_url_passthrough() {
        let api = test_client();
        assert_eq!(
            api.absolute_asset_url("https://cdn.example/pic.jpg"),
            "https://cdn.example/pic.jpg"
        );
    }

    #[test]
    fn test_extract_message() {
        assert_eq!(
            extract_message("{\"message\":\"Progress not found\"}"),
            "Progress not found"
        );
        assert_eq!(extract_message("not json"), "");
    }
}
