//! Common types used throughout ghrest
//!
//! This module contains shared constants, type aliases,
//! and small enums used across multiple modules.

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

// ============================================================================
// Defaults
// ============================================================================

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Page size the API uses when `per_page` is not sent
pub const DEFAULT_PER_PAGE: u32 = 30;

/// Default minimum spacing between two requests of the same method
pub const DEFAULT_SECONDS_BETWEEN_REQUESTS: f64 = 1.0;

/// Default wait after a secondary rate limit response
pub const DEFAULT_SECONDARY_RATE_WAIT: f64 = 60.0;

/// Default connection pool size
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Default user agent
pub const DEFAULT_USER_AGENT: &str = concat!("ghrest/", env!("CARGO_PKG_VERSION"));

/// Auxiliary hosts that absolute URLs may point at besides the API host
pub const DEFAULT_EXTRA_HOSTS: &[&str] = &["uploads.github.com", "status.github.com", "github.com"];

/// Path prefixes accepted on absolute URLs besides the API prefix
pub const ALLOWED_PATH_PREFIXES: &[&str] = &["/api/", "/login/oauth"];

// ============================================================================
// Header Names
// ============================================================================

pub const HEADER_RATE_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_RATE_LIMIT: &str = "x-ratelimit-limit";
pub const HEADER_RATE_RESET: &str = "x-ratelimit-reset";
pub const HEADER_RETRY_AFTER: &str = "retry-after";
pub const HEADER_LINK: &str = "link";

// ============================================================================
// Content Negotiation
// ============================================================================

/// Media type for raw file contents
pub const MEDIA_RAW_JSON: &str = "application/vnd.github.raw+json";

/// Media type for rendered HTML
pub const MEDIA_HTML_JSON: &str = "application/vnd.github.html+json";

/// Media type for the object representation of contents
pub const MEDIA_OBJECT_JSON: &str = "application/vnd.github.object+json";

/// Negotiated representation of a contents response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    /// Raw file contents
    Raw,
    /// Rendered HTML
    Html,
    /// Object representation
    Object,
}

impl MediaType {
    /// The media type string sent in `Accept` and matched in `Content-Type`
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Raw => MEDIA_RAW_JSON,
            MediaType::Html => MEDIA_HTML_JSON,
            MediaType::Object => MEDIA_OBJECT_JSON,
        }
    }

    /// Detect a negotiated media type inside a `Content-Type` value
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        [MediaType::Raw, MediaType::Html, MediaType::Object]
            .into_iter()
            .find(|m| content_type.contains(m.as_str()))
    }

    /// Detect a negotiated media type from response headers
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(Self::from_content_type)
    }
}

impl std::str::FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "raw" => Ok(MediaType::Raw),
            "html" => Ok(MediaType::Html),
            "object" => Ok(MediaType::Object),
            other => Err(format!(
                "unknown content type '{other}', expected raw, html or object"
            )),
        }
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Backoff strategy for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}
