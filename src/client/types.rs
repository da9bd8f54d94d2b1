//! Request pipeline types

use crate::error::{Error, Result};
use crate::types::{JsonValue, HEADER_RATE_LIMIT, HEADER_RATE_REMAINING, HEADER_RATE_RESET};
use reqwest::header::HeaderMap;
use reqwest::Method;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

// ============================================================================
// Query Parameters
// ============================================================================

/// A query parameter value; multi-valued parameters become repeated keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    Multi(Vec<String>),
}

impl ParamValue {
    /// All values of this parameter, in order
    pub fn values(&self) -> Vec<&str> {
        match self {
            ParamValue::Single(v) => vec![v.as_str()],
            ParamValue::Multi(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    /// Convert a JSON value, rejecting shapes that cannot be a query value
    pub fn from_json(name: &str, value: &JsonValue) -> Result<Self> {
        match value {
            JsonValue::String(s) => Ok(Self::Single(s.clone())),
            JsonValue::Number(n) => Ok(Self::Single(n.to_string())),
            JsonValue::Bool(b) => Ok(Self::Single(b.to_string())),
            JsonValue::Array(items) => items
                .iter()
                .map(|item| match Self::from_json(name, item)? {
                    Self::Single(s) => Ok(s),
                    Self::Multi(_) => Err(Error::invalid_parameter(name, "nested arrays")),
                })
                .collect::<Result<Vec<_>>>()
                .map(Self::Multi),
            JsonValue::Null => Err(Error::invalid_parameter(name, "null")),
            JsonValue::Object(_) => Err(Error::invalid_parameter(name, "objects")),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Single(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Single(v)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        Self::Single(v.to_string())
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        Self::Single(v.to_string())
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Single(v.to_string())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        Self::Multi(v)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(v: Vec<&str>) -> Self {
        Self::Multi(v.into_iter().map(ToString::to_string).collect())
    }
}

/// Query parameters keyed by name
pub type QueryParams = BTreeMap<String, ParamValue>;

// ============================================================================
// Request Config
// ============================================================================

/// Per-call options for [`super::Client::call`]
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Query parameters, merged over any already in the URL
    pub params: QueryParams,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body (JSON)
    pub body: Option<JsonValue>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Replace all query parameters
    #[must_use]
    pub fn params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Parsed JSON
    Json(JsonValue),
    /// Negotiated raw/HTML/object payload, returned as text
    Raw(String),
    /// The server sent no content
    Empty,
}

impl Body {
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}

/// Result of one logical API call
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Body,
}

impl ApiResponse {
    /// Header value as a string
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

// ============================================================================
// Rate Limit State
// ============================================================================

/// Last rate-limit counters reported by the server; `-1` means unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    pub remaining: i64,
    pub limit: i64,
    /// Unix timestamp of the next quota reset
    pub reset_at: i64,
}

impl Default for RateLimitState {
    fn default() -> Self {
        Self {
            remaining: -1,
            limit: -1,
            reset_at: 0,
        }
    }
}

impl RateLimitState {
    /// Overwrite the counters from response headers
    ///
    /// Remaining and limit are only taken together. Values are read as
    /// numbers and truncated, so `"4999.0"` counts as 4999.
    pub fn update_from_headers(&mut self, headers: &HeaderMap) {
        if let (Some(remaining), Some(limit)) = (
            header_int(headers, HEADER_RATE_REMAINING),
            header_int(headers, HEADER_RATE_LIMIT),
        ) {
            self.remaining = remaining;
            self.limit = limit;
        }
        if let Some(reset) = header_int(headers, HEADER_RATE_RESET) {
            self.reset_at = reset;
        }
    }

    /// Whether the server has reported counters yet
    pub fn is_known(&self) -> bool {
        self.limit >= 0
    }
}

fn header_int(headers: &HeaderMap, name: &str) -> Option<i64> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    let number = value.parse::<f64>().ok().filter(|n| n.is_finite())?;
    Some(number.trunc() as i64)
}

// ============================================================================
// Request Timing
// ============================================================================

/// Last dispatch instant per HTTP method, shared across calls
#[derive(Debug, Default)]
pub struct RequestTiming {
    last: Mutex<HashMap<Method, Instant>>,
}

impl RequestTiming {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next dispatch slot for `method` and return how long to wait
    ///
    /// The slot is recorded under the lock, so concurrent callers of the same
    /// method are spaced out from one another rather than all reading the
    /// same previous timestamp.
    pub fn reserve(&self, method: &Method, spacing: Duration) -> Duration {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let wait = match last.get(method) {
            Some(previous) => (*previous + spacing).saturating_duration_since(now),
            None => Duration::ZERO,
        };
        last.insert(method.clone(), now + wait);
        wait
    }

    /// Last dispatch instant of `method`
    pub fn last_dispatch(&self, method: &Method) -> Option<Instant> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(method)
            .copied()
    }
}
