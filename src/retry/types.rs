//! Retry policy types

use crate::config::duration_secs;
use crate::error::{Error, Result};
use crate::http::RawResponse;
use crate::types::{BackoffType, DEFAULT_SECONDARY_RATE_WAIT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Methods retried by default: the idempotent verbs plus GET and POST
pub const DEFAULT_ALLOWED_METHODS: &[&str] =
    &["HEAD", "GET", "PUT", "DELETE", "OPTIONS", "TRACE", "POST"];

/// Settings for [`super::RetryPolicy`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Methods eligible for retry (upper case)
    pub allowed_methods: Vec<String>,
    /// Statuses treated as transient failures
    pub status_forcelist: Vec<u16>,
    /// Shape of the attempt-count based backoff
    pub backoff_type: BackoffType,
    /// Base unit of the attempt-count based backoff
    #[serde(with = "duration_secs")]
    pub backoff_factor: Duration,
    /// Cap of the attempt-count based backoff
    #[serde(with = "duration_secs")]
    pub max_backoff: Duration,
    /// Wait applied after a secondary rate limit
    #[serde(with = "duration_secs")]
    pub secondary_rate_wait: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            allowed_methods: DEFAULT_ALLOWED_METHODS
                .iter()
                .map(ToString::to_string)
                .collect(),
            status_forcelist: (500..600).collect(),
            backoff_type: BackoffType::Exponential,
            backoff_factor: Duration::from_millis(100),
            max_backoff: Duration::from_secs(120),
            secondary_rate_wait: Duration::from_secs_f64(DEFAULT_SECONDARY_RATE_WAIT),
        }
    }
}

impl RetryConfig {
    /// Check the settings for usage errors
    pub fn validate(&self) -> Result<()> {
        if let Some(bad) = self.status_forcelist.iter().find(|s| **s < 400 || **s > 599) {
            return Err(Error::config(format!(
                "status_forcelist may only contain 4xx/5xx codes, got {bad}"
            )));
        }
        if self.backoff_factor > self.max_backoff {
            return Err(Error::config("backoff_factor must not exceed max_backoff"));
        }
        Ok(())
    }
}

/// Result of one exchange as seen by the retry policy
#[derive(Debug, Clone, Copy)]
pub enum Outcome<'a> {
    /// The server answered with a failure status
    Response(&'a RawResponse),
    /// The exchange failed below HTTP semantics
    Transport(&'a Error),
}

impl Outcome<'_> {
    /// The error surfaced to the caller when this outcome is not retried
    pub fn to_error(&self) -> Error {
        match self {
            Outcome::Response(response) => Error::api(response.status, response.text()),
            Outcome::Transport(err) => Error::connection(err.to_string()),
        }
    }
}

/// What the pipeline should do after a failed attempt
#[derive(Debug)]
pub enum RetryDecision {
    /// Sleep for `after`, then re-attempt
    Retry { after: Duration },
    /// The failure is retryable but the attempt budget is spent
    Exhausted,
    /// The failure must not be retried; surface this error
    Fatal(Error),
}

impl RetryDecision {
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry { .. })
    }

    /// The wait carried by a `Retry` decision
    pub fn backoff(&self) -> Option<Duration> {
        match self {
            Self::Retry { after } => Some(*after),
            _ => None,
        }
    }
}

/// Rate limit reported by a 403 response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitKind {
    /// Hourly quota exhausted; wait until the reset header
    Primary,
    /// Burst/abuse throttle; wait a fixed time
    Secondary,
}

/// Per-logical-request retry state
#[derive(Debug, Clone, Default)]
pub struct RetryContext {
    /// Number of retries granted so far
    pub attempt: u32,
    /// Every backoff granted, in order
    pub history: Vec<Duration>,
    /// The most recent backoff to sleep before the next attempt
    pub backoff: Duration,
}

impl RetryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, backoff: Duration) {
        self.attempt += 1;
        self.history.push(backoff);
        self.backoff = backoff;
    }
}
