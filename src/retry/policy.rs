//! Retry/backoff decisions
//!
//! The policy never sleeps. It inspects a failed exchange, decides whether
//! another attempt is worthwhile and returns how long to wait, so the caller
//! owns the suspension and tests can check the arithmetic directly.

use super::types::{Outcome, RateLimitKind, RetryConfig, RetryContext, RetryDecision};
use crate::error::Error;
use crate::http::RawResponse;
use crate::types::{BackoffType, HEADER_RATE_RESET, HEADER_RETRY_AFTER};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

const PRIMARY_PREFIX: &str = "api rate limit exceeded";
const SECONDARY_PREFIX: &str = "you have exceeded a secondary rate limit";
const SECONDARY_SUFFIXES: &[&str] = &[
    "please retry your request again later.",
    "please wait a few minutes before you try again.",
];

/// Classify a 403 `message` as a rate limit, ignoring case
pub fn classify_message(message: &str) -> Option<RateLimitKind> {
    let message = message.to_lowercase();
    if message.starts_with(PRIMARY_PREFIX) {
        Some(RateLimitKind::Primary)
    } else if message.starts_with(SECONDARY_PREFIX)
        || SECONDARY_SUFFIXES.iter().any(|s| message.ends_with(s))
    {
        Some(RateLimitKind::Secondary)
    } else {
        None
    }
}

/// Lower bound on the wait, as required by the failure itself
#[derive(Debug, Clone, Copy)]
enum Required {
    /// Wait exactly this long (server sent `Retry-After`)
    Exactly(Duration),
    /// Wait at least this long, or longer if the attempt backoff says so
    AtLeast(Duration),
}

/// Decides retry-vs-fail for failed exchanges
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Whether requests with this method may be retried
    pub fn is_method_allowed(&self, method: &Method) -> bool {
        self.config
            .allowed_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(method.as_str()))
    }

    /// Attempt-count based backoff for the `retry`-th retry (1-based)
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = self.config.backoff_factor;
        let delay = match self.config.backoff_type {
            BackoffType::Constant => factor,
            BackoffType::Linear => factor.saturating_mul(retry),
            BackoffType::Exponential => {
                factor.saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
            }
        };

        std::cmp::min(delay, self.config.max_backoff)
    }

    /// Decide what to do after a failed attempt
    ///
    /// `now` is the wall-clock instant used to turn a rate-limit reset
    /// timestamp into a wait. On `Retry` the context is advanced and the
    /// granted backoff recorded.
    pub fn decide(
        &self,
        ctx: &mut RetryContext,
        method: &Method,
        outcome: Outcome<'_>,
        now: DateTime<Utc>,
    ) -> RetryDecision {
        let required = match self.classify(outcome, now) {
            Ok(required) => required,
            Err(fatal) => return RetryDecision::Fatal(fatal),
        };

        if !self.is_method_allowed(method) {
            debug!("{method} is not retried");
            return RetryDecision::Fatal(outcome.to_error());
        }

        if ctx.attempt >= self.config.max_retries {
            return RetryDecision::Exhausted;
        }

        let retry_backoff = self.backoff_for(ctx.attempt + 1);
        let backoff = match required {
            Required::Exactly(wait) => wait,
            Required::AtLeast(wait) if retry_backoff > wait => {
                if !wait.is_zero() {
                    debug!(
                        "Retry backoff of {:?} exceeds required rate limit backoff of {:?}",
                        retry_backoff, wait
                    );
                }
                retry_backoff
            }
            Required::AtLeast(wait) => wait,
        };

        info!("Setting next backoff to {:?}", backoff);
        ctx.record(backoff);
        RetryDecision::Retry { after: backoff }
    }

    /// Work out the wait a failure requires, or the error that ends the call
    fn classify(&self, outcome: Outcome<'_>, now: DateTime<Utc>) -> Result<Required, Error> {
        let response = match outcome {
            Outcome::Transport(_) => return Ok(Required::AtLeast(Duration::ZERO)),
            Outcome::Response(response) => response,
        };

        if self.config.status_forcelist.contains(&response.status) {
            return Ok(match retry_after(response, now) {
                Some(wait) => Required::Exactly(wait),
                None => Required::AtLeast(Duration::ZERO),
            });
        }

        if response.status != 403 {
            return Err(outcome.to_error());
        }

        if let Some(wait) = retry_after(response, now) {
            info!("Retrying after {:?}", wait);
            return Ok(Required::Exactly(wait));
        }

        match inspect_message(response)?.as_deref().and_then(classify_message) {
            Some(RateLimitKind::Primary) => Ok(Required::AtLeast(primary_backoff(response, now))),
            Some(RateLimitKind::Secondary) => {
                Ok(Required::AtLeast(self.config.secondary_rate_wait))
            }
            None => {
                debug!("Response message does not indicate retry-able error");
                Err(outcome.to_error())
            }
        }
    }
}

/// Pull the `message` field out of a JSON error body
fn inspect_message(response: &RawResponse) -> Result<Option<String>, Error> {
    let body: Value = serde_json::from_slice(&response.body).map_err(|e| {
        Error::classification(
            response.status,
            format!("failed to inspect response message: {e}"),
        )
    })?;
    Ok(body
        .get("message")
        .and_then(Value::as_str)
        .map(ToString::to_string))
}

/// Wait until the primary rate limit resets, plus one second
///
/// The reset header has one-second resolution, so the extra second covers
/// the reset happening anywhere inside that second.
fn primary_backoff(response: &RawResponse, now: DateTime<Utc>) -> Duration {
    let Some(value) = response.header(HEADER_RATE_RESET) else {
        return Duration::ZERO;
    };
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Duration::ZERO;
    }
    let Some(reset) = value
        .parse::<i64>()
        .ok()
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
    else {
        return Duration::ZERO;
    };

    let delta = reset - now;
    let secs = delta.num_milliseconds() as f64 / 1000.0;
    if secs > 0.0 {
        debug!("Reset occurs in {secs}s ({value} / {reset})");
    }
    Duration::try_from_secs_f64(secs + 1.0).unwrap_or(Duration::ZERO)
}

/// Parse `Retry-After` as delay-seconds or an HTTP date
fn retry_after(response: &RawResponse, now: DateTime<Utc>) -> Option<Duration> {
    let value = response.header(HEADER_RETRY_AFTER)?.trim();
    if let Ok(secs) = value.parse::<f64>() {
        return Duration::try_from_secs_f64(secs.max(0.0)).ok();
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}
