//! Retry/backoff policy
//!
//! Distinguishes three failure classes:
//!
//! - **Transient**: transport errors and statuses in the configured
//!   forcelist (5xx by default). `Retry-After` is honoured verbatim, otherwise
//!   the attempt-count backoff applies.
//! - **Primary rate limit**: a 403 whose message starts with
//!   "API rate limit exceeded". Waits until `X-RateLimit-Reset` plus one second.
//! - **Secondary rate limit**: a 403 whose message reports a secondary/abuse
//!   limit. Waits the configured `secondary_rate_wait`.
//!
//! Any other failure is fatal. Rate-limit waits are never shorter than the
//! attempt-count backoff would be.

mod policy;
mod types;

pub use policy::{classify_message, RetryPolicy};
pub use types::{
    Outcome, RateLimitKind, RetryConfig, RetryContext, RetryDecision, DEFAULT_ALLOWED_METHODS,
};
