// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # ghrest
//!
//! A client engine for the GitHub REST API that survives rate limiting and
//! walks paginated listings for you.
//!
//! ## Features
//!
//! - **Retry policy**: transient 5xx failures, primary rate limits (wait for
//!   the reset) and secondary rate limits (fixed cool-down) each get their
//!   own backoff
//! - **Request pipeline**: URL allow-listing, auth and `User-Agent` stamping,
//!   per-method request spacing, rate-limit counters
//! - **Pagination**: lazy `Link`-header traversal, search envelope
//!   unwrapping, raw/HTML content passed through untouched
//! - **Auth**: token, basic, GitHub App JWT, anonymous
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ghrest::{auth::Token, Client, ClientConfig, RequestConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> ghrest::Result<()> {
//!     let client = Client::new(ClientConfig::default(), Arc::new(Token::new("ghp_...")?))?;
//!
//!     let mut commits = client.paginate("/repos/rust-lang/rust/commits", RequestConfig::new());
//!     while let Some(commit) = commits.next().await {
//!         println!("{}", commit?.into_json()["sha"]);
//!     }
//!
//!     let (remaining, limit) = client.rate_limiting();
//!     println!("{remaining}/{limit} requests left");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! caller ──► Pages ──► Client::call ──► RetryPolicy ──► Transport
//!            (Link,     (URL, headers,   (decide: retry,   (reqwest)
//!             envelope)  spacing, decode) exhausted, fatal)
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and constants
pub mod types;

/// Client configuration
pub mod config;

/// Authentication implementations
pub mod auth;

/// HTTP transport boundary
pub mod http;

/// Retry and backoff policy
pub mod retry;

/// Request pipeline
pub mod client;

/// Lazy Link-header pagination
pub mod pagination;

/// Endpoint callers
pub mod api;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use api::{CommitFilter, SearchSort, SortOrder};
pub use client::{ApiResponse, Body, Client, RequestConfig};
pub use config::ClientConfig;
pub use pagination::{PageItem, Pages};
pub use retry::{RetryConfig, RetryPolicy};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
