//! Client configuration
//!
//! [`ClientConfig`] gathers every tunable of the client: the API root,
//! transport limits, pagination size, request spacing and the retry policy.
//! It can be built in code through [`ClientConfig::builder`] or loaded from
//! YAML, where durations are written as (fractional) seconds:
//!
//! ```yaml
//! base_url: https://api.github.com
//! user_agent: my-tool/1.0
//! per_page: 100
//! seconds_between_requests: 0.25
//! retry:
//!   max_retries: 5
//!   secondary_rate_wait: 90
//! ```

use crate::error::{Error, Result};
use crate::retry::RetryConfig;
use crate::types::{
    DEFAULT_BASE_URL, DEFAULT_EXTRA_HOSTS, DEFAULT_PER_PAGE, DEFAULT_POOL_SIZE,
    DEFAULT_SECONDS_BETWEEN_REQUESTS, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

// ============================================================================
// Client Config
// ============================================================================

/// Configuration for [`crate::client::Client`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme, host and optional path prefix of the API
    pub base_url: String,
    /// Per-request timeout
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// User agent sent with every request (mandatory)
    pub user_agent: String,
    /// Page size requested from listing endpoints
    pub per_page: u32,
    /// Whether TLS certificates are verified
    pub verify_ssl: bool,
    /// Maximum requests in flight at once, also the idle connections kept per host
    pub pool_size: usize,
    /// Hosts besides the API host that absolute URLs may target
    pub extra_hosts: Vec<String>,
    /// Minimum spacing between two requests of the same method
    #[serde(with = "duration_secs")]
    pub seconds_between_requests: Duration,
    /// Retry policy settings
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            per_page: DEFAULT_PER_PAGE,
            verify_ssl: true,
            pool_size: DEFAULT_POOL_SIZE,
            extra_hosts: DEFAULT_EXTRA_HOSTS.iter().map(ToString::to_string).collect(),
            seconds_between_requests: Duration::from_secs_f64(DEFAULT_SECONDS_BETWEEN_REQUESTS),
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Parse a config from YAML and validate it
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: ClientConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a YAML file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(Error::Io)?;
        Self::from_yaml_str(&content)
    }

    /// Check the config for usage errors
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(Error::MissingUserAgent);
        }

        let base = self.parsed_base_url()?;
        if !matches!(base.scheme(), "https" | "http") {
            return Err(Error::config(format!(
                "base_url must use https, got '{}'",
                base.scheme()
            )));
        }
        if base.host_str().is_none() {
            return Err(Error::config("base_url has no host"));
        }

        if self.per_page == 0 || self.per_page > 100 {
            return Err(Error::config(format!(
                "per_page must be between 1 and 100, got {}",
                self.per_page
            )));
        }
        if self.pool_size == 0 {
            return Err(Error::config("pool_size must be at least 1"));
        }

        self.retry.validate()
    }

    /// The base URL as a parsed [`Url`]
    pub fn parsed_base_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.base_url)?)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`ClientConfig`]
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Set page size
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.config.per_page = per_page;
        self
    }

    /// Enable or disable TLS certificate verification
    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.config.verify_ssl = verify;
        self
    }

    /// Set connection pool size
    pub fn pool_size(mut self, size: usize) -> Self {
        self.config.pool_size = size;
        self
    }

    /// Allow an additional host for absolute URLs
    pub fn extra_host(mut self, host: impl Into<String>) -> Self {
        self.config.extra_hosts.push(host.into());
        self
    }

    /// Set the minimum spacing between requests of the same method
    pub fn seconds_between_requests(mut self, spacing: Duration) -> Self {
        self.config.seconds_between_requests = spacing;
        self
    }

    /// Disable request spacing
    pub fn no_spacing(mut self) -> Self {
        self.config.seconds_between_requests = Duration::ZERO;
        self
    }

    /// Set the retry policy settings
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set max retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.retry.max_retries = retries;
        self
    }

    /// Set the secondary rate limit wait
    pub fn secondary_rate_wait(mut self, wait: Duration) -> Self {
        self.config.retry.secondary_rate_wait = wait;
        self
    }

    /// Build the config
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

// ============================================================================
// Serde helpers
// ============================================================================

/// (De)serialize a [`Duration`] as fractional seconds
pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
