//! Request pipeline
//!
//! [`Client::call`] runs one logical API call:
//! - resolves the URL against the configured API root and checks it is allowed
//! - merges query parameters and stamps `User-Agent`
//! - spaces consecutive requests of the same method
//! - dispatches through the transport, retrying per [`RetryPolicy`] and
//!   stamping `Authorization` on every attempt
//! - records rate-limit counters and decodes the body

use super::types::{
    ApiResponse, Body, QueryParams, RateLimitState, RequestConfig, RequestTiming,
};
use crate::auth::Auth;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::{RawResponse, ReqwestTransport, Transport, TransportRequest};
use crate::retry::{Outcome, RetryContext, RetryDecision, RetryPolicy};
use crate::types::{JsonValue, MediaType, ALLOWED_PATH_PREFIXES};
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// API client: request pipeline plus the shared rate-limit and timing state
///
/// Clones share the transport, rate-limit counters and request spacing.
#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    base_url: Url,
    prefix: String,
    transport: Arc<dyn Transport>,
    auth: Arc<dyn Auth>,
    policy: RetryPolicy,
    rate_limit: Arc<Mutex<RateLimitState>>,
    timing: Arc<RequestTiming>,
}

impl Client {
    /// Create a client that talks HTTP through `reqwest`
    pub fn new(config: ClientConfig, auth: Arc<dyn Auth>) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, auth, Arc::new(transport))
    }

    /// Create a client over a custom transport
    pub fn with_transport(
        config: ClientConfig,
        auth: Arc<dyn Auth>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        config.validate()?;
        let base_url = config.parsed_base_url()?;
        let prefix = base_url.path().trim_end_matches('/').to_string();
        let policy = RetryPolicy::new(config.retry.clone());

        Ok(Self {
            config,
            base_url,
            prefix,
            transport,
            auth,
            policy,
            rate_limit: Arc::new(Mutex::new(RateLimitState::default())),
            timing: Arc::new(RequestTiming::new()),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `(remaining, limit)` as last reported by the server, `(-1, -1)` before that
    pub fn rate_limiting(&self) -> (i64, i64) {
        let state = self.rate_limit_state();
        (state.remaining, state.limit)
    }

    /// Unix timestamp of the next quota reset, `0` before the first report
    pub fn rate_limiting_resettime(&self) -> i64 {
        self.rate_limit_state().reset_at
    }

    pub fn rate_limit_state(&self) -> RateLimitState {
        *self.rate_limit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make a GET request
    pub async fn get(&self, url: &str) -> Result<ApiResponse> {
        self.call(Method::GET, url, RequestConfig::default()).await
    }

    /// Make a GET request with config
    pub async fn get_with_config(&self, url: &str, request: RequestConfig) -> Result<ApiResponse> {
        self.call(Method::GET, url, request).await
    }

    /// Make a POST request
    pub async fn post(&self, url: &str, body: JsonValue) -> Result<ApiResponse> {
        self.call(Method::POST, url, RequestConfig::default().json(body))
            .await
    }

    /// Run one logical API call
    pub async fn call(
        &self,
        method: Method,
        url: &str,
        request: RequestConfig,
    ) -> Result<ApiResponse> {
        let mut full_url = self.resolve_url(url)?;
        merge_params(&mut full_url, &request.params);
        let headers = self.build_headers(&request)?;
        let body = request
            .body
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()?
            .map(Into::into);

        let transport_request = TransportRequest {
            method: method.clone(),
            url: full_url,
            headers,
            body,
        };

        self.defer(&method).await;
        let response = self.execute_with_retry(&transport_request).await?;

        self.rate_limit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .update_from_headers(&response.headers);

        debug!("Request succeeded: {} {}", method, transport_request.url);
        let body = decode_body(&response)?;
        Ok(ApiResponse {
            status: response.status,
            headers: response.headers,
            body,
        })
    }

    /// Resolve `url` to an absolute URL the client is willing to request
    ///
    /// Paths starting with `/` are relative to the API root. Absolute URLs
    /// must stay on the API host or a configured extra host, on the same
    /// scheme and port, under an API path.
    pub fn resolve_url(&self, url: &str) -> Result<Url> {
        if url.starts_with('/') {
            let (path, query) = match url.split_once('?') {
                Some((path, query)) => (path, Some(query)),
                None => (url, None),
            };
            let mut resolved = self.base_url.clone();
            resolved.set_path(&format!("{}{}", self.prefix, path));
            resolved.set_query(query);
            resolved.set_fragment(None);
            return Ok(resolved);
        }

        let parsed = Url::parse(url)?;
        let host = parsed.host_str().unwrap_or_default();
        let allowed_host = self.base_url.host_str() == Some(host)
            || self
                .config
                .extra_hosts
                .iter()
                .any(|h| h.eq_ignore_ascii_case(host));
        if !allowed_host {
            return Err(Error::disallowed_url(
                url,
                format!("host '{host}' is not allowed"),
            ));
        }
        if parsed.scheme() != self.base_url.scheme() {
            return Err(Error::disallowed_url(
                url,
                format!("scheme must be '{}'", self.base_url.scheme()),
            ));
        }
        if parsed.port_or_known_default() != self.base_url.port_or_known_default() {
            return Err(Error::disallowed_url(url, "port does not match the API root"));
        }

        let path = parsed.path();
        if !path.starts_with(&self.prefix)
            && !ALLOWED_PATH_PREFIXES.iter().any(|p| path.starts_with(p))
        {
            return Err(Error::disallowed_url(
                url,
                format!("path '{path}' is outside the API"),
            ));
        }

        Ok(parsed)
    }

    fn build_headers(&self, request: &RequestConfig) -> Result<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(request.headers.len() + 3);
        for (key, value) in &request.headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| Error::config(format!("invalid header name '{key}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::config(format!("invalid value for header '{key}': {e}")))?;
            headers.insert(name, value);
        }

        if self.config.user_agent.trim().is_empty() {
            return Err(Error::MissingUserAgent);
        }
        let agent = HeaderValue::from_str(&self.config.user_agent)
            .map_err(|e| Error::config(format!("invalid user agent: {e}")))?;
        headers.insert(USER_AGENT, agent);

        if request.body.is_some() && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        Ok(headers)
    }

    /// Wait until `method` may be dispatched again
    async fn defer(&self, method: &Method) {
        let wait = self
            .timing
            .reserve(method, self.config.seconds_between_requests);
        if !wait.is_zero() {
            debug!("Deferring {method} request by {wait:?}");
            tokio::time::sleep(wait).await;
        }
    }

    async fn execute_with_retry(&self, request: &TransportRequest) -> Result<RawResponse> {
        let mut ctx = RetryContext::new();

        loop {
            // stamped per attempt; app tokens can expire during a backoff
            let mut attempt = request.clone();
            self.auth.apply(&mut attempt.headers)?;

            let wait = match self.transport.execute(attempt).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => self.next_backoff(&mut ctx, request, Outcome::Response(&response))?,
                Err(err) if err.is_transport() => {
                    self.next_backoff(&mut ctx, request, Outcome::Transport(&err))?
                }
                Err(err) => return Err(err),
            };

            warn!(
                "{} {} failed, retry {}/{} in {:?}",
                request.method,
                request.url,
                ctx.attempt,
                self.policy.config().max_retries,
                wait
            );
            tokio::time::sleep(wait).await;
        }
    }

    fn next_backoff(
        &self,
        ctx: &mut RetryContext,
        request: &TransportRequest,
        outcome: Outcome<'_>,
    ) -> Result<Duration> {
        match self.policy.decide(ctx, &request.method, outcome, Utc::now()) {
            RetryDecision::Retry { after } => Ok(after),
            RetryDecision::Fatal(err) => Err(err),
            RetryDecision::Exhausted => {
                warn!(
                    "Giving up on {} {} after {} retries",
                    request.method, request.url, ctx.attempt
                );
                Err(outcome.to_error())
            }
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("auth", &self.auth)
            .field("rate_limit", &self.rate_limit_state())
            .finish_non_exhaustive()
    }
}

/// Union `params` into the URL query; caller values win on key collision
pub fn merge_params(url: &mut Url, params: &QueryParams) {
    if params.is_empty() {
        return;
    }

    let mut merged: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in url.query_pairs() {
        match merged.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value.into_owned()),
            None => merged.push((key.into_owned(), vec![value.into_owned()])),
        }
    }
    for (key, value) in params {
        let values: Vec<String> = value.values().into_iter().map(String::from).collect();
        match merged.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = values,
            None => merged.push((key.clone(), values)),
        }
    }

    url.set_query(None);
    if merged.iter().all(|(_, values)| values.is_empty()) {
        return;
    }
    let mut pairs = url.query_pairs_mut();
    for (key, values) in &merged {
        for value in values {
            pairs.append_pair(key, value);
        }
    }
}

/// Decode a successful response body
///
/// Negotiated raw/HTML/object media types are returned as text untouched,
/// with invalid UTF-8 replaced rather than rejected. Anything else is JSON;
/// an empty body means no content.
pub fn decode_body(response: &RawResponse) -> Result<Body> {
    if MediaType::from_headers(&response.headers).is_some() {
        return Ok(Body::Raw(response.text()));
    }

    let text = std::str::from_utf8(&response.body)
        .map_err(|e| Error::protocol(format!("response body is not UTF-8: {e}")))?;
    if text.is_empty() {
        return Ok(Body::Empty);
    }

    serde_json::from_str(text)
        .map(Body::Json)
        .map_err(|e| Error::protocol(format!("invalid JSON in response: {e}")))
}
