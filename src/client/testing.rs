//! In-memory transport for pipeline and pagination tests

use crate::auth::{Auth, Token};
use crate::client::Client;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::{RawResponse, Transport, TransportRequest};
use crate::retry::RetryConfig;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replays a fixed script of responses and records every request
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<RawResponse>>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(responses: impl IntoIterator<Item = Result<RawResponse>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|r| r.url.to_string())
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: TransportRequest) -> Result<RawResponse> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::config("scripted transport ran out of responses")))
    }
}

/// Config with no spacing and a small, fast retry budget
pub(crate) fn test_config() -> ClientConfig {
    ClientConfig::builder()
        .user_agent("ghrest-tests")
        .no_spacing()
        .retry(RetryConfig {
            max_retries: 2,
            backoff_factor: Duration::from_millis(10),
            ..Default::default()
        })
        .build()
}

pub(crate) fn test_auth() -> Arc<dyn Auth> {
    Arc::new(Token::new("test-token").unwrap())
}

pub(crate) fn client_with(transport: Arc<ScriptedTransport>, config: ClientConfig) -> Client {
    Client::with_transport(config, test_auth(), transport).unwrap()
}

pub(crate) fn json_response(status: u16, body: &serde_json::Value) -> Result<RawResponse> {
    Ok(RawResponse::new(status)
        .with_header("content-type", "application/json; charset=utf-8")
        .with_body(body.to_string()))
}
