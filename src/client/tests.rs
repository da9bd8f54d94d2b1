//! Tests for the request pipeline

use super::testing::{client_with, json_response, test_config, ScriptedTransport};
use super::*;
use crate::auth::{Anonymous, Auth};
use crate::config::ClientConfig;
use crate::http::RawResponse;
use crate::types::MEDIA_RAW_JSON;
use crate::Error;
use pretty_assertions::assert_eq;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

fn client() -> Client {
    client_with(ScriptedTransport::new([]), test_config())
}

// ============================================================================
// URL Resolution
// ============================================================================

#[test]
fn test_resolve_relative_url() {
    let url = client().resolve_url("/repos/octo/hello/commits?sha=main").unwrap();
    assert_eq!(
        url.as_str(),
        "https://api.github.com/repos/octo/hello/commits?sha=main"
    );
}

#[test]
fn test_resolve_relative_url_under_prefix() {
    let config = ClientConfig::builder()
        .base_url("https://ghe.example.com/api/v3/")
        .build();
    let client = client_with(ScriptedTransport::new([]), config);

    let url = client.resolve_url("/user/repos").unwrap();
    assert_eq!(url.as_str(), "https://ghe.example.com/api/v3/user/repos");

    assert!(client
        .resolve_url("https://ghe.example.com/api/v3/user/repos?page=2")
        .is_ok());
    assert!(matches!(
        client.resolve_url("https://ghe.example.com/settings"),
        Err(Error::DisallowedUrl { .. })
    ));
}

#[test]
fn test_resolve_absolute_url_on_api_host() {
    let url = client()
        .resolve_url("https://api.github.com/repositories/1/commits?page=3")
        .unwrap();
    assert_eq!(url.query(), Some("page=3"));
}

#[test]
fn test_resolve_absolute_url_on_extra_host() {
    assert!(client()
        .resolve_url("https://uploads.github.com/repos/o/r/releases/1/assets")
        .is_ok());
}

#[test]
fn test_resolve_rejects_untrusted_host() {
    let err = client()
        .resolve_url("https://evil.example.com/repos/o/r")
        .unwrap_err();
    assert!(matches!(err, Error::DisallowedUrl { .. }));
    assert!(err.is_usage());
}

#[test]
fn test_resolve_rejects_port_and_scheme_mismatch() {
    assert!(matches!(
        client().resolve_url("https://api.github.com:8443/repos"),
        Err(Error::DisallowedUrl { .. })
    ));
    assert!(matches!(
        client().resolve_url("http://api.github.com/repos"),
        Err(Error::DisallowedUrl { .. })
    ));
}

#[test]
fn test_resolve_rejects_garbage() {
    assert!(matches!(
        client().resolve_url("not a url"),
        Err(Error::InvalidUrl(_))
    ));
}

// ============================================================================
// Parameter Merging
// ============================================================================

#[test]
fn test_merge_params_caller_wins() {
    let mut url = Url::parse("https://api.github.com/search?q=old&page=2").unwrap();
    let mut params = QueryParams::new();
    params.insert("q".to_string(), "new".into());
    params.insert("per_page".to_string(), 50u32.into());

    merge_params(&mut url, &params);
    assert_eq!(url.query(), Some("q=new&page=2&per_page=50"));
}

#[test]
fn test_merge_params_multi_valued() {
    let mut url = Url::parse("https://api.github.com/issues?labels=a&labels=b").unwrap();
    let mut params = QueryParams::new();
    params.insert("state".to_string(), vec!["open", "closed"].into());

    merge_params(&mut url, &params);
    assert_eq!(
        url.query(),
        Some("labels=a&labels=b&state=open&state=closed")
    );
}

#[test]
fn test_merge_params_empty_leaves_url_alone() {
    let mut url = Url::parse("https://api.github.com/user?x=1").unwrap();
    merge_params(&mut url, &QueryParams::new());
    assert_eq!(url.query(), Some("x=1"));
}

#[test]
fn test_param_value_from_json() {
    assert_eq!(
        ParamValue::from_json("n", &json!(5)).unwrap(),
        ParamValue::Single("5".to_string())
    );
    assert_eq!(
        ParamValue::from_json("l", &json!(["a", 1, true])).unwrap(),
        ParamValue::Multi(vec!["a".into(), "1".into(), "true".into()])
    );
    assert!(matches!(
        ParamValue::from_json("o", &json!({"a": 1})),
        Err(Error::InvalidParameter { .. })
    ));
    assert!(ParamValue::from_json("z", &json!(null)).is_err());
    assert!(ParamValue::from_json("n", &json!([[1]])).is_err());
}

// ============================================================================
// Headers
// ============================================================================

#[tokio::test]
async fn test_call_stamps_auth_and_user_agent() {
    let transport = ScriptedTransport::new([json_response(200, &json!({"login": "octocat"}))]);
    let client = client_with(transport.clone(), test_config());

    let response = client
        .get_with_config(
            "/user",
            RequestConfig::new().header("Accept", "application/vnd.github+json"),
        )
        .await
        .unwrap();
    assert_eq!(response.body, Body::Json(json!({"login": "octocat"})));

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.headers[AUTHORIZATION], "token test-token");
    assert_eq!(request.headers[USER_AGENT], "ghrest-tests");
    assert_eq!(request.headers["accept"], "application/vnd.github+json");
}

#[tokio::test]
async fn test_call_anonymous_sends_no_authorization() {
    let transport = ScriptedTransport::new([json_response(200, &json!({}))]);
    let client =
        Client::with_transport(test_config(), Arc::new(Anonymous), transport.clone()).unwrap();

    client.get("/meta").await.unwrap();
    assert!(!transport.requests()[0].headers.contains_key(AUTHORIZATION));
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let transport = ScriptedTransport::new([json_response(201, &json!({"id": 9}))]);
    let client = client_with(transport.clone(), test_config());

    let response = client
        .post("/repos/o/r/issues", json!({"title": "bug"}))
        .await
        .unwrap();
    assert_eq!(response.status, 201);

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.headers[CONTENT_TYPE], "application/json");
    assert_eq!(
        request.body.as_deref(),
        Some(br#"{"title":"bug"}"#.as_slice())
    );
}

#[test]
fn test_missing_user_agent_fails_before_network() {
    let transport = ScriptedTransport::new([]);
    let config = ClientConfig::builder().user_agent("").build();
    let result = Client::with_transport(config, Arc::new(Anonymous), transport.clone());

    assert!(matches!(result, Err(Error::MissingUserAgent)));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_disallowed_url_fails_before_network() {
    let transport = ScriptedTransport::new([]);
    let client = client_with(transport.clone(), test_config());

    let result = client.get("https://example.org/api/x").await;
    assert!(matches!(result, Err(Error::DisallowedUrl { .. })));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_invalid_header_is_usage_error() {
    let transport = ScriptedTransport::new([]);
    let client = client_with(transport.clone(), test_config());

    let result = client
        .get_with_config("/user", RequestConfig::new().header("bad header", "x"))
        .await;
    assert!(matches!(result, Err(Error::Config { .. })));
    assert_eq!(transport.request_count(), 0);
}

// ============================================================================
// Rate Limit State
// ============================================================================

#[tokio::test]
async fn test_rate_limit_state_starts_unknown_and_updates() {
    let transport = ScriptedTransport::new([Ok(RawResponse::new(200)
        .with_header("x-ratelimit-remaining", "4999")
        .with_header("x-ratelimit-limit", "5000.0")
        .with_header("X-RateLimit-Reset", "1700000000")
        .with_body("{}"))]);
    let client = client_with(transport, test_config());

    assert_eq!(client.rate_limiting(), (-1, -1));
    assert_eq!(client.rate_limiting_resettime(), 0);
    assert!(!client.rate_limit_state().is_known());

    client.get("/user").await.unwrap();

    assert_eq!(client.rate_limiting(), (4999, 5000));
    assert_eq!(client.rate_limiting_resettime(), 1_700_000_000);
}

#[tokio::test]
async fn test_rate_limit_state_needs_both_counters() {
    let transport = ScriptedTransport::new([Ok(RawResponse::new(200)
        .with_header("x-ratelimit-remaining", "10")
        .with_body("{}"))]);
    let client = client_with(transport, test_config());

    client.get("/user").await.unwrap();
    assert_eq!(client.rate_limiting(), (-1, -1));
}

#[tokio::test]
async fn test_rate_limit_state_shared_between_clones() {
    let transport = ScriptedTransport::new([Ok(RawResponse::new(200)
        .with_header("x-ratelimit-remaining", "1")
        .with_header("x-ratelimit-limit", "60")
        .with_body("[]"))]);
    let client = client_with(transport, test_config());
    let other = client.clone();

    client.get("/events").await.unwrap();
    assert_eq!(other.rate_limiting(), (1, 60));
}

// ============================================================================
// Body Decoding
// ============================================================================

#[test]
fn test_decode_raw_media_type_is_untouched() {
    let response = RawResponse::new(200)
        .with_header("content-type", MEDIA_RAW_JSON)
        .with_body("# README\nnot json");
    assert_eq!(
        decode_body(&response).unwrap(),
        Body::Raw("# README\nnot json".to_string())
    );
}

#[test]
fn test_decode_empty_body() {
    assert_eq!(decode_body(&RawResponse::new(204)).unwrap(), Body::Empty);
}

#[test]
fn test_decode_malformed_json_is_protocol_error() {
    let response = RawResponse::new(200).with_body("{\"unterminated\": ");
    assert!(matches!(
        decode_body(&response),
        Err(Error::Protocol { .. })
    ));
}

#[test]
fn test_decode_invalid_utf8_is_protocol_error() {
    let response = RawResponse::new(200).with_body(vec![0xff, 0xfe]);
    assert!(matches!(
        decode_body(&response),
        Err(Error::Protocol { .. })
    ));
}

#[test]
fn test_decode_binary_raw_payload_is_not_rejected() {
    let response = RawResponse::new(200)
        .with_header("content-type", MEDIA_RAW_JSON)
        .with_body(vec![0x89, b'P', b'N', b'G', 0xff, 0x00]);

    match decode_body(&response).unwrap() {
        Body::Raw(text) => {
            assert!(text.contains("PNG"));
            assert!(text.contains('\u{FFFD}'));
        }
        other => panic!("Expected Raw body, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_json_is_not_retried() {
    let transport = ScriptedTransport::new([Ok(RawResponse::new(200).with_body("nope"))]);
    let client = client_with(transport.clone(), test_config());

    assert!(matches!(
        client.get("/user").await,
        Err(Error::Protocol { .. })
    ));
    assert_eq!(transport.request_count(), 1);
}

// ============================================================================
// Errors and Retries
// ============================================================================

#[tokio::test]
async fn test_api_error_carries_status_and_body() {
    let transport = ScriptedTransport::new([json_response(404, &json!({"message": "Not Found"}))]);
    let client = client_with(transport.clone(), test_config());

    match client.get("/repos/o/missing").await {
        Err(Error::Api { status, body }) => {
            assert_eq!(status, 404);
            assert_eq!(body, r#"{"message":"Not Found"}"#);
        }
        other => panic!("Expected Api error, got {other:?}"),
    }
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transient_error_then_success() {
    let transport = ScriptedTransport::new([
        Ok(RawResponse::new(502)),
        json_response(200, &json!({"ok": true})),
    ]);
    let client = client_with(transport.clone(), test_config());

    let response = client.get("/user").await.unwrap();
    assert_eq!(response.body, Body::Json(json!({"ok": true})));
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_surface_last_error() {
    let transport = ScriptedTransport::new([
        Ok(RawResponse::new(500).with_body("first")),
        Ok(RawResponse::new(503).with_body("second")),
        Ok(RawResponse::new(500).with_body("last")),
    ]);
    let client = client_with(transport.clone(), test_config());

    match client.get("/user").await {
        Err(Error::Api { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "last");
        }
        other => panic!("Expected Api error, got {other:?}"),
    }
    // one attempt plus max_retries (2)
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_transport_errors_exhausted_become_connection_error() {
    let transport = ScriptedTransport::new([
        Err(Error::connection("reset")),
        Err(Error::Timeout { timeout_ms: 15000 }),
        Err(Error::connection("refused")),
    ]);
    let client = client_with(transport.clone(), test_config());

    match client.get("/user").await {
        Err(Error::Connection { message }) => assert!(message.contains("refused")),
        other => panic!("Expected Connection error, got {other:?}"),
    }
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_primary_rate_limit_sleeps_until_reset() {
    let reset = chrono::Utc::now().timestamp() + 5;
    let transport = ScriptedTransport::new([
        Ok(RawResponse::new(403)
            .with_header("X-RateLimit-Reset", &reset.to_string())
            .with_body(r#"{"message":"API rate limit exceeded for 1.2.3.4."}"#)),
        json_response(200, &json!([])),
    ]);
    let client = client_with(transport.clone(), test_config());

    let start = Instant::now();
    client.get("/events").await.unwrap();

    assert!(start.elapsed() >= Duration::from_secs(5));
    assert!(start.elapsed() <= Duration::from_secs(7));
    assert_eq!(transport.request_count(), 2);
}

/// Issues a new token on every call, like a short-lived app credential
#[derive(Debug, Default)]
struct RotatingAuth {
    issued: AtomicU32,
}

impl Auth for RotatingAuth {
    fn token_type(&self) -> &str {
        "Bearer"
    }

    fn token(&self) -> crate::Result<String> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("jwt-{n}"))
    }
}

#[tokio::test(start_paused = true)]
async fn test_credentials_restamped_after_long_backoff() {
    let reset = chrono::Utc::now().timestamp() + 3000;
    let transport = ScriptedTransport::new([
        Ok(RawResponse::new(403)
            .with_header("X-RateLimit-Reset", &reset.to_string())
            .with_body(r#"{"message":"API rate limit exceeded for installation."}"#)),
        json_response(200, &json!([])),
    ]);
    let auth = Arc::new(RotatingAuth::default());
    let client =
        Client::with_transport(test_config(), auth.clone(), transport.clone()).unwrap();

    let start = Instant::now();
    client.get("/installation/repositories").await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(2999));

    let requests = transport.requests();
    assert_eq!(requests[0].headers[AUTHORIZATION], "Bearer jwt-1");
    assert_eq!(requests[1].headers[AUTHORIZATION], "Bearer jwt-2");
    assert_eq!(auth.issued.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_secondary_rate_limit_sleeps_configured_wait() {
    let transport = ScriptedTransport::new([
        Ok(RawResponse::new(403)
            .with_body(r#"{"message":"You have exceeded a secondary rate limit."}"#)),
        json_response(200, &json!([])),
    ]);
    let config = ClientConfig {
        retry: crate::retry::RetryConfig {
            secondary_rate_wait: Duration::from_secs(30),
            ..test_config().retry
        },
        ..test_config()
    };
    let client = client_with(transport.clone(), config);

    let start = Instant::now();
    client.get("/events").await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_forbidden_permission_error_does_not_sleep() {
    let transport = ScriptedTransport::new([Ok(RawResponse::new(403)
        .with_body(r#"{"message":"Resource not accessible by integration"}"#))]);
    let client = client_with(transport.clone(), test_config());

    let start = Instant::now();
    let result = client.get("/repos/o/r/hooks").await;

    assert!(matches!(result, Err(Error::Api { status: 403, .. })));
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_unclassifiable_forbidden() {
    let transport =
        ScriptedTransport::new([Ok(RawResponse::new(403).with_body("<h1>Forbidden</h1>"))]);
    let client = client_with(transport, test_config());

    assert!(matches!(
        client.get("/user").await,
        Err(Error::Classification { status: 403, .. })
    ));
}

// ============================================================================
// Request Spacing
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_same_method_requests_are_spaced() {
    let transport = ScriptedTransport::new([
        json_response(200, &json!({})),
        json_response(200, &json!({})),
    ]);
    let config = ClientConfig {
        seconds_between_requests: Duration::from_secs(2),
        ..test_config()
    };
    let client = client_with(transport, config);

    let start = Instant::now();
    client.get("/a").await.unwrap();
    assert_eq!(start.elapsed(), Duration::ZERO);

    tokio::time::advance(Duration::from_millis(500)).await;
    client.get("/b").await.unwrap();

    // second call waits for the remaining 1.5s
    assert!(start.elapsed() >= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_different_methods_are_not_spaced() {
    let transport = ScriptedTransport::new([
        json_response(200, &json!({})),
        json_response(201, &json!({})),
    ]);
    let config = ClientConfig {
        seconds_between_requests: Duration::from_secs(2),
        ..test_config()
    };
    let client = client_with(transport, config);

    let start = Instant::now();
    client.get("/a").await.unwrap();
    client.post("/b", json!({})).await.unwrap();
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_request_timing_reserve() {
    let timing = RequestTiming::new();
    let spacing = Duration::from_secs(1);

    assert_eq!(timing.reserve(&Method::GET, spacing), Duration::ZERO);
    assert_eq!(timing.reserve(&Method::GET, spacing), spacing);
    // the reserved slot is already one second out, so a third caller waits two
    assert_eq!(timing.reserve(&Method::GET, spacing), spacing * 2);
    assert_eq!(timing.reserve(&Method::PUT, spacing), Duration::ZERO);
    assert!(timing.last_dispatch(&Method::DELETE).is_none());
}
