//! Error types for ghrest
//!
//! This module defines the error hierarchy for the whole client.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! The variants fall into four groups that callers can branch on:
//! usage/configuration errors (raised before any network activity),
//! transport errors, server-reported errors (status and body kept verbatim),
//! and classification failures from the retry policy.

use thiserror::Error;

/// The main error type for ghrest
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Usage / Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("A User-Agent is required by the API but none is configured")]
    MissingUserAgent,

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Refusing to request '{url}': {reason}")]
    DisallowedUrl { url: String, reason: String },

    #[error("Invalid value for parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    // ============================================================================
    // Transport Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Connection failed: {message}")]
    Connection { message: String },

    // ============================================================================
    // Server-Reported Errors
    // ============================================================================
    #[error("HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Malformed response from server: {message}")]
    Protocol { message: String },

    #[error("Could not classify HTTP {status} failure: {reason}")]
    Classification { status: u16, reason: String },
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a disallowed URL error
    pub fn disallowed_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DisallowedUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create an API status error
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a classification error
    pub fn classification(status: u16, reason: impl Into<String>) -> Self {
        Self::Classification {
            status,
            reason: reason.into(),
        }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// HTTP status carried by this error, if the server produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } | Error::Classification { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the failure happened below HTTP semantics
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Timeout { .. } | Error::Connection { .. }
        )
    }

    /// Whether the error was raised before any network activity
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::Config { .. }
                | Error::MissingUserAgent
                | Error::InvalidUrl(_)
                | Error::DisallowedUrl { .. }
                | Error::InvalidParameter { .. }
        )
    }
}

/// Result type alias for ghrest
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::api(404, "Not found");
        assert_eq!(err.to_string(), "HTTP 404: Not found");

        let err = Error::classification(403, "body is not JSON");
        assert_eq!(
            err.to_string(),
            "Could not classify HTTP 403 failure: body is not JSON"
        );
    }

    #[test]
    fn test_status() {
        assert_eq!(Error::api(422, "").status(), Some(422));
        assert_eq!(Error::classification(403, "").status(), Some(403));
        assert_eq!(Error::protocol("bad").status(), None);
        assert_eq!(Error::MissingUserAgent.status(), None);
    }

    #[test]
    fn test_error_groups() {
        assert!(Error::connection("refused").is_transport());
        assert!(Error::Timeout { timeout_ms: 100 }.is_transport());
        assert!(!Error::api(500, "").is_transport());

        assert!(Error::MissingUserAgent.is_usage());
        assert!(Error::disallowed_url("https://evil.example", "host").is_usage());
        assert!(Error::invalid_parameter("q", "object").is_usage());
        assert!(!Error::api(403, "").is_usage());
    }
}
