//! Credential schemes
//!
//! Handles stamping the `Authorization` header and, for app credentials,
//! signing and caching short-lived JWTs.

use super::types::CachedToken;
use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Serialize;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Capability shared by every credential scheme
///
/// Implementations must be idempotent: applying the same credential twice
/// leaves the same `Authorization` header behind.
pub trait Auth: Send + Sync + fmt::Debug {
    /// The scheme word placed before the token, e.g. `token` or `Bearer`
    fn token_type(&self) -> &str;

    /// The token as used in the `Authorization` header
    fn token(&self) -> Result<String>;

    /// Add authorization to the headers
    fn apply(&self, headers: &mut HeaderMap) -> Result<()> {
        let raw = format!("{} {}", self.token_type(), self.token()?);
        let mut value = HeaderValue::from_str(&raw)
            .map_err(|e| Error::auth(format!("invalid Authorization header value: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}

// ============================================================================
// Anonymous
// ============================================================================

/// No credentials; requests are sent unauthenticated
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl Auth for Anonymous {
    fn token_type(&self) -> &str {
        ""
    }

    fn token(&self) -> Result<String> {
        Ok(String::new())
    }

    fn apply(&self, _headers: &mut HeaderMap) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Static Token
// ============================================================================

/// A single constant token (personal access token, OAuth token)
#[derive(Clone)]
pub struct Token {
    token: String,
}

impl Token {
    /// Create a token credential; the token must not be empty
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::auth("token must not be empty"));
        }
        Ok(Self { token })
    }
}

impl Auth for Token {
    fn token_type(&self) -> &str {
        "token"
    }

    fn token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token").finish_non_exhaustive()
    }
}

// ============================================================================
// Basic
// ============================================================================

/// HTTP Basic credentials
#[derive(Clone)]
pub struct Basic {
    username: String,
    password: String,
}

impl Basic {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Auth for Basic {
    fn token_type(&self) -> &str {
        "Basic"
    }

    fn token(&self) -> Result<String> {
        Ok(STANDARD.encode(format!("{}:{}", self.username, self.password)))
    }
}

impl fmt::Debug for Basic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Basic")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// GitHub App JWT
// ============================================================================

#[derive(Debug, Serialize)]
struct AppClaims<'a> {
    iat: i64,
    exp: i64,
    iss: &'a str,
}

/// GitHub App credentials: an RS256-signed JWT issued for the app id
///
/// Tokens are cached and re-signed once they come within 30 seconds of expiry.
pub struct AppJwt {
    app_id: String,
    key: EncodingKey,
    lifetime_seconds: u64,
    cached: Mutex<Option<CachedToken>>,
}

impl AppJwt {
    /// Longest lifetime the API accepts for an app JWT
    pub const MAX_LIFETIME_SECS: u64 = 600;

    /// Clock drift allowance applied to `iat`
    const ISSUED_AT_LEEWAY_SECS: i64 = 60;

    /// Create app credentials from an RSA private key in PEM format
    pub fn from_pem(app_id: impl Into<String>, private_key: &[u8]) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(private_key)
            .map_err(|e| Error::auth(format!("invalid private key: {e}")))?;
        Ok(Self {
            app_id: app_id.into(),
            key,
            lifetime_seconds: Self::MAX_LIFETIME_SECS,
            cached: Mutex::new(None),
        })
    }

    /// Set the token lifetime, capped at [`Self::MAX_LIFETIME_SECS`]
    #[must_use]
    pub fn with_lifetime(mut self, seconds: u64) -> Self {
        self.lifetime_seconds = seconds.clamp(1, Self::MAX_LIFETIME_SECS);
        self
    }

    fn sign(&self) -> Result<CachedToken> {
        let now = Utc::now().timestamp();
        #[allow(clippy::cast_possible_wrap)]
        let lifetime = self.lifetime_seconds as i64;
        let claims = AppClaims {
            iat: now - Self::ISSUED_AT_LEEWAY_SECS,
            exp: now + lifetime,
            iss: &self.app_id,
        };

        let jwt = encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| Error::auth(format!("failed to sign JWT: {e}")))?;

        Ok(CachedToken::expires_in(jwt, lifetime))
    }
}

impl Auth for AppJwt {
    fn token_type(&self) -> &str {
        "Bearer"
    }

    fn token(&self) -> Result<String> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }

        let fresh = self.sign()?;
        let jwt = fresh.token.clone();
        *cached = Some(fresh);
        Ok(jwt)
    }
}

impl fmt::Debug for AppJwt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppJwt")
            .field("app_id", &self.app_id)
            .field("lifetime_seconds", &self.lifetime_seconds)
            .finish_non_exhaustive()
    }
}
