//! Auth configuration types

use super::authenticator::{Anonymous, AppJwt, Auth, Basic, Token};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Authentication configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication
    #[default]
    Anonymous,

    /// Personal access or OAuth token
    Token {
        /// The token value
        token: String,
    },

    /// HTTP Basic authentication
    Basic {
        /// Username
        username: String,
        /// Password
        password: String,
    },

    /// GitHub App authentication with a signed JWT
    App {
        /// App identifier (iss claim)
        app_id: String,
        /// RSA private key (PEM format)
        private_key: String,
        /// Token lifetime in seconds (capped at 600)
        #[serde(default = "default_jwt_lifetime")]
        lifetime_seconds: u64,
    },
}

fn default_jwt_lifetime() -> u64 {
    AppJwt::MAX_LIFETIME_SECS
}

impl AuthConfig {
    /// Build the credential this config describes
    pub fn build(&self) -> Result<Arc<dyn Auth>> {
        Ok(match self {
            AuthConfig::Anonymous => Arc::new(Anonymous),
            AuthConfig::Token { token } => Arc::new(Token::new(token.clone())?),
            AuthConfig::Basic { username, password } => {
                Arc::new(Basic::new(username.clone(), password.clone()))
            }
            AuthConfig::App {
                app_id,
                private_key,
                lifetime_seconds,
            } => Arc::new(
                AppJwt::from_pem(app_id.clone(), private_key.as_bytes())?
                    .with_lifetime(*lifetime_seconds),
            ),
        })
    }
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now
    pub fn expires_in(token: String, seconds: i64) -> Self {
        let expires_at = Utc::now() + chrono::Duration::seconds(seconds);
        Self {
            token,
            expires_at: Some(expires_at),
        }
    }

    /// Check if the token is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(30);
                Utc::now() + buffer >= expires_at
            }
            None => false,
        }
    }
}
