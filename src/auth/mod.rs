//! Authentication module
//!
//! Supports: static token, HTTP Basic, GitHub App JWT, anonymous
//!
//! Every credential scheme implements the [`Auth`] capability: it names a
//! token type and produces a token, and [`Auth::apply`] stamps the pair into
//! the `Authorization` header. [`AuthConfig`] is the serializable form used by
//! configuration files and the CLI.

mod authenticator;
mod types;

pub use authenticator::{Anonymous, AppJwt, Auth, Basic, Token};
pub use types::{AuthConfig, CachedToken};
