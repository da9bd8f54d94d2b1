//! HTTP transport module
//!
//! Defines the boundary between the request pipeline and the network.
//!
//! # Features
//!
//! - **Pluggable**: anything implementing [`Transport`] can carry requests
//! - **Pooling**: [`ReqwestTransport`] keeps idle connections per host
//! - **No redirects**: redirects are surfaced, never followed silently
//! - **Timeouts**: per-call timeout reported as [`crate::Error::Timeout`]

mod transport;

pub use transport::{RawResponse, ReqwestTransport, Transport, TransportRequest};
