//! Request pipeline module
//!
//! Executes one logical API call on top of the transport and retry policy,
//! and owns the state shared by every call of a client: the server-reported
//! rate-limit counters and the per-method dispatch timestamps.

mod pipeline;
mod types;

pub use pipeline::{decode_body, merge_params, Client};
pub use types::{
    ApiResponse, Body, ParamValue, QueryParams, RateLimitState, RequestConfig, RequestTiming,
};

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests;
