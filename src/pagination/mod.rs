//! Pagination module
//!
//! Turns a listing endpoint into a lazy, forward-only sequence of elements.
//!
//! # Overview
//!
//! [`Client::paginate`](crate::Client::paginate) returns [`Pages`], which
//! fetches one page per pull and follows `Link: <...>; rel="next"` until the
//! server stops sending one. Search-style bodies (`{"total_count", "items"}`)
//! are unwrapped, and negotiated raw/HTML content is yielded once without
//! following links.

mod link;
mod pages;
mod types;

pub use link::{next_link, parse_link_header, REL_NEXT};
pub use pages::Pages;
pub use types::{Envelope, PageCursor, PageItem};
