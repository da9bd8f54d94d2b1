//! Pagination types
//!
//! Defines the cursor, the items a listing yields and the body shapes a page
//! can come back in.

use crate::client::{Body, QueryParams};
use crate::error::{Error, Result};
use crate::types::JsonValue;
use std::collections::HashMap;

/// Minimal state needed to fetch the next page
///
/// `next_url` is taken when a page is fetched, so a consumed URL is never
/// requested twice. `None` means the listing is finished.
#[derive(Debug, Clone, Default)]
pub struct PageCursor {
    /// URL of the page to fetch next
    pub next_url: Option<String>,
    /// Parameters sent with the next fetch only
    pub pending_params: QueryParams,
    /// Headers sent with every fetch
    pub headers: HashMap<String, String>,
}

impl PageCursor {
    /// Cursor positioned at the first page
    pub fn start(
        url: impl Into<String>,
        params: QueryParams,
        headers: HashMap<String, String>,
    ) -> Self {
        Self {
            next_url: Some(url.into()),
            pending_params: params,
            headers,
        }
    }

    /// Whether no further page will be fetched
    pub fn is_terminal(&self) -> bool {
        self.next_url.is_none()
    }
}

/// One item produced by a listing
#[derive(Debug, Clone, PartialEq)]
pub enum PageItem {
    /// An element of a JSON listing
    Element(JsonValue),
    /// A negotiated raw/HTML payload, produced once
    Raw(String),
}

impl PageItem {
    pub fn is_raw(&self) -> bool {
        matches!(self, PageItem::Raw(_))
    }

    /// Convert into JSON; raw payloads become a JSON string
    pub fn into_json(self) -> JsonValue {
        match self {
            PageItem::Element(v) => v,
            PageItem::Raw(text) => JsonValue::String(text),
        }
    }
}

/// Shape of a page body
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// A listing; `total_count` is set for search-style wrappers
    List {
        items: Vec<JsonValue>,
        total_count: Option<u64>,
    },
    /// Negotiated raw content, never paginated
    Raw(String),
}

impl Envelope {
    /// Detect the shape of a decoded body
    ///
    /// - `{"items": [...], "total_count": n}` unwraps to its items
    /// - an array is used as is
    /// - an empty body or `null` is an empty page
    /// - any other JSON value is a single element
    pub fn from_body(body: Body) -> Result<Self> {
        let value = match body {
            Body::Raw(text) => return Ok(Envelope::Raw(text)),
            Body::Empty => return Ok(Self::empty()),
            Body::Json(value) => value,
        };

        match value {
            JsonValue::Array(items) => Ok(Envelope::List {
                items,
                total_count: None,
            }),
            JsonValue::Null => Ok(Self::empty()),
            JsonValue::Object(mut map) if map.contains_key("items") => {
                let total_count = map.get("total_count").and_then(JsonValue::as_u64);
                match map.remove("items") {
                    Some(JsonValue::Array(items)) => Ok(Envelope::List { items, total_count }),
                    Some(JsonValue::Null) | None => Ok(Envelope::List {
                        items: Vec::new(),
                        total_count,
                    }),
                    Some(other) => Err(Error::protocol(format!(
                        "expected 'items' to be an array, got {}",
                        json_kind(&other)
                    ))),
                }
            }
            other => Ok(Envelope::List {
                items: vec![other],
                total_count: None,
            }),
        }
    }

    fn empty() -> Self {
        Envelope::List {
            items: Vec::new(),
            total_count: None,
        }
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
