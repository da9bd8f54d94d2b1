//! `Link` header parsing
//!
//! Format: `<https://api.github.com/...?page=2>; rel="next", <...>; rel="last"`

use crate::types::HEADER_LINK;
use reqwest::header::HeaderMap;
use std::collections::HashMap;

/// Relation that continues a listing
pub const REL_NEXT: &str = "next";

/// Parse a `Link` header into a map of relation name to URL
///
/// Entries missing either the `<url>` or the `rel="..."` segment are skipped.
/// A relation that appears twice keeps its last URL.
pub fn parse_link_header(header: &str) -> HashMap<String, String> {
    let mut links = HashMap::new();

    for entry in header.split(", ") {
        let mut segments = entry.trim().split("; ");

        let Some(url) = segments
            .next()
            .and_then(|s| s.trim().strip_prefix('<'))
            .and_then(|s| s.strip_suffix('>'))
        else {
            continue;
        };

        let rel = segments.find_map(|s| {
            s.trim()
                .strip_prefix("rel=")
                .map(|v| v.trim_matches('"'))
        });

        if let Some(rel) = rel.filter(|r| !r.is_empty()) {
            links.insert(rel.to_string(), url.to_string());
        }
    }

    links
}

/// URL of the `next` relation in the response headers, if any
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(HEADER_LINK)?.to_str().ok()?;
    parse_link_header(header).remove(REL_NEXT)
}
