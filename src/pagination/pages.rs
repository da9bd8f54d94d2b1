//! Lazy page sequence
//!
//! [`Pages`] fetches one page per pull and follows the `next` relation of the
//! `Link` header until the server stops sending one. Nothing is prefetched,
//! so rate-limit counters stay current at every step.

use super::link::next_link;
use super::types::{Envelope, PageCursor, PageItem};
use crate::client::{Client, RequestConfig};
use crate::error::Result;
use crate::types::DEFAULT_PER_PAGE;
use futures::stream::{self, Stream};
use reqwest::Method;
use std::collections::VecDeque;
use tracing::debug;

/// Single-pass sequence over every element of a listing
#[derive(Debug)]
pub struct Pages {
    client: Client,
    cursor: PageCursor,
    buffer: VecDeque<PageItem>,
    total_count: Option<u64>,
    pages_fetched: u32,
}

impl Pages {
    pub(crate) fn new(client: Client, cursor: PageCursor) -> Self {
        Self {
            client,
            cursor,
            buffer: VecDeque::new(),
            total_count: None,
            pages_fetched: 0,
        }
    }

    /// Pull the next item, fetching a page when the buffer runs dry
    ///
    /// Returns `None` once the listing is finished. An error ends the
    /// sequence; the failed page is not retried by later pulls.
    pub async fn next(&mut self) -> Option<Result<PageItem>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            let url = self.cursor.next_url.take()?;
            if let Err(e) = self.fetch_page(&url).await {
                return Some(Err(e));
            }
        }
    }

    async fn fetch_page(&mut self, url: &str) -> Result<()> {
        let request = RequestConfig {
            params: std::mem::take(&mut self.cursor.pending_params),
            headers: self.cursor.headers.clone(),
            body: None,
        };

        let response = self.client.call(Method::GET, url, request).await?;
        self.pages_fetched += 1;

        match Envelope::from_body(response.body)? {
            Envelope::Raw(text) => {
                debug!("Raw content from {url}, not paginating");
                self.buffer.push_back(PageItem::Raw(text));
            }
            Envelope::List { items, total_count } => {
                if total_count.is_some() {
                    self.total_count = total_count;
                }
                self.buffer.extend(
                    items
                        .into_iter()
                        .filter(|item| !item.is_null())
                        .map(PageItem::Element),
                );
                self.cursor.next_url = next_link(&response.headers);
                debug!(
                    "Page {} of {url}: {} items, next: {:?}",
                    self.pages_fetched,
                    self.buffer.len(),
                    self.cursor.next_url
                );
            }
        }

        Ok(())
    }

    /// Drain the remaining items
    pub async fn collect_all(mut self) -> Result<Vec<PageItem>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await {
            items.push(item?);
        }
        Ok(items)
    }

    /// Turn the sequence into a [`Stream`]
    pub fn into_stream(self) -> impl Stream<Item = Result<PageItem>> {
        stream::unfold(self, |mut pages| async move {
            pages.next().await.map(|item| (item, pages))
        })
    }

    /// `total_count` of the last search-style page, if any
    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Whether another page remains to be fetched
    pub fn has_next_page(&self) -> bool {
        !self.cursor.is_terminal()
    }

    /// Whether the sequence will yield nothing more
    pub fn is_exhausted(&self) -> bool {
        self.buffer.is_empty() && self.cursor.is_terminal()
    }
}

impl Client {
    /// Lazily iterate every element of a listing endpoint
    ///
    /// `request.params` go on the first fetch only; later pages follow the
    /// `next` link, which already carries the full query. `per_page` is added
    /// when the configured page size differs from the API default, unless
    /// the caller set it. Headers are sent with every fetch.
    pub fn paginate(&self, url: &str, request: RequestConfig) -> Pages {
        let mut params = request.params;
        let per_page = self.config().per_page;
        if per_page != DEFAULT_PER_PAGE {
            params
                .entry("per_page".to_string())
                .or_insert_with(|| per_page.into());
        }

        Pages::new(
            self.clone(),
            PageCursor::start(url, params, request.headers),
        )
    }
}
