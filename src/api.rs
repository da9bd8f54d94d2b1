//! Endpoint callers
//!
//! Thin wrappers that validate arguments, build the query and hand the
//! listing to [`Client::paginate`].

use crate::client::{Client, RequestConfig};
use crate::error::{Error, Result};
use crate::pagination::Pages;
use crate::types::MediaType;
use chrono::NaiveDateTime;
use reqwest::header::ACCEPT;
use std::str::FromStr;

/// Timestamp format accepted by the `since`/`until` commit filters
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Sort key for repository search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSort {
    Stars,
    Forks,
    Updated,
}

impl SearchSort {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchSort::Stars => "stars",
            SearchSort::Forks => "forks",
            SearchSort::Updated => "updated",
        }
    }
}

impl FromStr for SearchSort {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "stars" => Ok(SearchSort::Stars),
            "forks" => Ok(SearchSort::Forks),
            "updated" => Ok(SearchSort::Updated),
            other => Err(Error::invalid_parameter(
                "sort",
                format!("'{other}' is not one of stars, forks, updated"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(Error::invalid_parameter(
                "order",
                format!("'{other}' is not one of asc, desc"),
            )),
        }
    }
}

/// Optional filters for listing commits
#[derive(Debug, Clone, Default)]
pub struct CommitFilter {
    /// Branch or SHA to start from
    pub sha: Option<String>,
    /// Only commits touching this path
    pub path: Option<String>,
    pub author: Option<String>,
    pub committer: Option<String>,
    /// `YYYY-MM-DDTHH:MM:SSZ`
    pub since: Option<String>,
    /// `YYYY-MM-DDTHH:MM:SSZ`
    pub until: Option<String>,
}

impl CommitFilter {
    fn into_request(self) -> Result<RequestConfig> {
        for (name, value) in [("since", &self.since), ("until", &self.until)] {
            if let Some(value) = value {
                check_timestamp(name, value)?;
            }
        }

        let mut request = RequestConfig::new();
        for (name, value) in [
            ("sha", self.sha),
            ("path", self.path),
            ("author", self.author),
            ("committer", self.committer),
            ("since", self.since),
            ("until", self.until),
        ] {
            if let Some(value) = value {
                request = request.query(name, value);
            }
        }
        Ok(request)
    }
}

fn check_timestamp(name: &str, value: &str) -> Result<()> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|_| ())
        .map_err(|e| {
            Error::invalid_parameter(name, format!("'{value}' is not YYYY-MM-DDTHH:MM:SSZ: {e}"))
        })
}

fn check_segment(name: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.contains('/') {
        return Err(Error::invalid_parameter(
            name,
            format!("'{value}' is not a valid name"),
        ));
    }
    Ok(())
}

impl Client {
    /// `GET /search/repositories`
    ///
    /// `q` is `query` followed by each `qualifier:value`, space separated,
    /// and must not end up empty.
    pub fn search_repositories(
        &self,
        query: &str,
        sort: Option<SearchSort>,
        order: Option<SortOrder>,
        qualifiers: &[(&str, &str)],
    ) -> Result<Pages> {
        let q = std::iter::once(query.trim().to_string())
            .filter(|s| !s.is_empty())
            .chain(qualifiers.iter().map(|(k, v)| format!("{k}:{v}")))
            .collect::<Vec<_>>()
            .join(" ");
        if q.is_empty() {
            return Err(Error::invalid_parameter(
                "q",
                "need a query or at least one qualifier",
            ));
        }

        let mut request = RequestConfig::new().query("q", q);
        if let Some(sort) = sort {
            request = request.query("sort", sort.as_str());
        }
        if let Some(order) = order {
            request = request.query("order", order.as_str());
        }
        Ok(self.paginate("/search/repositories", request))
    }

    /// `GET /repos/{owner}/{repo}/commits`
    pub fn commits(&self, owner: &str, repo: &str, filter: CommitFilter) -> Result<Pages> {
        check_segment("owner", owner)?;
        check_segment("repo", repo)?;
        let request = filter.into_request()?;
        Ok(self.paginate(&format!("/repos/{owner}/{repo}/commits"), request))
    }

    /// `GET /repos/{owner}/{repo}/contents/{path}`
    ///
    /// With a negotiated `media` type the sequence yields the payload once
    /// as [`PageItem::Raw`](crate::pagination::PageItem::Raw). Directory
    /// listings yield one element per entry.
    pub fn contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
        media: Option<MediaType>,
    ) -> Result<Pages> {
        check_segment("owner", owner)?;
        check_segment("repo", repo)?;

        let mut request = RequestConfig::new();
        if let Some(git_ref) = git_ref {
            request = request.query("ref", git_ref);
        }
        if let Some(media) = media {
            request = request.header(ACCEPT.as_str(), media.as_str());
        }
        let path = path.trim_start_matches('/');
        Ok(self.paginate(&format!("/repos/{owner}/{repo}/contents/{path}"), request))
    }
}
