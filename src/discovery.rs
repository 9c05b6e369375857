//! # Discovery
//! Fetches one catalog page. This is the only upstream whose failure fails
//! the whole request: there is no partial discovery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;

use crate::catalog::{CatalogItem, PageRequest};
use crate::fetch::{FetchError, SharedFetcher, DEFAULT_TIMEOUT};

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org";

/// Movies released before this date are never listed.
const RELEASED_AFTER: &str = "2010-10-12";

/// Discovery failed; carries the status the request boundary should answer with.
#[derive(Debug, Clone, thiserror::Error)]
#[error("discovery failed (upstream status {status}): {message}")]
pub struct DiscoveryError {
    pub status: StatusCode,
    pub message: String,
}

impl DiscoveryError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<FetchError> for DiscoveryError {
    fn from(e: FetchError) -> Self {
        let status = match &e {
            FetchError::Http { status, .. } => *status,
            FetchError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            FetchError::Network { .. } => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, e.to_string())
    }
}

#[async_trait]
pub trait Discovery: Send + Sync {
    async fn discover(&self, req: &PageRequest) -> Result<Vec<CatalogItem>, DiscoveryError>;
}

#[derive(Debug, Deserialize)]
struct DiscoverPage {
    #[serde(default)]
    results: Vec<CatalogItem>,
}

/// TMDB `discover/movie`: English-language releases, most voted first.
pub struct TmdbDiscovery {
    fetcher: SharedFetcher,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl TmdbDiscovery {
    pub fn new(fetcher: SharedFetcher, api_key: &str) -> Self {
        Self {
            fetcher,
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn page_url(&self, req: &PageRequest) -> Result<Url, DiscoveryError> {
        let page = req.page.to_string();
        Url::parse_with_params(
            &format!("{}/3/discover/movie", self.base_url),
            &[
                ("api_key", self.api_key.as_str()),
                ("language", "en-US"),
                ("page", page.as_str()),
                ("with_original_language", "en"),
                ("sort_by", "vote_count.desc"),
                ("with_genres", req.genre_param()),
                ("primary_release_date.gte", RELEASED_AFTER),
            ],
        )
        .map_err(|e| DiscoveryError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }
}

#[async_trait]
impl Discovery for TmdbDiscovery {
    async fn discover(&self, req: &PageRequest) -> Result<Vec<CatalogItem>, DiscoveryError> {
        let url = self.page_url(req)?;
        let resp = self.fetcher.fetch(url.as_str(), self.timeout).await?;
        let page: DiscoverPage = resp.json().map_err(|e| {
            DiscoveryError::new(
                StatusCode::BAD_GATEWAY,
                format!("undecodable discovery page: {e}"),
            )
        })?;
        Ok(page.results)
    }
}
