// src/ratings/providers/letterboxd.rs
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog::CatalogItem;
use crate::fetch::{SharedFetcher, SCRAPE_TIMEOUT};
use crate::observe::SharedObserver;
use crate::ratings::types::{AdapterError, Rating, RatingSource, RatingValue, Scale};
use crate::ratings::{settle, LETTERBOXD};

pub const DEFAULT_BASE_URL: &str = "https://letterboxd.com";

static RE_RATING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<meta name="twitter:data2" content="([\d.]+) out of 5"\s*/?>"#)
        .expect("letterboxd rating regex")
});

/// Scrapes the average rating out of the film page's twitter meta tag.
pub struct LetterboxdSource {
    fetcher: SharedFetcher,
    observer: SharedObserver,
    base_url: String,
    timeout: Duration,
}

impl LetterboxdSource {
    pub fn new(fetcher: SharedFetcher, observer: SharedObserver) -> Self {
        Self {
            fetcher,
            observer,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: SCRAPE_TIMEOUT,
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

    /// Letterboxd resolves discovery ids directly: `/tmdb/{id}/`.
    pub fn page_url(&self, item: &CatalogItem) -> String {
        format!("{}/tmdb/{}/", self.base_url, item.id)
    }

    async fn lookup(&self, item: &CatalogItem) -> Result<Rating, AdapterError> {
        let resp = self.fetcher.fetch(&self.page_url(item), self.timeout).await?;
        extract_rating(&resp.body)
    }
}

/// `"3.87 out of 5"` → `3.87`, verbatim text kept.
pub fn extract_rating(html: &str) -> Result<Rating, AdapterError> {
    let raw = RE_RATING
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or(AdapterError::PatternNotFound)?;
    Rating::parse(raw, Scale::OutOf5).ok_or_else(|| AdapterError::Parse(raw.to_string()))
}

#[async_trait]
impl RatingSource for LetterboxdSource {
    fn name(&self) -> &str {
        LETTERBOXD
    }

    async fn resolve(&self, item: &CatalogItem) -> RatingValue {
        let outcome = self.lookup(item).await;
        settle(LETTERBOXD, item, self.observer.as_ref(), outcome)
    }
}
