// src/ratings/providers/rotten_tomatoes.rs
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::catalog::CatalogItem;
use crate::fetch::{SharedFetcher, SCRAPE_TIMEOUT};
use crate::observe::SharedObserver;
use crate::ratings::types::{AdapterError, Rating, RatingSource, RatingValue, Scale};
use crate::ratings::{settle, ROTTEN_TOMATOES};

pub const DEFAULT_BASE_URL: &str = "https://www.rottentomatoes.com";

static RE_NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("non-word regex"));

static RE_SCORECARD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<script[^>]*\bid="media-scorecard-json"[^>]*>(.*?)</script>"#)
        .expect("scorecard regex")
});

/// Title → URL slug: `&` becomes `and`, runs of non-word characters become one `_`.
pub fn slug(title: &str) -> String {
    let spelled = title.replace('&', " and ");
    RE_NON_WORD
        .replace_all(&spelled, "_")
        .trim_matches('_')
        .to_lowercase()
}

/// Scrapes the critics score from the JSON scorecard embedded in the movie page.
pub struct RottenTomatoesSource {
    fetcher: SharedFetcher,
    observer: SharedObserver,
    base_url: String,
    timeout: Duration,
}

impl RottenTomatoesSource {
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

    pub fn page_url(&self, item: &CatalogItem) -> Result<String, AdapterError> {
        let s = slug(&item.title);
        if s.is_empty() {
            return Err(AdapterError::Url(format!(
                "title {:?} has no slug",
                item.title
            )));
        }
        Ok(format!("{}/m/{}", self.base_url, s))
    }

    async fn lookup(&self, item: &CatalogItem) -> Result<Rating, AdapterError> {
        let url = self.page_url(item)?;
        let resp = self.fetcher.fetch(&url, self.timeout).await?;
        extract_rating(&resp.body)
    }
}

/// Pull `criticsScore.score` out of the embedded scorecard blob.
pub fn extract_rating(html: &str) -> Result<Rating, AdapterError> {
    let blob = RE_SCORECARD
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .ok_or(AdapterError::PatternNotFound)?;
    let decoded = html_escape::decode_html_entities(blob);
    let card: Value = serde_json::from_str(&decoded)?;

    let score = card
        .pointer("/criticsScore/score")
        .ok_or_else(|| AdapterError::MissingField("criticsScore.score".into()))?;
    let raw = match score {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => return Err(AdapterError::Parse(other.to_string())),
    };
    let text = format!("{}%", raw.trim_end_matches('%'));
    Rating::parse(&text, Scale::Percent).ok_or(AdapterError::Parse(raw))
}

#[async_trait]
impl RatingSource for RottenTomatoesSource {
    fn name(&self) -> &str {
        ROTTEN_TOMATOES
    }

    async fn resolve(&self, item: &CatalogItem) -> RatingValue {
        let outcome = self.lookup(item).await;
        settle(ROTTEN_TOMATOES, item, self.observer.as_ref(), outcome)
    }
}
