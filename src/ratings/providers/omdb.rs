// src/ratings/providers/omdb.rs
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use crate::catalog::CatalogItem;
use crate::fetch::{SharedFetcher, DEFAULT_TIMEOUT};
use crate::observe::SharedObserver;
use crate::ratings::types::{AdapterError, Rating, RatingSource, RatingValue, Scale};
use crate::ratings::{settle, IMDB, OMDB_ROTTEN_TOMATOES};

pub const DEFAULT_BASE_URL: &str = "https://www.omdbapi.com";

/// What to pull out of an OMDb title record.
#[derive(Debug, Clone, PartialEq)]
pub enum OmdbExtract {
    /// Top-level string field holding a number on a known scale (`imdbRating`).
    Field { name: String, scale: Scale },
    /// Entry of `Ratings[]` whose `Source` equals the label exactly.
    RatingsEntry { label: String },
}

#[derive(Debug, Deserialize)]
struct RatingsEntry {
    #[serde(rename = "Source")]
    source: String,
    #[serde(rename = "Value")]
    value: String,
}

/// Typed lookup against the OMDb ratings API, keyed by title.
pub struct OmdbSource {
    name: String,
    fetcher: SharedFetcher,
    observer: SharedObserver,
    api_key: String,
    base_url: String,
    timeout: Duration,
    extract: OmdbExtract,
}

impl OmdbSource {
    pub fn new(
        name: impl Into<String>,
        extract: OmdbExtract,
        fetcher: SharedFetcher,
        observer: SharedObserver,
        api_key: &str,
    ) -> Self {
        Self {
            name: name.into(),
            fetcher,
            observer,
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            extract,
        }
    }

    /// IMDb rating (0–10) from the `imdbRating` field.
    pub fn imdb(fetcher: SharedFetcher, observer: SharedObserver, api_key: &str) -> Self {
        Self::new(
            IMDB,
            OmdbExtract::Field {
                name: "imdbRating".into(),
                scale: Scale::OutOf10,
            },
            fetcher,
            observer,
            api_key,
        )
    }

    /// Rotten Tomatoes percentage as relayed in OMDb's `Ratings` list.
    pub fn rotten_tomatoes(fetcher: SharedFetcher, observer: SharedObserver, api_key: &str) -> Self {
        Self::new(
            OMDB_ROTTEN_TOMATOES,
            OmdbExtract::RatingsEntry {
                label: "Rotten Tomatoes".into(),
            },
            fetcher,
            observer,
            api_key,
        )
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn lookup_url(&self, title: &str) -> Result<Url, AdapterError> {
        Url::parse_with_params(
            &format!("{}/", self.base_url),
            &[("t", title), ("apikey", self.api_key.as_str())],
        )
        .map_err(|e| AdapterError::Url(e.to_string()))
    }

    async fn lookup(&self, item: &CatalogItem) -> Result<Rating, AdapterError> {
        let url = self.lookup_url(&item.title)?;
        let resp = self.fetcher.fetch(url.as_str(), self.timeout).await?;
        if !resp.is_json() {
            return Err(AdapterError::NotJson);
        }
        let body: Value = resp.json()?;
        extract(&self.extract, &body)
    }
}

/// Apply an extraction rule to a decoded OMDb record.
pub fn extract(rule: &OmdbExtract, body: &Value) -> Result<Rating, AdapterError> {
    match rule {
        OmdbExtract::Field { name, scale } => {
            let raw = match body.get(name) {
                Some(Value::String(s)) if s.trim() != RatingValue::UNAVAILABLE_TEXT => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => return Err(AdapterError::MissingField(name.clone())),
            };
            Rating::parse(&raw, *scale).ok_or(AdapterError::Parse(raw))
        }
        OmdbExtract::RatingsEntry { label } => {
            let entries: Vec<RatingsEntry> = body
                .get("Ratings")
                .cloned()
                .map(serde_json::from_value)
                .transpose()?
                .ok_or_else(|| AdapterError::MissingField("Ratings".into()))?;
            let hit = entries
                .into_iter()
                .find(|e| e.source == *label)
                .ok_or_else(|| AdapterError::MissingField(format!("Ratings[{label}]")))?;
            Rating::infer(&hit.value).ok_or(AdapterError::Parse(hit.value))
        }
    }
}

#[async_trait]
impl RatingSource for OmdbSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, item: &CatalogItem) -> RatingValue {
        let outcome = self.lookup(item).await;
        settle(&self.name, item, self.observer.as_ref(), outcome)
    }
}
