//! # Catalog model
//! Items as returned by discovery, their enriched form, and the page request
//! that drives one aggregation run.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::ratings::RatingValue;

/// One movie record from the discovery source. Immutable after discovery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    pub id: u64,
    /// Lookup key for external sources. Not unique and not URL safe.
    pub title: String,
    #[serde(default)]
    pub popularity: f64,
    /// Fields the aggregator never reads (overview, poster_path, release_date, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CatalogItem {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            popularity: 0.0,
            extra: serde_json::Map::new(),
        }
    }
}

/// A catalog item plus one rating per configured source.
///
/// Built once by the enricher; there are no setters.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EnrichedItem {
    #[serde(flatten)]
    item: CatalogItem,
    ratings: BTreeMap<String, RatingValue>,
}

impl EnrichedItem {
    pub fn new(item: CatalogItem, ratings: BTreeMap<String, RatingValue>) -> Self {
        Self { item, ratings }
    }

    /// Every source `Unavailable`. Used when an item's enrichment is lost.
    pub fn degraded<I, S>(item: CatalogItem, source_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ratings = source_names
            .into_iter()
            .map(|name| (name.into(), RatingValue::Unavailable))
            .collect();
        Self { item, ratings }
    }

    pub fn item(&self) -> &CatalogItem {
        &self.item
    }

    pub fn ratings(&self) -> &BTreeMap<String, RatingValue> {
        &self.ratings
    }

    pub fn rating(&self, source: &str) -> Option<&RatingValue> {
        self.ratings.get(source)
    }

    pub fn is_fully_unavailable(&self) -> bool {
        self.ratings.values().all(|v| !v.is_available())
    }
}

/// Ordered, one entry per input item.
pub type Batch = Vec<EnrichedItem>;

/// Page + optional genre filter, forwarded opaquely to discovery.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PageRequest {
    #[serde(default = "default_page", deserialize_with = "de_page")]
    pub page: u32,
    /// Comma-separated genre ids, e.g. `"28,12"`.
    #[serde(default)]
    pub genre: Option<String>,
}

impl PageRequest {
    pub fn new(page: u32, genre: Option<String>) -> Self {
        Self {
            page: page.max(1),
            genre: genre.filter(|g| !g.trim().is_empty()),
        }
    }

    pub fn genre_param(&self) -> &str {
        self.genre.as_deref().map(str::trim).unwrap_or_default()
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(default_page(), None)
    }
}

fn default_page() -> u32 {
    1
}

// Browsing clients send the page either as a number or as a query-string value.
fn de_page<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Signed(i64),
        Float(f64),
        Text(String),
        Null(()),
    }

    let page = match Raw::deserialize(deserializer)? {
        Raw::Num(n) => u32::try_from(n).unwrap_or(u32::MAX),
        Raw::Signed(_) => 1,
        // `2.0`, `2.7` -> 2; the saturating cast maps NaN and negatives to 0.
        Raw::Float(f) => f.trunc() as u32,
        Raw::Text(s) => s.trim().parse::<f64>().map_or(1, |f| f.trunc() as u32),
        Raw::Null(()) => 1,
    };
    Ok(page.max(1))
}
