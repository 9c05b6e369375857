// src/ratings/types.rs
use async_trait::async_trait;
use serde::{Serialize, Serializer};

use crate::catalog::CatalogItem;
use crate::fetch::FetchError;

/// Native scale of a source. Values are kept on this scale and only
/// normalised when ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Scale {
    OutOf5,
    OutOf10,
    Percent,
}

impl Scale {
    pub fn max(self) -> f64 {
        match self {
            Scale::OutOf5 => 5.0,
            Scale::OutOf10 => 10.0,
            Scale::Percent => 100.0,
        }
    }

    /// Map a value on this scale onto 0..=10.
    pub fn to_ten(self, value: f64) -> f64 {
        value * 10.0 / self.max()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rating {
    /// Exactly what the source published, e.g. `"3.9"`, `"7.5"`, `"87%"`.
    pub text: String,
    pub value: f64,
    pub scale: Scale,
}

impl Rating {
    /// Parse a value on a known scale. Tolerates a trailing `%` or `/10`-style suffix.
    pub fn parse(text: &str, scale: Scale) -> Option<Self> {
        let trimmed = text.trim();
        let numeric = trimmed
            .split('/')
            .next()
            .unwrap_or_default()
            .trim()
            .trim_end_matches('%')
            .trim();
        let value: f64 = numeric.parse().ok()?;
        if !value.is_finite() || value < 0.0 || value > scale.max() {
            return None;
        }
        Some(Self {
            text: trimmed.to_string(),
            value,
            scale,
        })
    }

    /// Parse a labelled value whose scale is spelled out: `"87%"`, `"7.5/10"`, `"74/100"`.
    pub fn infer(text: &str) -> Option<Self> {
        let t = text.trim();
        let scale = if t.ends_with('%') || t.ends_with("/100") {
            Scale::Percent
        } else if t.ends_with("/10") {
            Scale::OutOf10
        } else if t.ends_with("/5") {
            Scale::OutOf5
        } else {
            return None;
        };
        Self::parse(t, scale)
    }

    pub fn normalized(&self) -> f64 {
        self.scale.to_ten(self.value)
    }
}

/// A rating or the explicit `unavailable` sentinel. Never absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RatingValue {
    Available(Rating),
    #[default]
    Unavailable,
}

impl RatingValue {
    pub const UNAVAILABLE_TEXT: &'static str = "N/A";

    pub fn is_available(&self) -> bool {
        matches!(self, RatingValue::Available(_))
    }

    pub fn as_rating(&self) -> Option<&Rating> {
        match self {
            RatingValue::Available(r) => Some(r),
            RatingValue::Unavailable => None,
        }
    }

    /// 0..=10 contribution to the composite score; `Unavailable` counts as 0.
    pub fn normalized(&self) -> f64 {
        self.as_rating().map(Rating::normalized).unwrap_or(0.0)
    }
}

impl From<Option<Rating>> for RatingValue {
    fn from(r: Option<Rating>) -> Self {
        r.map(RatingValue::Available).unwrap_or_default()
    }
}

// Wire form matches what browsing clients already render: verbatim text or "N/A".
impl Serialize for RatingValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RatingValue::Available(r) => serializer.serialize_str(&r.text),
            RatingValue::Unavailable => serializer.serialize_str(Self::UNAVAILABLE_TEXT),
        }
    }
}

/// Everything that can go wrong inside a rating source. Never leaves the source.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("response is not JSON")]
    NotJson,

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("field `{0}` missing")]
    MissingField(String),

    #[error("pattern not found in page")]
    PatternNotFound,

    #[error("could not parse rating from {0:?}")]
    Parse(String),

    #[error("could not build lookup url: {0}")]
    Url(String),

    #[error("source panicked")]
    Panicked,
}

impl AdapterError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, AdapterError::Fetch(e) if e.is_timeout())
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AdapterError::Fetch(e) => e.kind(),
            AdapterError::NotJson | AdapterError::Json(_) => "not_json",
            AdapterError::MissingField(_) => "missing_field",
            AdapterError::PatternNotFound => "pattern_not_found",
            AdapterError::Parse(_) => "parse",
            AdapterError::Url(_) => "url",
            AdapterError::Panicked => "panic",
        }
    }
}

/// One external provider of a rating. `resolve` must not fail: every error
/// path ends in `RatingValue::Unavailable`.
#[async_trait]
pub trait RatingSource: Send + Sync {
    /// Key under which the value lands in `EnrichedItem::ratings`.
    fn name(&self) -> &str;
    async fn resolve(&self, item: &CatalogItem) -> RatingValue;
}
