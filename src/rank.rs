//! # Ranking
//! Composite score = sum over an item's ratings of each available value
//! mapped onto 0..=10 (`/5` ×2, `/10` as is, `%` ÷10). `Unavailable` adds 0.
//! The catalog's own popularity is not part of the score.
//!
//! Ordering is descending by score and stable: equal scores keep batch order.

use serde::Serialize;

use crate::catalog::{Batch, EnrichedItem};
use crate::ratings::RatingValue;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RankedItem {
    #[serde(flatten)]
    pub item: EnrichedItem,
    pub composite_score: f64,
}

pub fn composite_score(item: &EnrichedItem) -> f64 {
    item.ratings().values().map(RatingValue::normalized).sum()
}

/// Reorders the batch; ratings are left untouched.
pub fn rank(batch: Batch) -> Vec<RankedItem> {
    let mut ranked: Vec<RankedItem> = batch
        .into_iter()
        .map(|item| RankedItem {
            composite_score: composite_score(&item),
            item,
        })
        .collect();
    // `sort_by` is stable.
    ranked.sort_by(|a, b| b.composite_score.total_cmp(&a.composite_score));
    ranked
}
