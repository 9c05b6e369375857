//! # Per-item enricher
//! Runs every rating source for one item concurrently and merges the results
//! by source name. Cannot fail: a source that panics is recorded as
//! `Unavailable` for its own key only.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;

use futures::future::join_all;
use futures::FutureExt;

use crate::catalog::{CatalogItem, EnrichedItem};
use crate::observe::Observer;
use crate::ratings::{AdapterError, RatingValue, SharedSource};

/// Latency is the slowest source, not the sum.
pub async fn enrich(
    item: CatalogItem,
    sources: &[SharedSource],
    observer: &dyn Observer,
) -> EnrichedItem {
    let lookups = sources.iter().map(|source| {
        let item = &item;
        async move {
            let value = match AssertUnwindSafe(source.resolve(item)).catch_unwind().await {
                Ok(v) => v,
                Err(_) => {
                    observer.source_failed(source.name(), item, &AdapterError::Panicked);
                    RatingValue::Unavailable
                }
            };
            (source.name().to_string(), value)
        }
    });

    let ratings: BTreeMap<String, RatingValue> = join_all(lookups).await.into_iter().collect();
    EnrichedItem::new(item, ratings)
}
