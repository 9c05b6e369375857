//! # Concurrency-bounded batch aggregator
//! Drives the enricher across a page of items with at most `max_concurrent`
//! enrichments in flight, and returns exactly one `EnrichedItem` per input
//! item, in input order.
//!
//! Each item runs in its own task. The task holds a semaphore permit for the
//! duration of its enrichment; the permit is released on drop, so completion,
//! panic and abort all free the slot. Results are collected by awaiting the
//! handles in input order, which makes completion order irrelevant.
//!
//! Dropping the `aggregate` future aborts every task it spawned.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinHandle};

use crate::catalog::{Batch, CatalogItem, EnrichedItem};
use crate::enrich::enrich;
use crate::observe::SharedObserver;
use crate::ratings::SharedSource;

pub const DEFAULT_MAX_CONCURRENT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Item enrichments allowed in flight at once. 0 is treated as 1.
    pub max_concurrent: usize,
    /// Optional cap on the whole batch. Items still running at the deadline
    /// are aborted and degraded; finished items are kept.
    pub batch_deadline: Option<Duration>,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            batch_deadline: None,
        }
    }
}

impl AggregateOptions {
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    pub fn with_batch_deadline(mut self, deadline: Duration) -> Self {
        self.batch_deadline = Some(deadline);
        self
    }
}

pub async fn aggregate(
    items: Vec<CatalogItem>,
    sources: Arc<[SharedSource]>,
    options: AggregateOptions,
    observer: SharedObserver,
) -> Batch {
    let started = Instant::now();
    let permits = Arc::new(Semaphore::new(options.max_concurrent.max(1)));
    let deadline = options
        .batch_deadline
        .map(|d| tokio::time::Instant::now() + d);

    let pending: Vec<(CatalogItem, JoinHandle<EnrichedItem>)> = items
        .into_iter()
        .map(|item| {
            let fallback = item.clone();
            let permits = permits.clone();
            let sources = sources.clone();
            let observer = observer.clone();
            let handle = tokio::spawn(async move {
                // The semaphore is never closed, so acquisition only waits.
                let _permit = permits.acquire_owned().await.ok();
                enrich(item, &sources, observer.as_ref()).await
            });
            (fallback, handle)
        })
        .collect();
    let _guard = AbortOnDrop(pending.iter().map(|(_, h)| h.abort_handle()).collect());

    let mut batch = Vec::with_capacity(pending.len());
    let mut degraded = 0usize;
    for (fallback, mut handle) in pending {
        let joined = match deadline {
            Some(at) => match tokio::time::timeout_at(at, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    handle.abort();
                    observer.item_failed(&fallback, "batch deadline exceeded");
                    degraded += 1;
                    batch.push(degrade(fallback, &sources));
                    continue;
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(enriched) => batch.push(enriched),
            Err(e) => {
                let reason = if e.is_panic() {
                    "enrichment panicked"
                } else {
                    "enrichment cancelled"
                };
                observer.item_failed(&fallback, reason);
                degraded += 1;
                batch.push(degrade(fallback, &sources));
            }
        }
    }

    observer.batch_completed(batch.len(), degraded, started.elapsed());
    batch
}

/// Aborts the batch's tasks when dropped; a no-op for tasks already finished.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

fn degrade(item: CatalogItem, sources: &[SharedSource]) -> EnrichedItem {
    EnrichedItem::degraded(item, sources.iter().map(|s| s.name().to_string()))
}
