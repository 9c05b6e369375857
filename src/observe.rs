//! # Observability
//! Sources, the enricher and the aggregator absorb their failures; they report
//! them here instead of writing to global output. `TracingObserver` is the
//! production implementation (leveled `tracing` events + Prometheus series).

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;

use crate::catalog::CatalogItem;
use crate::discovery::DiscoveryError;
use crate::ratings::AdapterError;

/// Sink for absorbed failures. All methods default to no-ops.
pub trait Observer: Send + Sync {
    /// A rating source degraded to `Unavailable` for one item.
    fn source_failed(&self, _source: &str, _item: &CatalogItem, _err: &AdapterError) {}

    /// A whole item lost its enrichment (panic or batch deadline).
    fn item_failed(&self, _item: &CatalogItem, _reason: &str) {}

    /// The one fatal condition of a page request.
    fn discovery_failed(&self, _err: &DiscoveryError) {}

    fn batch_completed(&self, _items: usize, _degraded: usize, _elapsed: Duration) {}
}

pub type SharedObserver = Arc<dyn Observer>;

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ratings_source_errors_total",
            "Rating lookups that degraded to unavailable, by source and kind."
        );
        describe_counter!(
            "ratings_item_failures_total",
            "Items whose whole enrichment was lost."
        );
        describe_counter!(
            "ratings_discovery_errors_total",
            "Page requests failed by the discovery source."
        );
        describe_counter!("ratings_items_total", "Items enriched.");
        describe_histogram!("ratings_batch_ms", "Batch aggregation time in milliseconds.");
    });
}

/// Timeouts at debug, source and item failures at warn, discovery at error.
#[derive(Debug, Clone, Copy)]
pub struct TracingObserver;

impl TracingObserver {
    pub fn new() -> Self {
        ensure_metrics_described();
        Self
    }

    pub fn shared() -> SharedObserver {
        Arc::new(Self::new())
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for TracingObserver {
    fn source_failed(&self, source: &str, item: &CatalogItem, err: &AdapterError) {
        if err.is_timeout() {
            tracing::debug!(target: "ratings", source, item_id = item.id, error = %err, "source timed out");
        } else {
            tracing::warn!(target: "ratings", source, item_id = item.id, kind = err.kind(), error = %err, "source unavailable");
        }
        counter!(
            "ratings_source_errors_total",
            "source" => source.to_string(),
            "kind" => err.kind()
        )
        .increment(1);
    }

    fn item_failed(&self, item: &CatalogItem, reason: &str) {
        tracing::warn!(target: "ratings", item_id = item.id, title = %item.title, reason, "item degraded");
        counter!("ratings_item_failures_total").increment(1);
    }

    fn discovery_failed(&self, err: &DiscoveryError) {
        tracing::error!(target: "ratings", status = err.status.as_u16(), error = %err, "discovery failed");
        counter!("ratings_discovery_errors_total").increment(1);
    }

    fn batch_completed(&self, items: usize, degraded: usize, elapsed: Duration) {
        let ms = elapsed.as_secs_f64() * 1_000.0;
        histogram!("ratings_batch_ms").record(ms);
        counter!("ratings_items_total").increment(items as u64);
        tracing::info!(target: "ratings", items, degraded, ms, "batch aggregated");
    }
}
