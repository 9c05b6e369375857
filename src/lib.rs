// src/lib.rs
// Public library surface for the binary, integration tests and the demo bin.

pub mod api;
pub mod catalog;
pub mod config;
pub mod discovery;
pub mod fetch;
pub mod metrics;
pub mod observe;
pub mod ratings;

// Fan-out pipeline: enrich one item, aggregate a page, rank the batch.
pub mod aggregate;
pub mod enrich;
pub mod rank;

pub mod service;
pub mod worker;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{aggregate, AggregateOptions};
pub use crate::api::router;
pub use crate::catalog::{Batch, CatalogItem, EnrichedItem, PageRequest};
pub use crate::enrich::enrich;
pub use crate::rank::{rank, RankedItem};
pub use crate::ratings::{RatingSource, RatingValue};
pub use crate::service::CatalogService;

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::api::AppState;
use crate::config::AggregatorConfig;
use crate::fetch::HttpFetcher;
use crate::observe::TracingObserver;
use crate::worker::AggregatorWorker;

/// Build the full HTTP app from configuration: real fetcher, TMDB discovery,
/// configured rating sources, optional worker offload, `/metrics`.
///
/// Example usage inside the Shuttle entrypoint:
/// ```ignore
/// let cfg = movie_ratings::config::AggregatorConfig::load_default()?;
/// let router = movie_ratings::app(&cfg, true)?;
/// ```
pub fn app(cfg: &AggregatorConfig, with_metrics: bool) -> anyhow::Result<axum::Router> {
    let fetcher = Arc::new(HttpFetcher::new()?);
    let service = CatalogService::from_config(cfg, fetcher, TracingObserver::shared())
        .context("wiring catalog service")?;
    info!(
        sources = ?service.source_names(),
        max_concurrent = cfg.aggregate_options().max_concurrent,
        offload = cfg.offload_worker,
        tmdb_key_len = cfg.tmdb_api_key.len(),
        omdb_key_len = cfg.omdb_api_key.len(),
        "aggregator configured"
    );

    let state = if cfg.offload_worker {
        AppState::offloaded(AggregatorWorker::spawn(service)?)
    } else {
        AppState::inline(service)
    };

    let mut router = api::router(state);
    if with_metrics {
        let m = metrics::Metrics::init(&cfg.aggregate_options())?;
        router = router.merge(m.router());
    }
    Ok(router)
}
