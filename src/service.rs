//! # Catalog service
//! One page request end to end: discovery → bounded aggregation → ranking.

use std::sync::Arc;

use anyhow::Result;

use crate::aggregate::{aggregate, AggregateOptions};
use crate::catalog::PageRequest;
use crate::config::AggregatorConfig;
use crate::discovery::{Discovery, DiscoveryError, TmdbDiscovery};
use crate::fetch::SharedFetcher;
use crate::observe::SharedObserver;
use crate::rank::{rank, RankedItem};
use crate::ratings::{build_sources, SharedSource};

#[derive(Clone)]
pub struct CatalogService {
    discovery: Arc<dyn Discovery>,
    sources: Arc<[SharedSource]>,
    options: AggregateOptions,
    observer: SharedObserver,
}

impl CatalogService {
    pub fn new(
        discovery: Arc<dyn Discovery>,
        sources: Vec<SharedSource>,
        options: AggregateOptions,
        observer: SharedObserver,
    ) -> Self {
        Self {
            discovery,
            sources: sources.into(),
            options,
            observer,
        }
    }

    /// Wire TMDB discovery and the configured rating sources over one fetcher.
    pub fn from_config(
        cfg: &AggregatorConfig,
        fetcher: SharedFetcher,
        observer: SharedObserver,
    ) -> Result<Self> {
        let discovery = TmdbDiscovery::new(fetcher.clone(), &cfg.tmdb_api_key)
            .with_base_url(&cfg.endpoints.tmdb)
            .with_timeout(cfg.fetch_timeout());
        let sources = build_sources(cfg, fetcher, observer.clone())?;
        Ok(Self::new(
            Arc::new(discovery),
            sources,
            cfg.aggregate_options(),
            observer,
        ))
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn options(&self) -> AggregateOptions {
        self.options
    }

    /// Fails only when discovery fails; rating failures degrade in place.
    pub async fn ranked_page(&self, req: &PageRequest) -> Result<Vec<RankedItem>, DiscoveryError> {
        let items = match self.discovery.discover(req).await {
            Ok(items) => items,
            Err(e) => {
                self.observer.discovery_failed(&e);
                return Err(e);
            }
        };
        tracing::debug!(target: "ratings", page = req.page, items = items.len(), "page discovered");

        let batch = aggregate(
            items,
            self.sources.clone(),
            self.options,
            self.observer.clone(),
        )
        .await;
        Ok(rank(batch))
    }
}
