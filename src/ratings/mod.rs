// src/ratings/mod.rs
pub mod providers;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};

pub use types::{AdapterError, Rating, RatingSource, RatingValue, Scale};

use crate::catalog::CatalogItem;
use crate::config::aggregator::AggregatorConfig;
use crate::fetch::SharedFetcher;
use crate::observe::{Observer, SharedObserver};
use providers::{
    letterboxd::LetterboxdSource, omdb::OmdbSource, rotten_tomatoes::RottenTomatoesSource,
};

pub type SharedSource = Arc<dyn RatingSource>;

pub const IMDB: &str = "imdb";
pub const OMDB_ROTTEN_TOMATOES: &str = "omdb_rotten_tomatoes";
pub const LETTERBOXD: &str = "letterboxd";
pub const ROTTEN_TOMATOES: &str = "rotten_tomatoes";

pub const KNOWN_SOURCES: [&str; 4] = [IMDB, OMDB_ROTTEN_TOMATOES, LETTERBOXD, ROTTEN_TOMATOES];

/// Collapse a lookup outcome into a `RatingValue`, reporting the failure.
pub(crate) fn settle(
    source: &str,
    item: &CatalogItem,
    observer: &dyn Observer,
    outcome: Result<Rating, AdapterError>,
) -> RatingValue {
    match outcome {
        Ok(r) => RatingValue::Available(r),
        Err(e) => {
            observer.source_failed(source, item, &e);
            RatingValue::Unavailable
        }
    }
}

/// Build the configured sources, in configured order.
pub fn build_sources(
    cfg: &AggregatorConfig,
    fetcher: SharedFetcher,
    observer: SharedObserver,
) -> Result<Vec<SharedSource>> {
    let api_timeout = Duration::from_millis(cfg.fetch_timeout_ms);
    let scrape_timeout = Duration::from_millis(cfg.scrape_timeout_ms);

    let mut out: Vec<SharedSource> = Vec::with_capacity(cfg.sources.len());
    for name in &cfg.sources {
        let source: SharedSource = match name.as_str() {
            IMDB => Arc::new(
                OmdbSource::imdb(fetcher.clone(), observer.clone(), &cfg.omdb_api_key)
                    .with_base_url(&cfg.endpoints.omdb)
                    .with_timeout(api_timeout),
            ),
            OMDB_ROTTEN_TOMATOES => Arc::new(
                OmdbSource::rotten_tomatoes(fetcher.clone(), observer.clone(), &cfg.omdb_api_key)
                    .with_base_url(&cfg.endpoints.omdb)
                    .with_timeout(api_timeout),
            ),
            LETTERBOXD => Arc::new(
                LetterboxdSource::new(fetcher.clone(), observer.clone())
                    .with_base_url(&cfg.endpoints.letterboxd)
                    .with_timeout(scrape_timeout),
            ),
            ROTTEN_TOMATOES => Arc::new(
                RottenTomatoesSource::new(fetcher.clone(), observer.clone())
                    .with_base_url(&cfg.endpoints.rotten_tomatoes)
                    .with_timeout(scrape_timeout),
            ),
            other => bail!("unknown rating source `{other}` (known: {KNOWN_SOURCES:?})"),
        };
        out.push(source);
    }
    Ok(out)
}
