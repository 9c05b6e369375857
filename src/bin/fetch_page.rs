//! Demo that runs one page through discovery, the rating fan-out and ranking,
//! then prints the ranked list as JSON. Usage: `fetch_page [page] [genre-ids]`.

use std::sync::Arc;

use movie_ratings::config::AggregatorConfig;
use movie_ratings::fetch::HttpFetcher;
use movie_ratings::observe::TracingObserver;
use movie_ratings::{CatalogService, PageRequest};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let mut args = std::env::args().skip(1);
    let page = args.next().and_then(|p| p.parse().ok()).unwrap_or(1);
    let genre = args.next();

    let cfg = AggregatorConfig::load_default()?;
    let service = CatalogService::from_config(
        &cfg,
        Arc::new(HttpFetcher::new()?),
        TracingObserver::shared(),
    )?;

    let ranked = service.ranked_page(&PageRequest::new(page, genre)).await?;
    println!("{}", serde_json::to_string_pretty(&ranked)?);
    Ok(())
}
