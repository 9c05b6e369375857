//! Movie Ratings Aggregator: binary entrypoint
//! Boots the Axum HTTP server: loads config, wires discovery + rating sources,
//! and serves ranked catalog pages.

use movie_ratings::config::AggregatorConfig;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs filtered by `RUST_LOG` (default: this crate at info, others at warn).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("movie_ratings=info,ratings=info,warn"));

    // The deployment runtime may already own the global subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    // This enables TMDB_API_KEY / OMDB_API_KEY / AGGREGATOR_CONFIG_PATH from .env.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = AggregatorConfig::load_default()?;
    let router = movie_ratings::app(&cfg, true)?;

    Ok(router.into())
}
