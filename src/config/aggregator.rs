// src/config/aggregator.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use crate::aggregate::{AggregateOptions, DEFAULT_MAX_CONCURRENT};
use crate::ratings::{IMDB, KNOWN_SOURCES, LETTERBOXD, ROTTEN_TOMATOES};

pub const ENV_CONFIG_PATH: &str = "AGGREGATOR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/aggregator.toml";
pub const ENV_TMDB_API_KEY: &str = "TMDB_API_KEY";
pub const ENV_OMDB_API_KEY: &str = "OMDB_API_KEY";

fn default_max_concurrent() -> usize {
    DEFAULT_MAX_CONCURRENT
}
fn default_fetch_timeout_ms() -> u64 {
    10_000
}
fn default_scrape_timeout_ms() -> u64 {
    7_000
}
fn default_sources() -> Vec<String> {
    vec![IMDB.into(), LETTERBOXD.into(), ROTTEN_TOMATOES.into()]
}
fn default_env_marker() -> String {
    "ENV".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Endpoints {
    #[serde(default = "Endpoints::default_tmdb")]
    pub tmdb: String,
    #[serde(default = "Endpoints::default_omdb")]
    pub omdb: String,
    #[serde(default = "Endpoints::default_letterboxd")]
    pub letterboxd: String,
    #[serde(default = "Endpoints::default_rotten_tomatoes")]
    pub rotten_tomatoes: String,
}

impl Endpoints {
    fn default_tmdb() -> String {
        crate::discovery::DEFAULT_BASE_URL.to_string()
    }
    fn default_omdb() -> String {
        crate::ratings::providers::omdb::DEFAULT_BASE_URL.to_string()
    }
    fn default_letterboxd() -> String {
        crate::ratings::providers::letterboxd::DEFAULT_BASE_URL.to_string()
    }
    fn default_rotten_tomatoes() -> String {
        crate::ratings::providers::rotten_tomatoes::DEFAULT_BASE_URL.to_string()
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            tmdb: Self::default_tmdb(),
            omdb: Self::default_omdb(),
            letterboxd: Self::default_letterboxd(),
            rotten_tomatoes: Self::default_rotten_tomatoes(),
        }
    }
}

/// Process-wide settings, loaded once at startup and injected into the
/// fetcher, discovery and rating sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatorConfig {
    /// "ENV" means: read from TMDB_API_KEY.
    #[serde(default = "default_env_marker")]
    pub tmdb_api_key: String,
    /// "ENV" means: read from OMDB_API_KEY.
    #[serde(default = "default_env_marker")]
    pub omdb_api_key: String,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    #[serde(default = "default_scrape_timeout_ms")]
    pub scrape_timeout_ms: u64,
    /// Optional cap on a whole page; unfinished items degrade to unavailable.
    #[serde(default)]
    pub batch_deadline_ms: Option<u64>,
    /// Run aggregation on a dedicated worker thread.
    #[serde(default)]
    pub offload_worker: bool,
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    #[serde(default)]
    pub endpoints: Endpoints,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            tmdb_api_key: default_env_marker(),
            omdb_api_key: default_env_marker(),
            max_concurrent: default_max_concurrent(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            scrape_timeout_ms: default_scrape_timeout_ms(),
            batch_deadline_ms: None,
            offload_worker: false,
            sources: default_sources(),
            endpoints: Endpoints::default(),
        }
    }
}

impl AggregatorConfig {
    /// Parse a TOML document, then resolve keys and validate.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: AggregatorConfig = toml::from_str(s).context("parsing aggregator config")?;
        cfg.finish()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading aggregator config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    /// Load using env var + fallbacks:
    /// 1) $AGGREGATOR_CONFIG_PATH
    /// 2) config/aggregator.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from_file(&pb);
            }
            bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from_file(&fallback);
        }
        Self::default().finish()
    }

    fn finish(mut self) -> Result<Self> {
        self.tmdb_api_key = resolve_key(&self.tmdb_api_key, ENV_TMDB_API_KEY)?;
        self.omdb_api_key = resolve_key(&self.omdb_api_key, ENV_OMDB_API_KEY)?;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for s in &self.sources {
            if !KNOWN_SOURCES.contains(&s.as_str()) {
                bail!("unknown rating source `{s}` (known: {KNOWN_SOURCES:?})");
            }
            if !seen.insert(s.as_str()) {
                bail!("rating source `{s}` listed twice");
            }
        }
        if self.fetch_timeout_ms == 0 || self.scrape_timeout_ms == 0 {
            bail!("timeouts must be greater than zero");
        }
        Ok(())
    }

    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            max_concurrent: self.max_concurrent.max(1),
            batch_deadline: self.batch_deadline_ms.map(Duration::from_millis),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

// An absent env var resolves to an empty key: upstream calls then fail per
// request instead of refusing to boot.
fn resolve_key(raw: &str, var: &str) -> Result<String> {
    if raw.trim().eq_ignore_ascii_case("env") {
        return match env::var(var) {
            Ok(v) => Ok(v.trim().to_string()),
            Err(env::VarError::NotPresent) => Ok(String::new()),
            Err(e) => Err(anyhow!("{var} is not valid unicode: {e}")),
        };
    }
    Ok(raw.trim().to_string())
}
