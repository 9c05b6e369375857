//! # Bounded-Timeout Fetcher
//! One outbound GET per call, bounded end to end by a deadline, sent under a
//! browser identity picked at random from a small pool.
//!
//! There are no retries here. A timeout drops the request future, which
//! cancels the underlying connection.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

/// Budget for API calls (discovery, ratings API).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
/// Budget for scraped pages, which tend to hang rather than fail.
pub const SCRAPE_TIMEOUT: Duration = Duration::from_millis(7_000);

/// Identity strings rotated across requests.
pub const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0.3 Safari/605.1.15",
];

pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} timed out after {}ms", .after.as_millis())]
    Timeout { url: String, after: Duration },

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status}")]
    Http { url: String, status: StatusCode },
}

impl FetchError {
    /// Timeouts are the common case against slow targets; callers log them quietly.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout { .. } => "timeout",
            FetchError::Network { .. } => "network",
            FetchError::Http { .. } => "http",
        }
    }

    fn from_reqwest(url: &str, after: Duration, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                after,
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                source: e,
            }
        }
    }
}

/// A fully read 2xx response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"))
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Resolves or fails no later than `timeout` after the call.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<RawResponse, FetchError>;
}

pub type SharedFetcher = Arc<dyn Fetcher>;

/// `reqwest`-backed fetcher shared by discovery and every rating source.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .build()
            .context("building reqwest client")?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn exchange(&self, url: &str, timeout: Duration) -> Result<RawResponse, FetchError> {
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, random_user_agent())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, timeout, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status,
            });
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, timeout, e))?;

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<RawResponse, FetchError> {
        // Covers connect, headers and body; dropping the future aborts the request.
        match tokio::time::timeout(timeout, self.exchange(url, timeout)).await {
            Ok(res) => res,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                after: timeout,
            }),
        }
    }
}
