// tests/common/mod.rs
//
// Shared stubs for integration tests: scripted rating sources, a recording
// observer, a canned discovery, and a tiny local HTTP server helper.
#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;

use movie_ratings::catalog::{CatalogItem, PageRequest};
use movie_ratings::discovery::{Discovery, DiscoveryError};
use movie_ratings::observe::Observer;
use movie_ratings::ratings::{AdapterError, Rating, RatingSource, RatingValue, Scale};

pub fn items(n: usize) -> Vec<CatalogItem> {
    (0..n as u64)
        .map(|i| CatalogItem::new(i, format!("Movie {i}")))
        .collect()
}

pub fn rated(text: &str, scale: Scale) -> RatingValue {
    RatingValue::Available(Rating::parse(text, scale).expect("valid rating"))
}

/// Returns the item id (mod 10) as an out-of-10 rating after an optional delay;
/// ids in `fail_ids` come back unavailable.
pub struct EchoSource {
    pub name: &'static str,
    pub delay: Duration,
    pub fail_ids: HashSet<u64>,
}

impl EchoSource {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            delay: Duration::ZERO,
            fail_ids: HashSet::new(),
        }
    }
}

#[async_trait]
impl RatingSource for EchoSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn resolve(&self, item: &CatalogItem) -> RatingValue {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_ids.contains(&item.id) {
            return RatingValue::Unavailable;
        }
        rated(&(item.id % 10).to_string(), Scale::OutOf10)
    }
}

/// Sleeps a pseudo-random time per item so completion order is scrambled.
pub struct JitterSource {
    pub name: &'static str,
    pub max_ms: u64,
    pub fail_ids: HashSet<u64>,
}

#[async_trait]
impl RatingSource for JitterSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn resolve(&self, item: &CatalogItem) -> RatingValue {
        let ms = rand::random_range(0..=self.max_ms);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        if self.fail_ids.contains(&item.id) {
            RatingValue::Unavailable
        } else {
            rated("5", Scale::OutOf10)
        }
    }
}

/// Tracks how many resolves are in flight at once.
pub struct GaugeSource {
    pub delay: Duration,
    pub in_flight: AtomicUsize,
    pub peak: AtomicUsize,
}

impl GaugeSource {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RatingSource for GaugeSource {
    fn name(&self) -> &str {
        "gauge"
    }

    async fn resolve(&self, _item: &CatalogItem) -> RatingValue {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        RatingValue::Unavailable
    }
}

/// Panics for the listed ids, rates everything else 7/10.
pub struct PanickySource {
    pub panic_ids: HashSet<u64>,
}

#[async_trait]
impl RatingSource for PanickySource {
    fn name(&self) -> &str {
        "panicky"
    }

    async fn resolve(&self, item: &CatalogItem) -> RatingValue {
        if self.panic_ids.contains(&item.id) {
            panic!("source blew up on {}", item.id);
        }
        rated("7", Scale::OutOf10)
    }
}

/// Collects everything the pipeline reports.
#[derive(Default)]
pub struct RecordingObserver {
    pub source_failures: Mutex<Vec<(String, u64, &'static str)>>,
    pub item_failures: Mutex<Vec<(u64, String)>>,
    pub discovery_failures: Mutex<Vec<u16>>,
    pub batches: Mutex<Vec<(usize, usize)>>,
}

impl Observer for RecordingObserver {
    fn source_failed(&self, source: &str, item: &CatalogItem, err: &AdapterError) {
        self.source_failures
            .lock()
            .unwrap()
            .push((source.to_string(), item.id, err.kind()));
    }

    fn item_failed(&self, item: &CatalogItem, reason: &str) {
        self.item_failures
            .lock()
            .unwrap()
            .push((item.id, reason.to_string()));
    }

    fn discovery_failed(&self, err: &DiscoveryError) {
        self.discovery_failures
            .lock()
            .unwrap()
            .push(err.status.as_u16());
    }

    fn batch_completed(&self, items: usize, degraded: usize, _elapsed: Duration) {
        self.batches.lock().unwrap().push((items, degraded));
    }
}

/// Discovery with a canned answer; counts calls.
pub struct StubDiscovery {
    pub answer: Result<Vec<CatalogItem>, DiscoveryError>,
    pub calls: AtomicUsize,
}

impl StubDiscovery {
    pub fn ok(items: Vec<CatalogItem>) -> Arc<Self> {
        Arc::new(Self {
            answer: Ok(items),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(err: DiscoveryError) -> Arc<Self> {
        Arc::new(Self {
            answer: Err(err),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Discovery for StubDiscovery {
    async fn discover(&self, _req: &PageRequest) -> Result<Vec<CatalogItem>, DiscoveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}

/// Serve `router` on an ephemeral local port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("local server");
    });
    addr
}
