// tests/aggregate_batch.rs
//
// Batch-level guarantees of the bounded fan-out:
// - one result per input item, in input order, under random failures
// - every source key present even when every source fails
// - concurrency never exceeds the bound
// - a timing-out source stays isolated from siblings and other items
// - panics and the batch deadline degrade single items only

mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::{EchoSource, GaugeSource, JitterSource, PanickySource, RecordingObserver};
use movie_ratings::aggregate::{aggregate, AggregateOptions};
use movie_ratings::fetch::{FetchError, Fetcher, RawResponse};
use movie_ratings::observe::NoopObserver;
use movie_ratings::ratings::providers::letterboxd::LetterboxdSource;
use movie_ratings::ratings::{RatingValue, SharedSource};
use reqwest::StatusCode;

fn sources(list: Vec<SharedSource>) -> Arc<[SharedSource]> {
    list.into()
}

#[tokio::test]
async fn output_matches_input_length_and_order_under_random_failures() {
    let n = 60u64;
    let fail_ids: HashSet<u64> = (0..n).filter(|_| rand::random_bool(0.3)).collect();

    let srcs = sources(vec![
        Arc::new(JitterSource {
            name: "jitter",
            max_ms: 25,
            fail_ids: fail_ids.clone(),
        }) as SharedSource,
        Arc::new(EchoSource::new("echo")),
    ]);
    let batch = aggregate(
        common::items(n as usize),
        srcs,
        AggregateOptions::default(),
        Arc::new(NoopObserver),
    )
    .await;

    assert_eq!(batch.len(), n as usize);
    for (i, e) in batch.iter().enumerate() {
        assert_eq!(e.item().id, i as u64, "batch must stay index-aligned");
        assert_eq!(e.ratings().len(), 2);
        let jitter = e.rating("jitter").unwrap();
        assert_eq!(jitter.is_available(), !fail_ids.contains(&(i as u64)));
        assert!(e.rating("echo").unwrap().is_available());
    }
}

#[tokio::test]
async fn all_failing_sources_still_fill_every_key() {
    let every: HashSet<u64> = (0..5).collect();
    let srcs = sources(vec![
        Arc::new(EchoSource {
            name: "imdb",
            delay: Duration::ZERO,
            fail_ids: every.clone(),
        }) as SharedSource,
        Arc::new(EchoSource {
            name: "letterboxd",
            delay: Duration::ZERO,
            fail_ids: every.clone(),
        }),
        Arc::new(EchoSource {
            name: "rotten_tomatoes",
            delay: Duration::ZERO,
            fail_ids: every,
        }),
    ]);
    let batch = aggregate(
        common::items(5),
        srcs,
        AggregateOptions::default(),
        Arc::new(NoopObserver),
    )
    .await;

    assert_eq!(batch.len(), 5);
    for e in &batch {
        let keys: Vec<&str> = e.ratings().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["imdb", "letterboxd", "rotten_tomatoes"]);
        assert!(e.ratings().values().all(|v| *v == RatingValue::Unavailable));
    }
}

#[tokio::test]
async fn in_flight_enrichments_never_exceed_bound() {
    let gauge = Arc::new(GaugeSource::new(Duration::from_millis(15)));
    let srcs = sources(vec![gauge.clone() as SharedSource]);

    let batch = aggregate(
        common::items(120),
        srcs,
        AggregateOptions::default().with_max_concurrent(10),
        Arc::new(NoopObserver),
    )
    .await;

    assert_eq!(batch.len(), 120);
    let peak = gauge.peak.load(std::sync::atomic::Ordering::SeqCst);
    assert!(peak <= 10, "peak in-flight {peak} exceeded bound");
    assert!(peak > 1, "items should overlap, peak was {peak}");
    assert_eq!(gauge.in_flight.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn zero_bound_is_treated_as_one() {
    let gauge = Arc::new(GaugeSource::new(Duration::from_millis(2)));
    let batch = aggregate(
        common::items(8),
        sources(vec![gauge.clone() as SharedSource]),
        AggregateOptions::default().with_max_concurrent(0),
        Arc::new(NoopObserver),
    )
    .await;
    assert_eq!(batch.len(), 8);
    assert_eq!(gauge.peak.load(std::sync::atomic::Ordering::SeqCst), 1);
}

/// Hangs for item 0's page until the caller's timeout fires; serves a rating otherwise.
struct HangOnFirst;

#[async_trait]
impl Fetcher for HangOnFirst {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<RawResponse, FetchError> {
        if url.ends_with("/tmdb/0/") {
            let _ = tokio::time::timeout(timeout, std::future::pending::<()>()).await;
            return Err(FetchError::Timeout {
                url: url.to_string(),
                after: timeout,
            });
        }
        Ok(RawResponse {
            status: StatusCode::OK,
            content_type: Some("text/html".into()),
            body: r#"<meta name="twitter:data2" content="3.50 out of 5" />"#.into(),
        })
    }
}

#[tokio::test]
async fn one_timing_out_source_does_not_affect_siblings_or_other_items() {
    let observer = Arc::new(RecordingObserver::default());
    let letterboxd = LetterboxdSource::new(Arc::new(HangOnFirst), observer.clone())
        .with_timeout(Duration::from_millis(300));
    let srcs = sources(vec![Arc::new(letterboxd) as SharedSource, Arc::new(EchoSource::new("echo"))]);

    let started = Instant::now();
    let batch = aggregate(
        common::items(6),
        srcs,
        AggregateOptions::default(),
        observer.clone(),
    )
    .await;
    assert!(started.elapsed() < Duration::from_secs(3));

    // Item 0: only the hanging source degrades.
    assert_eq!(batch[0].rating("letterboxd"), Some(&RatingValue::Unavailable));
    assert!(batch[0].rating("echo").unwrap().is_available());
    // Everyone else is untouched.
    for e in &batch[1..] {
        assert_eq!(
            e.rating("letterboxd").unwrap().as_rating().unwrap().text,
            "3.50"
        );
    }

    let failures = observer.source_failures.lock().unwrap().clone();
    assert_eq!(failures, vec![("letterboxd".to_string(), 0, "timeout")]);
    assert!(observer.item_failures.lock().unwrap().is_empty());
}

#[tokio::test]
async fn panicking_source_degrades_only_its_own_key() {
    let observer = Arc::new(RecordingObserver::default());
    let srcs = sources(vec![
        Arc::new(PanickySource {
            panic_ids: [2u64].into_iter().collect(),
        }) as SharedSource,
        Arc::new(EchoSource::new("echo")),
    ]);

    let batch = aggregate(
        common::items(4),
        srcs,
        AggregateOptions::default(),
        observer.clone(),
    )
    .await;

    assert_eq!(batch.len(), 4);
    assert_eq!(batch[2].rating("panicky"), Some(&RatingValue::Unavailable));
    assert!(batch[2].rating("echo").unwrap().is_available());
    assert!(batch[1].rating("panicky").unwrap().is_available());

    let failures = observer.source_failures.lock().unwrap().clone();
    assert_eq!(failures, vec![("panicky".to_string(), 2, "panic")]);
}

// Paused clock: the deadline fires deterministically before the 30s stall.
#[tokio::test(start_paused = true)]
async fn batch_deadline_keeps_finished_items_and_degrades_the_rest() {
    let observer = Arc::new(RecordingObserver::default());
    // Item 3 takes far longer than the deadline; the others are instant.
    struct StallOnThree;
    #[async_trait]
    impl movie_ratings::ratings::RatingSource for StallOnThree {
        fn name(&self) -> &str {
            "stall"
        }
        async fn resolve(&self, item: &movie_ratings::CatalogItem) -> RatingValue {
            if item.id == 3 {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            common::rated("6", movie_ratings::ratings::Scale::OutOf10)
        }
    }

    let started = tokio::time::Instant::now();
    let batch = aggregate(
        common::items(6),
        sources(vec![Arc::new(EchoSource::new("echo")) as SharedSource, Arc::new(StallOnThree)]),
        AggregateOptions::default().with_batch_deadline(Duration::from_millis(250)),
        observer.clone(),
    )
    .await;
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(250), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(300), "{elapsed:?}");

    assert_eq!(batch.len(), 6);
    assert!(batch[3].is_fully_unavailable());
    assert_eq!(batch[3].ratings().len(), 2);
    for i in [0usize, 1, 2, 4, 5] {
        assert!(batch[i].rating("stall").unwrap().is_available(), "item {i}");
    }

    let failed = observer.item_failures.lock().unwrap().clone();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, 3);
    assert_eq!(*observer.batches.lock().unwrap(), vec![(6, 1)]);
}

#[tokio::test]
async fn empty_page_yields_empty_batch() {
    let batch = aggregate(
        Vec::new(),
        sources(vec![Arc::new(EchoSource::new("echo")) as SharedSource]),
        AggregateOptions::default(),
        Arc::new(NoopObserver),
    )
    .await;
    assert!(batch.is_empty());
}

/// Counts how many resolves started; each takes 50ms.
#[derive(Default)]
struct CountingSource {
    started: AtomicUsize,
}

#[async_trait]
impl movie_ratings::ratings::RatingSource for CountingSource {
    fn name(&self) -> &str {
        "counting"
    }

    async fn resolve(&self, _item: &movie_ratings::CatalogItem) -> RatingValue {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        common::rated("5", movie_ratings::ratings::Scale::OutOf10)
    }
}

#[tokio::test(start_paused = true)]
async fn dropping_the_batch_future_stops_pending_enrichments() {
    let counting = Arc::new(CountingSource::default());
    let running = aggregate(
        common::items(40),
        sources(vec![counting.clone() as SharedSource]),
        AggregateOptions::default().with_max_concurrent(2),
        Arc::new(NoopObserver),
    );

    // Caller gives up after 60ms: two waves of two items have started by then.
    assert!(tokio::time::timeout(Duration::from_millis(60), running)
        .await
        .is_err());
    let at_drop = counting.started.load(Ordering::SeqCst);
    assert!(at_drop < 40, "all items started before the drop");

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(
        counting.started.load(Ordering::SeqCst),
        at_drop,
        "enrichments kept starting after the batch was dropped"
    );
}
