// tests/metrics.rs
//
// One test per binary: the Prometheus recorder is process-global.

mod common;

use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use reqwest::StatusCode as UpstreamStatus;
use tower::ServiceExt;

use common::{PanickySource, StubDiscovery};
use movie_ratings::discovery::DiscoveryError;
use movie_ratings::metrics::Metrics;
use movie_ratings::observe::TracingObserver;
use movie_ratings::ratings::SharedSource;
use movie_ratings::{AggregateOptions, CatalogService, PageRequest};

#[tokio::test]
async fn metrics_endpoint_exposes_pipeline_series() {
    let options = AggregateOptions::default().with_max_concurrent(7);
    let metrics = Metrics::init(&options).expect("install recorder");

    let panicky = || {
        vec![Arc::new(PanickySource {
            panic_ids: [1u64].into_iter().collect(),
        }) as SharedSource]
    };

    let ok = CatalogService::new(
        StubDiscovery::ok(common::items(3)),
        panicky(),
        options,
        TracingObserver::shared(),
    );
    let ranked = ok.ranked_page(&PageRequest::default()).await.unwrap();
    assert_eq!(ranked.len(), 3);

    let failing = CatalogService::new(
        StubDiscovery::failing(DiscoveryError::new(UpstreamStatus::BAD_GATEWAY, "down")),
        panicky(),
        options,
        TracingObserver::shared(),
    );
    assert!(failing.ranked_page(&PageRequest::default()).await.is_err());

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    // axum::body::to_bytes requires an explicit limit
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "ratings_max_concurrent 7",
        "ratings_source_errors_total{",
        "kind=\"panic\"",
        "ratings_discovery_errors_total",
        "ratings_items_total 3",
        "ratings_batch_ms{quantile=",
    ] {
        assert!(
            text.contains(needle),
            "metrics exposition missing '{needle}'\n{text}"
        );
    }
}
