//! # Worker offload
//! Runs page aggregation on a dedicated OS thread with its own single-threaded
//! runtime, so a large fan-out never competes with request handling.
//! Requests go in over an mpsc channel; each answer comes back on a oneshot.

use std::thread;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};

use crate::catalog::PageRequest;
use crate::discovery::DiscoveryError;
use crate::rank::RankedItem;
use crate::service::CatalogService;

const QUEUE_DEPTH: usize = 32;

type Reply = Result<Vec<RankedItem>, DiscoveryError>;

struct Job {
    request: PageRequest,
    reply: oneshot::Sender<Reply>,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("aggregator worker stopped")]
    Stopped,
}

pub struct AggregatorWorker {
    tx: mpsc::Sender<Job>,
    thread: thread::JoinHandle<()>,
}

impl AggregatorWorker {
    pub fn spawn(service: CatalogService) -> Result<Self> {
        let (tx, mut rx) = mpsc::channel::<Job>(QUEUE_DEPTH);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("building worker runtime")?;

        let thread = thread::Builder::new()
            .name("aggregator-worker".into())
            .spawn(move || {
                runtime.block_on(async move {
                    while let Some(job) = rx.recv().await {
                        let service = service.clone();
                        // Jobs interleave on the worker runtime.
                        tokio::spawn(async move {
                            let out = service.ranked_page(&job.request).await;
                            let _ = job.reply.send(out);
                        });
                    }
                });
                tracing::debug!(target: "ratings", "aggregator worker exiting");
            })
            .context("spawning aggregator worker thread")?;

        Ok(Self { tx, thread })
    }

    pub async fn submit(&self, request: PageRequest) -> Result<Vec<RankedItem>, WorkerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Job { request, reply })
            .await
            .map_err(|_| WorkerError::Stopped)?;
        let out = rx.await.map_err(|_| WorkerError::Stopped)?;
        Ok(out?)
    }

    /// Close the queue and wait for the thread. Blocks; call off the async runtime.
    pub fn shutdown(self) {
        let Self { tx, thread } = self;
        drop(tx);
        if thread.join().is_err() {
            tracing::warn!(target: "ratings", "aggregator worker panicked");
        }
    }
}
