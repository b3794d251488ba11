//! Crawl coordination
//!
//! One `Crawler` owns the download pool, the extraction pool, and the host
//! gate; each `download` call gets its own `CrawlState` so concurrent calls
//! do not share visited sets or error maps. The recursive loop is: seed task
//! -> gate -> download worker -> extraction worker -> child tasks -> gate,
//! with a latch counting every registered unit of work until the whole graph
//! has settled.

use crate::config::{self, CrawlerConfig};
use crate::crawler::{Document, Downloader, FetchError, HostGate, Job, WorkerPool};
use crate::state::{CompletionGuard, CrawlResult, CrawlState, CrawlTask};
use crate::url::host_of;
use crate::KumoError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A concurrent, depth-bounded web crawler
///
/// Construction spawns both worker pools; `download` may be called any
/// number of times (concurrently, if desired) until `close`.
pub struct Crawler {
    inner: Arc<Inner>,
    closed: AtomicBool,
}

struct Inner {
    downloader: Arc<dyn Downloader>,
    gate: HostGate,
    download_pool: WorkerPool,
    extract_pool: WorkerPool,
}

impl Crawler {
    /// Creates a crawler over the given downloader
    ///
    /// Pool sizes and the per-host cap come from `config` and are validated
    /// here; misconfiguration is the only hard failure in the crawler's
    /// lifetime.
    pub fn new(downloader: Arc<dyn Downloader>, config: &CrawlerConfig) -> Result<Self, KumoError> {
        config::validate_crawler(config)?;

        let download_pool = WorkerPool::new("download", config.download_workers);
        let extract_pool = WorkerPool::new("extract", config.extract_workers);
        let downloads = download_pool
            .sender()
            .expect("freshly created pool is open");
        let gate = HostGate::new(config.max_per_host, downloads);

        tracing::debug!(
            "Crawler ready: {} download workers, {} extract workers, {} per host",
            config.download_workers,
            config.extract_workers,
            config.max_per_host
        );

        Ok(Self {
            inner: Arc::new(Inner {
                downloader,
                gate,
                download_pool,
                extract_pool,
            }),
            closed: AtomicBool::new(false),
        })
    }

    /// Crawls `url` and everything reachable within `depth` hops
    ///
    /// `depth = 1` downloads only the seed; `depth = 2` adds its direct
    /// links, and so on. Blocks cooperatively until every task spawned by
    /// the crawl has finished. Per-URL failures land in the result's error
    /// map; this method itself never fails. Must not be called after
    /// `close`.
    pub async fn download(&self, url: &str, depth: u32) -> CrawlResult {
        tracing::info!("Starting crawl of {} at depth {}", url, depth);
        let state = Arc::new(CrawlState::new());

        self.inner.enqueue(&state, CrawlTask::new(url, depth));
        state.pending.wait().await;

        let result = state.build_result();
        tracing::info!(
            "Crawl of {} finished: {} downloaded, {} failed",
            url,
            result.downloaded.len(),
            result.errors.len()
        );
        result
    }

    /// Shuts down both pools and the gate; idempotent
    ///
    /// Queued download jobs are discarded, queued pool jobs drain, running
    /// jobs finish. A `download` racing with `close` may resolve with a
    /// partial result.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Closing crawler");
        self.inner.gate.close();
        self.inner.download_pool.shutdown();
        self.inner.extract_pool.shutdown();
    }
}

impl Drop for Crawler {
    fn drop(&mut self) {
        self.close();
    }
}

impl Inner {
    /// Admission path for seed and child tasks alike
    ///
    /// A task proceeds only if it has hops left and its URL was not claimed
    /// before. The latch registration happens before the gate sees the job,
    /// and the matching arrival rides a drop guard inside the job, so the
    /// count stays balanced on every path.
    fn enqueue(self: &Arc<Self>, state: &Arc<CrawlState>, task: CrawlTask) {
        if task.depth < 1 || !state.claim(&task.url) {
            return;
        }

        let host = match host_of(&task.url) {
            Ok(host) => host,
            Err(e) => {
                // Malformed URLs never reach the gate
                state.record_error(&task.url, FetchError::Url(e));
                return;
            }
        };

        state.pending.register();
        let done = CompletionGuard::new(Arc::clone(state));
        let job = self.download_job(Arc::clone(state), task, host.clone(), done);
        self.gate.submit(&host, job);
    }

    fn download_job(
        self: &Arc<Self>,
        state: Arc<CrawlState>,
        task: CrawlTask,
        host: String,
        done: CompletionGuard,
    ) -> Job {
        let inner = Arc::clone(self);
        Box::pin(async move {
            let _done = done;
            let _slot = SlotGuard {
                inner: Arc::clone(&inner),
                host,
            };

            match inner.downloader.fetch(&task.url).await {
                Ok(document) => {
                    tracing::debug!("Downloaded {}", task.url);
                    if task.depth > 1 {
                        inner.spawn_extraction(&state, task, document);
                    }
                }
                Err(e) => state.record_error(&task.url, e),
            }
        })
    }

    /// Hands a downloaded document to the extraction pool
    ///
    /// Extraction failures are charged to the parent page; links already
    /// enqueued from other pages are unaffected.
    fn spawn_extraction(
        self: &Arc<Self>,
        state: &Arc<CrawlState>,
        task: CrawlTask,
        document: Box<dyn Document>,
    ) {
        state.pending.register();
        let done = CompletionGuard::new(Arc::clone(state));
        let inner = Arc::clone(self);
        let state = Arc::clone(state);
        let url = task.url.clone();

        let job: Job = Box::pin(async move {
            let _done = done;
            match document.extract_links() {
                Ok(links) => {
                    tracing::debug!("Extracted {} links from {}", links.len(), task.url);
                    for link in links {
                        inner.enqueue(&state, task.child(link));
                    }
                }
                Err(e) => state.record_error(&task.url, e),
            }
        });

        if !self.extract_pool.submit(job) {
            tracing::warn!("Extraction pool closed; links from {} dropped", url);
        }
    }
}

/// Releases the task's host slot when dropped
///
/// Lives inside the download job future so the slot is returned on success,
/// failure, and panic unwinding alike; forgetting it would stall every
/// queued job for the host.
struct SlotGuard {
    inner: Arc<Inner>,
    host: String,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.inner.gate.release(&self.host);
    }
}
