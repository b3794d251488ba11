//! Fixed-size worker pools
//!
//! Both crawl stages run on a `WorkerPool`: a bounded set of workers pulling
//! boxed job futures off a shared unbounded queue. Parallelism is bounded by
//! the worker count, not one task per URL, so a large frontier cannot spawn
//! an unbounded number of in-flight fetches.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// A unit of work executed by a pool worker
pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A fixed number of workers draining a shared job queue
///
/// Workers execute jobs one at a time; a submitted job waits in the queue
/// until a worker frees up. Shutting the pool down closes the queue: queued
/// jobs still drain, further submissions are rejected, and workers exit once
/// the queue empties.
pub struct WorkerPool {
    tx: Mutex<Option<UnboundedSender<Job>>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns a pool with `size` workers
    ///
    /// `name` labels the workers in log output.
    pub fn new(name: &'static str, size: usize) -> Self {
        assert!(size > 0, "worker pool needs at least one worker");

        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let workers = (0..size)
            .map(|id| {
                let rx = Arc::clone(&rx);
                tokio::spawn(worker_loop(name, id, rx))
            })
            .collect();

        Self {
            tx: Mutex::new(Some(tx)),
            workers,
        }
    }

    /// Queues a job for execution
    ///
    /// Returns `false` if the pool has been shut down; the job is dropped,
    /// which still runs any completion guards it captured.
    pub fn submit(&self, job: Job) -> bool {
        let guard = self.tx.lock().expect("pool sender lock poisoned");
        match guard.as_ref() {
            Some(tx) => tx.send(job).is_ok(),
            None => false,
        }
    }

    /// A handle for submitting jobs without holding the pool itself
    pub fn sender(&self) -> Option<UnboundedSender<Job>> {
        self.tx.lock().expect("pool sender lock poisoned").clone()
    }

    /// Stops accepting new jobs; queued jobs drain, then workers exit
    ///
    /// Safe to call more than once. Workers are not interrupted mid-job.
    pub fn shutdown(&self) {
        if self.tx.lock().expect("pool sender lock poisoned").take().is_some() {
            tracing::debug!("Worker pool shutting down");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Pulls jobs off the shared queue until it is closed and drained
///
/// Each job runs as its own tokio task so a panicking job is logged and the
/// worker survives to take the next one.
async fn worker_loop(
    name: &'static str,
    id: usize,
    rx: Arc<tokio::sync::Mutex<UnboundedReceiver<Job>>>,
) {
    loop {
        let job = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };

        let Some(job) = job else {
            tracing::trace!("{} worker {} exiting", name, id);
            return;
        };

        if let Err(e) = tokio::spawn(job).await {
            if e.is_panic() {
                tracing::error!("{} worker {}: job panicked: {}", name, id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_executes_all_jobs() {
        let pool = WorkerPool::new("test", 4);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..50 {
            let counter = Arc::clone(&counter);
            assert!(pool.submit(Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })));
        }

        // Workers drain the queue shortly after submission
        tokio::time::timeout(Duration::from_secs(2), async {
            while counter.load(Ordering::SeqCst) < 50 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("jobs never finished");
    }

    #[tokio::test]
    async fn test_parallelism_bounded_by_worker_count() {
        let pool = WorkerPool::new("test", 2);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..10 {
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            let done = Arc::clone(&done);
            pool.submit(Box::pin(async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                done.fetch_add(1, Ordering::SeqCst);
            }));
        }

        tokio::time::timeout(Duration::from_secs(5), async {
            while done.load(Ordering::SeqCst) < 10 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("jobs never finished");

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_rejected() {
        let pool = WorkerPool::new("test", 1);
        pool.shutdown();
        assert!(!pool.submit(Box::pin(async {})));
        // Idempotent
        pool.shutdown();
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_kill_worker() {
        let pool = WorkerPool::new("test", 1);
        let counter = Arc::new(AtomicUsize::new(0));

        pool.submit(Box::pin(async { panic!("boom") }));
        let c = Arc::clone(&counter);
        pool.submit(Box::pin(async move {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        tokio::time::timeout(Duration::from_secs(2), async {
            while counter.load(Ordering::SeqCst) < 1 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("worker died after a panicking job");
    }
}
