//! Per-host admission control
//!
//! The gate sits between task creation and the download pool: at most
//! `per_host` download jobs for one host are in the pool at a time, and
//! overflow waits in that host's FIFO queue. Releasing a finished job's slot
//! hands it straight to the oldest queued job for the host, so arrival order
//! per host is preserved.

use crate::crawler::Job;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;

/// Per-host admission state
///
/// `active` counts jobs currently admitted to the download pool for this
/// host; `pending` holds jobs waiting for a slot, oldest first. Records are
/// created on first sight of a host and kept for the life of the gate.
#[derive(Default)]
struct HostRecord {
    active: usize,
    pending: VecDeque<Job>,
}

/// Admits or queues download jobs so each host sees bounded concurrency
///
/// Each record sits behind its own lock inside a concurrent map, so
/// admission for one host never contends with another. The gate performs no
/// I/O; its only obligation is that every admitted job is eventually
/// dispatched, which holds as long as `release` is called once per admitted
/// job.
pub struct HostGate {
    per_host: usize,
    hosts: DashMap<String, Mutex<HostRecord>>,
    downloads: Mutex<Option<UnboundedSender<Job>>>,
}

impl HostGate {
    /// Creates a gate dispatching admitted jobs to `downloads`
    pub fn new(per_host: usize, downloads: UnboundedSender<Job>) -> Self {
        assert!(per_host > 0, "per-host limit must be positive");
        Self {
            per_host,
            hosts: DashMap::new(),
            downloads: Mutex::new(Some(downloads)),
        }
    }

    /// Submits a ready job for `host`
    ///
    /// Dispatches immediately if the host has a free slot, otherwise queues
    /// the job behind earlier arrivals for the same host.
    pub fn submit(&self, host: &str, job: Job) {
        let Some(tx) = self.sender() else {
            // Gate closed; dropping the job runs its completion guard
            tracing::warn!("Dropping job for {}: gate is closed", host);
            return;
        };

        let record = self.hosts.entry(host.to_string()).or_default();
        let mut record = record.lock().expect("host record lock poisoned");
        if record.active < self.per_host {
            record.active += 1;
            if tx.send(job).is_err() {
                tracing::warn!("Download pool rejected job for {}", host);
            }
        } else {
            record.pending.push_back(job);
            tracing::trace!(
                "Queued job for {} ({} waiting)",
                host,
                record.pending.len()
            );
        }
    }

    /// Releases the slot of a finished job for `host`
    ///
    /// If jobs are queued for the host the oldest takes over the slot (one
    /// finished, one started, `active` unchanged); otherwise the slot is
    /// freed. Must be called exactly once per admitted job.
    pub fn release(&self, host: &str) {
        let Some(record) = self.hosts.get(host) else {
            debug_assert!(false, "release for a host never submitted");
            return;
        };
        let mut record = record.lock().expect("host record lock poisoned");

        match record.pending.pop_front() {
            Some(job) => match self.sender() {
                Some(tx) if tx.send(job).is_ok() => {}
                _ => {
                    // Closed mid-crawl: discard the queued job, free the slot
                    record.active -= 1;
                }
            },
            None => record.active -= 1,
        }
    }

    /// Stops dispatching and discards every queued job
    ///
    /// Dropped jobs still run their completion guards, so the crawl's join
    /// counter is not leaked.
    pub fn close(&self) {
        self.downloads
            .lock()
            .expect("gate sender lock poisoned")
            .take();

        for record in self.hosts.iter() {
            record
                .lock()
                .expect("host record lock poisoned")
                .pending
                .clear();
        }
    }

    fn sender(&self) -> Option<UnboundedSender<Job>> {
        self.downloads
            .lock()
            .expect("gate sender lock poisoned")
            .clone()
    }
}
