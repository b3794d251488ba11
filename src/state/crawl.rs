use crate::crawler::FetchError;
use crate::state::TaskLatch;
use dashmap::{DashMap, DashSet};
use std::collections::HashMap;
use std::sync::Arc;

/// One unit of crawl work: a URL and the hops remaining for it
///
/// `depth == 1` means the URL itself is downloaded but none of its links are
/// followed. Tasks are immutable once created and discarded after execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    pub url: String,
    pub depth: u32,
}

impl CrawlTask {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }

    /// The task for a link discovered on this task's page
    pub fn child(&self, url: impl Into<String>) -> Self {
        Self::new(url, self.depth - 1)
    }
}

/// Shared bookkeeping for the lifetime of one `download` call
///
/// The visited set is the single point of deduplication: a URL proceeds to
/// admission only if `claim` inserted it. The error map keeps the first
/// failure per URL; later failures for the same URL are dropped. Both are
/// keyed per URL so concurrent writers never contend on a crawl-wide lock.
#[derive(Debug, Default)]
pub struct CrawlState {
    visited: DashSet<String>,
    errors: DashMap<String, FetchError>,
    pub pending: TaskLatch,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a URL for this crawl
    ///
    /// Returns `true` if this caller is the first to see the URL. Exactly
    /// one claimer exists per URL per crawl.
    pub fn claim(&self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    /// Records a per-URL failure; the first failure for a URL wins
    pub fn record_error(&self, url: &str, error: FetchError) {
        tracing::debug!("Recording failure for {}: {}", url, error);
        self.errors.entry(url.to_string()).or_insert(error);
    }

    /// Assembles the final result
    ///
    /// Must only be called after the latch has released: it drains the error
    /// map, and `downloaded` is the visited set minus every URL with a
    /// recorded failure, sorted for deterministic output.
    pub fn build_result(&self) -> CrawlResult {
        let keys: Vec<String> = self.errors.iter().map(|e| e.key().clone()).collect();
        let mut errors = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some((url, error)) = self.errors.remove(&key) {
                errors.insert(url, error);
            }
        }

        let mut downloaded: Vec<String> = self
            .visited
            .iter()
            .filter(|url| !errors.contains_key(url.key().as_str()))
            .map(|url| url.key().clone())
            .collect();
        downloaded.sort();

        CrawlResult { downloaded, errors }
    }
}

/// Outcome of one `download` call
///
/// A URL never appears in both `downloaded` and `errors`.
#[derive(Debug)]
pub struct CrawlResult {
    /// URLs fetched successfully, sorted
    pub downloaded: Vec<String>,

    /// First failure per failing URL
    pub errors: HashMap<String, FetchError>,
}

/// Arrives at the crawl latch when dropped
///
/// Every registered task moves one of these into its job future, so the
/// matching `arrive` happens on every exit path: normal completion, a
/// recorded failure, a panic unwinding through the job, or the job being
/// dropped unpolled because a pool was shut down.
pub(crate) struct CompletionGuard {
    state: Arc<CrawlState>,
}

impl CompletionGuard {
    pub(crate) fn new(state: Arc<CrawlState>) -> Self {
        Self { state }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.state.pending.arrive();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_is_first_writer_wins() {
        let state = CrawlState::new();
        assert!(state.claim("https://example.com/"));
        assert!(!state.claim("https://example.com/"));
        assert!(state.claim("https://example.com/other"));
    }

    #[test]
    fn test_first_error_wins() {
        let state = CrawlState::new();
        state.claim("https://example.com/");
        state.record_error("https://example.com/", FetchError::Status(404));
        state.record_error("https://example.com/", FetchError::Status(500));

        let result = state.build_result();
        match result.errors.get("https://example.com/") {
            Some(FetchError::Status(404)) => {}
            other => panic!("expected first recorded error, got {:?}", other),
        }
    }

    #[test]
    fn test_result_excludes_failed_urls() {
        let state = CrawlState::new();
        state.claim("https://a.test/");
        state.claim("https://b.test/");
        state.record_error("https://b.test/", FetchError::Status(503));

        let result = state.build_result();
        assert_eq!(result.downloaded, vec!["https://a.test/".to_string()]);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors.contains_key("https://b.test/"));
    }

    #[test]
    fn test_downloaded_is_sorted() {
        let state = CrawlState::new();
        state.claim("https://c.test/");
        state.claim("https://a.test/");
        state.claim("https://b.test/");

        let result = state.build_result();
        assert_eq!(
            result.downloaded,
            vec![
                "https://a.test/".to_string(),
                "https://b.test/".to_string(),
                "https://c.test/".to_string(),
            ]
        );
    }

    #[test]
    fn test_child_task_depth() {
        let task = CrawlTask::new("https://a.test/", 3);
        let child = task.child("https://a.test/next");
        assert_eq!(child.depth, 2);
        assert_eq!(child.url, "https://a.test/next");
    }

    #[tokio::test]
    async fn test_completion_guard_arrives_on_drop() {
        let state = Arc::new(CrawlState::new());
        state.pending.register();
        let guard = CompletionGuard::new(Arc::clone(&state));
        assert_eq!(state.pending.outstanding(), 1);
        drop(guard);
        assert_eq!(state.pending.outstanding(), 0);
    }
}
