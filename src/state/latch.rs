use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// A dynamic join barrier over a growing set of tasks
///
/// Unlike a wait group sized up front, tasks may register more tasks while
/// running; `wait` resolves once every registered task has arrived. Each
/// `register` must be matched by exactly one `arrive`, including on error
/// paths, or `wait` never resolves.
#[derive(Debug, Default)]
pub struct TaskLatch {
    count: AtomicUsize,
    zero: Notify,
}

impl TaskLatch {
    /// Creates a latch with no registered tasks
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one task
    pub fn register(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    /// Marks one registered task as finished
    ///
    /// Wakes all waiters when the last outstanding task arrives.
    pub fn arrive(&self) {
        let prev = self.count.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(prev > 0, "arrive without a matching register");
        if prev == 1 {
            self.zero.notify_waiters();
        }
    }

    /// Returns the number of tasks registered but not yet arrived
    pub fn outstanding(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Waits until every registered task has arrived
    ///
    /// Returns immediately if no tasks are outstanding. The notified future
    /// is created before the count is checked so an `arrive` racing with the
    /// check cannot be missed.
    pub async fn wait(&self) {
        loop {
            let notified = self.zero.notified();
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_on_empty_latch_returns_immediately() {
        let latch = TaskLatch::new();
        latch.wait().await;
    }

    #[tokio::test]
    async fn test_wait_blocks_until_arrival() {
        let latch = Arc::new(TaskLatch::new());
        latch.register();

        let waiter = {
            let latch = Arc::clone(&latch);
            tokio::spawn(async move { latch.wait().await })
        };

        // Give the waiter time to park
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        latch.arrive();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("latch never released")
            .unwrap();
    }

    #[tokio::test]
    async fn test_tasks_registered_while_running() {
        let latch = Arc::new(TaskLatch::new());
        latch.register();

        {
            let latch = Arc::clone(&latch);
            tokio::spawn(async move {
                // A running task spawns two more before arriving
                for _ in 0..2 {
                    latch.register();
                    let latch = Arc::clone(&latch);
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        latch.arrive();
                    });
                }
                latch.arrive();
            });
        }

        tokio::time::timeout(Duration::from_secs(1), latch.wait())
            .await
            .expect("latch never released");
        assert_eq!(latch.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_many_concurrent_arrivals() {
        let latch = Arc::new(TaskLatch::new());
        for _ in 0..100 {
            latch.register();
        }
        for _ in 0..100 {
            let latch = Arc::clone(&latch);
            tokio::spawn(async move { latch.arrive() });
        }
        tokio::time::timeout(Duration::from_secs(1), latch.wait())
            .await
            .expect("latch never released");
    }
}
