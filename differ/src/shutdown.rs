//! Ctrl-C bookkeeping shared by the signal watcher, the terminal key
//! reader and the pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;

/// Counts interrupt requests. Cheap to clone; all clones share one counter.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    count: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one interrupt and wake anyone waiting. Returns the new total.
    pub fn trigger(&self) -> usize {
        let count = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        info!(count, "interrupt received");
        self.notify.notify_waiters();
        count
    }

    pub fn is_set(&self) -> bool {
        self.count() > 0
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Resolve once more than `seen` interrupts have been recorded.
    pub async fn beyond(&self, seen: usize) {
        loop {
            let notified = self.notify.notified();
            if self.count() > seen {
                return;
            }
            notified.await;
        }
    }
}

/// Forward process Ctrl-C signals into `interrupt` until the runtime shuts down.
pub fn watch_ctrl_c(interrupt: Interrupt) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            interrupt.trigger();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn clones_share_the_count() {
        let interrupt = Interrupt::new();
        assert!(!interrupt.is_set());
        let other = interrupt.clone();
        assert_eq!(other.trigger(), 1);
        assert!(interrupt.is_set());
        assert_eq!(interrupt.trigger(), 2);
        assert_eq!(other.count(), 2);
    }

    #[tokio::test]
    async fn beyond_returns_immediately_when_already_past() {
        let interrupt = Interrupt::new();
        interrupt.trigger();
        tokio::time::timeout(Duration::from_millis(100), interrupt.beyond(0))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn beyond_waits_for_a_new_trigger() {
        let interrupt = Interrupt::new();
        interrupt.trigger();

        let waiter = interrupt.clone();
        let task = tokio::spawn(async move { waiter.beyond(1).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!task.is_finished());

        interrupt.trigger();
        tokio::time::timeout(Duration::from_millis(500), task)
            .await
            .unwrap()
            .unwrap();
    }
}
