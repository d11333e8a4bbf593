//! Timer coalescing.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Runs only the most recent of a burst of scheduled actions.
///
/// Each [`schedule`](Debouncer::schedule) aborts the previous pending action,
/// so an action runs only if no newer one arrives within its delay. Dropping
/// the debouncer cancels whatever is still pending.
#[derive(Debug, Default)]
pub struct Debouncer {
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any pending action with `action`, to run after `delay`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });
        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Drops the pending action, if any. Safe to call at any time.
    pub fn cancel(&self) {
        if let Some(task) = self.pending.lock().unwrap_or_else(PoisonError::into_inner).take() {
            task.abort();
        }
    }

    /// Whether an action is scheduled and has not run yet.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_burst_runs_last_action_once() {
        let debouncer = Debouncer::new();
        let runs = Arc::new(Mutex::new(Vec::new()));

        for value in ["h", "he", "hel", "hell", "hello"] {
            let runs = Arc::clone(&runs);
            debouncer.schedule(Duration::from_millis(500), move || {
                runs.lock().unwrap().push(value);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(runs.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(*runs.lock().unwrap(), vec!["hello"]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_windows_each_run() {
        let debouncer = Debouncer::new();
        let runs = Arc::new(Mutex::new(0));

        for _ in 0..2 {
            let runs = Arc::clone(&runs);
            debouncer.schedule(Duration::from_millis(50), move || {
                *runs.lock().unwrap() += 1;
            });
            tokio::time::sleep(Duration::from_millis(60)).await;
        }
        assert_eq!(*runs.lock().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let debouncer = Debouncer::new();
        let runs = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&runs);
        debouncer.schedule(Duration::from_millis(10), move || {
            *counter.lock().unwrap() += 1;
        });
        assert!(debouncer.is_pending());

        debouncer.cancel();
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*runs.lock().unwrap(), 0);

        // Cancelling after nothing is pending is still fine.
        debouncer.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_action() {
        let runs = Arc::new(Mutex::new(0));
        {
            let debouncer = Debouncer::new();
            let counter = Arc::clone(&runs);
            debouncer.schedule(Duration::from_millis(10), move || {
                *counter.lock().unwrap() += 1;
            });
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*runs.lock().unwrap(), 0);
    }
}
