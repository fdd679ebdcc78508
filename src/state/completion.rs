use std::sync::Arc;
use tokio::sync::watch;

/// Counts pending pipeline tasks and wakes waiters when the count hits zero
///
/// Every task increments the counter when it is created, before it is
/// handed to a pool, and decrements it exactly once when it terminates.
/// The count is zero only when nothing is queued or running.
///
/// The counter lives in a `watch` channel, so checking for zero and
/// waiting for the next change happen atomically inside `wait_for` and no
/// wakeup can be missed.
#[derive(Debug)]
pub struct CompletionTracker {
    pending: watch::Sender<usize>,
}

impl CompletionTracker {
    /// Creates a tracker with no pending tasks
    pub fn new() -> Self {
        let (pending, _) = watch::channel(0);
        Self { pending }
    }

    /// Registers a new task
    pub fn task_started(&self) {
        self.pending.send_modify(|n| *n += 1);
    }

    /// Marks one task as terminated, waking waiters if none remain
    pub fn task_finished(&self) {
        self.pending.send_modify(|n| {
            debug_assert!(*n > 0, "task finished more often than started");
            *n = n.saturating_sub(1);
        });
    }

    /// Registers a new task and returns the guard that finishes it on drop
    pub fn track(self: &Arc<Self>) -> PendingTask {
        self.task_started();
        PendingTask {
            tracker: Arc::clone(self),
        }
    }

    /// Current number of pending tasks
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Waits until no task is pending
    ///
    /// Returns immediately if the count is already zero. The future is
    /// cancel-safe: dropping it consumes nothing, so callers can race it
    /// against a cancellation signal.
    pub async fn await_zero(&self) {
        let mut rx = self.pending.subscribe();
        // The sender is owned by self, so the channel cannot close here
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl Default for CompletionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// One task's contribution to a `CompletionTracker`
///
/// Dropping the guard marks the task finished. Tasks own their guard, so a
/// task that completes, is rejected by a closed pool, or panics is counted
/// down exactly once.
#[derive(Debug)]
pub struct PendingTask {
    tracker: Arc<CompletionTracker>,
}

impl Drop for PendingTask {
    fn drop(&mut self) {
        self.tracker.task_finished();
    }
}
