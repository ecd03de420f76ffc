use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle state of a scheduled item.
///
/// `Completed`, `Cancelled` and `Failed` are terminal: once reached, the
/// state never changes again. A repeating item cycles `Pending` → `Running`
/// → `Pending` until it is cancelled or the scheduler shuts down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    /// Queued, waiting for its due time.
    Pending = 0,
    /// Currently executing on a worker thread.
    Running = 1,
    /// One-shot item finished successfully.
    Completed = 2,
    /// Cancelled before (or between) executions; will never run again.
    Cancelled = 3,
    /// One-shot item's execution faulted.
    Failed = 4,
}

impl TaskState {
    fn from_u8(value: u8) -> TaskState {
        match value {
            0 => TaskState::Pending,
            1 => TaskState::Running,
            2 => TaskState::Completed,
            3 => TaskState::Cancelled,
            _ => TaskState::Failed,
        }
    }

    fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Cancelled | TaskState::Failed
        )
    }
}

/// State shared between a [`TaskHandle`] and the worker pool.
pub(crate) struct HandleInner {
    state: AtomicU8,
    cancelled: AtomicBool,
}

impl HandleInner {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(TaskState::Pending as u8),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Set the cancel flag and move to `Cancelled` unless already terminal.
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.transition(TaskState::Cancelled);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Move to `to` unless the current state is terminal.
    pub(crate) fn transition(&self, to: TaskState) {
        let mut current = self.state.load(Ordering::SeqCst);
        loop {
            if TaskState::from_u8(current).is_terminal() {
                return;
            }
            match self.state.compare_exchange(
                current,
                to as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

/// Caller-visible handle to a scheduled item.
///
/// Returned synchronously from every scheduling call. Cloneable; all clones
/// observe the same item. Cancelling never aborts an execution already in
/// progress — it suppresses every future dispatch of the item.
#[derive(Clone)]
pub struct TaskHandle {
    inner: Arc<HandleInner>,
}

impl TaskHandle {
    pub(crate) fn new(inner: Arc<HandleInner>) -> Self {
        Self { inner }
    }

    /// A handle born cancelled, for submissions rejected after shutdown.
    pub(crate) fn pre_cancelled() -> Self {
        let inner = HandleInner::new();
        inner.cancel();
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Cancel the item. Effective at its next dispatch or reinsertion; an
    /// in-flight execution runs to completion.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        self.inner.state()
    }

    /// Whether the item has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.inner.state().is_terminal()
    }
}
