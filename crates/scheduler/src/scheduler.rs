//! Public scheduling façade and builder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::handle::{HandleInner, TaskHandle};
use crate::metrics::SchedulerMetrics;
use crate::pool::WorkerPool;
use crate::shutdown;
use crate::task::Task;

// ── Builder ──────────────────────────────────────────────────────────

/// Fluent builder for constructing a [`Scheduler`].
///
/// # Example
/// ```
/// # use metronome_scheduler::Scheduler;
/// let scheduler = Scheduler::builder()
///     .capacity(2)
///     .thread_name_prefix("worker")
///     .build()
///     .unwrap();
/// # scheduler.on_program_exit();
/// ```
pub struct SchedulerBuilder {
    capacity: usize,
    thread_name_prefix: String,
    grace_period: Duration,
}

impl SchedulerBuilder {
    pub fn new() -> Self {
        Self {
            capacity: 4,
            thread_name_prefix: "metronome".to_string(),
            grace_period: shutdown::DEFAULT_GRACE_PERIOD,
        }
    }

    /// Set the worker thread count (must be greater than zero).
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the prefix used in worker thread names.
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Override the shutdown grace period (default: 60s).
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    /// Spawn the worker pool and return the scheduler.
    pub fn build(self) -> Result<Scheduler, SchedulerError> {
        if self.capacity == 0 {
            return Err(SchedulerError::InvalidCapacity);
        }
        let pool = WorkerPool::start(self.capacity, &self.thread_name_prefix)?;
        info!(
            capacity = self.capacity,
            prefix = %self.thread_name_prefix,
            "scheduler started"
        );
        Ok(Scheduler {
            pool,
            disposed: AtomicBool::new(false),
            thread_name_prefix: self.thread_name_prefix,
            grace_period: self.grace_period,
        })
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ── Scheduler ────────────────────────────────────────────────────────

/// Bounded-capacity task scheduler over a fixed pool of worker threads.
///
/// Every scheduling call returns a [`TaskHandle`] synchronously. After
/// [`on_program_exit`](Scheduler::on_program_exit) has been called, further
/// scheduling calls still return `Ok` — with a handle already in
/// [`Cancelled`](crate::TaskState::Cancelled) state — so shutdown races
/// never cascade into caller failures. That is the documented contract, not
/// an incidental behavior.
pub struct Scheduler {
    pool: Arc<WorkerPool>,
    disposed: AtomicBool,
    thread_name_prefix: String,
    grace_period: Duration,
}

impl Scheduler {
    pub fn builder() -> SchedulerBuilder {
        SchedulerBuilder::new()
    }

    /// Build a scheduler from a [`SchedulerConfig`].
    pub fn from_config(config: &SchedulerConfig) -> Result<Self, SchedulerError> {
        Self::builder()
            .capacity(config.capacity)
            .thread_name_prefix(config.thread_name_prefix.clone())
            .grace_period(Duration::from_secs(config.grace_period_seconds))
            .build()
    }

    /// Schedule `task` to run every `period`, first at `now + init_delay`.
    ///
    /// Fixed-rate semantics: each next due time is the previous due time
    /// plus `period`, so schedule slip does not accumulate; a run that
    /// overruns its period is followed by immediate back-to-back catch-up
    /// runs, but two runs of the same item never overlap.
    pub fn schedule_repeated(
        &self,
        init_delay: Duration,
        period: Duration,
        task: impl Task + 'static,
    ) -> Result<TaskHandle, SchedulerError> {
        if period.is_zero() {
            return Err(SchedulerError::InvalidPeriod);
        }
        Ok(self.submit(Arc::new(task), init_delay, Some(period)))
    }

    /// Schedule `task` to run once at `now + delay`. The task may start
    /// later than that if no worker is free, never earlier.
    pub fn schedule_delayed(
        &self,
        delay: Duration,
        task: impl Task + 'static,
    ) -> Result<TaskHandle, SchedulerError> {
        Ok(self.submit(Arc::new(task), delay, None))
    }

    /// Run `task` once, as soon as a worker is free. No ordering guarantee
    /// relative to other pending items beyond due time.
    pub fn execute_now(&self, task: impl Task + 'static) -> Result<TaskHandle, SchedulerError> {
        self.schedule_delayed(Duration::ZERO, task)
    }

    /// Begin the graceful-then-forced shutdown sequence.
    ///
    /// Idempotent and concurrency-safe: the first caller kicks off a
    /// dedicated termination thread and returns immediately; every later
    /// call is a no-op. In-flight and queued one-shot work gets up to the
    /// grace period to finish before termination is forced.
    pub fn on_program_exit(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        shutdown::spawn_termination(
            Arc::clone(&self.pool),
            self.grace_period,
            &self.thread_name_prefix,
        );
    }

    /// Whether shutdown has been initiated.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Snapshot of the current scheduler metrics.
    pub fn metrics(&self) -> SchedulerMetrics {
        self.pool.metrics_snapshot()
    }

    fn submit(
        &self,
        task: Arc<dyn Task>,
        delay: Duration,
        period: Option<Duration>,
    ) -> TaskHandle {
        if self.disposed.load(Ordering::SeqCst) {
            debug!(task = task.name(), "submission after shutdown rejected");
            self.pool.record_rejected();
            return TaskHandle::pre_cancelled();
        }
        let inner = Arc::new(HandleInner::new());
        if self.pool.submit(task, delay, period, Arc::clone(&inner)) {
            TaskHandle::new(inner)
        } else {
            // The pool began draining between the disposed check and the
            // enqueue; same contract as the disposed path.
            self.pool.record_rejected();
            TaskHandle::pre_cancelled()
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // A scheduler dropped without on_program_exit would leave its
        // workers parked forever; stop them outright. If shutdown is
        // already underway the coordinator thread owns termination.
        if !self.disposed.swap(true, Ordering::SeqCst) {
            self.pool.begin_drain();
            self.pool.terminate();
        }
    }
}
