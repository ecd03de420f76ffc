//! Fixed-size worker pool over a due-time-ordered queue.
//!
//! `capacity` named OS threads share one [`BinaryHeap`] of [`WorkItem`]s,
//! min-ordered by due time with FIFO tie-break by insertion sequence. The
//! heap and pool phase live under a single [`Mutex`] paired with a
//! [`Condvar`], so a submission can wake a worker parked on a later due
//! time and earliest-due-first dispatch is preserved.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::SchedulerError;
use crate::handle::{HandleInner, TaskState};
use crate::metrics::SchedulerMetrics;
use crate::task::{Task, TaskError};

// ── Work item ────────────────────────────────────────────────────────

/// Internal wrapper pairing a task with its due time and repeat policy.
pub(crate) struct WorkItem {
    /// Absolute instant when the item becomes eligible to run.
    due: Instant,
    /// Insertion order, breaks ties among equal due times (FIFO).
    sequence: u64,
    /// `None` for one-shot; `Some(p)` reschedules at `due + p` (fixed rate).
    period: Option<Duration>,
    task: Arc<dyn Task>,
    handle: Arc<HandleInner>,
}

// BinaryHeap is a max-heap; invert the ordering so the earliest due time
// (then the lowest sequence) sits at the top.
impl Ord for WorkItem {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for WorkItem {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for WorkItem {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.sequence == other.sequence
    }
}

impl Eq for WorkItem {}

// ── Pool phase ───────────────────────────────────────────────────────

/// Lifecycle phase of the pool. Draining stops intake and periodic
/// reinsertion; Terminated drops the queue and exits the workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PoolPhase {
    Running,
    Draining,
    Terminated,
}

struct PoolState {
    queue: BinaryHeap<WorkItem>,
    phase: PoolPhase,
    /// Handles of items currently executing, one per busy worker. Kept so
    /// forced termination can cancel in-flight work it cannot preempt.
    running: Vec<Arc<HandleInner>>,
    next_sequence: u64,
}

// ── Worker pool ──────────────────────────────────────────────────────

pub(crate) struct WorkerPool {
    state: Mutex<PoolState>,
    work_available: Condvar,
    metrics: RwLock<SchedulerMetrics>,
}

impl WorkerPool {
    /// Spawn `capacity` workers named `{prefix}-{index}`.
    pub(crate) fn start(capacity: usize, prefix: &str) -> Result<Arc<Self>, SchedulerError> {
        let pool = Arc::new(WorkerPool {
            state: Mutex::new(PoolState {
                queue: BinaryHeap::new(),
                phase: PoolPhase::Running,
                running: Vec::new(),
                next_sequence: 0,
            }),
            work_available: Condvar::new(),
            metrics: RwLock::new(SchedulerMetrics::default()),
        });

        for index in 0..capacity {
            let worker = Arc::clone(&pool);
            thread::Builder::new()
                .name(format!("{prefix}-{index}"))
                .spawn(move || worker.worker_loop())?;
        }
        debug!(capacity, prefix, "worker pool started");
        Ok(pool)
    }

    /// Enqueue an item. Returns `false` without enqueuing once shutdown has
    /// begun; the façade turns that into a pre-cancelled handle.
    pub(crate) fn submit(
        &self,
        task: Arc<dyn Task>,
        delay: Duration,
        period: Option<Duration>,
        handle: Arc<HandleInner>,
    ) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.phase != PoolPhase::Running {
            return false;
        }
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.queue.push(WorkItem {
            due: Instant::now() + delay,
            sequence,
            period,
            task,
            handle,
        });
        drop(state);

        self.metrics.write().unwrap().tasks_submitted += 1;
        // Wake a parked worker: the new item may be due earlier than the
        // head it was parked on.
        self.work_available.notify_one();
        true
    }

    /// Note a submission refused because shutdown had begun.
    pub(crate) fn record_rejected(&self) {
        self.metrics.write().unwrap().tasks_rejected += 1;
    }

    /// Snapshot the metrics, including live queue depth and active count.
    pub(crate) fn metrics_snapshot(&self) -> SchedulerMetrics {
        let (depth, active) = {
            let state = self.state.lock().unwrap();
            (state.queue.len(), state.running.len())
        };
        let mut snapshot = self.metrics.read().unwrap().clone();
        snapshot.queue_depth = depth;
        snapshot.active_workers = active;
        snapshot
    }

    // ── Shutdown surface (driven by the coordinator) ─────────────────

    /// Stop intake and cancel queued periodic items; queued one-shots keep
    /// their due times. Returns `(queue_depth, active_workers)` at the
    /// moment draining begins.
    pub(crate) fn begin_drain(&self) -> (usize, usize) {
        let mut state = self.state.lock().unwrap();
        let mut dropped = 0u64;
        if state.phase == PoolPhase::Running {
            state.phase = PoolPhase::Draining;
            let mut kept = Vec::new();
            for item in std::mem::take(&mut state.queue) {
                if item.period.is_some() {
                    item.handle.cancel();
                    dropped += 1;
                } else {
                    kept.push(item);
                }
            }
            state.queue = BinaryHeap::from(kept);
        }
        let counts = (state.queue.len(), state.running.len());
        drop(state);

        if dropped > 0 {
            self.metrics.write().unwrap().tasks_cancelled += dropped;
        }
        self.work_available.notify_all();
        counts
    }

    /// Whether the queue is empty and every worker idle.
    pub(crate) fn is_drained(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.queue.is_empty() && state.running.is_empty()
    }

    /// Flip to Terminated, drop whatever is still queued and cancel the
    /// handles of in-flight executions, then wake every worker so it can
    /// exit. A thread mid-run cannot be preempted; its handle reports
    /// `Cancelled` and its reinsertion/completion is suppressed, which is
    /// as close to interruption as native threads allow. Returns the
    /// number of workers still executing at that moment.
    pub(crate) fn terminate(&self) -> usize {
        let mut state = self.state.lock().unwrap();
        state.phase = PoolPhase::Terminated;
        let mut dropped = 0u64;
        for item in std::mem::take(&mut state.queue) {
            item.handle.cancel();
            dropped += 1;
        }
        for handle in &state.running {
            handle.cancel();
        }
        let active = state.running.len();
        drop(state);

        if dropped > 0 {
            self.metrics.write().unwrap().tasks_cancelled += dropped;
        }
        self.work_available.notify_all();
        active
    }

    // ── Dispatch loop ────────────────────────────────────────────────

    fn worker_loop(&self) {
        let mut state = self.state.lock().unwrap();
        loop {
            if state.phase == PoolPhase::Terminated {
                return;
            }

            // Discard cancelled items sitting at the head.
            let mut discarded = 0u64;
            while state
                .queue
                .peek()
                .is_some_and(|item| item.handle.is_cancelled())
            {
                if let Some(item) = state.queue.pop() {
                    debug!(task = item.task.name(), "dropping cancelled item");
                    discarded += 1;
                }
            }
            if discarded > 0 {
                // Bump metrics outside the state lock, like submit/terminate.
                drop(state);
                self.metrics.write().unwrap().tasks_cancelled += discarded;
                state = self.state.lock().unwrap();
                continue;
            }

            let now = Instant::now();
            let head_due = state.queue.peek().map(|item| item.due);
            match head_due {
                Some(due) if due <= now => {
                    if let Some(item) = state.queue.pop() {
                        let running = Arc::clone(&item.handle);
                        state.running.push(Arc::clone(&running));
                        drop(state);
                        self.run_item(item);
                        state = self.state.lock().unwrap();
                        if let Some(pos) = state
                            .running
                            .iter()
                            .position(|h| Arc::ptr_eq(h, &running))
                        {
                            state.running.swap_remove(pos);
                        }
                    }
                }
                Some(due) => {
                    // Park until the head is due or a submission wakes us.
                    let (guard, _) = self
                        .work_available
                        .wait_timeout(state, due - now)
                        .unwrap();
                    state = guard;
                }
                None => {
                    state = self.work_available.wait(state).unwrap();
                }
            }
        }
    }

    /// Execute one item on the calling worker thread, then reinsert it if
    /// it repeats. Faults (error returns and panics) are contained here and
    /// never unwind into the worker.
    fn run_item(&self, item: WorkItem) {
        // A cancel may have landed between pop and dispatch.
        if item.handle.is_cancelled() {
            self.metrics.write().unwrap().tasks_cancelled += 1;
            return;
        }

        item.handle.transition(TaskState::Running);
        let started = Instant::now();
        let outcome: Result<(), TaskError> =
            match catch_unwind(AssertUnwindSafe(|| item.task.execute())) {
                Ok(result) => result,
                Err(_) => Err(TaskError::Panicked),
            };
        let elapsed = started.elapsed();

        match &outcome {
            Ok(()) => {
                debug!(task = item.task.name(), ?elapsed, "task completed");
                self.metrics
                    .write()
                    .unwrap()
                    .record_execution(item.task.name(), elapsed);
            }
            Err(e) => {
                warn!(task = item.task.name(), error = %e, "task execution failed");
                self.metrics.write().unwrap().record_failure(item.task.name());
            }
        }

        match item.period {
            None => {
                // Terminal state; stays Cancelled if a cancel raced the run.
                let end_state = match outcome {
                    Ok(()) => TaskState::Completed,
                    Err(_) => TaskState::Failed,
                };
                item.handle.transition(end_state);
            }
            Some(period) => {
                if item.handle.is_cancelled() {
                    return;
                }
                // Fixed rate: schedule from the previous due time, so slip
                // does not accumulate. An overrun makes the next due time
                // already past and the item re-fires back to back.
                item.handle.transition(TaskState::Pending);
                let mut state = self.state.lock().unwrap();
                if state.phase == PoolPhase::Running {
                    let sequence = state.next_sequence;
                    state.next_sequence += 1;
                    state.queue.push(WorkItem {
                        due: item.due + period,
                        sequence,
                        period: item.period,
                        task: item.task,
                        handle: item.handle,
                    });
                    drop(state);
                    self.work_available.notify_one();
                } else {
                    // Periodic items do not continue past shutdown.
                    drop(state);
                    item.handle.cancel();
                }
            }
        }
    }
}
