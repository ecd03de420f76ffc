//! Graceful-then-forced termination, run exactly once per scheduler.
//!
//! The coordinator drives the pool through Active → Draining → Terminated.
//! It runs on its own dedicated thread (never inside the pool, so the tasks
//! it waits on cannot starve it): report queue depth and active workers,
//! stop intake, wait up to the grace period for the pool to drain, then
//! either terminate silently or force termination and report survivors.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::pool::WorkerPool;

/// Default bounded wait for draining before forced termination.
pub(crate) const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(60);

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Kick off the termination sequence on a dedicated thread and return
/// immediately. The caller of `on_program_exit` is never blocked.
pub(crate) fn spawn_termination(pool: Arc<WorkerPool>, grace: Duration, prefix: &str) {
    let fallback = Arc::clone(&pool);
    let spawned = thread::Builder::new()
        .name(format!("{prefix}-shutdown"))
        .spawn(move || run_termination(&pool, grace));
    if let Err(e) = spawned {
        // No thread to drain on; stopping the pool right here beats leaving
        // it running forever, even though it skips the grace period.
        error!(error = %e, "failed to spawn shutdown thread; terminating pool inline");
        fallback.begin_drain();
        fallback.terminate();
    }
}

fn run_termination(pool: &WorkerPool, grace: Duration) {
    let (queue_depth, active_workers) = pool.begin_drain();
    info!(
        queue_depth,
        active_workers,
        grace_secs = grace.as_secs_f64(),
        "scheduler draining; waiting for tasks to finish"
    );

    let deadline = Instant::now() + grace;
    while Instant::now() < deadline {
        if pool.is_drained() {
            pool.terminate();
            debug!("scheduler drained and terminated");
            return;
        }
        thread::sleep(DRAIN_POLL_INTERVAL);
    }

    let still_active = pool.terminate();
    warn!(
        active_workers = still_active,
        "grace period expired; forcing scheduler termination"
    );
}
