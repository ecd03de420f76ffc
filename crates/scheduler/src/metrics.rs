use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Operational metrics for a running scheduler.
///
/// Snapshot via [`Scheduler::metrics`](crate::Scheduler::metrics).
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    /// Items accepted into the queue.
    pub tasks_submitted: u64,
    /// Submissions refused because shutdown had begun.
    pub tasks_rejected: u64,
    /// Items discarded before execution due to cancellation.
    pub tasks_cancelled: u64,
    /// Successful executions by task name.
    pub tasks_executed: HashMap<String, u64>,
    /// Faulted executions by task name.
    pub tasks_failed: HashMap<String, u64>,
    /// Rolling average execution duration by task name.
    pub avg_task_duration: HashMap<String, Duration>,
    /// Last successful execution time by task name.
    pub last_run: HashMap<String, DateTime<Utc>>,
    /// Queue depth at snapshot time.
    pub queue_depth: usize,
    /// Workers executing a task at snapshot time.
    pub active_workers: usize,
}

impl SchedulerMetrics {
    /// Record a successful task execution.
    pub fn record_execution(&mut self, task_name: &str, duration: Duration) {
        *self.tasks_executed.entry(task_name.to_string()).or_default() += 1;
        self.last_run.insert(task_name.to_string(), Utc::now());

        // Incremental mean: new_avg = prev_avg + (duration - prev_avg) / count
        let count = self.tasks_executed[task_name];
        let new_avg = if count == 1 {
            duration
        } else {
            let prev_nanos = self
                .avg_task_duration
                .get(task_name)
                .copied()
                .unwrap_or_default()
                .as_nanos() as f64;
            let cur_nanos = duration.as_nanos() as f64;
            Duration::from_nanos((prev_nanos + (cur_nanos - prev_nanos) / count as f64) as u64)
        };
        self.avg_task_duration.insert(task_name.to_string(), new_avg);
    }

    /// Record a faulted task execution.
    pub fn record_failure(&mut self, task_name: &str) {
        *self.tasks_failed.entry(task_name.to_string()).or_default() += 1;
    }
}
