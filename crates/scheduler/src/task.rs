use thiserror::Error;

/// Error type for task execution.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task failed: {0}")]
    Failed(String),

    #[error("task panicked")]
    Panicked,
}

/// A unit of work the scheduler can execute.
///
/// The scheduler never interprets a success value; tasks act through side
/// effects only. Error returns and panics are both contained at the dispatch
/// boundary: the worker thread survives, the fault is logged and counted,
/// and a one-shot item's handle moves to [`Failed`](crate::TaskState::Failed)
/// while a repeating item skips that cycle and keeps its schedule.
pub trait Task: Send + Sync {
    /// Human-readable name for logging and metrics.
    fn name(&self) -> &str {
        "task"
    }

    /// Run the unit of work. Invoked with no arguments on a worker thread.
    fn execute(&self) -> Result<(), TaskError>;
}

impl<F> Task for F
where
    F: Fn() -> Result<(), TaskError> + Send + Sync,
{
    fn execute(&self) -> Result<(), TaskError> {
        self()
    }
}
