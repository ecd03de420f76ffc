//! Bounded-capacity task scheduler over a fixed pool of worker threads.
//!
//! Tasks run under one of three temporal policies: immediately
//! ([`Scheduler::execute_now`]), once after a delay
//! ([`Scheduler::schedule_delayed`]), or repeatedly at a fixed rate
//! ([`Scheduler::schedule_repeated`]). Every call returns a [`TaskHandle`]
//! for cancellation and state queries. [`Scheduler::on_program_exit`] runs
//! the graceful-then-forced shutdown sequence exactly once per instance.

pub mod config;
pub mod error;
pub mod handle;
pub mod metrics;
mod pool;
pub mod scheduler;
mod shutdown;
pub mod task;

pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use handle::{TaskHandle, TaskState};
pub use metrics::SchedulerMetrics;
pub use scheduler::{Scheduler, SchedulerBuilder};
pub use task::{Task, TaskError};
