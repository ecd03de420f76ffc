//! Scheduler configuration, typically parsed from TOML.

use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

/// Construction-time configuration for a [`Scheduler`](crate::Scheduler).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of worker threads. Must be greater than zero.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Prefix for worker thread names (observability label).
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,
    /// Seconds to wait for draining tasks before forcing termination.
    #[serde(default = "default_grace_period_seconds")]
    pub grace_period_seconds: u64,
}

fn default_capacity() -> usize {
    4
}
fn default_thread_name_prefix() -> String {
    "metronome".to_string()
}
fn default_grace_period_seconds() -> u64 {
    60
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            thread_name_prefix: default_thread_name_prefix(),
            grace_period_seconds: default_grace_period_seconds(),
        }
    }
}

impl SchedulerConfig {
    /// Parse a config from a TOML document. Missing keys take defaults.
    pub fn from_toml(input: &str) -> Result<Self, SchedulerError> {
        Ok(toml::from_str(input)?)
    }
}
