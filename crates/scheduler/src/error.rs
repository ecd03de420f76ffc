use thiserror::Error;

/// Errors surfaced by scheduler construction and scheduling calls.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("worker capacity must be greater than zero")]
    InvalidCapacity,

    #[error("repeat period must be greater than zero")]
    InvalidPeriod,

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}
