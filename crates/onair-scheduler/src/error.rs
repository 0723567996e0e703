use onair_store::StoreError;
use thiserror::Error;

/// Errors from the refresh runtime.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A periodic task was configured with a zero or otherwise unusable period.
    #[error("Invalid period for task {task}: {reason}")]
    InvalidPeriod { task: String, reason: String },

    /// A task with this name is already running.
    #[error("Task already running: {0}")]
    DuplicateTask(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
