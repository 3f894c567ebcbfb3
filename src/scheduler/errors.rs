//! Scheduler errors

use thiserror::Error;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Invalid schedule for '{job}': {reason}")]
    InvalidSchedule { job: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SchedulerError {
    /// Schedule construction or evaluation failure
    pub fn invalid_schedule(job: impl Into<String>, reason: impl Into<String>) -> Self {
        SchedulerError::InvalidSchedule {
            job: job.into(),
            reason: reason.into(),
        }
    }
}
