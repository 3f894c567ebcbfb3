//! Configuration error types
//!
//! Configuration is loaded and validated before any subsystem starts.
//! Every error here is fatal for the process: a deployment with a bad
//! config must not run a partial pipeline.

use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFailed(String),

    #[error("Invalid config JSON: {0}")]
    ParseFailed(String),

    #[error("Job '{job}': {reason}")]
    InvalidJob { job: String, reason: String },

    #[error("Volume plan '{volume}': {reason}")]
    InvalidVolumePlan { volume: String, reason: String },

    #[error("Invalid cron expression '{0}': {1}")]
    InvalidCron(String, String),

    #[error("{0}")]
    Invalid(String),
}

impl ConfigError {
    /// Job-level validation failure
    pub fn invalid_job(job: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidJob {
            job: job.into(),
            reason: reason.into(),
        }
    }

    /// Volume-plan-level validation failure
    pub fn invalid_volume_plan(volume: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidVolumePlan {
            volume: volume.into(),
            reason: reason.into(),
        }
    }
}
