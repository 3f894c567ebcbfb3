//! CLI-specific error types
//!
//! Every CLI error is terminal: the command prints the error and exits
//! non-zero. Subsystem errors are wrapped with the command that hit them.

use std::fmt;
use std::io;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdout, filesystem setup)
    IoError,
    /// Bad or missing command arguments
    InvalidRequest,
    /// One-shot backup run failed
    BackupFailed,
    /// Retention sweep failed
    SweepFailed,
    /// Volume snapshot plan failed
    VolumeFailed,
    /// Restore failed
    RestoreFailed,
    /// Scheduler failure in the run loop
    SchedulerFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "VAULT_CLI_CONFIG_ERROR",
            Self::IoError => "VAULT_CLI_IO_ERROR",
            Self::InvalidRequest => "VAULT_CLI_INVALID_REQUEST",
            Self::BackupFailed => "VAULT_CLI_BACKUP_FAILED",
            Self::SweepFailed => "VAULT_CLI_SWEEP_FAILED",
            Self::VolumeFailed => "VAULT_CLI_VOLUME_FAILED",
            Self::RestoreFailed => "VAULT_CLI_RESTORE_FAILED",
            Self::SchedulerFailed => "VAULT_CLI_SCHEDULER_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Bad arguments
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidRequest, msg)
    }

    /// Backup run failed
    pub fn backup_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::BackupFailed, msg)
    }

    /// Sweep failed
    pub fn sweep_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::SweepFailed, msg)
    }

    /// Volume plan failed
    pub fn volume_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::VolumeFailed, msg)
    }

    /// Restore failed
    pub fn restore_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::RestoreFailed, msg)
    }

    /// Scheduler failure
    pub fn scheduler_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::SchedulerFailed, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<crate::config::ConfigError> for CliError {
    fn from(e: crate::config::ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
