//! Backup run error types
//!
//! Structured error codes in VAULT_CATEGORY_NAME format. Every failure
//! in the automated pipeline is contained to the current run: the next
//! scheduled run is an independent retry, and nothing here ever crashes
//! the host data engine.

use std::fmt;

use crate::object_store::StoreError;
use crate::packager::PackageError;
use crate::producer::ProducerError;
use crate::secrets::SecretError;

/// Backup run error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunErrorCode {
    /// Credentials could not be resolved; aborted before the engine
    VaultRunSecret,
    /// Dump failed or produced partial output
    VaultRunDump,
    /// Compression/packaging failed; raw artifact discarded
    VaultRunPackage,
    /// Upload failed; local artifact retained for the next cycle
    VaultRunUpload,
    /// Local spool I/O failure
    VaultRunSpool,
}

impl RunErrorCode {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RunErrorCode::VaultRunSecret => "VAULT_RUN_SECRET",
            RunErrorCode::VaultRunDump => "VAULT_RUN_DUMP",
            RunErrorCode::VaultRunPackage => "VAULT_RUN_PACKAGE",
            RunErrorCode::VaultRunUpload => "VAULT_RUN_UPLOAD",
            RunErrorCode::VaultRunSpool => "VAULT_RUN_SPOOL",
        }
    }

    /// Alert kind raised for this failure
    pub fn alert_kind(&self) -> &'static str {
        match self {
            RunErrorCode::VaultRunSecret => "SECRET_UNAVAILABLE",
            RunErrorCode::VaultRunDump => "DUMP_FAILED",
            RunErrorCode::VaultRunPackage => "PACKAGING_FAILED",
            RunErrorCode::VaultRunUpload => "UPLOAD_FAILED",
            RunErrorCode::VaultRunSpool => "SPOOL_FAILED",
        }
    }
}

impl fmt::Display for RunErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Backup run error with full context
#[derive(Debug)]
pub struct RunError {
    code: RunErrorCode,
    message: String,
}

impl RunError {
    /// Create an error with an explicit code
    pub fn new(code: RunErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Spool I/O failure
    pub fn spool(message: impl Into<String>) -> Self {
        Self::new(RunErrorCode::VaultRunSpool, message)
    }

    /// Returns the error code
    pub fn code(&self) -> RunErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// True when the local artifact was kept for the next cycle
    pub fn artifact_retained(&self) -> bool {
        self.code == RunErrorCode::VaultRunUpload
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.code, self.message)
    }
}

impl std::error::Error for RunError {}

impl From<SecretError> for RunError {
    fn from(err: SecretError) -> Self {
        RunError::new(RunErrorCode::VaultRunSecret, err.to_string())
    }
}

impl From<ProducerError> for RunError {
    fn from(err: ProducerError) -> Self {
        RunError::new(RunErrorCode::VaultRunDump, err.to_string())
    }
}

impl From<PackageError> for RunError {
    fn from(err: PackageError) -> Self {
        RunError::new(RunErrorCode::VaultRunPackage, err.to_string())
    }
}

impl From<StoreError> for RunError {
    fn from(err: StoreError) -> Self {
        RunError::new(RunErrorCode::VaultRunUpload, err.to_string())
    }
}

/// Result type for backup run operations
pub type RunResult<T> = Result<T, RunError>;
