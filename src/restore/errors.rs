//! Restore error types
//!
//! Structured error codes in VAULT_CATEGORY_NAME format. Restore is the
//! one operator-driven flow in the system, so every code here maps to a
//! machine-readable terminal status the operator's tooling can branch
//! on (see [`crate::restore::RestoreStatus`]).

use std::fmt;

use crate::changelog::ChangeLogError;
use crate::object_store::StoreError;
use crate::packager::PackageError;

/// Restore error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreErrorCode {
    /// No artifact matches the requested key or timestamp
    VaultRestoreNotFound,
    /// Downloaded bytes do not match the sidecar manifest checksum
    VaultRestoreChecksumMismatch,
    /// Sidecar manifest missing or unparseable
    VaultRestoreManifest,
    /// Object store operation failed
    VaultRestoreStore,
    /// Local filesystem failure while materializing the snapshot
    VaultRestoreIo,
    /// Engine stop/start/load operation failed
    VaultRestoreEngine,
    /// Retained change log cannot reach the requested recovery point
    VaultRestoreLogGap,
    /// Engine did not come back healthy after the restore
    VaultRestoreVerify,
}

impl RestoreErrorCode {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RestoreErrorCode::VaultRestoreNotFound => "VAULT_RESTORE_NOT_FOUND",
            RestoreErrorCode::VaultRestoreChecksumMismatch => "VAULT_RESTORE_CHECKSUM_MISMATCH",
            RestoreErrorCode::VaultRestoreManifest => "VAULT_RESTORE_MANIFEST",
            RestoreErrorCode::VaultRestoreStore => "VAULT_RESTORE_STORE",
            RestoreErrorCode::VaultRestoreIo => "VAULT_RESTORE_IO",
            RestoreErrorCode::VaultRestoreEngine => "VAULT_RESTORE_ENGINE",
            RestoreErrorCode::VaultRestoreLogGap => "VAULT_RESTORE_LOG_GAP",
            RestoreErrorCode::VaultRestoreVerify => "VAULT_RESTORE_VERIFY",
        }
    }
}

impl fmt::Display for RestoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Restore error with full context
#[derive(Debug)]
pub struct RestoreError {
    code: RestoreErrorCode,
    message: String,
}

impl RestoreError {
    /// Create an error with an explicit code
    pub fn new(code: RestoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// No artifact matched the request
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(RestoreErrorCode::VaultRestoreNotFound, detail)
    }

    /// Checksum verification failure
    pub fn checksum_mismatch(key: &str, expected: u32, actual: u32) -> Self {
        Self::new(
            RestoreErrorCode::VaultRestoreChecksumMismatch,
            format!(
                "checksum mismatch for '{}': manifest {:08x}, downloaded {:08x}",
                key, expected, actual
            ),
        )
    }

    /// Local filesystem failure
    pub fn io(detail: impl Into<String>) -> Self {
        Self::new(RestoreErrorCode::VaultRestoreIo, detail)
    }

    /// Engine control failure
    pub fn engine(detail: impl Into<String>) -> Self {
        Self::new(RestoreErrorCode::VaultRestoreEngine, detail)
    }

    /// Post-restore health check failure
    pub fn verify(detail: impl Into<String>) -> Self {
        Self::new(RestoreErrorCode::VaultRestoreVerify, detail)
    }

    /// Returns the error code
    pub fn code(&self) -> RestoreErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// True for gap conditions in the retained change log
    pub fn is_log_gap(&self) -> bool {
        self.code == RestoreErrorCode::VaultRestoreLogGap
    }
}

impl fmt::Display for RestoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.code, self.message)
    }
}

impl std::error::Error for RestoreError {}

impl From<StoreError> for RestoreError {
    fn from(err: StoreError) -> Self {
        RestoreError::new(RestoreErrorCode::VaultRestoreStore, err.to_string())
    }
}

impl From<PackageError> for RestoreError {
    fn from(err: PackageError) -> Self {
        RestoreError::new(RestoreErrorCode::VaultRestoreManifest, err.to_string())
    }
}

impl From<ChangeLogError> for RestoreError {
    fn from(err: ChangeLogError) -> Self {
        let code = if err.is_gap() {
            RestoreErrorCode::VaultRestoreLogGap
        } else {
            RestoreErrorCode::VaultRestoreManifest
        };
        RestoreError::new(code, err.to_string())
    }
}

/// Result type for restore operations
pub type RestoreResult<T> = Result<T, RestoreError>;
