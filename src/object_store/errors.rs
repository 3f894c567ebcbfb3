//! Object store error types
//!
//! Structured error codes in VAULT_CATEGORY_NAME format with explicit
//! severity. Store errors never take down the host data engine; the
//! pipeline contains them to the current run.

use std::fmt;
use std::io;

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation failed but system is healthy
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Object store error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// I/O failure talking to the store
    VaultStoreIo,
    /// Upload would overwrite an existing key
    VaultStoreKeyExists,
    /// Key not present
    VaultStoreNotFound,
    /// Principal lacks the capability for this call
    VaultStoreAccessDenied,
    /// Key fails layout validation
    VaultStoreInvalidKey,
}

impl StoreErrorCode {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreErrorCode::VaultStoreIo => "VAULT_STORE_IO",
            StoreErrorCode::VaultStoreKeyExists => "VAULT_STORE_KEY_EXISTS",
            StoreErrorCode::VaultStoreNotFound => "VAULT_STORE_NOT_FOUND",
            StoreErrorCode::VaultStoreAccessDenied => "VAULT_STORE_ACCESS_DENIED",
            StoreErrorCode::VaultStoreInvalidKey => "VAULT_STORE_INVALID_KEY",
        }
    }

    /// Returns the severity level for this error code
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Object store error with full context
#[derive(Debug)]
pub struct StoreError {
    code: StoreErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl StoreError {
    fn new(code: StoreErrorCode, message: impl Into<String>, source: Option<io::Error>) -> Self {
        Self {
            code,
            message: message.into(),
            source,
        }
    }

    /// I/O failure
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(StoreErrorCode::VaultStoreIo, message, Some(source))
    }

    /// I/O failure at a specific path
    pub fn io_error_at_path(path: &std::path::Path, source: io::Error) -> Self {
        Self::io_error(format!("I/O error at {}", path.display()), source)
    }

    /// Key already written; keys are immutable once visible
    pub fn key_exists(key: &str) -> Self {
        Self::new(
            StoreErrorCode::VaultStoreKeyExists,
            format!("key already exists: {}", key),
            None,
        )
    }

    /// Key not found
    pub fn not_found(key: &str) -> Self {
        Self::new(
            StoreErrorCode::VaultStoreNotFound,
            format!("key not found: {}", key),
            None,
        )
    }

    /// Principal lacks the capability
    pub fn access_denied(operation: &str) -> Self {
        Self::new(
            StoreErrorCode::VaultStoreAccessDenied,
            format!("principal is not allowed to {}", operation),
            None,
        )
    }

    /// Key failed layout validation
    pub fn invalid_key(key: &str, reason: &str) -> Self {
        Self::new(
            StoreErrorCode::VaultStoreInvalidKey,
            format!("invalid key '{}': {}", key, reason),
            None,
        )
    }

    /// Returns the error code
    pub fn code(&self) -> StoreErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// True when the principal was refused by capability, not by I/O
    pub fn is_access_denied(&self) -> bool {
        self.code == StoreErrorCode::VaultStoreAccessDenied
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code,
            self.message
        )?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for object store operations
pub type StoreResult<T> = Result<T, StoreError>;
