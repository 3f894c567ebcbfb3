//! Packaging error types
//!
//! Structured error codes in VAULT_CATEGORY_NAME format. A packaging
//! failure is fatal for the current run; the raw artifact is discarded
//! rather than uploaded in a corrupt state.

use std::fmt;
use std::io;

/// Packaging error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageErrorCode {
    /// Compression or archiving could not complete
    VaultPackageFailed,
    /// I/O failure while reading the raw artifact
    VaultPackageIo,
    /// Manifest serialization failure
    VaultPackageManifest,
}

impl PackageErrorCode {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageErrorCode::VaultPackageFailed => "VAULT_PACKAGE_FAILED",
            PackageErrorCode::VaultPackageIo => "VAULT_PACKAGE_IO",
            PackageErrorCode::VaultPackageManifest => "VAULT_PACKAGE_MANIFEST",
        }
    }
}

impl fmt::Display for PackageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Packaging error with full context
#[derive(Debug)]
pub struct PackageError {
    code: PackageErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl PackageError {
    fn new(code: PackageErrorCode, message: impl Into<String>, source: Option<io::Error>) -> Self {
        Self {
            code,
            message: message.into(),
            source,
        }
    }

    /// General packaging failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(PackageErrorCode::VaultPackageFailed, message, None)
    }

    /// I/O failure
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(PackageErrorCode::VaultPackageIo, message, Some(source))
    }

    /// I/O failure at a specific path
    pub fn io_error_at_path(path: &std::path::Path, source: io::Error) -> Self {
        Self::io_error(format!("I/O error at {}", path.display()), source)
    }

    /// Manifest failure
    pub fn manifest_failed(message: impl Into<String>) -> Self {
        Self::new(PackageErrorCode::VaultPackageManifest, message, None)
    }

    /// Returns the error code
    pub fn code(&self) -> PackageErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PackageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] {}: {}", self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for PackageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for packaging operations
pub type PackageResult<T> = Result<T, PackageError>;
