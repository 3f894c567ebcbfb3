//! Secret resolution errors
//!
//! Any failure here aborts the current backup run before the dump starts;
//! a run must never reach the engine with missing or partial credentials.

use thiserror::Error;

/// Result type for secret operations
pub type SecretResult<T> = Result<T, SecretError>;

/// Secret resolution errors.
///
/// Error messages carry the secret identifier, never the value.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Secret unavailable: {0}")]
    SecretUnavailable(String),

    #[error("Secret store unreachable: {0}")]
    StoreUnreachable(String),

    #[error("Secret '{0}' is malformed: {1}")]
    Malformed(String, String),
}
