//! Retention sweep errors
//!
//! A failed sweep is logged and retried on the next sweep cycle, never
//! silently ignored: stale artifacts accumulating is a cost and
//! compliance problem even though it is not a correctness problem.

use thiserror::Error;

/// Result type for retention operations
pub type RetentionResult<T> = Result<T, RetentionError>;

/// Retention sweep errors
#[derive(Debug, Error)]
pub enum RetentionError {
    #[error("Retention sweep failed to list '{prefix}': {reason}")]
    ListFailed { prefix: String, reason: String },

    #[error("Retention sweep under '{prefix}' left {failed} of {expired} expired objects undeleted")]
    SweepIncomplete {
        prefix: String,
        expired: usize,
        failed: usize,
    },
}
