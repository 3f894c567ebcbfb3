//! Change-log errors
//!
//! A gap in the change log relative to the snapshot boundary is fatal
//! and operator-escalated: silently skipping a segment would corrupt the
//! recovered state, so nothing here is ever auto-resolved.

use thiserror::Error;

/// Result type for change-log operations
pub type ChangeLogResult<T> = Result<T, ChangeLogError>;

/// Change-log errors
#[derive(Debug, Error)]
pub enum ChangeLogError {
    #[error("Log gap detected: expected segment {expected}, found {found}")]
    LogGapDetected { expected: u64, found: u64 },

    #[error("Log gap detected: no segment covers the snapshot boundary at {0}")]
    BoundaryNotCovered(String),

    #[error("Log gap detected: retained log ends at {log_end}, before the requested recovery point {requested}")]
    RecoveryPointNotCovered { log_end: String, requested: String },

    #[error("Failed to read change-log segment: {0}")]
    ReadFailed(String),

    #[error("Segment {0} is malformed: {1}")]
    Malformed(u64, String),
}

impl ChangeLogError {
    /// True for any of the gap conditions that must escalate to the
    /// operator as `LogGapDetected`
    pub fn is_gap(&self) -> bool {
        matches!(
            self,
            ChangeLogError::LogGapDetected { .. }
                | ChangeLogError::BoundaryNotCovered(_)
                | ChangeLogError::RecoveryPointNotCovered { .. }
        )
    }
}
