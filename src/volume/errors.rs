//! Volume snapshot errors
//!
//! Volume snapshot failures are reported and alerted but never block
//! normal database operation or the logical backup pipeline; there is no
//! synchronous retry.

use thiserror::Error;

/// Result type for volume snapshot operations
pub type VolumeResult<T> = Result<T, VolumeError>;

/// Volume snapshot errors
#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("Snapshot API failed for volume '{volume}': {reason}")]
    SnapshotApiFailed { volume: String, reason: String },

    #[error("Copy of snapshot '{snapshot}' to region '{region}' failed: {reason}")]
    CopyFailed {
        snapshot: String,
        region: String,
        reason: String,
    },

    #[error("Listing snapshots for volume '{volume}' failed: {reason}")]
    ListFailed { volume: String, reason: String },

    #[error("Deleting snapshot '{snapshot}' failed: {reason}")]
    DeleteFailed { snapshot: String, reason: String },
}

impl VolumeError {
    /// Snapshot creation failure
    pub fn api_failed(volume: impl Into<String>, reason: impl Into<String>) -> Self {
        VolumeError::SnapshotApiFailed {
            volume: volume.into(),
            reason: reason.into(),
        }
    }
}
