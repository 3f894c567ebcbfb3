//! Snapshot producer error types
//!
//! A dump failure, including any partial-output case, is fatal for the
//! current run. The next scheduled run is an independent retry; repeated
//! failures are alerted by the pipeline.

use thiserror::Error;

/// Result type for producer operations
pub type ProducerResult<T> = Result<T, ProducerError>;

/// Snapshot producer errors
#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("Dump failed for '{database}': {reason}")]
    DumpFailed { database: String, reason: String },

    #[error("Dump for '{database}' produced partial output: {reason}")]
    PartialOutput { database: String, reason: String },

    #[error("Dump command could not be started: {0}")]
    SpawnFailed(String),
}

impl ProducerError {
    /// General dump failure
    pub fn dump_failed(database: impl Into<String>, reason: impl Into<String>) -> Self {
        ProducerError::DumpFailed {
            database: database.into(),
            reason: reason.into(),
        }
    }

    /// Dump truncated or otherwise incomplete
    pub fn partial_output(database: impl Into<String>, reason: impl Into<String>) -> Self {
        ProducerError::PartialOutput {
            database: database.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_database() {
        let err = ProducerError::dump_failed("orders", "exit status 2");
        assert!(format!("{}", err).contains("orders"));

        let err = ProducerError::partial_output("orders", "stream closed early");
        assert!(format!("{}", err).contains("partial"));
    }
}
