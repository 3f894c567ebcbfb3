//! Snapshot producers for snapvault
//!
//! A producer turns a live data store into one immutable artifact plus
//! metadata (source timestamp, logical size). The engine-specific dump
//! strategies sit behind one trait, selected by engine kind:
//!
//! - `sql`: a consistent transactional dump captured from the engine's
//!   dump tool (see [`SqlCommandProducer`])
//! - `native`: the engine's own snapshot API, materialized into a
//!   directory (see [`NativeSnapshotProducer`])
//!
//! # Important
//!
//! A successful dump does NOT modify engine state.
//! Producers do NOT upload; the pipeline owns packaging and upload.
//! Producers do NOT retry; the next scheduled run is the retry.

mod errors;
mod native;
mod sql;

pub use errors::{ProducerError, ProducerResult};
pub use native::{NativeSnapshotProducer, OUT_ENV_VAR};
pub use sql::{SqlCommandProducer, SINGLE_TRANSACTION_FLAG};

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::JobConfig;
use crate::secrets::SecretValue;

/// Environment variable carrying the resolved credential to the child
pub const SECRET_ENV_VAR: &str = "SNAPVAULT_SECRET";

/// Engine kind, selects the producer strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Relational engine, transactional dump
    Sql,
    /// Engine with a native snapshot API
    Native,
}

impl EngineKind {
    /// Artifact file extension for this engine kind
    pub fn artifact_ext(&self) -> &'static str {
        match self {
            EngineKind::Sql => "sql.gz",
            EngineKind::Native => "tar.gz",
        }
    }
}

/// Raw dump output before packaging
#[derive(Debug)]
pub enum DumpPayload {
    /// Single export stream (sql engines)
    Stream(Vec<u8>),
    /// Snapshot directory (native engines); owned by the run, deleted
    /// after packaging
    Directory(PathBuf),
}

/// One dump plus its metadata
#[derive(Debug)]
pub struct DumpArtifact {
    pub payload: DumpPayload,
    /// Wall clock at dump start; embedded in the object key
    pub source_timestamp: DateTime<Utc>,
    /// Raw (pre-compression) size in bytes
    pub logical_size: u64,
}

/// Engine-specific snapshot strategy.
///
/// Implementations must fail on partial output rather than return a
/// truncated artifact.
pub trait SnapshotProducer {
    /// Produce one artifact from the live store
    fn produce(&self, secret: &SecretValue) -> ProducerResult<DumpArtifact>;
}

/// Build the producer for a job, dispatching on engine kind
pub fn producer_for_job(job: &JobConfig, spool_dir: &Path) -> Box<dyn SnapshotProducer> {
    match job.engine {
        EngineKind::Sql => Box::new(SqlCommandProducer::new(
            job.name.clone(),
            job.command.clone(),
            job.consistency,
        )),
        EngineKind::Native => Box::new(NativeSnapshotProducer::new(
            job.name.clone(),
            job.command.clone(),
            spool_dir,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_kind_serde() {
        assert_eq!(serde_json::to_string(&EngineKind::Sql).unwrap(), "\"sql\"");
        let kind: EngineKind = serde_json::from_str("\"native\"").unwrap();
        assert_eq!(kind, EngineKind::Native);
    }

    #[test]
    fn test_artifact_extensions() {
        assert_eq!(EngineKind::Sql.artifact_ext(), "sql.gz");
        assert_eq!(EngineKind::Native.artifact_ext(), "tar.gz");
    }
}
