//! Consistent dump producer for relational engines
//!
//! Spawns the configured dump command (mysqldump, pg_dump, and friends)
//! and captures its stdout as the export stream.
//!
//! # Consistency
//!
//! In `Strict` mode (the default) the producer appends
//! `--single-transaction` so the export is taken inside one consistent
//! read view and concurrent writers cannot produce a torn dump. `Relaxed`
//! mode omits the flag; it is an explicit opt-in for append-mostly
//! workloads and every relaxed run is logged at WARN.
//!
//! # Credentials
//!
//! The resolved secret is passed to the child through the
//! `SNAPVAULT_SECRET` environment variable, never on the command line,
//! so it cannot leak through the process table.

use std::process::{Command, Stdio};

use chrono::Utc;

use crate::config::ConsistencyMode;
use crate::observability::Logger;
use crate::secrets::SecretValue;

use super::errors::{ProducerError, ProducerResult};
use super::{DumpArtifact, DumpPayload, SnapshotProducer, SECRET_ENV_VAR};

/// Flag appended to the dump command in strict mode
pub const SINGLE_TRANSACTION_FLAG: &str = "--single-transaction";

/// Producer that shells out to an engine dump tool
pub struct SqlCommandProducer {
    database: String,
    command: Vec<String>,
    consistency: ConsistencyMode,
}

impl SqlCommandProducer {
    /// Create a producer for one logical database
    pub fn new(
        database: impl Into<String>,
        command: Vec<String>,
        consistency: ConsistencyMode,
    ) -> Self {
        Self {
            database: database.into(),
            command,
            consistency,
        }
    }

    fn build_command(&self, secret: &SecretValue) -> ProducerResult<Command> {
        let program = self
            .command
            .first()
            .ok_or_else(|| ProducerError::SpawnFailed("empty dump command".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(&self.command[1..]);
        if self.consistency == ConsistencyMode::Strict {
            cmd.arg(SINGLE_TRANSACTION_FLAG);
        }
        cmd.env(SECRET_ENV_VAR, secret.expose());
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        Ok(cmd)
    }
}

impl SnapshotProducer for SqlCommandProducer {
    fn produce(&self, secret: &SecretValue) -> ProducerResult<DumpArtifact> {
        if self.consistency == ConsistencyMode::Relaxed {
            Logger::warn(
                "DUMP_CONSISTENCY_RELAXED",
                &[("database", self.database.as_str())],
            );
        }

        // Wall clock at dump start; the object key embeds this
        let source_timestamp = Utc::now();

        let output = self
            .build_command(secret)?
            .output()
            .map_err(|e| ProducerError::SpawnFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProducerError::dump_failed(
                &self.database,
                format!("{} ({})", output.status, stderr.trim()),
            ));
        }

        if output.stdout.is_empty() {
            // A successful exit with no bytes is a partial export, not a dump
            return Err(ProducerError::partial_output(
                &self.database,
                "dump command exited successfully but produced no output",
            ));
        }

        let logical_size = output.stdout.len() as u64;
        Ok(DumpArtifact {
            payload: DumpPayload::Stream(output.stdout),
            source_timestamp,
            logical_size,
        })
    }
}
