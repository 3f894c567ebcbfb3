//! Native-snapshot producer for engines with their own snapshot API
//!
//! Some engines (document and vector stores) export through a built-in
//! snapshot call instead of a row-level dump. The configured command
//! drives that API and must materialize the snapshot under the directory
//! given in the `SNAPVAULT_OUT` environment variable. The producer hands
//! the directory to the packager, which archives it as a `.tar.gz`.
//!
//! A command that exits successfully but leaves the output directory
//! empty is treated as partial output, never uploaded.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use chrono::Utc;
use uuid::Uuid;

use crate::secrets::SecretValue;

use super::errors::{ProducerError, ProducerResult};
use super::{DumpArtifact, DumpPayload, SnapshotProducer, SECRET_ENV_VAR};

/// Environment variable naming the snapshot output directory
pub const OUT_ENV_VAR: &str = "SNAPVAULT_OUT";

/// Producer that drives an engine-native snapshot command
pub struct NativeSnapshotProducer {
    database: String,
    command: Vec<String>,
    work_dir: PathBuf,
}

impl NativeSnapshotProducer {
    /// Create a producer; `work_dir` is the local spool directory
    pub fn new(
        database: impl Into<String>,
        command: Vec<String>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            database: database.into(),
            command: command.into(),
            work_dir: work_dir.into(),
        }
    }

    fn dir_size(dir: &Path) -> ProducerResult<u64> {
        let mut total = 0;
        let entries = fs::read_dir(dir)
            .map_err(|e| ProducerError::dump_failed("", format!("read {}: {}", dir.display(), e)))?;
        for entry in entries {
            let entry =
                entry.map_err(|e| ProducerError::dump_failed("", format!("read dir: {}", e)))?;
            let path = entry.path();
            if path.is_dir() {
                total += Self::dir_size(&path)?;
            } else {
                total += entry
                    .metadata()
                    .map_err(|e| ProducerError::dump_failed("", format!("stat: {}", e)))?
                    .len();
            }
        }
        Ok(total)
    }
}

impl SnapshotProducer for NativeSnapshotProducer {
    fn produce(&self, secret: &SecretValue) -> ProducerResult<DumpArtifact> {
        let source_timestamp = Utc::now();

        let out_dir = self.work_dir.join(format!("native-{}", Uuid::new_v4()));
        fs::create_dir_all(&out_dir)
            .map_err(|e| ProducerError::SpawnFailed(format!("create output dir: {}", e)))?;

        let program = self.command.first().ok_or_else(|| {
            ProducerError::SpawnFailed("empty snapshot command".to_string())
        })?;

        let output = Command::new(program)
            .args(&self.command[1..])
            .env(SECRET_ENV_VAR, secret.expose())
            .env(OUT_ENV_VAR, &out_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        let output = match output {
            Ok(o) => o,
            Err(e) => {
                let _ = fs::remove_dir_all(&out_dir);
                return Err(ProducerError::SpawnFailed(e.to_string()));
            }
        };

        if !output.status.success() {
            // A failed snapshot leaves only discardable garbage
            let _ = fs::remove_dir_all(&out_dir);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProducerError::dump_failed(
                &self.database,
                format!("{} ({})", output.status, stderr.trim()),
            ));
        }

        let logical_size = Self::dir_size(&out_dir)?;
        if logical_size == 0 {
            let _ = fs::remove_dir_all(&out_dir);
            return Err(ProducerError::partial_output(
                &self.database,
                "snapshot command exited successfully but wrote nothing",
            ));
        }

        Ok(DumpArtifact {
            payload: DumpPayload::Directory(out_dir),
            source_timestamp,
            logical_size,
        })
    }
}
