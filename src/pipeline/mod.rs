//! The backup run pipeline
//!
//! One run of one job, strictly sequential:
//!
//! 1. Flush artifacts retained by earlier failed uploads
//! 2. Resolve credentials (abort before any engine operation on failure)
//! 3. Produce the dump (engine-specific strategy)
//! 4. Package: compress, checksum, derive the object key
//! 5. Upload artifact, then its sidecar manifest
//!
//! # Failure containment
//!
//! Every failure aborts the current run, raises an alert, and leaves
//! the next scheduled run as the retry. An upload failure additionally
//! retains the packaged artifact in the local spool; the next run
//! re-attempts it before dumping again. Partial local artifacts are
//! discardable garbage and are never promoted to the object store.

mod errors;

pub use errors::{RunError, RunErrorCode, RunResult};

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::JobConfig;
use crate::object_store::{StoreErrorCode, WriterHandle};
use crate::observability::{AlertSink, Logger};
use crate::packager::{PackagedArtifact, Packager};
use crate::producer::{producer_for_job, DumpPayload};
use crate::secrets::SecretStore;

/// Subdirectory of the spool holding artifacts awaiting re-upload
const RETAINED_DIR: &str = "retained";

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Uploaded artifact key
    pub key: String,
    /// Uploaded sidecar manifest key
    pub manifest_key: String,
    /// Raw size of the export in bytes
    pub logical_size: u64,
    /// Uploaded (compressed) size in bytes
    pub uploaded_size: u64,
    /// Artifacts from earlier failed uploads flushed at run start
    pub flushed_retained: usize,
}

/// Executes backup runs for one deployment
pub struct BackupRunner {
    packager: Packager,
    store: WriterHandle,
    spool_dir: PathBuf,
}

impl BackupRunner {
    /// Create a runner; `store` must be the write-only principal
    pub fn new(environment: impl Into<String>, store: WriterHandle, spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            packager: Packager::new(environment),
            store,
            spool_dir: spool_dir.into(),
        }
    }

    /// Execute one run of `job`
    pub fn run(
        &self,
        job: &JobConfig,
        secrets: &dyn SecretStore,
        alerts: &dyn AlertSink,
    ) -> RunResult<RunOutcome> {
        Logger::info("BACKUP_RUN_START", &[("job", job.name.as_str())]);

        let result = self.run_inner(job, secrets);
        match &result {
            Ok(outcome) => {
                Logger::info(
                    "BACKUP_RUN_COMPLETE",
                    &[
                        ("job", job.name.as_str()),
                        ("key", outcome.key.as_str()),
                        ("logical_size", &outcome.logical_size.to_string()),
                        ("uploaded_size", &outcome.uploaded_size.to_string()),
                    ],
                );
            }
            Err(err) => {
                alerts.raise(err.code().alert_kind(), &job.name, err.message());
            }
        }
        result
    }

    fn run_inner(&self, job: &JobConfig, secrets: &dyn SecretStore) -> RunResult<RunOutcome> {
        let flushed_retained = self.flush_retained(&job.name)?;

        // Credentials first; abort before touching the engine on failure
        let secret = secrets.get_secret(&job.secret_id)?;

        let producer = producer_for_job(job, &self.spool_dir);
        let dump = producer.produce(&secret)?;

        let packaged = self.packager.package(&job.name, job.engine, &dump);

        // The raw payload is spent either way once packaging has run
        if let DumpPayload::Directory(dir) = &dump.payload {
            let _ = fs::remove_dir_all(dir);
        }
        let packaged = packaged?;

        let logical_size = dump.logical_size;
        let uploaded_size = packaged.bytes.len() as u64;

        self.upload(&job.name, &packaged)?;

        let manifest_key = packaged.manifest_key();
        Ok(RunOutcome {
            key: packaged.key,
            manifest_key,
            logical_size,
            uploaded_size,
            flushed_retained,
        })
    }

    fn upload(&self, job_name: &str, packaged: &PackagedArtifact) -> RunResult<()> {
        let manifest_bytes = packaged.manifest.to_bytes()?;

        let artifact = self.store.put(&packaged.key, &packaged.bytes);
        let manifest = artifact
            .and_then(|_| self.store.put(&packaged.manifest_key(), &manifest_bytes));

        if let Err(err) = manifest {
            // Keep the packaged artifact for the next cycle; a key
            // collision means a previous attempt already landed it
            if err.code() != StoreErrorCode::VaultStoreKeyExists {
                self.retain(job_name, &packaged.key, &packaged.bytes)?;
                self.retain(job_name, &packaged.manifest_key(), &manifest_bytes)?;
                return Err(err.into());
            }
        }
        Ok(())
    }

    fn retained_dir(&self, job_name: &str) -> PathBuf {
        self.spool_dir.join(RETAINED_DIR).join(job_name)
    }

    /// Keep an artifact on local disk after a failed upload
    fn retain(&self, job_name: &str, key: &str, bytes: &[u8]) -> RunResult<()> {
        // Mirror the key path under the spool so the key can be
        // reconstructed on flush
        let path = self.retained_dir(job_name).join(key);
        let parent = path.parent().expect("retained path has a parent");
        fs::create_dir_all(parent)
            .map_err(|e| RunError::spool(format!("create {}: {}", parent.display(), e)))?;
        fs::write(&path, bytes)
            .map_err(|e| RunError::spool(format!("write {}: {}", path.display(), e)))?;
        Logger::warn("ARTIFACT_RETAINED", &[("job", job_name), ("key", key)]);
        Ok(())
    }

    /// Re-attempt uploads retained by earlier runs; returns how many
    /// artifacts were flushed
    fn flush_retained(&self, job_name: &str) -> RunResult<usize> {
        let root = self.retained_dir(job_name);
        if !root.exists() {
            return Ok(0);
        }

        let mut files = Vec::new();
        collect_files(&root, &mut files)
            .map_err(|e| RunError::spool(format!("scan {}: {}", root.display(), e)))?;
        // Oldest keys first so the store stays chronologically complete
        files.sort();

        let mut flushed = 0;
        for path in files {
            let key = path
                .strip_prefix(&root)
                .expect("collected under root")
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let bytes = fs::read(&path)
                .map_err(|e| RunError::spool(format!("read {}: {}", path.display(), e)))?;

            match self.store.put(&key, &bytes) {
                Ok(()) => {}
                // A collision means an earlier attempt made it through
                Err(e) if e.code() == StoreErrorCode::VaultStoreKeyExists => {}
                Err(e) => return Err(e.into()),
            }

            fs::remove_file(&path)
                .map_err(|e| RunError::spool(format!("remove {}: {}", path.display(), e)))?;
            Logger::info("RETAINED_ARTIFACT_FLUSHED", &[("job", job_name), ("key", &key)]);
            flushed += 1;
        }

        Ok(flushed)
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}
