//! Operator-driven restore
//!
//! Restore is never automatic. An operator names a deployment, a
//! logical store, and either an artifact key or a target time, and the
//! orchestrator walks one irreversible sequence:
//!
//! 1. Locate the artifact and download it with its sidecar manifest
//! 2. Verify the checksum (abort here and the engine is untouched)
//! 3. For point-in-time recovery, build the replay plan (a log gap
//!    aborts here, engine still untouched)
//! 4. Stop the engine
//! 5. Materialize the snapshot (swap the data directory, or reload the
//!    logical dump after restart)
//! 6. Start the engine
//! 7. Replay the plan's entries in committed order
//! 8. Verify engine health
//!
//! # Important
//!
//! Once the engine is stopped there is NO automatic rollback; a failure
//! reports `FAILED` and leaves the rest to the operator. All validation
//! that can fail is therefore front-loaded before step 4. A native
//! restore displaces the original data directory rather than deleting
//! it; the displaced tree is removed only after step 8 passes, so a
//! failed restore always leaves the pre-restore state on disk.

mod errors;
mod locator;

pub use errors::{RestoreError, RestoreErrorCode, RestoreResult};
pub use locator::{locate_artifact, ArtifactSelector};

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::changelog::{ChangeLogEntry, ChangeLogSource, RestorePlan};
use crate::object_store::WriterHandle;
use crate::observability::Logger;
use crate::packager::{
    compute_checksum, gunzip_bytes, manifest_key, untar_gz, ArtifactManifest,
};
use crate::producer::EngineKind;

/// Control surface the orchestrator drives on the target engine.
///
/// Implementations wrap whatever the deployment uses to manage the
/// engine process (service manager, container runtime).
pub trait EngineControl {
    /// Stop serving; blocks until the engine is down
    fn stop(&mut self) -> RestoreResult<()>;

    /// Start the engine; blocks until it accepts connections
    fn start(&mut self) -> RestoreResult<()>;

    /// Health check after restart
    fn is_ready(&self) -> bool;

    /// The engine's data directory (swapped for native snapshots)
    fn data_dir(&self) -> &Path;

    /// Load a logical dump into the running engine
    fn load_dump(&mut self, dump: &[u8]) -> RestoreResult<()>;

    /// Apply one replayed change during point-in-time recovery
    fn apply(&mut self, entry: &ChangeLogEntry) -> RestoreResult<()>;
}

/// Machine-readable terminal status of a restore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStatus {
    /// Engine restored and healthy
    Ready,
    /// Retained change log cannot reach the recovery point
    LogGapDetected,
    /// Any other failure
    Failed,
}

impl RestoreStatus {
    /// Status for a finished restore attempt
    pub fn from_result<T>(result: &RestoreResult<T>) -> Self {
        match result {
            Ok(_) => RestoreStatus::Ready,
            Err(e) if e.is_log_gap() => RestoreStatus::LogGapDetected,
            Err(_) => RestoreStatus::Failed,
        }
    }

    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RestoreStatus::Ready => "READY",
            RestoreStatus::LogGapDetected => "LOG_GAP_DETECTED",
            RestoreStatus::Failed => "FAILED",
        }
    }
}

/// What the operator asked for
#[derive(Debug, Clone)]
pub struct RestoreRequest {
    /// Logical store to restore
    pub logical_name: String,
    /// Which artifact to restore from
    pub selector: ArtifactSelector,
    /// Point-in-time recovery target; full restore when unset
    pub recover_to: Option<DateTime<Utc>>,
}

/// Outcome of a completed restore
#[derive(Debug, Clone)]
pub struct RestoreReport {
    /// Artifact the restore ran from
    pub key: String,
    /// Source timestamp of that artifact
    pub snapshot_time: DateTime<Utc>,
    /// Change-log entries replayed (0 for a full restore)
    pub replayed_entries: usize,
}

/// Drives one restore from artifact selection to engine health check
pub struct RestoreOrchestrator {
    environment: String,
    store: WriterHandle,
    staging_dir: PathBuf,
}

impl RestoreOrchestrator {
    /// Create an orchestrator; `staging_dir` must be on the same
    /// filesystem as the engine data directory so the final rename is
    /// atomic
    pub fn new(
        environment: impl Into<String>,
        store: WriterHandle,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            environment: environment.into(),
            store,
            staging_dir: staging_dir.into(),
        }
    }

    /// Execute one restore.
    ///
    /// `log` is required only for point-in-time recovery.
    pub fn execute(
        &self,
        request: &RestoreRequest,
        engine: &mut dyn EngineControl,
        log: Option<&dyn ChangeLogSource>,
    ) -> RestoreResult<RestoreReport> {
        let key = locate_artifact(
            &self.store,
            &self.environment,
            &request.logical_name,
            &request.selector,
        )?;
        Logger::info(
            "RESTORE_START",
            &[("logical_name", request.logical_name.as_str()), ("key", &key)],
        );

        // Everything that can be validated happens before the engine
        // is touched
        let artifact = self.store.get(&key)?;
        let manifest = ArtifactManifest::from_bytes(&self.store.get(&manifest_key(&key))?)?;

        let actual = compute_checksum(&artifact);
        if actual != manifest.checksum {
            return Err(RestoreError::checksum_mismatch(&key, manifest.checksum, actual));
        }

        let snapshot_time = manifest.source_time()?;
        let plan = match request.recover_to {
            Some(recovery_time) => {
                if recovery_time < snapshot_time {
                    return Err(RestoreError::not_found(format!(
                        "recovery point {} precedes snapshot {}",
                        recovery_time.to_rfc3339(),
                        snapshot_time.to_rfc3339()
                    )));
                }
                let source = log.ok_or_else(|| {
                    RestoreError::engine("point-in-time recovery requested without a change log")
                })?;
                Some(RestorePlan::build(
                    snapshot_time,
                    recovery_time,
                    &source.segments()?,
                )?)
            }
            None => None,
        };

        // Point of no return
        self.phase("stopping");
        engine.stop()?;

        self.phase("restoring");
        let mut displaced: Option<PathBuf> = None;
        let dump = match manifest.engine {
            EngineKind::Native => {
                displaced = self.swap_data_dir(engine.data_dir(), &artifact)?;
                None
            }
            EngineKind::Sql => Some(gunzip_bytes(&artifact)?),
        };

        self.phase("starting");
        engine.start()?;
        if let Some(dump) = dump {
            engine.load_dump(&dump)?;
        }

        let mut replayed_entries = 0;
        if let Some(plan) = &plan {
            self.phase("replaying_log");
            for entry in plan.replay_entries() {
                engine.apply(entry)?;
                replayed_entries += 1;
            }
        }

        self.phase("verifying");
        if !engine.is_ready() {
            // The displaced original stays on disk for the operator
            return Err(RestoreError::verify("engine not healthy after restore"));
        }
        if let Some(displaced) = &displaced {
            let _ = fs::remove_dir_all(displaced);
        }

        Logger::info(
            "RESTORE_COMPLETE",
            &[
                ("logical_name", request.logical_name.as_str()),
                ("key", key.as_str()),
                ("replayed_entries", &replayed_entries.to_string()),
            ],
        );

        Ok(RestoreReport {
            key,
            snapshot_time,
            replayed_entries,
        })
    }

    fn phase(&self, phase: &str) {
        Logger::info("RESTORE_PHASE", &[("phase", phase)]);
    }

    /// Unpack a native snapshot next to the data directory and rename
    /// it into place.
    ///
    /// Returns the path the original data directory was displaced to,
    /// if there was one; the caller deletes it only once the restored
    /// engine passes its health check.
    fn swap_data_dir(&self, data_dir: &Path, artifact: &[u8]) -> RestoreResult<Option<PathBuf>> {
        let staged = self.staging_dir.join(format!("restore-{}", Uuid::new_v4()));
        fs::create_dir_all(&staged)
            .map_err(|e| RestoreError::io(format!("create {}: {}", staged.display(), e)))?;
        untar_gz(artifact, &staged)?;

        let parent = data_dir
            .parent()
            .ok_or_else(|| RestoreError::io("data directory has no parent"))?;
        let displaced = parent.join(format!("displaced-{}", Uuid::new_v4()));

        let had_original = data_dir.exists();
        if had_original {
            fs::rename(data_dir, &displaced)
                .map_err(|e| RestoreError::io(format!("displace data dir: {}", e)))?;
        }
        fs::rename(&staged, data_dir)
            .map_err(|e| RestoreError::io(format!("install restored data dir: {}", e)))?;

        let d = OpenOptions::new()
            .read(true)
            .open(parent)
            .map_err(|e| RestoreError::io(format!("open {}: {}", parent.display(), e)))?;
        d.sync_all()
            .map_err(|e| RestoreError::io(format!("fsync {}: {}", parent.display(), e)))?;

        Logger::info(
            "RESTORE_DATA_SWAPPED",
            &[
                ("data_dir", data_dir.display().to_string().as_str()),
                ("displaced", if had_original { "true" } else { "false" }),
            ],
        );
        Ok(had_original.then_some(displaced))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changelog::{ChangeLogResult, ChangeLogSegment, ChangeOp};
    use crate::object_store::LocalFsStore;
    use crate::packager::Packager;
    use crate::producer::{DumpArtifact, DumpPayload};
    use chrono::TimeZone;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct MockEngine {
        running: bool,
        stops: usize,
        healthy: bool,
        data_dir: PathBuf,
        rows: BTreeMap<String, String>,
    }

    impl MockEngine {
        fn new(data_dir: PathBuf) -> Self {
            Self {
                running: true,
                stops: 0,
                healthy: true,
                data_dir,
                rows: BTreeMap::new(),
            }
        }
    }

    impl EngineControl for MockEngine {
        fn stop(&mut self) -> RestoreResult<()> {
            self.running = false;
            self.stops += 1;
            Ok(())
        }

        fn start(&mut self) -> RestoreResult<()> {
            self.running = true;
            Ok(())
        }

        fn is_ready(&self) -> bool {
            self.running && self.healthy
        }

        fn data_dir(&self) -> &Path {
            &self.data_dir
        }

        // Dump format for tests: one `key=value` per line
        fn load_dump(&mut self, dump: &[u8]) -> RestoreResult<()> {
            self.rows.clear();
            for line in String::from_utf8_lossy(dump).lines() {
                if let Some((k, v)) = line.split_once('=') {
                    self.rows.insert(k.to_string(), v.to_string());
                }
            }
            Ok(())
        }

        fn apply(&mut self, entry: &ChangeLogEntry) -> RestoreResult<()> {
            match &entry.op {
                ChangeOp::Put { key, value } => {
                    self.rows.insert(key.clone(), value.clone());
                }
                ChangeOp::Delete { key } => {
                    self.rows.remove(key);
                }
            }
            Ok(())
        }
    }

    struct FixedSegments(Vec<ChangeLogSegment>);

    impl ChangeLogSource for FixedSegments {
        fn segments(&self) -> ChangeLogResult<Vec<ChangeLogSegment>> {
            Ok(self.0.clone())
        }
    }

    fn snapshot_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 28, 2, 0, 0).unwrap()
    }

    fn t(min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 28, 2, min, 0).unwrap()
    }

    fn put(min: u32, key: &str, value: &str) -> ChangeLogEntry {
        ChangeLogEntry {
            timestamp: t(min),
            op: ChangeOp::Put {
                key: key.to_string(),
                value: value.to_string(),
            },
        }
    }

    /// Package and upload a sql dump taken at [`snapshot_time`]
    fn upload_sql_artifact(handle: &WriterHandle, dump: &[u8]) -> String {
        let packaged = Packager::new("prod")
            .package(
                "orders",
                EngineKind::Sql,
                &DumpArtifact {
                    payload: DumpPayload::Stream(dump.to_vec()),
                    source_timestamp: snapshot_time(),
                    logical_size: dump.len() as u64,
                },
            )
            .unwrap();
        handle.put(&packaged.key, &packaged.bytes).unwrap();
        handle
            .put(
                &packaged.manifest_key(),
                &packaged.manifest.to_bytes().unwrap(),
            )
            .unwrap();
        packaged.key
    }

    /// Package and upload a one-file native snapshot taken at
    /// [`snapshot_time`]
    fn upload_native_artifact(handle: &WriterHandle, work: &Path, contents: &[u8]) -> String {
        let snap = work.join("snap");
        std::fs::create_dir_all(&snap).unwrap();
        std::fs::write(snap.join("segment.dat"), contents).unwrap();

        let packaged = Packager::new("prod")
            .package(
                "vectors",
                EngineKind::Native,
                &DumpArtifact {
                    payload: DumpPayload::Directory(snap),
                    source_timestamp: snapshot_time(),
                    logical_size: contents.len() as u64,
                },
            )
            .unwrap();
        handle.put(&packaged.key, &packaged.bytes).unwrap();
        handle
            .put(
                &packaged.manifest_key(),
                &packaged.manifest.to_bytes().unwrap(),
            )
            .unwrap();
        packaged.key
    }

    fn setup() -> (TempDir, WriterHandle, RestoreOrchestrator) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(LocalFsStore::open_write_only(dir.path().join("store")).unwrap());
        let handle = WriterHandle::new(store);
        let orchestrator =
            RestoreOrchestrator::new("prod", handle.clone(), dir.path().join("staging"));
        (dir, handle, orchestrator)
    }

    #[test]
    fn test_full_sql_restore() {
        let (dir, handle, orchestrator) = setup();
        let key = upload_sql_artifact(&handle, b"a=1\nb=2");
        let mut engine = MockEngine::new(dir.path().join("data"));

        let report = orchestrator
            .execute(
                &RestoreRequest {
                    logical_name: "orders".to_string(),
                    selector: ArtifactSelector::Key(key.clone()),
                    recover_to: None,
                },
                &mut engine,
                None,
            )
            .unwrap();

        assert_eq!(report.key, key);
        assert_eq!(report.replayed_entries, 0);
        assert_eq!(engine.rows.get("a").unwrap(), "1");
        assert_eq!(engine.rows.get("b").unwrap(), "2");
        assert!(engine.is_ready());
        assert_eq!(engine.stops, 1);
    }

    #[test]
    fn test_checksum_mismatch_never_touches_engine() {
        let (dir, handle, orchestrator) = setup();
        let key = upload_sql_artifact(&handle, b"a=1");

        // Corrupt the stored artifact in place, bypassing the store
        let artifact_path = dir.path().join("store").join(&key);
        std::fs::write(&artifact_path, b"tampered").unwrap();

        let mut engine = MockEngine::new(dir.path().join("data"));
        let err = orchestrator
            .execute(
                &RestoreRequest {
                    logical_name: "orders".to_string(),
                    selector: ArtifactSelector::Key(key),
                    recover_to: None,
                },
                &mut engine,
                None,
            )
            .unwrap_err();

        assert_eq!(err.code(), RestoreErrorCode::VaultRestoreChecksumMismatch);
        assert_eq!(engine.stops, 0);
        assert!(engine.running);
    }

    #[test]
    fn test_point_in_time_recovery_replays_bounded_entries() {
        let (dir, handle, orchestrator) = setup();
        let key = upload_sql_artifact(&handle, b"a=1\nb=2");

        let log = FixedSegments(vec![
            ChangeLogSegment {
                sequence_no: 1,
                start_time: t(0),
                end_time: t(10),
                entries: vec![put(0, "stale", "x"), put(5, "a", "updated"), put(9, "c", "3")],
            },
            ChangeLogSegment {
                sequence_no: 2,
                start_time: t(10),
                end_time: t(20),
                entries: vec![
                    put(15, "d", "4"),
                    ChangeLogEntry {
                        timestamp: t(16),
                        op: ChangeOp::Delete {
                            key: "b".to_string(),
                        },
                    },
                    put(19, "late", "never"),
                ],
            },
        ]);

        let mut engine = MockEngine::new(dir.path().join("data"));
        let report = orchestrator
            .execute(
                &RestoreRequest {
                    logical_name: "orders".to_string(),
                    selector: ArtifactSelector::Key(key),
                    recover_to: Some(t(16)),
                },
                &mut engine,
                Some(&log),
            )
            .unwrap();

        // put(0) is at the snapshot boundary (excluded), put(19) is
        // past the recovery point (excluded), the delete at t(16) is at
        // the recovery point (included)
        assert_eq!(report.replayed_entries, 4);
        assert_eq!(engine.rows.get("a").unwrap(), "updated");
        assert!(!engine.rows.contains_key("b"));
        assert_eq!(engine.rows.get("c").unwrap(), "3");
        assert_eq!(engine.rows.get("d").unwrap(), "4");
        assert!(!engine.rows.contains_key("stale"));
        assert!(!engine.rows.contains_key("late"));
    }

    #[test]
    fn test_log_gap_detected_before_engine_stop() {
        let (dir, handle, orchestrator) = setup();
        let key = upload_sql_artifact(&handle, b"a=1");

        // Retention already dropped the segment covering the snapshot
        let log = FixedSegments(vec![ChangeLogSegment {
            sequence_no: 9,
            start_time: t(30),
            end_time: t(40),
            entries: vec![],
        }]);

        let mut engine = MockEngine::new(dir.path().join("data"));
        let err = orchestrator
            .execute(
                &RestoreRequest {
                    logical_name: "orders".to_string(),
                    selector: ArtifactSelector::Key(key),
                    recover_to: Some(t(35)),
                },
                &mut engine,
                Some(&log),
            )
            .unwrap_err();

        assert!(err.is_log_gap());
        assert_eq!(RestoreStatus::from_result::<()>(&Err(err)), RestoreStatus::LogGapDetected);
        assert_eq!(engine.stops, 0);
    }

    #[test]
    fn test_native_restore_swaps_data_dir() {
        let (dir, handle, orchestrator) = setup();
        upload_native_artifact(&handle, dir.path(), b"vectors");

        // Existing data dir holds corrupted state
        let data_dir = dir.path().join("engine").join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::write(data_dir.join("segment.dat"), b"corrupt").unwrap();

        let mut engine = MockEngine::new(data_dir.clone());
        orchestrator
            .execute(
                &RestoreRequest {
                    logical_name: "vectors".to_string(),
                    selector: ArtifactSelector::LatestBefore(t(30)),
                    recover_to: None,
                },
                &mut engine,
                None,
            )
            .unwrap();

        assert_eq!(
            std::fs::read(data_dir.join("segment.dat")).unwrap(),
            b"vectors"
        );
        // The displaced directory is cleaned up
        let siblings: Vec<_> = std::fs::read_dir(dir.path().join("engine"))
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(siblings.len(), 1);
        assert!(engine.is_ready());
    }

    #[test]
    fn test_failed_native_restore_preserves_original_data() {
        let (dir, handle, orchestrator) = setup();
        let key = upload_native_artifact(&handle, dir.path(), b"vectors");

        let data_dir = dir.path().join("engine").join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::write(data_dir.join("segment.dat"), b"last-known-good").unwrap();

        let mut engine = MockEngine::new(data_dir.clone());
        engine.healthy = false;

        let result = orchestrator.execute(
            &RestoreRequest {
                logical_name: "vectors".to_string(),
                selector: ArtifactSelector::Key(key),
                recover_to: None,
            },
            &mut engine,
            None,
        );
        assert_eq!(RestoreStatus::from_result(&result), RestoreStatus::Failed);

        // The pre-restore tree survives under a displaced-* sibling
        let displaced: Vec<_> = std::fs::read_dir(dir.path().join("engine"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("displaced-"))
            .collect();
        assert_eq!(displaced.len(), 1);
        assert_eq!(
            std::fs::read(displaced[0].path().join("segment.dat")).unwrap(),
            b"last-known-good"
        );
    }

    #[test]
    fn test_unhealthy_engine_reports_failed() {
        let (dir, handle, orchestrator) = setup();
        let key = upload_sql_artifact(&handle, b"a=1");

        let mut engine = MockEngine::new(dir.path().join("data"));
        engine.healthy = false;

        let result = orchestrator.execute(
            &RestoreRequest {
                logical_name: "orders".to_string(),
                selector: ArtifactSelector::Key(key),
                recover_to: None,
            },
            &mut engine,
            None,
        );

        assert_eq!(RestoreStatus::from_result(&result), RestoreStatus::Failed);
        assert_eq!(
            result.unwrap_err().code(),
            RestoreErrorCode::VaultRestoreVerify
        );
    }

    #[test]
    fn test_recovery_point_before_snapshot_rejected() {
        let (dir, handle, orchestrator) = setup();
        let key = upload_sql_artifact(&handle, b"a=1");
        let log = FixedSegments(vec![]);

        let mut engine = MockEngine::new(dir.path().join("data"));
        let err = orchestrator
            .execute(
                &RestoreRequest {
                    logical_name: "orders".to_string(),
                    selector: ArtifactSelector::Key(key),
                    recover_to: Some(snapshot_time() - chrono::Duration::hours(1)),
                },
                &mut engine,
                Some(&log),
            )
            .unwrap_err();

        assert_eq!(err.code(), RestoreErrorCode::VaultRestoreNotFound);
        assert_eq!(engine.stops, 0);
    }
}
