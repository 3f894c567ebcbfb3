//! Block-volume snapshot management
//!
//! Independent of the logical backup pipeline: on its own daily
//! schedule, the manager requests a point-in-time snapshot of the data
//! volume from the storage service, tags it, prunes to the most recent
//! N, and optionally copies it to a second region with an independent
//! retention count there.
//!
//! # Important
//!
//! Volume snapshot failures are reported, never retried synchronously,
//! and never block the database engine or the logical pipeline.
//! Consistency relies on the storage service's atomic snapshot
//! guarantee; the engine is not quiesced.

mod errors;
mod service;

pub use errors::{VolumeError, VolumeResult};
pub use service::{LocalVolumeService, VolumeSnapshotInfo, VolumeSnapshotService};

use std::sync::Arc;

use crate::config::VolumePlanConfig;
use crate::observability::{AlertSink, Logger};

/// Outcome of executing one volume plan
#[derive(Debug, Clone)]
pub struct VolumeRunReport {
    /// Newly created snapshot id in the primary region
    pub snapshot_id: String,
    /// Snapshots pruned in the primary region
    pub pruned: usize,
    /// Snapshot id of the cross-region copy, when configured
    pub copy_id: Option<String>,
    /// Snapshots pruned in the copy region
    pub copy_pruned: usize,
}

/// Volume snapshot manager for one deployment
pub struct VolumeSnapshotManager {
    environment: String,
    primary: Arc<dyn VolumeSnapshotService>,
    /// Service handle bound to the copy region, when configured
    copy_region: Option<(String, Arc<dyn VolumeSnapshotService>)>,
}

impl VolumeSnapshotManager {
    /// Create a manager over the primary-region service
    pub fn new(environment: impl Into<String>, primary: Arc<dyn VolumeSnapshotService>) -> Self {
        Self {
            environment: environment.into(),
            primary,
            copy_region: None,
        }
    }

    /// Attach a service handle for the copy region
    pub fn with_copy_region(
        mut self,
        region: impl Into<String>,
        service: Arc<dyn VolumeSnapshotService>,
    ) -> Self {
        self.copy_region = Some((region.into(), service));
        self
    }

    fn tags(&self, plan: &VolumePlanConfig) -> Vec<(String, String)> {
        vec![
            ("snapvault:volume".to_string(), plan.volume_id.clone()),
            ("snapvault:environment".to_string(), self.environment.clone()),
        ]
    }

    /// Keep the newest `max_count` snapshots of a volume, delete the rest
    fn prune(
        service: &dyn VolumeSnapshotService,
        volume_id: &str,
        max_count: u32,
    ) -> VolumeResult<usize> {
        let snapshots = service.list_snapshots(volume_id)?;
        let mut pruned = 0;
        // list_snapshots returns newest first
        for snapshot in snapshots.iter().skip(max_count as usize) {
            service.delete_snapshot(&snapshot.id)?;
            pruned += 1;
        }
        Ok(pruned)
    }

    /// Execute one volume plan: snapshot, prune, optionally copy + prune.
    ///
    /// Alerts on failure and returns the error; the caller does not
    /// retry — the next scheduled execution is the retry.
    pub fn run_plan(
        &self,
        plan: &VolumePlanConfig,
        alerts: &dyn AlertSink,
    ) -> VolumeResult<VolumeRunReport> {
        let snapshot_id = self
            .primary
            .create_snapshot(&plan.volume_id, &self.tags(plan))
            .map_err(|e| {
                alerts.raise("SNAPSHOT_API_FAILED", &plan.volume_id, &e.to_string());
                e
            })?;

        let pruned = Self::prune(self.primary.as_ref(), &plan.volume_id, plan.max_count)
            .map_err(|e| {
                alerts.raise("SNAPSHOT_PRUNE_FAILED", &plan.volume_id, &e.to_string());
                e
            })?;

        let mut copy_id = None;
        let mut copy_pruned = 0;

        if let Some(region) = &plan.copy_region {
            match &self.copy_region {
                Some((bound_region, dest)) if bound_region == region => {
                    let id = self
                        .primary
                        .copy_snapshot(&snapshot_id, dest.as_ref())
                        .map_err(|e| {
                            alerts.raise("COPY_FAILED", &plan.volume_id, &e.to_string());
                            e
                        })?;
                    copy_id = Some(id);

                    // copy_max_count is validated to exist alongside copy_region
                    let max = plan.copy_max_count.unwrap_or(plan.max_count);
                    copy_pruned = Self::prune(dest.as_ref(), &plan.volume_id, max)
                        .map_err(|e| {
                            alerts.raise("SNAPSHOT_PRUNE_FAILED", &plan.volume_id, &e.to_string());
                            e
                        })?;
                }
                _ => {
                    let err = VolumeError::CopyFailed {
                        snapshot: snapshot_id.clone(),
                        region: region.clone(),
                        reason: "no service handle bound for region".to_string(),
                    };
                    alerts.raise("COPY_FAILED", &plan.volume_id, &err.to_string());
                    return Err(err);
                }
            }
        }

        Logger::info(
            "VOLUME_SNAPSHOT_COMPLETE",
            &[
                ("volume", plan.volume_id.as_str()),
                ("snapshot", snapshot_id.as_str()),
                ("pruned", &pruned.to_string()),
            ],
        );

        Ok(VolumeRunReport {
            snapshot_id,
            pruned,
            copy_id,
            copy_pruned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::LogAlertSink;
    use std::fs;
    use tempfile::TempDir;

    fn plan(volume_id: &str, max_count: u32) -> VolumePlanConfig {
        VolumePlanConfig {
            volume_id: volume_id.to_string(),
            time_of_day: "02:30".to_string(),
            max_count,
            copy_region: None,
            copy_max_count: None,
        }
    }

    fn make_volume() -> TempDir {
        let vol = TempDir::new().unwrap();
        fs::write(vol.path().join("data.db"), b"engine state").unwrap();
        vol
    }

    #[test]
    fn test_run_plan_creates_and_prunes() {
        let vol = make_volume();
        let root = TempDir::new().unwrap();
        let service = Arc::new(LocalVolumeService::open(root.path()).unwrap());
        let manager = VolumeSnapshotManager::new("prod", service.clone());

        let volume_id = vol.path().to_str().unwrap().to_string();
        let plan = plan(&volume_id, 2);

        // Three runs with max_count 2: oldest is pruned on the third
        manager.run_plan(&plan, &LogAlertSink).unwrap();
        manager.run_plan(&plan, &LogAlertSink).unwrap();
        let report = manager.run_plan(&plan, &LogAlertSink).unwrap();

        assert_eq!(report.pruned, 1);
        assert_eq!(service.list_snapshots(&volume_id).unwrap().len(), 2);
    }

    #[test]
    fn test_run_plan_with_copy_region() {
        let vol = make_volume();
        let primary_root = TempDir::new().unwrap();
        let replica_root = TempDir::new().unwrap();
        let primary = Arc::new(LocalVolumeService::open(primary_root.path()).unwrap());
        let replica = Arc::new(LocalVolumeService::open(replica_root.path()).unwrap());

        let manager = VolumeSnapshotManager::new("prod", primary.clone())
            .with_copy_region("eu-west-1", replica.clone());

        let volume_id = vol.path().to_str().unwrap().to_string();
        let mut plan = plan(&volume_id, 7);
        plan.copy_region = Some("eu-west-1".to_string());
        plan.copy_max_count = Some(1);

        let first = manager.run_plan(&plan, &LogAlertSink).unwrap();
        assert!(first.copy_id.is_some());

        // Second run prunes the copy region down to one
        let second = manager.run_plan(&plan, &LogAlertSink).unwrap();
        assert_eq!(second.copy_pruned, 1);
        assert_eq!(replica.list_snapshots(&volume_id).unwrap().len(), 1);
        assert_eq!(primary.list_snapshots(&volume_id).unwrap().len(), 2);
    }

    #[test]
    fn test_unbound_copy_region_is_copy_failed() {
        let vol = make_volume();
        let root = TempDir::new().unwrap();
        let service = Arc::new(LocalVolumeService::open(root.path()).unwrap());
        let manager = VolumeSnapshotManager::new("prod", service);

        let volume_id = vol.path().to_str().unwrap().to_string();
        let mut plan = plan(&volume_id, 7);
        plan.copy_region = Some("eu-west-1".to_string());
        plan.copy_max_count = Some(3);

        let err = manager.run_plan(&plan, &LogAlertSink).unwrap_err();
        assert!(matches!(err, VolumeError::CopyFailed { .. }));
    }
}
