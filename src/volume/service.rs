//! Volume snapshot service interface and local implementation
//!
//! The block-storage service provides atomic point-in-time snapshots of
//! a volume without quiescing the engine; snapvault relies on that
//! crash-consistency guarantee rather than stopping writes.
//!
//! A service handle is bound to one region. Cross-region copy creates a
//! snapshot in the destination region; retention in that region runs
//! through a handle bound there.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{VolumeError, VolumeResult};

/// One snapshot as reported by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSnapshotInfo {
    /// Service-assigned snapshot identifier
    pub id: String,
    /// Creation time at the service
    pub created_at: DateTime<Utc>,
}

/// Block-storage snapshot interface, one handle per region.
pub trait VolumeSnapshotService: Send + Sync {
    /// Request a point-in-time snapshot of `volume_id`, tagged
    fn create_snapshot(
        &self,
        volume_id: &str,
        tags: &[(String, String)],
    ) -> VolumeResult<String>;

    /// Snapshots of `volume_id` in this region, newest first
    fn list_snapshots(&self, volume_id: &str) -> VolumeResult<Vec<VolumeSnapshotInfo>>;

    /// Delete a snapshot in this region
    fn delete_snapshot(&self, id: &str) -> VolumeResult<()>;

    /// Copy a snapshot from this region into `dest`, returning the new id.
    /// The copy keeps the source volume id so retention in the
    /// destination region can group it with its siblings.
    fn copy_snapshot(&self, id: &str, dest: &dyn VolumeSnapshotService) -> VolumeResult<String>;

    /// Receiving side of a cross-region copy: register snapshot data that
    /// originated elsewhere under the original volume id
    fn copy_in(
        &self,
        volume_id: &str,
        tags: &[(String, String)],
        data_src: &Path,
    ) -> VolumeResult<String>;
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotMeta {
    volume_id: String,
    created_at: DateTime<Utc>,
    tags: Vec<(String, String)>,
}

/// Directory-backed snapshot service for local deployments and tests.
///
/// A "volume" is a directory; a snapshot is a recursive copy of it under
/// the service root, one subdirectory per snapshot with a `meta.json`.
/// Not a substitute for a real block service in production, but it gives
/// the manager and CLI a complete implementation to run against.
pub struct LocalVolumeService {
    root: PathBuf,
}

impl LocalVolumeService {
    /// Open a service rooted at `root` (created if absent)
    pub fn open(root: impl Into<PathBuf>) -> VolumeResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| VolumeError::api_failed(root.display().to_string(), e.to_string()))?;
        Ok(Self { root })
    }

    fn snapshot_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    fn read_meta(&self, id: &str) -> VolumeResult<SnapshotMeta> {
        let path = self.snapshot_dir(id).join("meta.json");
        let content = fs::read_to_string(&path)
            .map_err(|e| VolumeError::ListFailed {
                volume: id.to_string(),
                reason: e.to_string(),
            })?;
        serde_json::from_str(&content).map_err(|e| VolumeError::ListFailed {
            volume: id.to_string(),
            reason: e.to_string(),
        })
    }

    fn copy_dir(src: &Path, dst: &Path) -> std::io::Result<()> {
        fs::create_dir_all(dst)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            let src_path = entry.path();
            let dst_path = dst.join(entry.file_name());
            if src_path.is_dir() {
                Self::copy_dir(&src_path, &dst_path)?;
            } else {
                fs::copy(&src_path, &dst_path)?;
            }
        }
        Ok(())
    }
}

impl VolumeSnapshotService for LocalVolumeService {
    fn create_snapshot(
        &self,
        volume_id: &str,
        tags: &[(String, String)],
    ) -> VolumeResult<String> {
        let source = Path::new(volume_id);
        if !source.is_dir() {
            return Err(VolumeError::api_failed(
                volume_id,
                "volume path does not exist",
            ));
        }

        let id = format!("snap-{}", Uuid::new_v4());
        let dir = self.snapshot_dir(&id);
        let data_dir = dir.join("data");

        Self::copy_dir(source, &data_dir)
            .map_err(|e| VolumeError::api_failed(volume_id, e.to_string()))?;

        let meta = SnapshotMeta {
            volume_id: volume_id.to_string(),
            created_at: Utc::now(),
            tags: tags.to_vec(),
        };
        let meta_json = serde_json::to_vec_pretty(&meta)
            .map_err(|e| VolumeError::api_failed(volume_id, e.to_string()))?;
        fs::write(dir.join("meta.json"), meta_json)
            .map_err(|e| VolumeError::api_failed(volume_id, e.to_string()))?;

        Ok(id)
    }

    fn list_snapshots(&self, volume_id: &str) -> VolumeResult<Vec<VolumeSnapshotInfo>> {
        let mut out = Vec::new();
        let entries = fs::read_dir(&self.root).map_err(|e| VolumeError::ListFailed {
            volume: volume_id.to_string(),
            reason: e.to_string(),
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| VolumeError::ListFailed {
                volume: volume_id.to_string(),
                reason: e.to_string(),
            })?;
            let Some(id) = entry.file_name().to_str().map(String::from) else {
                continue;
            };
            if !entry.path().is_dir() {
                continue;
            }
            let meta = self.read_meta(&id)?;
            if meta.volume_id == volume_id {
                out.push(VolumeSnapshotInfo {
                    id,
                    created_at: meta.created_at,
                });
            }
        }

        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(out)
    }

    fn delete_snapshot(&self, id: &str) -> VolumeResult<()> {
        let dir = self.snapshot_dir(id);
        if !dir.exists() {
            return Err(VolumeError::DeleteFailed {
                snapshot: id.to_string(),
                reason: "not found".to_string(),
            });
        }
        fs::remove_dir_all(&dir).map_err(|e| VolumeError::DeleteFailed {
            snapshot: id.to_string(),
            reason: e.to_string(),
        })
    }

    fn copy_snapshot(&self, id: &str, dest: &dyn VolumeSnapshotService) -> VolumeResult<String> {
        let meta = self.read_meta(id).map_err(|e| VolumeError::CopyFailed {
            snapshot: id.to_string(),
            region: "dest".to_string(),
            reason: e.to_string(),
        })?;

        let data_dir = self.snapshot_dir(id).join("data");
        dest.copy_in(&meta.volume_id, &meta.tags, &data_dir)
            .map_err(|e| VolumeError::CopyFailed {
                snapshot: id.to_string(),
                region: "dest".to_string(),
                reason: e.to_string(),
            })
    }

    fn copy_in(
        &self,
        volume_id: &str,
        tags: &[(String, String)],
        data_src: &Path,
    ) -> VolumeResult<String> {
        let id = format!("snap-{}", Uuid::new_v4());
        let dir = self.snapshot_dir(&id);

        Self::copy_dir(data_src, &dir.join("data"))
            .map_err(|e| VolumeError::api_failed(volume_id, e.to_string()))?;

        let meta = SnapshotMeta {
            volume_id: volume_id.to_string(),
            created_at: Utc::now(),
            tags: tags.to_vec(),
        };
        let meta_json = serde_json::to_vec_pretty(&meta)
            .map_err(|e| VolumeError::api_failed(volume_id, e.to_string()))?;
        fs::write(dir.join("meta.json"), meta_json)
            .map_err(|e| VolumeError::api_failed(volume_id, e.to_string()))?;

        Ok(id)
    }
}
