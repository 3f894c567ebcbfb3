//! Age-based retention for logical snapshots
//!
//! The retention manager enumerates objects under a prefix, computes
//! each object's age from the timestamp embedded in its key, and deletes
//! objects older than the policy threshold. It runs on its own schedule,
//! independent of the backup cadence, and holds the only delete-capable
//! handle in the process: the producing pipeline structurally cannot
//! reach `delete` (see [`crate::object_store::WriterHandle`]).
//!
//! # Important
//!
//! The sweep trusts key-embedded timestamps, not store mtimes; a
//! re-replicated object keeps its logical age.
//! Keys that do not follow the layout are foreign objects and are never
//! touched.
//! The sweep is safe to run concurrently with backup runs: it only ever
//! enumerates and deletes-by-age, and new uploads are never old enough
//! to qualify.

mod errors;

pub use errors::{RetentionError, RetentionResult};

use chrono::{DateTime, Duration, Utc};

use crate::object_store::SweeperHandle;
use crate::observability::Logger;
use crate::packager::parse_key;

/// Age-based retention policy for logical snapshot artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgePolicy {
    /// Objects strictly older than this many days are expired
    pub max_age_days: u32,
}

impl AgePolicy {
    /// True if an object with the given source timestamp is expired
    pub fn is_expired(&self, source: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - source > Duration::days(self.max_age_days as i64)
    }
}

/// Outcome of one retention sweep
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Objects enumerated under the prefix
    pub examined: usize,
    /// Objects deleted
    pub deleted: usize,
    /// Objects within the retention window
    pub kept: usize,
    /// Objects whose keys do not follow the layout
    pub foreign: usize,
    /// Keys whose delete call failed, with the error text
    pub failures: Vec<(String, String)>,
}

/// Retention manager holding the delete-capable principal
pub struct RetentionManager {
    handle: SweeperHandle,
    policy: AgePolicy,
}

impl RetentionManager {
    /// Create a manager from the sweeper handle and policy
    pub fn new(handle: SweeperHandle, policy: AgePolicy) -> Self {
        Self { handle, policy }
    }

    /// Sweep one prefix at the given clock reading.
    ///
    /// Deletes every expired object it can; collects per-object failures
    /// and returns `SweepIncomplete` if any expired object survived, so
    /// the caller alerts and the next sweep retries.
    pub fn sweep(&self, prefix: &str, now: DateTime<Utc>) -> RetentionResult<SweepReport> {
        let objects = self
            .handle
            .list(prefix)
            .map_err(|e| RetentionError::ListFailed {
                prefix: prefix.to_string(),
                reason: e.to_string(),
            })?;

        let mut report = SweepReport {
            examined: objects.len(),
            ..SweepReport::default()
        };
        let mut expired = 0;

        for object in &objects {
            let Some(parsed) = parse_key(&object.key) else {
                report.foreign += 1;
                continue;
            };

            if !self.policy.is_expired(parsed.timestamp, now) {
                report.kept += 1;
                continue;
            }

            expired += 1;
            match self.handle.delete(&object.key) {
                Ok(()) => report.deleted += 1,
                Err(e) => report.failures.push((object.key.clone(), e.to_string())),
            }
        }

        Logger::info(
            "RETENTION_SWEEP_COMPLETE",
            &[
                ("prefix", prefix),
                ("examined", &report.examined.to_string()),
                ("deleted", &report.deleted.to_string()),
                ("kept", &report.kept.to_string()),
                ("failed", &report.failures.len().to_string()),
            ],
        );

        if !report.failures.is_empty() {
            return Err(RetentionError::SweepIncomplete {
                prefix: prefix.to_string(),
                expired,
                failed: report.failures.len(),
            });
        }

        Ok(report)
    }
}
