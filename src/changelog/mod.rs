//! Change-log segments for point-in-time recovery
//!
//! The data engine retains an ordered, append-only log of committed
//! writes for a bounded window (the config loader enforces that the
//! window covers at least twice the snapshot interval). Point-in-time
//! recovery replays the entries with timestamps strictly after the
//! snapshot's source timestamp and at or before the requested recovery
//! point, in committed order.
//!
//! # Ordering
//!
//! Segments carry contiguous sequence numbers. A recovery plan is valid
//! only when:
//! 1. some selected segment covers the snapshot boundary,
//! 2. the selected segments form an unbroken sequence, and
//! 3. the retained log reaches the requested recovery point.
//!
//! Any violation is a gap condition, surfaced as `LogGapDetected` and
//! escalated to the operator.

mod errors;

pub use errors::{ChangeLogError, ChangeLogResult};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One committed write, as recorded by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    /// Commit time
    pub timestamp: DateTime<Utc>,
    /// Operation
    pub op: ChangeOp,
}

/// Committed mutation kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum ChangeOp {
    /// Write or replace a row/document
    Put { key: String, value: String },
    /// Delete a row/document
    Delete { key: String },
}

/// An ordered, append-only segment of committed writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogSegment {
    /// Contiguous, strictly increasing segment number
    pub sequence_no: u64,
    /// Commit time of the first entry (or segment open time)
    pub start_time: DateTime<Utc>,
    /// Commit time of the last entry (or segment close time)
    pub end_time: DateTime<Utc>,
    /// Entries in committed order
    pub entries: Vec<ChangeLogEntry>,
}

impl ChangeLogSegment {
    fn validate(&self) -> ChangeLogResult<()> {
        if self.end_time < self.start_time {
            return Err(ChangeLogError::Malformed(
                self.sequence_no,
                "end_time before start_time".to_string(),
            ));
        }
        let mut last: Option<DateTime<Utc>> = None;
        for entry in &self.entries {
            if entry.timestamp < self.start_time || entry.timestamp > self.end_time {
                return Err(ChangeLogError::Malformed(
                    self.sequence_no,
                    "entry timestamp outside segment bounds".to_string(),
                ));
            }
            if let Some(prev) = last {
                if entry.timestamp < prev {
                    return Err(ChangeLogError::Malformed(
                        self.sequence_no,
                        "entries out of committed order".to_string(),
                    ));
                }
            }
            last = Some(entry.timestamp);
        }
        Ok(())
    }
}

/// Source of retained change-log segments
pub trait ChangeLogSource {
    /// All retained segments, ordered by sequence number
    fn segments(&self) -> ChangeLogResult<Vec<ChangeLogSegment>>;
}

/// Reads segments from the engine's log directory, one JSON file per
/// segment (`<sequence>.json`).
pub struct FsChangeLogSource {
    dir: PathBuf,
}

impl FsChangeLogSource {
    /// Create a source over a segment directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The segment directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ChangeLogSource for FsChangeLogSource {
    fn segments(&self) -> ChangeLogResult<Vec<ChangeLogSegment>> {
        let entries =
            fs::read_dir(&self.dir).map_err(|e| ChangeLogError::ReadFailed(e.to_string()))?;

        let mut segments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ChangeLogError::ReadFailed(e.to_string()))?;
            let path = entry.path();
            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            let content =
                fs::read_to_string(&path).map_err(|e| ChangeLogError::ReadFailed(e.to_string()))?;
            let segment: ChangeLogSegment = serde_json::from_str(&content)
                .map_err(|e| ChangeLogError::ReadFailed(format!("{}: {}", path.display(), e)))?;
            segment.validate()?;
            segments.push(segment);
        }

        segments.sort_by_key(|s| s.sequence_no);
        Ok(segments)
    }
}

/// An operator-constructed recovery plan: the ordered segments whose
/// entries must be replayed onto a restored snapshot to reach the
/// requested recovery point. Discarded after the restore completes.
#[derive(Debug, Clone)]
pub struct RestorePlan {
    /// Snapshot boundary; only entries strictly after this replay
    pub snapshot_time: DateTime<Utc>,
    /// Requested recovery point; entries at or before this replay
    pub recovery_time: DateTime<Utc>,
    /// Segments in sequence order
    pub segments: Vec<ChangeLogSegment>,
}

impl RestorePlan {
    /// Build a plan from the retained log.
    ///
    /// Fails with a gap condition when the boundary is not covered, the
    /// sequence is broken, or the log ends before the recovery point.
    pub fn build(
        snapshot_time: DateTime<Utc>,
        recovery_time: DateTime<Utc>,
        retained: &[ChangeLogSegment],
    ) -> ChangeLogResult<Self> {
        // Segments overlapping (snapshot_time, recovery_time]
        let selected: Vec<ChangeLogSegment> = retained
            .iter()
            .filter(|s| s.end_time > snapshot_time && s.start_time <= recovery_time)
            .cloned()
            .collect();

        let boundary_covered = selected
            .first()
            .map(|s| s.start_time <= snapshot_time)
            .unwrap_or(false);
        if !boundary_covered {
            return Err(ChangeLogError::BoundaryNotCovered(
                snapshot_time.to_rfc3339(),
            ));
        }

        for pair in selected.windows(2) {
            if pair[1].sequence_no != pair[0].sequence_no + 1 {
                return Err(ChangeLogError::LogGapDetected {
                    expected: pair[0].sequence_no + 1,
                    found: pair[1].sequence_no,
                });
            }
        }

        let log_end = selected
            .last()
            .map(|s| s.end_time)
            .expect("boundary check guarantees at least one segment");
        if log_end < recovery_time {
            return Err(ChangeLogError::RecoveryPointNotCovered {
                log_end: log_end.to_rfc3339(),
                requested: recovery_time.to_rfc3339(),
            });
        }

        Ok(Self {
            snapshot_time,
            recovery_time,
            segments: selected,
        })
    }

    /// Entries to replay, in committed order, already bounded to
    /// (snapshot_time, recovery_time]
    pub fn replay_entries(&self) -> impl Iterator<Item = &ChangeLogEntry> {
        let snapshot_time = self.snapshot_time;
        let recovery_time = self.recovery_time;
        self.segments
            .iter()
            .flat_map(|s| s.entries.iter())
            .filter(move |e| e.timestamp > snapshot_time && e.timestamp <= recovery_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 28, 10, min, 0).unwrap()
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

    fn segment(seq: u64, start: u32, end: u32, entries: Vec<ChangeLogEntry>) -> ChangeLogSegment {
        ChangeLogSegment {
            sequence_no: seq,
            start_time: t(start),
            end_time: t(end),
            entries,
        }
    }

    #[test]
    fn test_plan_selects_bounded_entries() {
        let retained = vec![
            segment(1, 0, 10, vec![put(5, "a", "1"), put(9, "b", "2")]),
            segment(2, 10, 20, vec![put(12, "a", "3"), put(18, "c", "4")]),
            segment(3, 20, 30, vec![put(25, "d", "5")]),
        ];

        // Snapshot at 10:09, recover to 10:18
        let plan = RestorePlan::build(t(9), t(18), &retained).unwrap();
        let keys: Vec<_> = plan
            .replay_entries()
            .map(|e| match &e.op {
                ChangeOp::Put { key, .. } => key.clone(),
                ChangeOp::Delete { key } => key.clone(),
            })
            .collect();
        assert_eq!(keys, vec!["a", "c"]);
    }

    #[test]
    fn test_missing_boundary_segment_is_gap() {
        // Retention already dropped the segment containing the boundary
        let retained = vec![segment(5, 20, 30, vec![])];

        let err = RestorePlan::build(t(9), t(25), &retained).unwrap_err();
        assert!(matches!(err, ChangeLogError::BoundaryNotCovered(_)));
        assert!(err.is_gap());
    }

    #[test]
    fn test_broken_sequence_is_gap() {
        let retained = vec![
            segment(1, 0, 10, vec![]),
            // segment 2 missing
            segment(3, 20, 30, vec![]),
        ];

        let err = RestorePlan::build(t(5), t(25), &retained).unwrap_err();
        assert!(matches!(
            err,
            ChangeLogError::LogGapDetected {
                expected: 2,
                found: 3
            }
        ));
    }

    #[test]
    fn test_recovery_point_beyond_log_is_gap() {
        let retained = vec![segment(1, 0, 10, vec![])];

        let err = RestorePlan::build(t(5), t(25), &retained).unwrap_err();
        assert!(matches!(err, ChangeLogError::RecoveryPointNotCovered { .. }));
        assert!(err.is_gap());
    }

    #[test]
    fn test_segment_validation_rejects_disorder() {
        let bad = ChangeLogSegment {
            sequence_no: 1,
            start_time: t(0),
            end_time: t(10),
            entries: vec![put(8, "a", "1"), put(4, "b", "2")],
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_fs_source_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let seg = segment(7, 0, 10, vec![put(5, "a", "1")]);
        std::fs::write(
            dir.path().join("7.json"),
            serde_json::to_vec(&seg).unwrap(),
        )
        .unwrap();
        // Non-segment files are ignored
        std::fs::write(dir.path().join("README"), b"x").unwrap();

        let source = FsChangeLogSource::new(dir.path());
        let segments = source.segments().unwrap();
        assert_eq!(segments, vec![seg]);
    }
}
