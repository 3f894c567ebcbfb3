//! Retention Invariant Tests
//!
//! Tests for the retention properties:
//! - Objects are expired strictly by the timestamp embedded in the key
//! - The retention window boundary keeps the oldest in-window object
//! - Foreign keys (not following the layout) are never touched
//! - Sidecar manifests age out together with their artifacts

use chrono::{TimeZone, Utc};
use snapvault::object_store::{LocalFsStore, ObjectStore, SweeperHandle, WriterHandle};
use snapvault::packager::{manifest_key, object_key};
use snapvault::retention::{AgePolicy, RetentionManager};
use std::sync::Arc;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn stores(dir: &TempDir) -> (WriterHandle, SweeperHandle) {
    let writer = Arc::new(LocalFsStore::open_write_only(dir.path()).unwrap());
    let sweeper = Arc::new(LocalFsStore::open(dir.path()).unwrap());
    (WriterHandle::new(writer), SweeperHandle::new(sweeper))
}

fn daily_key(day: u32) -> String {
    let ts = Utc.with_ymd_and_hms(2026, 8, day, 2, 0, 0).unwrap();
    object_key("prod", "orders", ts, "sql.gz")
}

// =============================================================================
// Age-based expiry
// =============================================================================

/// With a 7-day policy and daily backups on days 1..=10, a sweep later
/// on day 10 keeps exactly the backups from days 4..=10.
#[test]
fn test_seven_day_window_keeps_last_seven_dailies() {
    let dir = TempDir::new().unwrap();
    let (writer, sweeper) = stores(&dir);

    for day in 1..=10 {
        writer.put(&daily_key(day), b"dump").unwrap();
    }

    let manager = RetentionManager::new(sweeper.clone(), AgePolicy { max_age_days: 7 });
    let now = Utc.with_ymd_and_hms(2026, 8, 10, 12, 0, 0).unwrap();
    let report = manager.sweep("prod/orders/", now).unwrap();

    assert_eq!(report.examined, 10);
    assert_eq!(report.deleted, 3);
    assert_eq!(report.kept, 7);

    let surviving: Vec<String> = sweeper
        .list("prod/orders/")
        .unwrap()
        .into_iter()
        .map(|m| m.key)
        .collect();
    let expected: Vec<String> = (4..=10).map(daily_key).collect();
    assert_eq!(surviving, expected);
}

/// An object exactly at the age boundary is kept; expiry requires
/// strictly older.
#[test]
fn test_boundary_object_is_kept() {
    let dir = TempDir::new().unwrap();
    let (writer, sweeper) = stores(&dir);

    let ts = Utc.with_ymd_and_hms(2026, 8, 1, 2, 0, 0).unwrap();
    writer.put(&object_key("prod", "orders", ts, "sql.gz"), b"dump").unwrap();

    let manager = RetentionManager::new(sweeper, AgePolicy { max_age_days: 7 });
    // Exactly 7 days later
    let now = Utc.with_ymd_and_hms(2026, 8, 8, 2, 0, 0).unwrap();
    let report = manager.sweep("prod/orders/", now).unwrap();

    assert_eq!(report.deleted, 0);
    assert_eq!(report.kept, 1);
}

/// Age comes from the key, not the store mtime: a freshly written
/// object whose key says it is old expires immediately.
#[test]
fn test_age_is_key_embedded_not_mtime() {
    let dir = TempDir::new().unwrap();
    let (writer, sweeper) = stores(&dir);

    // Written now, but the key claims January
    let ts = Utc.with_ymd_and_hms(2026, 1, 1, 2, 0, 0).unwrap();
    writer.put(&object_key("prod", "orders", ts, "sql.gz"), b"dump").unwrap();

    let manager = RetentionManager::new(sweeper, AgePolicy { max_age_days: 7 });
    let report = manager
        .sweep("prod/orders/", Utc.with_ymd_and_hms(2026, 8, 28, 0, 0, 0).unwrap())
        .unwrap();
    assert_eq!(report.deleted, 1);
}

// =============================================================================
// Foreign objects and sidecars
// =============================================================================

/// Keys that do not follow the layout are counted and left alone.
#[test]
fn test_foreign_keys_never_deleted() {
    let dir = TempDir::new().unwrap();
    let (writer, sweeper) = stores(&dir);

    writer.put("prod/orders/README", b"not a backup").unwrap();
    writer.put(&daily_key(1), b"dump").unwrap();

    let manager = RetentionManager::new(sweeper.clone(), AgePolicy { max_age_days: 7 });
    let now = Utc.with_ymd_and_hms(2026, 8, 28, 0, 0, 0).unwrap();
    let report = manager.sweep("prod/orders/", now).unwrap();

    assert_eq!(report.foreign, 1);
    assert_eq!(report.deleted, 1);
    assert!(sweeper
        .list("prod/orders/")
        .unwrap()
        .iter()
        .any(|m| m.key == "prod/orders/README"));
}

/// Sidecar manifests carry the artifact's timestamp in their key, so
/// they expire in the same sweep as the artifact.
#[test]
fn test_manifest_sidecar_expires_with_artifact() {
    let dir = TempDir::new().unwrap();
    let (writer, sweeper) = stores(&dir);

    let key = daily_key(1);
    writer.put(&key, b"dump").unwrap();
    writer.put(&manifest_key(&key), b"{}").unwrap();

    let manager = RetentionManager::new(sweeper.clone(), AgePolicy { max_age_days: 7 });
    let now = Utc.with_ymd_and_hms(2026, 8, 28, 0, 0, 0).unwrap();
    let report = manager.sweep("prod/orders/", now).unwrap();

    assert_eq!(report.deleted, 2);
    assert!(sweeper.list("prod/orders/").unwrap().is_empty());
}
