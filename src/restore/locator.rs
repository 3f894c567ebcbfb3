//! Artifact selection for restore
//!
//! An operator names the artifact either by exact key or as "the latest
//! backup taken at or before T". The latter is resolved against the
//! store listing: keys within one logical-name prefix sort
//! lexicographically in timestamp order, so the candidate is the last
//! parseable artifact key whose embedded timestamp is within bound.

use chrono::{DateTime, Utc};

use crate::object_store::WriterHandle;
use crate::packager::{is_manifest_key, parse_key};

use super::errors::{RestoreError, RestoreResult};

/// How the operator names the artifact to restore
#[derive(Debug, Clone)]
pub enum ArtifactSelector {
    /// Exact object key
    Key(String),
    /// Latest artifact with source timestamp at or before this point
    LatestBefore(DateTime<Utc>),
}

/// Resolve a selector to a concrete artifact key
pub fn locate_artifact(
    store: &WriterHandle,
    environment: &str,
    logical_name: &str,
    selector: &ArtifactSelector,
) -> RestoreResult<String> {
    match selector {
        ArtifactSelector::Key(key) => {
            // Fail fast on a mistyped key instead of at download time
            store.get(key).map_err(|_| {
                RestoreError::not_found(format!("no artifact at key '{}'", key))
            })?;
            Ok(key.clone())
        }
        ArtifactSelector::LatestBefore(bound) => {
            let prefix = format!("{}/{}/", environment, logical_name);
            let objects = store.list(&prefix)?;

            let candidate = objects
                .iter()
                .filter(|m| !is_manifest_key(&m.key))
                .filter_map(|m| parse_key(&m.key).map(|p| (m.key.clone(), p.timestamp)))
                .filter(|(_, ts)| *ts <= *bound)
                .last();

            candidate.map(|(key, _)| key).ok_or_else(|| {
                RestoreError::not_found(format!(
                    "no artifact for '{}' at or before {}",
                    logical_name,
                    bound.to_rfc3339()
                ))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::LocalFsStore;
    use chrono::TimeZone;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store_with_keys(keys: &[&str]) -> (TempDir, WriterHandle) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(LocalFsStore::open_write_only(dir.path()).unwrap());
        let handle = WriterHandle::new(store);
        for key in keys {
            handle.put(key, b"artifact").unwrap();
        }
        (dir, handle)
    }

    #[test]
    fn test_latest_before_picks_newest_in_bound() {
        let (_dir, handle) = store_with_keys(&[
            "prod/orders/2026-08-26/020000.sql.gz",
            "prod/orders/2026-08-27/020000.sql.gz",
            "prod/orders/2026-08-27/020000.sql.gz.manifest.json",
            "prod/orders/2026-08-28/020000.sql.gz",
        ]);

        let bound = Utc.with_ymd_and_hms(2026, 8, 27, 12, 0, 0).unwrap();
        let key = locate_artifact(
            &handle,
            "prod",
            "orders",
            &ArtifactSelector::LatestBefore(bound),
        )
        .unwrap();
        assert_eq!(key, "prod/orders/2026-08-27/020000.sql.gz");
    }

    #[test]
    fn test_latest_before_ignores_other_jobs() {
        let (_dir, handle) = store_with_keys(&[
            "prod/orders/2026-08-26/020000.sql.gz",
            "prod/users/2026-08-28/020000.sql.gz",
        ]);

        let bound = Utc.with_ymd_and_hms(2026, 8, 28, 12, 0, 0).unwrap();
        let key = locate_artifact(
            &handle,
            "prod",
            "orders",
            &ArtifactSelector::LatestBefore(bound),
        )
        .unwrap();
        assert_eq!(key, "prod/orders/2026-08-26/020000.sql.gz");
    }

    #[test]
    fn test_nothing_before_bound() {
        let (_dir, handle) = store_with_keys(&["prod/orders/2026-08-28/020000.sql.gz"]);

        let bound = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
        let err = locate_artifact(
            &handle,
            "prod",
            "orders",
            &ArtifactSelector::LatestBefore(bound),
        )
        .unwrap_err();
        assert_eq!(err.code().as_str(), "VAULT_RESTORE_NOT_FOUND");
    }

    #[test]
    fn test_explicit_key_must_exist() {
        let (_dir, handle) = store_with_keys(&["prod/orders/2026-08-28/020000.sql.gz"]);

        let key = locate_artifact(
            &handle,
            "prod",
            "orders",
            &ArtifactSelector::Key("prod/orders/2026-08-28/020000.sql.gz".to_string()),
        )
        .unwrap();
        assert_eq!(key, "prod/orders/2026-08-28/020000.sql.gz");

        let err = locate_artifact(
            &handle,
            "prod",
            "orders",
            &ArtifactSelector::Key("prod/orders/2026-08-28/999999.sql.gz".to_string()),
        )
        .unwrap_err();
        assert_eq!(err.code().as_str(), "VAULT_RESTORE_NOT_FOUND");
    }
}
