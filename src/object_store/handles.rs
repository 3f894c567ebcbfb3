//! Capability handles over an object store
//!
//! The ransomware-containment property of the design: the principal that
//! produces backups can create and read them, never delete them. Instead
//! of trusting configuration to keep the credentials apart, the split is
//! structural — the pipeline is handed a [`WriterHandle`] and there is no
//! way to reach `delete` through it; only the retention manager holds a
//! [`SweeperHandle`].

use std::sync::Arc;

use super::errors::StoreResult;
use super::{ObjectMeta, ObjectStore};

/// Create/read/list capability for the producing host.
///
/// Cloning shares the underlying store client.
#[derive(Clone)]
pub struct WriterHandle {
    inner: Arc<dyn ObjectStore>,
}

impl WriterHandle {
    /// Wrap a store client as a write-only principal
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { inner: store }
    }

    /// Upload an object; atomic visibility, refuses existing keys
    pub fn put(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        self.inner.put(key, bytes)
    }

    /// Download an object
    pub fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        self.inner.get(key)
    }

    /// Enumerate objects under a prefix
    pub fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectMeta>> {
        self.inner.list(prefix)
    }
}

/// Enumerate-and-delete capability for the retention principal.
///
/// Has no `put`: the sweeper never creates artifacts, so a compromised
/// sweeper cannot plant objects either.
#[derive(Clone)]
pub struct SweeperHandle {
    inner: Arc<dyn ObjectStore>,
}

impl SweeperHandle {
    /// Wrap a store client as the retention principal
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { inner: store }
    }

    /// Enumerate objects under a prefix
    pub fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectMeta>> {
        self.inner.list(prefix)
    }

    /// Delete an object
    pub fn delete(&self, key: &str) -> StoreResult<()> {
        self.inner.delete(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_store::LocalFsStore;
    use tempfile::TempDir;

    #[test]
    fn test_writer_handle_puts_and_reads() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(LocalFsStore::open_write_only(dir.path()).unwrap());
        let writer = WriterHandle::new(store);

        writer.put("prod/orders/2026-01-01/120000.sql.gz", b"abc").unwrap();
        assert_eq!(writer.get("prod/orders/2026-01-01/120000.sql.gz").unwrap(), b"abc");
        assert_eq!(writer.list("prod/").unwrap().len(), 1);
    }

    #[test]
    fn test_sweeper_handle_deletes() {
        let dir = TempDir::new().unwrap();

        // Producer writes through its own write-only client
        let producer_store = Arc::new(LocalFsStore::open_write_only(dir.path()).unwrap());
        WriterHandle::new(producer_store)
            .put("prod/orders/2026-01-01/120000.sql.gz", b"abc")
            .unwrap();

        // Retention runs with a distinct, delete-capable client
        let sweeper_store = Arc::new(LocalFsStore::open(dir.path()).unwrap());
        let sweeper = SweeperHandle::new(sweeper_store);
        sweeper.delete("prod/orders/2026-01-01/120000.sql.gz").unwrap();
        assert!(sweeper.list("prod/").unwrap().is_empty());
    }
}
