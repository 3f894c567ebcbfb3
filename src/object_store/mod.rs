//! Durable object storage for backup artifacts
//!
//! Artifacts live under a deterministic key layout:
//!
//! ```text
//! <backup-root>/<environment>/<logical-name>/<YYYY-MM-DD>/<HHMMSS>.<ext>
//! ```
//!
//! # Guarantees
//!
//! - Atomic visibility: a reader never observes a half-written object
//! - Immutability: a key, once written, is never overwritten
//! - Privilege split: the producing principal can put/get/list, never
//!   delete; only the retention principal can delete
//!
//! # Important
//!
//! The store does NOT interpret key timestamps; retention does.
//! The store does NOT retry; the pipeline retries on its next cycle.

mod errors;
mod handles;
mod local;

pub use errors::{Severity, StoreError, StoreErrorCode, StoreResult};
pub use handles::{SweeperHandle, WriterHandle};
pub use local::LocalFsStore;

use chrono::{DateTime, Utc};

/// Metadata for one stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Full object key
    pub key: String,
    /// Object size in bytes
    pub size: u64,
    /// Store-side modification time
    pub modified: DateTime<Utc>,
}

/// Object storage interface.
///
/// Implementations must make `put` all-or-nothing: on failure the key must
/// not exist at all, never hold truncated bytes.
pub trait ObjectStore: Send + Sync {
    /// Write an object; fails with `VAULT_STORE_KEY_EXISTS` on reuse
    fn put(&self, key: &str, bytes: &[u8]) -> StoreResult<()>;

    /// Read an object's full contents
    fn get(&self, key: &str) -> StoreResult<Vec<u8>>;

    /// Enumerate objects under a prefix, sorted by key
    fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectMeta>>;

    /// Delete an object (delete-capable principal only)
    fn delete(&self, key: &str) -> StoreResult<()>;
}
