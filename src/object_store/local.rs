//! Filesystem-backed object store
//!
//! Maps object keys to paths under a root directory. Uploads are staged
//! under a hidden `.staging/` directory and renamed into place, so a
//! reader can never observe a half-written object: the key either does
//! not exist or holds the complete bytes.
//!
//! # Atomic put sequence
//!
//! 1. Validate the key
//! 2. Refuse if the key already exists (keys are immutable)
//! 3. Write bytes to `.staging/<uuid>`
//! 4. fsync the staged file
//! 5. Create the key's parent directories
//! 6. Rename staged file → key path
//! 7. fsync the parent directory

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::{ObjectMeta, ObjectStore};

const STAGING_DIR: &str = ".staging";

/// fsync a directory
fn fsync_dir(dir: &Path) -> StoreResult<()> {
    let d = OpenOptions::new()
        .read(true)
        .open(dir)
        .map_err(|e| StoreError::io_error_at_path(dir, e))?;
    d.sync_all()
        .map_err(|e| StoreError::io_error(format!("Failed to fsync {}", dir.display()), e))
}

/// Reject keys that could escape the root or collide with staging
fn validate_key(key: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreError::invalid_key(key, "empty"));
    }
    if key.starts_with('/') {
        return Err(StoreError::invalid_key(key, "absolute path"));
    }
    for part in key.split('/') {
        if part.is_empty() {
            return Err(StoreError::invalid_key(key, "empty path segment"));
        }
        if part == "." || part == ".." {
            return Err(StoreError::invalid_key(key, "relative path segment"));
        }
        if part == STAGING_DIR {
            return Err(StoreError::invalid_key(key, "reserved segment"));
        }
    }
    Ok(())
}

/// Object store over a local directory tree.
///
/// A store opened with [`LocalFsStore::open_write_only`] models the
/// producing host's credentials: `delete` fails with
/// `VAULT_STORE_ACCESS_DENIED` regardless of filesystem permissions, the
/// same contract a write-only bucket policy gives a cloud principal.
pub struct LocalFsStore {
    root: PathBuf,
    delete_allowed: bool,
}

impl LocalFsStore {
    /// Open a store with full capabilities (retention principal)
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::open_inner(root.into(), true)
    }

    /// Open a store whose principal can create and read, never delete
    pub fn open_write_only(root: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::open_inner(root.into(), false)
    }

    fn open_inner(root: PathBuf, delete_allowed: bool) -> StoreResult<Self> {
        fs::create_dir_all(&root).map_err(|e| StoreError::io_error_at_path(&root, e))?;
        fs::create_dir_all(root.join(STAGING_DIR))
            .map_err(|e| StoreError::io_error_at_path(&root, e))?;
        Ok(Self {
            root,
            delete_allowed,
        })
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn list_into(&self, dir: &Path, out: &mut Vec<ObjectMeta>) -> StoreResult<()> {
        let entries = fs::read_dir(dir).map_err(|e| StoreError::io_error_at_path(dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io_error_at_path(dir, e))?;
            let path = entry.path();

            if path.is_dir() {
                if path.file_name().map(|n| n == STAGING_DIR).unwrap_or(false) {
                    continue;
                }
                self.list_into(&path, out)?;
            } else {
                let meta = entry
                    .metadata()
                    .map_err(|e| StoreError::io_error_at_path(&path, e))?;
                let modified: DateTime<Utc> = meta
                    .modified()
                    .map_err(|e| StoreError::io_error_at_path(&path, e))?
                    .into();

                let rel = path
                    .strip_prefix(&self.root)
                    .expect("listed path is under root");
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");

                out.push(ObjectMeta {
                    key,
                    size: meta.len(),
                    modified,
                });
            }
        }
        Ok(())
    }
}

impl ObjectStore for LocalFsStore {
    fn put(&self, key: &str, bytes: &[u8]) -> StoreResult<()> {
        validate_key(key)?;

        let target = self.key_path(key);
        if target.exists() {
            return Err(StoreError::key_exists(key));
        }

        // Stage under a name no reader ever lists
        let staged = self.root.join(STAGING_DIR).join(Uuid::new_v4().to_string());
        let mut file =
            File::create(&staged).map_err(|e| StoreError::io_error_at_path(&staged, e))?;
        file.write_all(bytes)
            .map_err(|e| StoreError::io_error_at_path(&staged, e))?;
        file.sync_all()
            .map_err(|e| StoreError::io_error_at_path(&staged, e))?;
        drop(file);

        let parent = target.parent().expect("validated key has a parent");
        fs::create_dir_all(parent).map_err(|e| StoreError::io_error_at_path(parent, e))?;

        if let Err(e) = fs::rename(&staged, &target) {
            let _ = fs::remove_file(&staged);
            return Err(StoreError::io_error_at_path(&target, e));
        }

        fsync_dir(parent)
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        validate_key(key)?;
        let path = self.key_path(key);
        if !path.exists() {
            return Err(StoreError::not_found(key));
        }
        fs::read(&path).map_err(|e| StoreError::io_error_at_path(&path, e))
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<ObjectMeta>> {
        let mut out = Vec::new();
        if self.root.exists() {
            let root = self.root.clone();
            self.list_into(&root, &mut out)?;
        }
        out.retain(|m| m.key.starts_with(prefix));
        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        if !self.delete_allowed {
            return Err(StoreError::access_denied("delete"));
        }
        validate_key(key)?;
        let path = self.key_path(key);
        if !path.exists() {
            return Err(StoreError::not_found(key));
        }
        fs::remove_file(&path).map_err(|e| StoreError::io_error_at_path(&path, e))
    }
}
