//! Secret resolution for snapvault
//!
//! Database credentials are fetched from a secret store at run time and
//! handed to the snapshot producer for the duration of one run.
//!
//! # Important
//!
//! Resolvers do NOT cache values across runs.
//! Resolved values are NEVER written to disk.
//! Resolved values are NEVER logged; log fields carry identifiers only.
//! A resolution failure aborts the run before any engine operation.

mod errors;

pub use errors::{SecretError, SecretResult};

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// A resolved secret value, valid for one backup run.
///
/// Deliberately opaque: no `Display`, and `Debug` redacts the value so a
/// stray debug-format cannot leak credentials into logs.
#[derive(Clone)]
pub struct SecretValue(String);

impl SecretValue {
    /// Wrap a raw value
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the raw value to the consumer (the dump process environment)
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue(<redacted>)")
    }
}

/// Source of credentials, resolved per run.
pub trait SecretStore {
    /// Fetch the current value for `identifier`.
    fn get_secret(&self, identifier: &str) -> SecretResult<SecretValue>;
}

/// Resolves secrets from process environment variables.
///
/// The identifier is mapped to an environment variable name by uppercasing
/// and replacing `/`, `-`, and `.` with `_` (so `db/orders` reads
/// `DB_ORDERS`), the conventional shape for injected credentials.
pub struct EnvSecretStore;

impl EnvSecretStore {
    /// Environment variable name for a secret identifier
    pub fn var_name(identifier: &str) -> String {
        identifier
            .chars()
            .map(|c| match c {
                '/' | '-' | '.' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect()
    }
}

impl SecretStore for EnvSecretStore {
    fn get_secret(&self, identifier: &str) -> SecretResult<SecretValue> {
        let var = Self::var_name(identifier);
        match env::var(&var) {
            Ok(value) if !value.is_empty() => Ok(SecretValue::new(value)),
            _ => Err(SecretError::SecretUnavailable(identifier.to_string())),
        }
    }
}

/// Resolves secrets from a JSON file of `{"identifier": "value"}` pairs.
///
/// The file is re-read on every resolution so rotations take effect on the
/// next run without a process restart. Nothing is retained between calls.
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    /// Create a store backed by the given JSON file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SecretStore for FileSecretStore {
    fn get_secret(&self, identifier: &str) -> SecretResult<SecretValue> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| SecretError::StoreUnreachable(e.to_string()))?;

        let map: HashMap<String, String> = serde_json::from_str(&content)
            .map_err(|e| SecretError::Malformed(identifier.to_string(), e.to_string()))?;

        match map.get(identifier) {
            Some(value) if !value.is_empty() => Ok(SecretValue::new(value.clone())),
            _ => Err(SecretError::SecretUnavailable(identifier.to_string())),
        }
    }
}
