//! Sidecar manifest for uploaded artifacts
//!
//! Every artifact is uploaded together with a small JSON sidecar at
//! `<artifact-key>.manifest.json` recording:
//! - format_version: always 1
//! - environment and logical name
//! - engine kind
//! - source_timestamp: RFC3339, wall clock at dump start
//! - logical_size: raw (pre-compression) size in bytes
//! - checksum: CRC32 of the packaged bytes exactly as uploaded
//!
//! Restore verifies the downloaded object against the sidecar before
//! touching any engine state.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::producer::EngineKind;

use super::errors::{PackageError, PackageResult};

/// Artifact manifest data structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactManifest {
    /// Format version (always 1)
    pub format_version: u8,

    /// Environment name
    pub environment: String,

    /// Logical database/collection name
    pub logical_name: String,

    /// Engine kind the artifact came from
    pub engine: EngineKind,

    /// Wall clock at dump start (RFC3339)
    pub source_timestamp: String,

    /// Raw size in bytes before compression
    pub logical_size: u64,

    /// CRC32 of the uploaded bytes
    pub checksum: u32,
}

impl ArtifactManifest {
    /// Create a manifest for a packaged artifact
    pub fn new(
        environment: &str,
        logical_name: &str,
        engine: EngineKind,
        source_timestamp: DateTime<Utc>,
        logical_size: u64,
        checksum: u32,
    ) -> Self {
        Self {
            format_version: 1,
            environment: environment.to_string(),
            logical_name: logical_name.to_string(),
            engine,
            source_timestamp: source_timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            logical_size,
            checksum,
        }
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> PackageResult<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| PackageError::manifest_failed(format!("serialize manifest: {}", e)))
    }

    /// Parse from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> PackageResult<Self> {
        let manifest: ArtifactManifest = serde_json::from_slice(bytes)
            .map_err(|e| PackageError::manifest_failed(format!("parse manifest: {}", e)))?;
        if manifest.format_version != 1 {
            return Err(PackageError::manifest_failed(format!(
                "unsupported manifest format_version {}",
                manifest.format_version
            )));
        }
        Ok(manifest)
    }

    /// Source timestamp parsed back to a DateTime
    pub fn source_time(&self) -> PackageResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.source_timestamp)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| PackageError::manifest_failed(format!("bad source_timestamp: {}", e)))
    }
}
