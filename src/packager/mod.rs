//! Archive packaging for snapvault
//!
//! Takes a raw dump artifact, compresses it, computes its checksum, and
//! derives the collision-free object key:
//!
//! ```text
//! <environment>/<logical-name>/<YYYY-MM-DD>/<HHMMSS>.<ext>
//! ```
//!
//! # Algorithm
//!
//! 1. Compress the payload (gzip for streams, tar+gzip for directories)
//! 2. Compute CRC32 over the packaged bytes
//! 3. Derive the object key from the dump's source timestamp
//! 4. Build the sidecar manifest
//!
//! # Important
//!
//! Packaging does NOT upload.
//! A packaging failure discards the raw artifact; nothing corrupt is
//! ever handed to the uploader.

mod archive;
mod checksum;
mod errors;
mod key;
mod manifest;

pub use archive::{gunzip_bytes, gzip_bytes, tar_gz_dir, untar_gz};
pub use checksum::{compute_checksum, verify_checksum};
pub use errors::{PackageError, PackageErrorCode, PackageResult};
pub use key::{is_manifest_key, manifest_key, object_key, parse_key, ParsedKey};
pub use manifest::ArtifactManifest;

use crate::producer::{DumpArtifact, DumpPayload, EngineKind};

/// A packaged artifact ready for upload
#[derive(Debug)]
pub struct PackagedArtifact {
    /// Object key for the artifact
    pub key: String,
    /// Compressed bytes as they will be uploaded
    pub bytes: Vec<u8>,
    /// Sidecar manifest
    pub manifest: ArtifactManifest,
}

impl PackagedArtifact {
    /// Key of the sidecar manifest object
    pub fn manifest_key(&self) -> String {
        manifest_key(&self.key)
    }
}

/// Archive packager for one environment
pub struct Packager {
    environment: String,
}

impl Packager {
    /// Create a packager for the given environment
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
        }
    }

    /// Package a dump artifact for upload.
    ///
    /// The caller remains responsible for deleting directory payloads
    /// after a successful run.
    pub fn package(
        &self,
        logical_name: &str,
        engine: EngineKind,
        dump: &DumpArtifact,
    ) -> PackageResult<PackagedArtifact> {
        let bytes = match &dump.payload {
            DumpPayload::Stream(raw) => gzip_bytes(raw)?,
            DumpPayload::Directory(dir) => tar_gz_dir(dir)?,
        };

        let sum = compute_checksum(&bytes);
        let key = object_key(
            &self.environment,
            logical_name,
            dump.source_timestamp,
            engine.artifact_ext(),
        );
        let manifest = ArtifactManifest::new(
            &self.environment,
            logical_name,
            engine,
            dump.source_timestamp,
            dump.logical_size,
            sum,
        );

        Ok(PackagedArtifact {
            key,
            bytes,
            manifest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;
    use std::fs;
    use tempfile::TempDir;

    fn dump_stream(bytes: &[u8]) -> DumpArtifact {
        DumpArtifact {
            payload: DumpPayload::Stream(bytes.to_vec()),
            source_timestamp: Utc.with_ymd_and_hms(2026, 8, 28, 14, 30, 5).unwrap(),
            logical_size: bytes.len() as u64,
        }
    }

    #[test]
    fn test_package_stream() {
        let packager = Packager::new("prod");
        let dump = dump_stream(b"INSERT INTO t VALUES (1);\n");

        let packaged = packager.package("orders", EngineKind::Sql, &dump).unwrap();
        assert_eq!(packaged.key, "prod/orders/2026-08-28/143005.sql.gz");
        assert_eq!(
            packaged.manifest_key(),
            "prod/orders/2026-08-28/143005.sql.gz.manifest.json"
        );
        assert_eq!(packaged.manifest.logical_size, 26);
        assert!(verify_checksum(&packaged.bytes, packaged.manifest.checksum));

        // Unpacking yields byte-identical content
        assert_eq!(gunzip_bytes(&packaged.bytes).unwrap(), b"INSERT INTO t VALUES (1);\n");
    }

    #[test]
    fn test_package_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("segment.dat"), b"vectors").unwrap();

        let packager = Packager::new("prod");
        let dump = DumpArtifact {
            payload: DumpPayload::Directory(dir.path().to_path_buf()),
            source_timestamp: Utc.with_ymd_and_hms(2026, 8, 28, 14, 30, 5).unwrap(),
            logical_size: 7,
        };

        let packaged = packager.package("vectors", EngineKind::Native, &dump).unwrap();
        assert_eq!(packaged.key, "prod/vectors/2026-08-28/143005.tar.gz");

        let dest = TempDir::new().unwrap();
        untar_gz(&packaged.bytes, dest.path()).unwrap();
        assert_eq!(fs::read(dest.path().join("segment.dat")).unwrap(), b"vectors");
    }

    #[test]
    fn test_concurrent_jobs_never_collide() {
        let packager = Packager::new("prod");
        let dump = dump_stream(b"x");

        let a = packager.package("orders", EngineKind::Sql, &dump).unwrap();
        let b = packager.package("users", EngineKind::Sql, &dump).unwrap();
        assert_ne!(a.key, b.key);
    }
}
