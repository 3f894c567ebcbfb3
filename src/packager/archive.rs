//! Compression and archiving primitives
//!
//! Relational dumps are a single stream and are gzip-compressed as-is
//! (`.sql.gz`). Native engine snapshots arrive as a directory and are
//! packaged as a gzip-compressed tar (`.tar.gz`).
//!
//! Failure anywhere here is `VAULT_PACKAGE_FAILED`; the caller discards
//! the raw artifact instead of uploading a corrupt archive.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Archive, Builder};

use super::errors::{PackageError, PackageResult};

/// gzip-compress a byte stream
pub fn gzip_bytes(data: &[u8]) -> PackageResult<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| PackageError::io_error("compression write failed", e))?;
    encoder
        .finish()
        .map_err(|e| PackageError::io_error("compression finish failed", e))
}

/// Decompress a gzip stream
pub fn gunzip_bytes(data: &[u8]) -> PackageResult<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| PackageError::io_error("decompression failed", e))?;
    Ok(out)
}

/// Package a directory as a gzip-compressed tar archive
pub fn tar_gz_dir(dir: &Path) -> PackageResult<Vec<u8>> {
    if !dir.is_dir() {
        return Err(PackageError::failed(format!(
            "artifact path is not a directory: {}",
            dir.display()
        )));
    }

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = Builder::new(encoder);
    builder
        .append_dir_all(".", dir)
        .map_err(|e| PackageError::io_error_at_path(dir, e))?;

    let encoder = builder
        .into_inner()
        .map_err(|e| PackageError::io_error("archive finalize failed", e))?;
    encoder
        .finish()
        .map_err(|e| PackageError::io_error("compression finish failed", e))
}

/// Unpack a gzip-compressed tar archive into a directory
pub fn untar_gz(data: &[u8], dest: &Path) -> PackageResult<()> {
    fs::create_dir_all(dest).map_err(|e| PackageError::io_error_at_path(dest, e))?;

    let decoder = GzDecoder::new(data);
    let mut archive = Archive::new(decoder);
    archive
        .unpack(dest)
        .map_err(|e| PackageError::io_error_at_path(dest, e))
}
