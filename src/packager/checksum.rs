//! CRC32 checksums for packaged artifacts
//!
//! The checksum is computed over the packaged artifact exactly as
//! uploaded and recorded in the sidecar manifest. Restore recomputes it
//! over the downloaded object before unpacking, so store-side corruption
//! or truncation is caught before any engine state is touched.
//!
//! Uses CRC32 (IEEE polynomial).

use crc32fast::Hasher;

/// Compute a CRC32 checksum over the provided bytes.
///
/// Deterministic: the same input always produces the same output.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Verify bytes against an expected checksum
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}
