//! Object key derivation and parsing
//!
//! Keys follow the layout:
//!
//! ```text
//! <environment>/<logical-name>/<YYYY-MM-DD>/<HHMMSS>.<ext>
//! ```
//!
//! The key is a pure function of (environment, logical name, source
//! timestamp, extension). Two jobs never collide because the logical name
//! is embedded; two runs of the same job never collide because the
//! timestamp is embedded at second resolution and the scheduler never
//! overlaps runs of one job. Keys sort lexicographically in timestamp
//! order within a prefix, which is what "latest before T" lookup relies
//! on.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

/// Derive the object key for an artifact
pub fn object_key(
    environment: &str,
    logical_name: &str,
    timestamp: DateTime<Utc>,
    ext: &str,
) -> String {
    format!(
        "{}/{}/{}/{}.{}",
        environment,
        logical_name,
        timestamp.format("%Y-%m-%d"),
        timestamp.format("%H%M%S"),
        ext
    )
}

/// Key for the sidecar manifest of an artifact key
pub fn manifest_key(artifact_key: &str) -> String {
    format!("{}.manifest.json", artifact_key)
}

/// True if the key names a sidecar manifest rather than an artifact
pub fn is_manifest_key(key: &str) -> bool {
    key.ends_with(".manifest.json")
}

/// A key decomposed into its layout components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedKey {
    pub environment: String,
    pub logical_name: String,
    pub timestamp: DateTime<Utc>,
}

/// Parse a key back into its components.
///
/// Returns `None` for keys that do not follow the layout; the retention
/// sweep treats those as foreign objects and leaves them alone.
pub fn parse_key(key: &str) -> Option<ParsedKey> {
    let mut parts = key.split('/');
    let environment = parts.next()?;
    let logical_name = parts.next()?;
    let date_part = parts.next()?;
    let file_part = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;

    // File part is HHMMSS followed by the extension
    let time_digits = file_part.split('.').next()?;
    if time_digits.len() != 6 || !time_digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let time = NaiveTime::parse_from_str(time_digits, "%H%M%S").ok()?;

    let timestamp = Utc.from_utc_datetime(&date.and_time(time));

    Some(ParsedKey {
        environment: environment.to_string(),
        logical_name: logical_name.to_string(),
        timestamp,
    })
}
