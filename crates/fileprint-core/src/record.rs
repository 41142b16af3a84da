//! Work items, digests and output records.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header line written once at the top of every output log.
pub const RECORD_HEADER: &str = "Path, Hash, Time";

/// Separator between the fields of a record line.
const FIELD_SEPARATOR: &str = ", ";

/// Timestamp layout used in record lines, before the fractional seconds.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Fixed-length content digest of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Get the hash as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Hash function used to fingerprint file contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-256, compatible with digests from other tooling.
    #[default]
    Sha256,
    /// BLAKE3, considerably faster on large trees.
    Blake3,
}

impl DigestAlgorithm {
    /// Short lowercase name of the algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single file waiting to be hashed.
///
/// Created by the walker at discovery time and consumed exactly once by
/// one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    path: PathBuf,
}

impl WorkItem {
    /// Create a work item for the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the file to hash.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consume the item, returning its path.
    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

/// The outcome of hashing one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path of the hashed file.
    pub path: PathBuf,
    /// Content digest.
    pub hash: ContentHash,
    /// Last modification time.
    pub modified: DateTime<Utc>,
}

impl FileRecord {
    /// Create a new record.
    pub fn new(path: impl Into<PathBuf>, hash: ContentHash, modified: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            hash,
            modified,
        }
    }

    /// Format the record as a single output line, including the newline.
    ///
    /// Paths are written verbatim. A path containing a newline cannot be
    /// represented faithfully. Fractional seconds are written with trailing
    /// zeros trimmed and omitted when zero.
    pub fn to_line(&self) -> String {
        format!(
            "{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}\n",
            self.path.display(),
            self.hash,
            format_time(&self.modified)
        )
    }

    /// Split a record line into its path, hash and time fields.
    ///
    /// Splits from the right so that paths containing the separator still
    /// come back whole. Returns `None` for lines with fewer than three
    /// fields.
    pub fn split_line(line: &str) -> Option<(&str, &str, &str)> {
        let line = line.strip_suffix('\n').unwrap_or(line);
        let mut fields = line.rsplitn(3, FIELD_SEPARATOR);
        let time = fields.next()?;
        let hash = fields.next()?;
        let path = fields.next()?;
        Some((path, hash, time))
    }
}

fn format_time(time: &DateTime<Utc>) -> String {
    let mut out = time.format(TIME_FORMAT).to_string();
    let nanos = time.timestamp_subsec_nanos();
    if nanos > 0 {
        let fraction = format!("{nanos:09}");
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }
    out.push_str(" +0000 UTC");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_hash_display_matches_hex() {
        let hash = ContentHash::new([0x0f; 32]);
        assert_eq!(hash.to_string(), hash.to_hex());
        assert!(hash.to_hex().starts_with("0f0f"));
    }

    #[test]
    fn test_record_line_format() {
        let modified = Utc.with_ymd_and_hms(2021, 4, 27, 22, 33, 47).unwrap();
        let record = FileRecord::new("/data/a.txt", ContentHash::new([0xab; 32]), modified);

        let line = record.to_line();
        assert!(line.ends_with('\n'));
        assert_eq!(
            line,
            format!("/data/a.txt, {}, 2021-04-27 22:33:47 +0000 UTC\n", "ab".repeat(32))
        );
    }

    #[test]
    fn test_record_line_keeps_fraction() {
        let modified = Utc
            .with_ymd_and_hms(2021, 4, 27, 22, 33, 47)
            .unwrap()
            .with_nanosecond(982_338_000)
            .unwrap();
        let record = FileRecord::new("/x", ContentHash::new([0; 32]), modified);
        assert!(record.to_line().contains("22:33:47.982338 +0000 UTC"));
    }

    #[test]
    fn test_record_line_trims_fraction_zeros() {
        let hash = ContentHash::new([0; 32]);
        let half = Utc
            .with_ymd_and_hms(2021, 4, 27, 22, 33, 47)
            .unwrap()
            .with_nanosecond(500_000_000)
            .unwrap();
        let nanos = half.with_nanosecond(7).unwrap();

        assert!(
            FileRecord::new("/a", hash, half)
                .to_line()
                .ends_with("22:33:47.5 +0000 UTC\n")
        );
        assert!(
            FileRecord::new("/a", hash, nanos)
                .to_line()
                .ends_with("22:33:47.000000007 +0000 UTC\n")
        );
    }

    #[test]
    fn test_split_line_with_comma_in_path() {
        let modified = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let record = FileRecord::new("/tmp/a, b.txt", ContentHash::new([1; 32]), modified);
        let line = record.to_line();

        let (path, hash, time) = FileRecord::split_line(&line).unwrap();
        assert_eq!(path, "/tmp/a, b.txt");
        assert_eq!(hash, record.hash.to_hex());
        assert_eq!(time, "2020-01-01 00:00:00 +0000 UTC");
    }

    #[test]
    fn test_split_line_rejects_short_lines() {
        assert!(FileRecord::split_line("only, two").is_none());
        assert!(FileRecord::split_line("").is_none());
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!(DigestAlgorithm::default(), DigestAlgorithm::Sha256);
        assert_eq!(DigestAlgorithm::Blake3.to_string(), "blake3");
    }
}
