//! Streaming content digests.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use fileprint_core::{ContentHash, DigestAlgorithm, FileRecord, FileStep, IndexError, WorkItem};

/// Read buffer size for streaming file contents.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Hashes files with a fixed algorithm.
///
/// Stateless apart from the algorithm choice, so a single instance can be
/// shared by every worker.
#[derive(Debug, Clone, Copy, Default)]
pub struct Digester {
    algorithm: DigestAlgorithm,
}

impl Digester {
    /// Create a digester for the given algorithm.
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Algorithm used by this digester.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Hash a queued file and build its record.
    pub fn digest(&self, item: &WorkItem) -> Result<FileRecord, IndexError> {
        let (hash, modified) = self.digest_path(item.path())?;
        Ok(FileRecord::new(item.path(), hash, modified))
    }

    /// Hash the file at `path` and read its modification time.
    ///
    /// The file is read in fixed-size chunks, so memory use does not depend
    /// on file size. The handle is closed on every return path.
    pub fn digest_path(&self, path: &Path) -> Result<(ContentHash, DateTime<Utc>), IndexError> {
        let mut file = File::open(path).map_err(|e| IndexError::file(path, FileStep::Open, e))?;

        let hash = self
            .hash_reader(&mut file)
            .map_err(|e| IndexError::file(path, FileStep::Read, e))?;

        let modified = file
            .metadata()
            .and_then(|m| m.modified())
            .map_err(|e| IndexError::file(path, FileStep::Metadata, e))?;

        Ok((hash, DateTime::<Utc>::from(modified)))
    }

    /// Hash everything readable from `reader`.
    pub fn hash_reader<R: Read>(&self, reader: &mut R) -> std::io::Result<ContentHash> {
        let mut accumulator = Accumulator::new(self.algorithm);
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];

        loop {
            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            accumulator.update(&buffer[..bytes_read]);
        }

        Ok(accumulator.finalize())
    }

    /// Hash an in-memory byte slice.
    pub fn hash_bytes(&self, bytes: &[u8]) -> ContentHash {
        let mut accumulator = Accumulator::new(self.algorithm);
        accumulator.update(bytes);
        accumulator.finalize()
    }
}

/// Running hash state for one file.
enum Accumulator {
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Accumulator {
    fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            DigestAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, bytes: &[u8]) {
        match self {
            Self::Sha256(hasher) => hasher.update(bytes),
            Self::Blake3(hasher) => {
                hasher.update(bytes);
            }
        }
    }

    fn finalize(self) -> ContentHash {
        match self {
            Self::Sha256(hasher) => ContentHash::new(hasher.finalize().into()),
            Self::Blake3(hasher) => ContentHash::new(*hasher.finalize().as_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // sha256("hello")
    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_sha256_reference_digest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hello.txt");
        fs::write(&path, "hello").unwrap();

        let (hash, _) = Digester::new(DigestAlgorithm::Sha256)
            .digest_path(&path)
            .unwrap();
        assert_eq!(hash.to_hex(), HELLO_SHA256);
    }

    #[test]
    fn test_blake3_matches_one_shot() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.bin");
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &content).unwrap();

        let (hash, _) = Digester::new(DigestAlgorithm::Blake3)
            .digest_path(&path)
            .unwrap();
        assert_eq!(hash.as_bytes(), blake3::hash(&content).as_bytes());
    }

    #[test]
    fn test_streaming_matches_in_memory() {
        let digester = Digester::new(DigestAlgorithm::Sha256);
        let content = vec![7u8; READ_BUFFER_SIZE * 3 + 17];

        let streamed = digester.hash_reader(&mut content.as_slice()).unwrap();
        assert_eq!(streamed, digester.hash_bytes(&content));
    }

    #[test]
    fn test_digest_changes_with_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("file.txt");
        let digester = Digester::default();

        fs::write(&path, "first").unwrap();
        let (first, _) = digester.digest_path(&path).unwrap();
        let (again, _) = digester.digest_path(&path).unwrap();
        fs::write(&path, "second").unwrap();
        let (second, _) = digester.digest_path(&path).unwrap();

        assert_eq!(first, again);
        assert_ne!(first, second);
    }

    #[test]
    fn test_missing_file_fails_on_open() {
        let temp = TempDir::new().unwrap();
        let err = Digester::default()
            .digest_path(&temp.path().join("gone.txt"))
            .unwrap_err();

        assert!(matches!(
            err,
            IndexError::FileIo {
                step: FileStep::Open,
                ..
            }
        ));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_digest_builds_record() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("hello.txt");
        fs::write(&path, "hello").unwrap();

        let digester = Digester::default();
        assert_eq!(digester.algorithm(), DigestAlgorithm::Sha256);

        let record = digester.digest(&WorkItem::new(&path)).unwrap();
        assert_eq!(record.path, path);
        assert_eq!(record.hash.to_hex(), HELLO_SHA256);
        assert!(record.modified <= Utc::now());
    }
}
