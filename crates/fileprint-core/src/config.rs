//! Index configuration types.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::record::DigestAlgorithm;

/// Configuration for an indexing run.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct IndexConfig {
    /// Root directory to index.
    pub root: PathBuf,

    /// Path of the output log.
    #[builder(default = "default_output()")]
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Hash function for file contents.
    #[builder(default)]
    #[serde(default)]
    pub algorithm: DigestAlgorithm,

    /// Number of hashing workers (0 = available parallelism).
    #[builder(default = "0")]
    #[serde(default)]
    pub workers: usize,

    /// Append to an existing output log instead of truncating it.
    #[builder(default = "false")]
    #[serde(default)]
    pub append: bool,
}

fn default_output() -> PathBuf {
    PathBuf::from("files.csv")
}

/// Filesystem root of the host.
pub fn default_root() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("C:\\")
    } else {
        PathBuf::from("/")
    }
}

impl IndexConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            None => return Err("Root path is required".to_string()),
            _ => {}
        }
        if let Some(ref output) = self.output {
            if output.as_os_str().is_empty() {
                return Err("Output path cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl From<IndexConfigBuilderError> for IndexError {
    fn from(err: IndexConfigBuilderError) -> Self {
        Self::InvalidConfig {
            message: err.to_string(),
        }
    }
}

impl IndexConfig {
    /// Create a new index config builder.
    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::default()
    }

    /// Create a simple config for indexing a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output: default_output(),
            algorithm: DigestAlgorithm::default(),
            workers: 0,
            append: false,
        }
    }

    /// Resolve the worker count, substituting the host's available
    /// parallelism for 0.
    pub fn worker_count(&self) -> usize {
        match self.workers {
            0 => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            n => n,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new(default_root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = IndexConfig::builder()
            .root("/home/user")
            .output("/tmp/out.csv")
            .algorithm(DigestAlgorithm::Blake3)
            .workers(4usize)
            .append(true)
            .build()
            .unwrap();

        assert_eq!(config.root, PathBuf::from("/home/user"));
        assert_eq!(config.output, PathBuf::from("/tmp/out.csv"));
        assert_eq!(config.algorithm, DigestAlgorithm::Blake3);
        assert_eq!(config.worker_count(), 4);
        assert!(config.append);
    }

    #[test]
    fn test_config_simple() {
        let config = IndexConfig::new("/srv");
        assert_eq!(config.output, PathBuf::from("files.csv"));
        assert_eq!(config.algorithm, DigestAlgorithm::Sha256);
        assert!(!config.append);
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn test_builder_requires_root() {
        assert!(IndexConfig::builder().build().is_err());
        assert!(IndexConfig::builder().root("").build().is_err());
    }

    #[test]
    fn test_builder_rejects_empty_output() {
        let err = IndexConfig::builder()
            .root("/srv")
            .output("")
            .build()
            .map_err(IndexError::from)
            .unwrap_err();
        assert!(matches!(err, IndexError::InvalidConfig { .. }));
        assert!(err.to_string().contains("Output path cannot be empty"));
    }

    #[test]
    fn test_default_root_is_absolute() {
        assert!(default_root().is_absolute());
    }
}
