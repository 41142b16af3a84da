//! Error types for indexing operations.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The step of hashing a file that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileStep {
    /// Opening the file for reading.
    Open,
    /// Reading the file contents.
    Read,
    /// Reading the file metadata.
    Metadata,
}

impl fmt::Display for FileStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Read => write!(f, "read"),
            Self::Metadata => write!(f, "stat"),
        }
    }
}

/// Errors that can occur while indexing a tree.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The root path could not be opened.
    #[error("Cannot open root {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// A queued file could not be hashed.
    #[error("Failed to {step} {path}: {source}")]
    FileIo {
        path: PathBuf,
        step: FileStep,
        #[source]
        source: std::io::Error,
    },

    /// The output log could not be written.
    #[error("Failed to write output {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The worker pool could not be started.
    #[error("Worker pool error: {message}")]
    WorkerPool { message: String },
}

impl IndexError {
    /// Create a root error with path context.
    pub fn root(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::RootUnreadable {
            path: path.into(),
            source,
        }
    }

    /// Create a per-file error for the given step.
    pub fn file(path: impl Into<PathBuf>, step: FileStep, source: std::io::Error) -> Self {
        Self::FileIo {
            path: path.into(),
            step,
            source,
        }
    }

    /// Create an output write error.
    pub fn output(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::OutputWrite {
            path: path.into(),
            source,
        }
    }

    /// Whether this error must abort the whole run.
    ///
    /// Only per-file failures are recoverable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::FileIo { .. })
    }
}

/// Kind of a non-fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// An entry could not be read during traversal.
    EntryUnreadable,
    /// A queued file failed while being hashed.
    FileIo(FileStep),
}

/// Non-fatal error reported while indexing.
///
/// Traversal failures and per-file hashing failures both end up here so
/// they can flow through a single reporting hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryError {
    /// Path where the error occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of error.
    pub kind: ErrorKind,
}

impl EntryError {
    /// Create a new entry error.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Build a report from a recoverable indexing error.
    ///
    /// Returns `None` for fatal errors, which abort the run instead.
    pub fn from_index_error(error: &IndexError) -> Option<Self> {
        match error {
            IndexError::FileIo { path, step, .. } => Some(Self {
                path: path.clone(),
                message: error.to_string(),
                kind: ErrorKind::FileIo(*step),
            }),
            _ => None,
        }
    }

    /// Path the error refers to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for EntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
