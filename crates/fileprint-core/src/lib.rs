//! Core types and configuration for fileprint.
//!
//! This crate provides the data structures shared by the indexing pipeline:
//! work items, file records, digests, configuration and errors.

mod config;
mod error;
mod record;

pub use config::{IndexConfig, IndexConfigBuilder, IndexConfigBuilderError, default_root};
pub use error::{EntryError, ErrorKind, FileStep, IndexError};
pub use record::{ContentHash, DigestAlgorithm, FileRecord, RECORD_HEADER, WorkItem};
