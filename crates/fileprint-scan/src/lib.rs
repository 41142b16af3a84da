//! Traversal, hashing and recording pipeline for fileprint.
//!
//! # Overview
//!
//! `fileprint-scan` walks a directory tree, hashes every file on a bounded
//! worker pool and appends one record per file to an output log. Key
//! pieces:
//!
//! - **Traversal** via jwalk on a single thread ([`TreeWalker`])
//! - **Two-phase scheduling**: files are queued while workers are held,
//!   then all workers are released at once ([`WorkScheduler`])
//! - **Streaming digests** with SHA-256 or BLAKE3 ([`Digester`])
//! - **Serialized output** so concurrent records never interleave
//!   ([`ResultSink`])
//! - **Progress** counters whose hashing total is fixed before hashing
//!   starts ([`ProgressReporter`], [`HashProgress`])
//!
//! # Example
//!
//! ```rust,no_run
//! use fileprint_scan::{IndexConfig, Indexer};
//!
//! let config = IndexConfig::builder()
//!     .root("/path/to/index")
//!     .output("files.csv")
//!     .build()
//!     .unwrap();
//!
//! let summary = Indexer::new(config).run().unwrap();
//! println!("Hashed {} files", summary.files_hashed);
//! ```
//!
//! # Error Reporting
//!
//! Unreadable entries and files that fail to hash are skipped and reported
//! through an [`ErrorHook`]; the run continues. An unusable root or a failed
//! output write aborts the run with an [`IndexError`].
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fileprint_scan::{EntryError, IndexConfig, Indexer};
//!
//! let indexer = Indexer::new(IndexConfig::new("/srv"))
//!     .with_error_hook(Arc::new(|err: &EntryError| eprintln!("ERROR: {err}")));
//! indexer.run().unwrap();
//! ```

mod digest;
mod indexer;
mod progress;
mod report;
mod scheduler;
mod sink;
mod walker;

pub use digest::Digester;
pub use indexer::{IndexSummary, Indexer};
pub use progress::{HashProgress, IndexProgress, NoopObserver, ProgressObserver, ProgressReporter};
pub use report::{CollectingHook, ErrorHook, LogHook};
pub use scheduler::{Held, Job, Running, SchedulerStats, WorkScheduler};
pub use sink::ResultSink;
pub use walker::{TreeWalker, Walk, WalkEvent};

// Re-export core types for convenience
pub use fileprint_core::{
    ContentHash, DigestAlgorithm, EntryError, ErrorKind, FileRecord, FileStep, IndexConfig,
    IndexError, RECORD_HEADER, WorkItem,
};
