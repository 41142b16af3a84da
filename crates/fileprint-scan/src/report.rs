//! Hooks for non-fatal errors.

use std::sync::{Mutex, PoisonError};

use tracing::warn;

use fileprint_core::EntryError;

/// Receives every recoverable error raised during a run.
///
/// Traversal failures and per-file hashing failures are both delivered
/// here. Implementations are called from the traversal thread and from
/// workers concurrently.
pub trait ErrorHook: Send + Sync {
    /// Report one error. The run continues afterwards.
    fn report(&self, error: &EntryError);
}

impl<F> ErrorHook for F
where
    F: Fn(&EntryError) + Send + Sync,
{
    fn report(&self, error: &EntryError) {
        self(error)
    }
}

/// Forwards errors to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHook;

impl ErrorHook for LogHook {
    fn report(&self, error: &EntryError) {
        warn!(path = %error.path.display(), kind = ?error.kind, "{}", error.message);
    }
}

/// Keeps every reported error in memory.
#[derive(Debug, Default)]
pub struct CollectingHook {
    errors: Mutex<Vec<EntryError>>,
}

impl CollectingHook {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the errors reported so far.
    pub fn errors(&self) -> Vec<EntryError> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of errors reported so far.
    pub fn len(&self) -> usize {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check if nothing has been reported.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ErrorHook for CollectingHook {
    fn report(&self, error: &EntryError) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(error.clone());
    }
}
