//! Progress counters for discovery and hashing.
//!
//! Discovery and hashing are tracked by two different types. The hashing
//! counter can only be obtained by finishing discovery, which fixes its
//! total before any worker runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Receives progress notifications.
///
/// All methods default to doing nothing. Implementations are called from
/// the traversal thread and from workers concurrently, and must not block.
pub trait ProgressObserver: Send + Sync {
    /// A file was discovered. `discovered` is the running total.
    fn discovered(&self, _discovered: u64) {}

    /// Discovery finished and hashing is about to start.
    fn hashing_started(&self, _total: u64) {}

    /// A file reached a terminal outcome. `completed` is the running total.
    fn hashed(&self, _completed: u64) {}

    /// Every queued file has been processed.
    fn finished(&self, _progress: &IndexProgress) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

/// Point-in-time view of a run's progress.
#[derive(Debug, Clone, Default)]
pub struct IndexProgress {
    /// Files found by the walker.
    pub files_discovered: u64,
    /// Files hashed and recorded.
    pub files_hashed: u64,
    /// Files that failed to hash.
    pub files_failed: u64,
    /// Time elapsed since the run started.
    pub elapsed: Duration,
}

impl IndexProgress {
    /// Files that reached a terminal outcome.
    pub fn files_completed(&self) -> u64 {
        self.files_hashed + self.files_failed
    }

    /// Calculate hashing rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_completed() as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Discovery-phase progress.
pub struct ProgressReporter {
    start_time: Instant,
    discovered: AtomicU64,
    observer: Arc<dyn ProgressObserver>,
}

impl ProgressReporter {
    /// Create a reporter that notifies `observer`.
    pub fn new(observer: Arc<dyn ProgressObserver>) -> Self {
        Self {
            start_time: Instant::now(),
            discovered: AtomicU64::new(0),
            observer,
        }
    }

    /// Record one discovered file.
    pub fn file_discovered(&self) -> u64 {
        let count = self.discovered.fetch_add(1, Ordering::Relaxed) + 1;
        self.observer.discovered(count);
        count
    }

    /// Files discovered so far.
    pub fn discovered(&self) -> u64 {
        self.discovered.load(Ordering::Relaxed)
    }

    /// End discovery and size the hashing counter to the discovered total.
    pub fn finish_discovery(self) -> HashProgress {
        let total = self.discovered.into_inner();
        self.observer.hashing_started(total);
        HashProgress {
            start_time: self.start_time,
            total,
            hashed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            observer: self.observer,
        }
    }
}

/// Hashing-phase progress with a fixed total.
pub struct HashProgress {
    start_time: Instant,
    total: u64,
    hashed: AtomicU64,
    failed: AtomicU64,
    observer: Arc<dyn ProgressObserver>,
}

impl HashProgress {
    /// Number of files expected, equal to the discovered count.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Record a file that was hashed and recorded.
    pub fn file_hashed(&self) {
        self.hashed.fetch_add(1, Ordering::Relaxed);
        self.notify();
    }

    /// Record a file that failed to hash.
    pub fn file_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.notify();
    }

    /// Take a snapshot of the counters.
    pub fn snapshot(&self) -> IndexProgress {
        IndexProgress {
            files_discovered: self.total,
            files_hashed: self.hashed.load(Ordering::Relaxed),
            files_failed: self.failed.load(Ordering::Relaxed),
            elapsed: self.start_time.elapsed(),
        }
    }

    /// Notify the observer that hashing is complete.
    pub fn finish(&self) -> IndexProgress {
        let progress = self.snapshot();
        self.observer.finished(&progress);
        progress
    }

    fn notify(&self) {
        let completed = self.hashed.load(Ordering::Relaxed) + self.failed.load(Ordering::Relaxed);
        self.observer.hashed(completed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        started: Mutex<Option<u64>>,
        last_hashed: AtomicU64,
    }

    impl ProgressObserver for Recorder {
        fn hashing_started(&self, total: u64) {
            *self.started.lock().unwrap() = Some(total);
        }

        fn hashed(&self, completed: u64) {
            self.last_hashed.fetch_max(completed, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_capacity_equals_discovered() {
        let recorder = Arc::new(Recorder::default());
        let reporter = ProgressReporter::new(recorder.clone());

        for _ in 0..5 {
            reporter.file_discovered();
        }
        assert_eq!(reporter.discovered(), 5);

        let hashing = reporter.finish_discovery();
        assert_eq!(hashing.total(), 5);
        assert_eq!(*recorder.started.lock().unwrap(), Some(5));
    }

    #[test]
    fn test_failures_count_as_completed() {
        let recorder = Arc::new(Recorder::default());
        let reporter = ProgressReporter::new(recorder.clone());
        reporter.file_discovered();
        reporter.file_discovered();

        let hashing = reporter.finish_discovery();
        hashing.file_hashed();
        hashing.file_failed();

        let progress = hashing.finish();
        assert_eq!(progress.files_hashed, 1);
        assert_eq!(progress.files_failed, 1);
        assert_eq!(progress.files_completed(), 2);
        assert_eq!(recorder.last_hashed.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_empty_run() {
        let hashing = ProgressReporter::new(Arc::new(NoopObserver)).finish_discovery();
        assert_eq!(hashing.total(), 0);
        assert_eq!(hashing.snapshot().files_completed(), 0);
    }

    #[test]
    fn test_files_per_second() {
        let progress = IndexProgress {
            files_discovered: 10,
            files_hashed: 8,
            files_failed: 2,
            elapsed: Duration::from_secs(2),
        };
        assert_eq!(progress.files_per_second(), 5.0);

        let instant = IndexProgress {
            elapsed: Duration::ZERO,
            ..progress
        };
        assert_eq!(instant.files_per_second(), 0.0);
    }
}
