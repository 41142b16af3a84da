//! End-to-end indexing pipeline.

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use fileprint_core::{IndexConfig, IndexError, WorkItem};

use crate::digest::Digester;
use crate::progress::{NoopObserver, ProgressObserver, ProgressReporter};
use crate::report::{ErrorHook, LogHook};
use crate::scheduler::WorkScheduler;
use crate::sink::ResultSink;
use crate::walker::TreeWalker;

/// Totals for a completed run.
#[derive(Debug, Clone, Default)]
pub struct IndexSummary {
    /// Files found by the walker.
    pub files_discovered: u64,
    /// Files hashed and recorded.
    pub files_hashed: u64,
    /// Queued files that failed to hash.
    pub files_failed: u64,
    /// Entries the walker could not read.
    pub entry_errors: u64,
    /// Records appended to the output log.
    pub records_written: u64,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl IndexSummary {
    /// Total number of errors reported during the run.
    pub fn error_count(&self) -> u64 {
        self.files_failed + self.entry_errors
    }
}

/// Walks a tree, hashes every file on a worker pool and records the results.
pub struct Indexer {
    config: IndexConfig,
    observer: Arc<dyn ProgressObserver>,
    hook: Arc<dyn ErrorHook>,
}

impl Indexer {
    /// Create an indexer that logs errors and reports no progress.
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config,
            observer: Arc::new(NoopObserver),
            hook: Arc::new(LogHook),
        }
    }

    /// Send progress notifications to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Send recoverable errors to `hook`.
    pub fn with_error_hook(mut self, hook: Arc<dyn ErrorHook>) -> Self {
        self.hook = hook;
        self
    }

    /// Configuration of this indexer.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Index the configured root into the configured output file.
    ///
    /// The root is checked before the output is touched, so an unusable
    /// root leaves no output behind.
    pub fn run(&self) -> Result<IndexSummary, IndexError> {
        let walker = TreeWalker::new(&self.config.root)?;
        let sink = ResultSink::create(&self.config.output, self.config.append)?;
        info!(
            root = %walker.root().display(),
            output = %sink.label().display(),
            "indexing"
        );
        self.execute(walker, sink).map(|(summary, _)| summary)
    }

    /// Index the configured root into an arbitrary writer.
    ///
    /// The header is written to `writer` first. Returns the writer once
    /// every record has been flushed.
    pub fn run_to_writer<W>(&self, writer: W) -> Result<(IndexSummary, W), IndexError>
    where
        W: Write + Send + 'static,
    {
        let walker = TreeWalker::new(&self.config.root)?;
        let sink = ResultSink::new(writer, "<writer>")?;
        self.execute(walker, sink)
    }

    fn execute<W>(
        &self,
        walker: TreeWalker,
        sink: ResultSink<W>,
    ) -> Result<(IndexSummary, W), IndexError>
    where
        W: Write + Send + 'static,
    {
        let start = Instant::now();
        let scheduler = WorkScheduler::new(self.config.worker_count(), Arc::clone(&self.hook))?;
        let discovery = ProgressReporter::new(Arc::clone(&self.observer));

        // Accumulation: workers stay held while the walk fills the queue.
        let entry_errors = walker.drain_into(
            |item| {
                discovery.file_discovered();
                scheduler.submit(item)
            },
            self.hook.as_ref(),
        )?;

        let hashing = Arc::new(discovery.finish_discovery());
        debug_assert_eq!(scheduler.queued() as u64, hashing.total());

        let digester = Digester::new(self.config.algorithm);
        info!(
            files = hashing.total(),
            workers = scheduler.workers(),
            algorithm = %digester.algorithm(),
            "traversal complete, hashing"
        );

        let output = sink.label().to_path_buf();
        let sink = Arc::new(sink);
        let job = {
            let sink = Arc::clone(&sink);
            let hashing = Arc::clone(&hashing);
            move |item: WorkItem| {
                let result = digester.digest(&item).and_then(|record| sink.append(&record));
                match &result {
                    Ok(()) => hashing.file_hashed(),
                    Err(err) if !err.is_fatal() => hashing.file_failed(),
                    Err(_) => {}
                }
                result
            }
        };

        let stats = scheduler.release(job).stop_wait()?;
        let progress = hashing.finish();

        let sink = Arc::try_unwrap(sink).map_err(|_| IndexError::WorkerPool {
            message: "output still shared after workers exited".to_string(),
        })?;
        let (records_written, writer) = sink.finish()?;

        let summary = IndexSummary {
            files_discovered: progress.files_discovered,
            files_hashed: stats.processed,
            files_failed: stats.skipped,
            entry_errors,
            records_written,
            duration: start.elapsed(),
        };
        info!(
            output = %output.display(),
            hashed = summary.files_hashed,
            failed = summary.files_failed,
            entry_errors = summary.entry_errors,
            files_per_sec = progress.files_per_second(),
            elapsed_ms = summary.duration.as_millis() as u64,
            "indexing complete"
        );

        Ok((summary, writer))
    }
}
