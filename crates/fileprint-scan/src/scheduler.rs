//! Two-phase worker pool.
//!
//! Work is queued while workers are held, then every worker is released at
//! once and drains the shared queue:
//!
//! ```text
//! walker ──submit──▶ [ queue ] ◀──recv── worker 0..N   (Running only)
//!                                            │
//!                                            └─▶ job(item) ─▶ Ok / skip / fatal
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender, unbounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, error};

use fileprint_core::{EntryError, IndexError, WorkItem};

use crate::report::ErrorHook;

/// Work executed by a worker for each queued item.
///
/// Recoverable errors (see [`IndexError::is_fatal`]) are reported through
/// the scheduler's error hook and the worker moves on. A fatal error stops
/// every worker.
pub trait Job: Send + Sync + 'static {
    /// Process one item.
    fn run(&self, item: WorkItem) -> Result<(), IndexError>;
}

impl<F> Job for F
where
    F: Fn(WorkItem) -> Result<(), IndexError> + Send + Sync + 'static,
{
    fn run(&self, item: WorkItem) -> Result<(), IndexError> {
        self(item)
    }
}

/// Scheduler state while work is being accumulated.
#[derive(Debug)]
pub struct Held;

/// Scheduler state once workers have been released.
pub struct Running {
    shared: Arc<WorkerShared>,
    done_rx: Receiver<()>,
}

/// Counts returned once every worker has exited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Items processed successfully.
    pub processed: u64,
    /// Items skipped after a recoverable error.
    pub skipped: u64,
}

/// Fixed-size worker pool fed by a shared queue.
pub struct WorkScheduler<S = Held> {
    pool: ThreadPool,
    workers: usize,
    tx: Sender<WorkItem>,
    rx: Receiver<WorkItem>,
    hook: Arc<dyn ErrorHook>,
    state: S,
}

impl WorkScheduler<Held> {
    /// Start `workers` threads, held idle until [`release`](Self::release).
    pub fn new(workers: usize, hook: Arc<dyn ErrorHook>) -> Result<Self, IndexError> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("fileprint-worker-{i}"))
            .build()
            .map_err(|e| IndexError::WorkerPool {
                message: e.to_string(),
            })?;
        let (tx, rx) = unbounded();

        Ok(Self {
            pool,
            workers,
            tx,
            rx,
            hook,
            state: Held,
        })
    }

    /// Release every held worker. Each one runs `job` on queued items until
    /// the queue is closed and empty.
    pub fn release(self, job: impl Job) -> WorkScheduler<Running> {
        let job: Arc<dyn Job> = Arc::new(job);
        let shared = Arc::new(WorkerShared::default());
        let (done_tx, done_rx) = unbounded::<()>();

        debug!(
            workers = self.workers,
            queued = self.rx.len(),
            "releasing workers"
        );

        for _ in 0..self.workers {
            let rx = self.rx.clone();
            let job = Arc::clone(&job);
            let shared = Arc::clone(&shared);
            let hook = Arc::clone(&self.hook);
            let done = done_tx.clone();
            self.pool
                .spawn(move || worker_loop(rx, job, shared, hook, done));
        }

        WorkScheduler {
            pool: self.pool,
            workers: self.workers,
            tx: self.tx,
            rx: self.rx,
            hook: self.hook,
            state: Running { shared, done_rx },
        }
    }

    /// Release the workers and wait for the queue to drain.
    pub fn run(self, job: impl Job) -> Result<SchedulerStats, IndexError> {
        self.release(job).stop_wait()
    }
}

impl WorkScheduler<Running> {
    /// Close the queue and block until every queued item has been processed
    /// and every worker has exited.
    ///
    /// Returns the first fatal error raised by a job, if any.
    pub fn stop_wait(self) -> Result<SchedulerStats, IndexError> {
        let Self {
            pool, tx, state, ..
        } = self;
        drop(tx);

        // Workers never send; recv fails once the last one drops its sender.
        while state.done_rx.recv().is_ok() {}
        drop(pool);

        let stats = SchedulerStats {
            processed: state.shared.processed.load(Ordering::Acquire),
            skipped: state.shared.skipped.load(Ordering::Acquire),
        };

        match state.shared.take_fatal() {
            Some(err) => Err(err),
            None => Ok(stats),
        }
    }
}

impl<S> WorkScheduler<S> {
    /// Queue an item. Running workers pick it up immediately; held workers
    /// see it once released.
    pub fn submit(&self, item: WorkItem) -> Result<(), IndexError> {
        self.tx.send(item).map_err(|_| IndexError::WorkerPool {
            message: "work queue closed".to_string(),
        })
    }

    /// Items waiting in the queue.
    pub fn queued(&self) -> usize {
        self.rx.len()
    }

    /// Number of workers in the pool.
    pub fn workers(&self) -> usize {
        self.workers
    }
}

#[derive(Default)]
struct WorkerShared {
    processed: AtomicU64,
    skipped: AtomicU64,
    abort: AtomicBool,
    fatal: Mutex<Option<IndexError>>,
}

impl WorkerShared {
    fn fail(&self, err: IndexError) {
        self.abort.store(true, Ordering::Release);
        let mut fatal = self.fatal.lock().unwrap_or_else(PoisonError::into_inner);
        if fatal.is_none() {
            *fatal = Some(err);
        }
    }

    fn take_fatal(&self) -> Option<IndexError> {
        self.fatal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

fn worker_loop(
    rx: Receiver<WorkItem>,
    job: Arc<dyn Job>,
    shared: Arc<WorkerShared>,
    hook: Arc<dyn ErrorHook>,
    done: Sender<()>,
) {
    while let Ok(item) = rx.recv() {
        if shared.abort.load(Ordering::Acquire) {
            break;
        }

        let path = item.path().to_path_buf();
        let result = match catch_unwind(AssertUnwindSafe(|| job.run(item))) {
            Ok(result) => result,
            Err(_) => Err(IndexError::WorkerPool {
                message: format!("worker panicked on {}", path.display()),
            }),
        };

        match result {
            Ok(()) => {
                shared.processed.fetch_add(1, Ordering::AcqRel);
            }
            Err(err) if err.is_fatal() => {
                error!(path = %path.display(), "{err}");
                shared.fail(err);
                break;
            }
            Err(err) => {
                shared.skipped.fetch_add(1, Ordering::AcqRel);
                if let Some(report) = EntryError::from_index_error(&err) {
                    hook.report(&report);
                }
            }
        }
    }

    // The job may own resources the caller reclaims after stop_wait.
    drop(job);
    drop(done);
}
