//! Fixed-size worker pool that identifies files and commits index records.
//!
//! ```text
//! submit ──> job queue (bounded) ──┬── worker 0 ─┐
//!                                  ├── worker 1 ─┼──> result queue ──> reporter
//!                                  └── worker N ─┘
//! ```
//!
//! Each job goes through cache lookup, identification on a miss, duplicate
//! classification and a single store commit. A counter of outstanding jobs
//! lets the producer wait until everything it submitted is done.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded};
use tracing::{debug, error, info, warn};

use identifier_core::{ChecksumAlgorithm, IndexConfig, IndexRecord, modified_secs};
use identifier_store::RecordStore;

use crate::duplicates::DuplicateTracker;
use crate::engine::IdentificationEngine;
use crate::error::IndexError;

/// One file to index.
#[derive(Debug, Clone)]
pub struct IndexJob {
    /// Location on disk.
    pub path: PathBuf,
    /// `/` separated path relative to the indexing root, used as record key.
    pub relative: String,
}

impl IndexJob {
    pub fn new(path: impl Into<PathBuf>, relative: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            relative: relative.into(),
        }
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The stored record was still valid and was refreshed.
    Cached,
    /// The file was identified and a new record committed.
    Identified,
    /// The job was not a regular file.
    Skipped,
    /// Stat, identification or commit failed; nothing was written.
    Failed(String),
}

/// Completion notice sent by a worker for every job.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub worker: usize,
    pub path: String,
    pub outcome: JobOutcome,
    pub duplicate: bool,
}

/// Totals for one pool lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub cached: u64,
    pub identified: u64,
    pub skipped: u64,
    pub failed: u64,
    pub duplicates: u64,
}

impl PoolStats {
    /// Jobs that produced a stored record.
    pub fn committed(&self) -> u64 {
        self.cached + self.identified
    }

    fn record(&mut self, report: &JobReport) {
        match report.outcome {
            JobOutcome::Cached => self.cached += 1,
            JobOutcome::Identified => self.identified += 1,
            JobOutcome::Skipped => self.skipped += 1,
            JobOutcome::Failed(_) => self.failed += 1,
        }
        if report.duplicate {
            self.duplicates += 1;
        }
    }
}

/// Counter of submitted but unfinished jobs.
#[derive(Debug, Default)]
struct Outstanding {
    count: Mutex<u64>,
    idle: Condvar,
}

impl Outstanding {
    fn add(&self) {
        let mut count = self.lock();
        *count += 1;
    }

    fn done(&self) {
        let mut count = self.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn wait(&self) {
        let mut count = self.lock();
        while *count > 0 {
            count = match self.idle.wait(count) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, u64> {
        match self.count.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// State shared by all workers of a pool.
struct WorkerContext {
    engine: Arc<dyn IdentificationEngine>,
    store: Arc<RecordStore>,
    tracker: DuplicateTracker,
    actions: Vec<String>,
    algorithms: Vec<ChecksumAlgorithm>,
    started_at: i64,
    outstanding: Outstanding,
}

/// Identifies files concurrently and writes their records to the store.
pub struct IndexingWorkerPool {
    job_tx: Option<Sender<IndexJob>>,
    workers: Vec<JoinHandle<()>>,
    reporter: Option<JoinHandle<PoolStats>>,
    context: Arc<WorkerContext>,
}

impl IndexingWorkerPool {
    /// Start `config.workers` workers and the result reporter.
    ///
    /// Every pool owns a fresh [`DuplicateTracker`].
    pub fn start(
        config: &IndexConfig,
        engine: Arc<dyn IdentificationEngine>,
        store: Arc<RecordStore>,
    ) -> Result<Self, IndexError> {
        let (job_tx, job_rx) = bounded::<IndexJob>(config.job_queue_size);
        let (result_tx, result_rx) = bounded::<JobReport>(config.result_queue_size);

        let context = Arc::new(WorkerContext {
            engine,
            store,
            tracker: DuplicateTracker::new(),
            actions: config.normalized_actions(),
            algorithms: config.algorithms.clone(),
            started_at: config.started_at,
            outstanding: Outstanding::default(),
        });

        let reporter = spawn_named("index-reporter".to_string(), move || report_loop(result_rx))?;

        let mut pool = Self {
            job_tx: Some(job_tx),
            workers: Vec::with_capacity(config.workers),
            reporter: Some(reporter),
            context,
        };

        for id in 0..config.workers.max(1) {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let context = Arc::clone(&pool.context);
            let handle = spawn_named(format!("index-worker-{id}"), move || {
                worker_loop(id, &context, jobs, results)
            });
            match handle {
                Ok(handle) => pool.workers.push(handle),
                Err(err) => {
                    // Let already running threads drain and exit.
                    drop(result_tx);
                    let _ = pool.shutdown();
                    return Err(err);
                }
            }
        }

        info!(
            workers = pool.workers.len(),
            actions = ?pool.context.actions,
            "indexing pool started"
        );
        Ok(pool)
    }

    /// Queue a job, blocking while the job queue is full.
    pub fn submit(&self, job: IndexJob) -> Result<(), IndexError> {
        let Some(ref job_tx) = self.job_tx else {
            return Err(IndexError::QueueClosed);
        };
        self.context.outstanding.add();
        if job_tx.send(job).is_err() {
            self.context.outstanding.done();
            return Err(IndexError::QueueClosed);
        }
        Ok(())
    }

    /// Block until every submitted job has finished.
    pub fn wait(&self) {
        self.context.outstanding.wait();
    }

    /// Wait for outstanding jobs, close the queue and join all threads.
    pub fn finish(mut self) -> Result<PoolStats, IndexError> {
        self.wait();
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<PoolStats, IndexError> {
        self.job_tx = None;

        let mut result = Ok(());
        for handle in self.workers.drain(..) {
            let name = thread_name(&handle);
            if handle.join().is_err() {
                result = Err(IndexError::Panicked { name });
            }
        }

        let stats = match self.reporter.take() {
            Some(handle) => {
                let name = thread_name(&handle);
                handle.join().map_err(|_| IndexError::Panicked { name })?
            }
            None => PoolStats::default(),
        };
        result.map(|()| stats)
    }
}

impl Drop for IndexingWorkerPool {
    fn drop(&mut self) {
        if self.reporter.is_some() {
            let _ = self.shutdown();
        }
    }
}

fn spawn_named<F, T>(name: String, f: F) -> Result<JoinHandle<T>, IndexError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    thread::Builder::new()
        .name(name.clone())
        .spawn(f)
        .map_err(|source| IndexError::Spawn { name, source })
}

fn thread_name<T>(handle: &JoinHandle<T>) -> String {
    handle.thread().name().unwrap_or("unnamed").to_string()
}

fn worker_loop(
    id: usize,
    context: &WorkerContext,
    jobs: Receiver<IndexJob>,
    results: Sender<JobReport>,
) {
    debug!(worker = id, "worker started");
    for job in jobs.iter() {
        let relative = job.relative.clone();
        let report = match panic::catch_unwind(AssertUnwindSafe(|| process(id, context, job))) {
            Ok(report) => report,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(worker = id, path = %relative, error = %message, "indexing job panicked");
                JobReport {
                    worker: id,
                    path: relative,
                    outcome: JobOutcome::Failed(format!("panic: {message}")),
                    duplicate: false,
                }
            }
        };
        if results.send(report).is_err() {
            warn!(worker = id, "result queue closed");
        }
        context.outstanding.done();
    }
    debug!(worker = id, "worker stopped");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

fn process(id: usize, context: &WorkerContext, job: IndexJob) -> JobReport {
    let mut report = JobReport {
        worker: id,
        path: job.relative.clone(),
        outcome: JobOutcome::Failed(String::new()),
        duplicate: false,
    };

    let metadata = match std::fs::metadata(&job.path) {
        Ok(metadata) => metadata,
        Err(err) => {
            error!(worker = id, path = %job.path.display(), error = %err, "cannot stat file");
            report.outcome = JobOutcome::Failed(err.to_string());
            return report;
        }
    };
    if metadata.is_dir() {
        error!(worker = id, path = %job.path.display(), "directory queued as indexing job");
        report.outcome = JobOutcome::Skipped;
        return report;
    }
    let size = metadata.len();
    let last_modified = modified_secs(&metadata);

    let cached = match context.store.get(&job.relative) {
        Ok(record) => record.filter(|r| r.matches_stat(size, last_modified)),
        Err(err) => {
            warn!(worker = id, path = %job.relative, error = %err, "cannot read cached record");
            None
        }
    };

    let (identification, outcome) = match cached {
        Some(record) => {
            debug!(worker = id, path = %job.relative, "cache hit");
            (record.identification, JobOutcome::Cached)
        }
        None => match context
            .engine
            .identify(&job.path, &context.actions, &context.algorithms)
        {
            Ok(identification) => (identification, JobOutcome::Identified),
            Err(err) => {
                error!(worker = id, path = %job.path.display(), error = %err, "identification failed");
                report.outcome = JobOutcome::Failed(err.to_string());
                return report;
            }
        },
    };

    let mut record = IndexRecord::new(
        job.relative,
        size,
        last_modified,
        context.started_at,
        identification,
    );
    let checksum = if size > 0 { record.checksum().map(str::to_string) } else { None };
    record.duplicate = checksum
        .as_deref()
        .is_some_and(|checksum| context.tracker.check_and_mark(checksum));

    if let Err(err) = context.store.put(&record) {
        error!(worker = id, path = %record.path, error = %err, "cannot store record");
        // An unstored first copy must not turn the next copy into a duplicate.
        if let Some(checksum) = checksum.filter(|_| !record.duplicate) {
            context.tracker.release(&checksum);
        }
        report.outcome = JobOutcome::Failed(err.to_string());
        return report;
    }

    report.duplicate = record.duplicate;
    report.outcome = outcome;
    report
}

fn report_loop(results: Receiver<JobReport>) -> PoolStats {
    let mut stats = PoolStats::default();
    for report in results.iter() {
        match report.outcome {
            JobOutcome::Failed(ref message) => {
                debug!(worker = report.worker, path = %report.path, error = %message, "job failed");
            }
            ref outcome => {
                debug!(
                    worker = report.worker,
                    path = %report.path,
                    ?outcome,
                    duplicate = report.duplicate,
                    "job done"
                );
            }
        }
        stats.record(&report);
    }
    stats
}
