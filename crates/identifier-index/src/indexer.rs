//! Indexing run driver: walk, fan out to the pool, wait, close.

use std::sync::Arc;
use std::time::{Duration, Instant};

use identifier_core::IndexConfig;
use identifier_scan::JwalkWalker;
use identifier_store::RecordStore;

use crate::engine::IdentificationEngine;
use crate::error::IndexError;
use crate::pool::{IndexJob, IndexingWorkerPool, PoolStats};

/// Summary of one indexing run.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexSummary {
    /// Files found by the walk.
    pub files: u64,
    /// Files that could not be queued.
    pub rejected: u64,
    pub stats: PoolStats,
    pub elapsed: Duration,
}

/// Indexes every file below a root directory into a [`RecordStore`].
pub struct Indexer {
    config: IndexConfig,
    engine: Arc<dyn IdentificationEngine>,
    walker: JwalkWalker,
}

impl Indexer {
    pub fn new(config: IndexConfig, engine: Arc<dyn IdentificationEngine>) -> Self {
        Self {
            config,
            engine,
            walker: JwalkWalker::new(),
        }
    }

    /// Use a preconfigured walker, for example one with progress subscribers.
    pub fn with_walker(mut self, walker: JwalkWalker) -> Self {
        self.walker = walker;
        self
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Run the indexing pass.
    ///
    /// The walk feeds the pool as it goes. Once the walk is over the driver
    /// waits for all queued jobs, then closes the queue. A walk failure is
    /// returned after the pool has drained.
    pub fn run(&self, store: Arc<RecordStore>) -> Result<IndexSummary, IndexError> {
        let start = Instant::now();
        let root = &self.config.root;
        tracing::info!(root = %root.display(), workers = self.config.workers, "indexing started");

        let pool = IndexingWorkerPool::start(&self.config, Arc::clone(&self.engine), store)?;

        let mut rejected = 0u64;
        let walked = self.walker.for_each_file(root, |entry| {
            if let Err(err) = pool.submit(IndexJob::new(entry.path, entry.relative)) {
                tracing::error!(error = %err, "cannot queue file");
                rejected += 1;
            }
        });

        let stats = pool.finish()?;
        let files = walked?;

        let summary = IndexSummary {
            files,
            rejected,
            stats,
            elapsed: start.elapsed(),
        };
        tracing::info!(
            files,
            identified = stats.identified,
            cached = stats.cached,
            failed = stats.failed,
            duplicates = stats.duplicates,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "indexing finished"
        );
        Ok(summary)
    }
}
