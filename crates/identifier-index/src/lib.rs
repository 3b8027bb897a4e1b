//! File indexing for identifier.
//!
//! An indexing run walks a directory, hands every file to a fixed pool of
//! worker threads and commits one [`IndexRecord`](identifier_core::IndexRecord)
//! per file to the store. Records whose size and modification time are
//! unchanged are reused instead of identified again.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use identifier_core::IndexConfig;
//! use identifier_index::{BasicEngine, Indexer};
//! use identifier_store::RecordStore;
//!
//! let store = Arc::new(RecordStore::open_read_write("/tmp/identifier-db").unwrap());
//! let indexer = Indexer::new(IndexConfig::new("/path/to/archive"), Arc::new(BasicEngine::new()));
//! let summary = indexer.run(store).unwrap();
//! println!("{} files, {} duplicates", summary.files, summary.stats.duplicates);
//! ```

mod duplicates;
mod engine;
mod error;
mod indexer;
mod pool;

pub use duplicates::DuplicateTracker;
pub use engine::{BasicEngine, IdentificationEngine, parse_algorithms};
pub use error::{EngineError, IndexError};
pub use indexer::{IndexSummary, Indexer};
pub use pool::{IndexJob, IndexingWorkerPool, JobOutcome, JobReport, PoolStats};
