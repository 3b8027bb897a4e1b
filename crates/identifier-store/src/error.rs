//! Store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Error returned by a scan visitor to abort the scan.
pub type VisitError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be opened (bad path, lock held elsewhere).
    #[error("Cannot open store at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rocksdb::Error,
    },

    /// A read or write against the database failed.
    #[error("Store operation failed: {0}")]
    Backend(#[from] rocksdb::Error),

    /// A stored value is not a valid record. Treated as store corruption.
    #[error("Corrupt record at key {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be serialized.
    #[error("Cannot encode value for key {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The scan visitor returned an error.
    #[error("Scan aborted at key {key}: {source}")]
    Visit {
        key: String,
        #[source]
        source: VisitError,
    },

    /// A mutation was requested on a store opened read-only.
    #[error("Store at {path} is opened read-only")]
    ReadOnly { path: PathBuf },
}
