//! Indexing error types.

use std::path::PathBuf;

use thiserror::Error;

use identifier_core::WalkError;
use identifier_store::StoreError;

/// Errors raised by an identification engine for a single file.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A checksum algorithm the engine cannot compute.
    #[error("Unsupported checksum algorithm: {name}")]
    UnsupportedAlgorithm { name: String },

    /// The engine could not identify the file.
    #[error("Cannot identify {path}: {message}")]
    Failed { path: PathBuf, message: String },
}

impl EngineError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Errors that stop an indexing run.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A worker thread could not be started.
    #[error("Cannot spawn {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// A worker thread panicked.
    #[error("Thread {name} panicked")]
    Panicked { name: String },

    /// Jobs were submitted after the pool was closed.
    #[error("Job queue is closed")]
    QueueClosed,
}
