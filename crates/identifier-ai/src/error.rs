//! Error types for description generation and RO-Crate export.

use std::path::PathBuf;

use thiserror::Error;

use identifier_store::StoreError;

/// Errors raised by the `ai` commands. All of them are fatal to the command.
#[derive(Debug, Error)]
pub enum AiError {
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

    /// The model string is not `<driver>-<model>`.
    #[error("Model '{model}' must consist of driver and model name")]
    InvalidModel { model: String },

    /// The driver part of the model string is not supported.
    #[error("Unknown driver '{driver}'")]
    UnknownDriver { driver: String },

    /// An `%%NAME%%` API key names an unset environment variable.
    #[error("Environment variable {name} for the API key is not set")]
    MissingApiKey { name: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answer contains no JSON payload.
    #[error("No JSON found in response: {response}")]
    NoJson { response: String },

    #[error("Cannot decode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cannot write CSV context: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The RO-Crate document is not usable.
    #[error("Invalid RO-Crate {path}: {message}")]
    RoCrate { path: PathBuf, message: String },
}

impl AiError {
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
