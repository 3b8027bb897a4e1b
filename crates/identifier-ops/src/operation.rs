//! Operation result types.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The kind of mutation performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    Rename,
    RemoveFile,
    RemoveFolder,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rename => write!(f, "Rename"),
            Self::RemoveFile => write!(f, "Remove file"),
            Self::RemoveFolder => write!(f, "Remove folder"),
        }
    }
}

/// An error that occurred for one item of an operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationError {
    /// The path that caused the error.
    pub path: PathBuf,
    /// A human-readable error message.
    pub message: String,
}

impl OperationError {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

impl std::error::Error for OperationError {}

/// Result of a completed operation.
#[derive(Debug, Clone)]
pub struct OperationComplete {
    pub operation_type: OperationType,
    /// Number of items successfully processed.
    pub succeeded: usize,
    /// Number of items that failed.
    pub failed: usize,
    /// Bytes removed, for removals.
    pub bytes_processed: u64,
    pub errors: Vec<OperationError>,
}

impl OperationComplete {
    pub(crate) fn new(operation_type: OperationType) -> Self {
        Self {
            operation_type,
            succeeded: 0,
            failed: 0,
            bytes_processed: 0,
            errors: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, result: Result<u64, OperationError>) {
        match result {
            Ok(bytes) => {
                self.succeeded += 1;
                self.bytes_processed += bytes;
            }
            Err(err) => {
                tracing::error!(
                    operation = %self.operation_type,
                    path = %err.path.display(),
                    error = %err.message,
                    "operation failed"
                );
                self.failed += 1;
                self.errors.push(err);
            }
        }
    }

    /// Check if the operation was fully successful.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Get a human-readable summary of the operation.
    pub fn summary(&self) -> String {
        let action = match self.operation_type {
            OperationType::Rename => "Renamed",
            OperationType::RemoveFile | OperationType::RemoveFolder => "Removed",
        };

        if self.failed == 0 {
            format!("{} {} items", action, self.succeeded)
        } else {
            format!("{} {} items, {} failed", action, self.succeeded, self.failed)
        }
    }
}

/// Join a `/` separated relative path onto `root`.
///
/// Absolute paths and `..` segments are rejected so nothing outside `root`
/// is touched.
pub fn resolve_under(root: &Path, relative: &str) -> Result<PathBuf, OperationError> {
    let relative_path = Path::new(relative);
    let escapes = relative_path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if relative.is_empty() || escapes {
        return Err(OperationError::new(
            relative,
            "path must be relative to the data root",
        ));
    }
    Ok(root.join(relative_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_under() {
        let root = Path::new("/data");
        assert_eq!(
            resolve_under(root, "a/b.txt").unwrap(),
            PathBuf::from("/data/a/b.txt")
        );
        assert!(resolve_under(root, "../etc/passwd").is_err());
        assert!(resolve_under(root, "/etc/passwd").is_err());
        assert!(resolve_under(root, "").is_err());
    }

    #[test]
    fn test_summary() {
        let mut complete = OperationComplete::new(OperationType::RemoveFile);
        complete.record(Ok(10));
        complete.record(Err(OperationError::new("x", "gone")));
        assert_eq!(complete.summary(), "Removed 1 items, 1 failed");
        assert_eq!(complete.bytes_processed, 10);
        assert!(!complete.is_success());
    }
}
