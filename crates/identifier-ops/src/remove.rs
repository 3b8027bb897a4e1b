//! Removal operations.

use std::fs;
use std::path::Path;

use crate::operation::{OperationComplete, OperationError, OperationType, resolve_under};

/// Remove one file below `root`, returning its size.
pub fn remove_file(root: &Path, relative: &str) -> Result<u64, OperationError> {
    let path = resolve_under(root, relative)?;
    let metadata = fs::symlink_metadata(&path)
        .map_err(|e| OperationError::new(&path, format!("Cannot stat: {}", e)))?;
    if metadata.is_dir() {
        return Err(OperationError::new(&path, "is a directory"));
    }
    fs::remove_file(&path)
        .map_err(|e| OperationError::new(&path, format!("Delete failed: {}", e)))?;
    tracing::info!(path = %path.display(), "file removed");
    Ok(metadata.len())
}

/// Remove a folder and everything below it, returning the bytes freed.
pub fn remove_folder(root: &Path, relative: &str) -> Result<u64, OperationError> {
    let path = resolve_under(root, relative)?;
    let metadata = fs::symlink_metadata(&path)
        .map_err(|e| OperationError::new(&path, format!("Cannot stat: {}", e)))?;
    if !metadata.is_dir() {
        return Err(OperationError::new(&path, "is not a directory"));
    }
    let bytes = tree_size(&path);
    fs::remove_dir_all(&path)
        .map_err(|e| OperationError::new(&path, format!("Delete failed: {}", e)))?;
    tracing::info!(path = %path.display(), bytes, "folder removed");
    Ok(bytes)
}

/// Remove files below `root`. Failures are recorded and skipped.
pub fn remove_files<I, S>(root: &Path, paths: I) -> OperationComplete
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut complete = OperationComplete::new(OperationType::RemoveFile);
    for relative in paths {
        complete.record(remove_file(root, relative.as_ref()));
    }
    complete
}

/// Remove folders below `root` recursively. Failures are recorded and skipped.
pub fn remove_folders<I, S>(root: &Path, paths: I) -> OperationComplete
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut complete = OperationComplete::new(OperationType::RemoveFolder);
    for relative in paths {
        complete.record(remove_folder(root, relative.as_ref()));
    }
    complete
}

fn tree_size(path: &Path) -> u64 {
    let mut total = 0;
    let mut stack = vec![path.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            match entry.metadata() {
                Ok(m) if m.is_dir() => stack.push(entry.path()),
                Ok(m) => total += m.len(),
                Err(_) => {}
            }
        }
    }
    total
}
