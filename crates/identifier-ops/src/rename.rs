//! Rename operation.

use std::fs;
use std::path::Path;

use identifier_core::Rename;

use crate::operation::{OperationComplete, OperationError, OperationType, resolve_under};

/// Apply renames produced by a clear pass, in the order given.
///
/// Renames from [`PathTree::clear`](identifier_core::PathTree::clear) come
/// children first and name the target inside the parent's current path, so
/// applying them in order is safe. A failed rename is recorded and the rest
/// continue.
pub fn apply_renames<I>(root: &Path, renames: I) -> OperationComplete
where
    I: IntoIterator<Item = Rename>,
{
    let mut complete = OperationComplete::new(OperationType::Rename);
    for rename in renames {
        complete.record(rename_one(root, &rename).map(|()| 0));
    }
    tracing::info!(root = %root.display(), summary = %complete.summary(), "renames applied");
    complete
}

/// Rename a single entry below `root`.
pub fn rename_one(root: &Path, rename: &Rename) -> Result<(), OperationError> {
    let source = resolve_under(root, &rename.from)?;
    let target = resolve_under(root, &rename.to)?;

    let new_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    validate_filename(&new_name).map_err(|e| OperationError::new(&source, e))?;

    if target.symlink_metadata().is_ok() && target != source {
        return Err(OperationError::new(
            &source,
            format!("'{}' already exists", new_name),
        ));
    }

    fs::rename(&source, &target)
        .map_err(|e| OperationError::new(&source, format!("Rename failed: {}", e)))?;
    tracing::debug!(from = %rename.from, to = %rename.to, "renamed");
    Ok(())
}

/// Validate a filename for cross-platform compatibility.
pub fn validate_filename(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Name cannot be empty".into());
    }

    if name.len() > 255 {
        return Err("Name is too long (max 255 bytes)".into());
    }

    for c in ['/', '\0'] {
        if name.contains(c) {
            return Err(format!("Name cannot contain '{}'", c.escape_default()));
        }
    }

    #[cfg(target_os = "windows")]
    {
        for c in ['\\', ':', '*', '?', '"', '<', '>', '|'] {
            if name.contains(c) {
                return Err(format!("Name cannot contain '{}'", c));
            }
        }
    }

    if name == "." || name == ".." {
        return Err("'.' and '..' are reserved names".into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rename(from: &str, to: &str) -> Rename {
        Rename {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("test.txt").is_ok());
        assert!(validate_filename("_hidden").is_ok());
        assert!(validate_filename("").is_err());
        assert!(validate_filename("a/b").is_err());
        assert!(validate_filename("..").is_err());
    }

    #[test]
    fn test_children_then_parent() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".dir")).unwrap();
        fs::write(temp.path().join(".dir/~f.txt"), "x").unwrap();

        let complete = apply_renames(
            temp.path(),
            [rename(".dir/~f.txt", ".dir/-f.txt"), rename(".dir", "_dir")],
        );

        assert!(complete.is_success());
        assert_eq!(complete.succeeded, 2);
        assert!(temp.path().join("_dir/-f.txt").is_file());
    }

    #[test]
    fn test_existing_target_is_not_overwritten() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a"), "a").unwrap();
        fs::write(temp.path().join("b"), "b").unwrap();

        let complete = apply_renames(temp.path(), [rename("a", "b"), rename("missing", "c")]);

        assert_eq!(complete.failed, 2);
        assert_eq!(fs::read_to_string(temp.path().join("b")).unwrap(), "b");
        assert!(temp.path().join("a").exists());
    }
}
