//! Path normalisation helpers.

use std::fs::Metadata;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Render a path with `/` separators.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Path of `path` relative to `root`, `/` separated.
///
/// Returns `None` if `path` is not below `root`.
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root).ok().map(to_slash)
}

/// Absolute, lexically normalised form of a command line path.
///
/// Relative paths are resolved against the current directory. `.` and `..`
/// components are folded without touching the filesystem.
pub fn resolve_full_path(path: impl AsRef<Path>) -> std::io::Result<PathBuf> {
    let path = path.as_ref();
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut resolved = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other.as_os_str()),
        }
    }
    Ok(resolved)
}

/// Modification time in whole seconds since the epoch, 0 when unavailable.
pub fn modified_secs(metadata: &Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_slash_path() {
        let root = Path::new("/data/root");
        let file = root.join("a").join("b.txt");
        assert_eq!(relative_slash_path(root, &file).as_deref(), Some("a/b.txt"));
        assert_eq!(relative_slash_path(root, Path::new("/other/x")), None);
    }

    #[test]
    fn test_resolve_full_path() {
        let resolved = resolve_full_path("/data/./a/../b").unwrap();
        assert_eq!(resolved, PathBuf::from("/data/b"));

        let relative = resolve_full_path("x").unwrap();
        assert!(relative.is_absolute());
        assert!(relative.ends_with("x"));
    }
}
