//! JWalk-based directory walker.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use jwalk::{Parallelism, WalkDir};
use tokio::sync::broadcast;

use identifier_core::{PathTree, WalkError, modified_secs, relative_slash_path};

use crate::progress::ScanProgress;

/// How often a progress snapshot is broadcast.
const PROGRESS_INTERVAL: u64 = 1000;

/// A non-directory entry found while walking.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// `/` separated path relative to the walk root.
    pub relative: String,
    pub size: u64,
    /// Seconds since the epoch.
    pub modified: i64,
}

/// Walks directory trees using jwalk with sorted, hidden-inclusive output.
pub struct JwalkWalker {
    progress_tx: broadcast::Sender<ScanProgress>,
    threads: usize,
}

impl JwalkWalker {
    /// Create a new walker using the default rayon pool.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            progress_tx,
            threads: 0,
        }
    }

    /// Use a dedicated pool with `threads` threads (0 = shared default pool).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Subscribe to walk progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Build a [`PathTree`] of everything below `root`.
    ///
    /// Any walk error aborts the build; no partial tree is returned.
    pub fn build_tree(&self, root: &Path) -> Result<PathTree, WalkError> {
        let mut tree = PathTree::new();
        self.walk(root, |relative, is_dir, metadata| {
            tree.insert_path(relative, is_dir, if is_dir { 0 } else { metadata.len() });
        })?;
        tracing::debug!(root = %root.display(), nodes = tree.len(), "path tree built");
        Ok(tree)
    }

    /// Visit every non-directory entry below `root` in walk order.
    ///
    /// Returns the number of files visited.
    pub fn for_each_file<F>(&self, root: &Path, mut visit: F) -> Result<u64, WalkError>
    where
        F: FnMut(FileEntry),
    {
        let mut count = 0u64;
        self.walk(root, |relative, is_dir, metadata| {
            if is_dir {
                tracing::debug!(folder = relative, "folder");
                return;
            }
            count += 1;
            visit(FileEntry {
                path: root.join(relative),
                relative: relative.to_string(),
                size: metadata.len(),
                modified: modified_secs(metadata),
            });
        })?;
        Ok(count)
    }

    fn walk<F>(&self, root: &Path, mut visit: F) -> Result<(), WalkError>
    where
        F: FnMut(&str, bool, &std::fs::Metadata),
    {
        let start = Instant::now();
        let metadata = std::fs::metadata(root).map_err(|e| WalkError::io(root, e))?;
        if !metadata.is_dir() {
            return Err(WalkError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        let parallelism = match self.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_millis(100),
            },
            n => Parallelism::RayonNewPool(n),
        };

        let walker = WalkDir::new(root)
            .parallelism(parallelism)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .min_depth(1);

        let mut progress = ScanProgress::new();
        for entry_result in walker {
            let entry = entry_result.map_err(|err| WalkError::Walk {
                path: err.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
                message: err.to_string(),
            })?;

            let path = entry.path();
            let metadata = entry.metadata().map_err(|err| WalkError::Walk {
                path: path.clone(),
                message: err.to_string(),
            })?;
            let Some(relative) = relative_slash_path(root, &path) else {
                continue;
            };

            let is_dir = entry.file_type().is_dir();
            if is_dir {
                progress.dirs_found += 1;
            } else {
                progress.files_found += 1;
                progress.bytes_found += metadata.len();
            }
            visit(&relative, is_dir, &metadata);

            if (progress.files_found + progress.dirs_found) % PROGRESS_INTERVAL == 0 {
                progress.current_path = path;
                progress.elapsed = start.elapsed();
                let _ = self.progress_tx.send(progress.clone());
            }
        }

        progress.elapsed = start.elapsed();
        let _ = self.progress_tx.send(progress);
        Ok(())
    }
}

impl Default for JwalkWalker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("dir1")).unwrap();
        fs::create_dir(root.join("dir2")).unwrap();
        fs::create_dir(root.join("dir1/subdir")).unwrap();

        fs::write(root.join("file1.txt"), "hello").unwrap();
        fs::write(root.join("dir1/file2.txt"), "world world world").unwrap();
        fs::write(root.join("dir1/subdir/file3.txt"), "test").unwrap();
        fs::write(root.join(".hidden"), "").unwrap();

        temp
    }

    #[test]
    fn test_build_tree() {
        let temp = create_test_tree();
        let tree = JwalkWalker::new().build_tree(temp.path()).unwrap();

        let file2 = tree.find("dir1/file2.txt").unwrap();
        assert_eq!(tree.node(file2).size, 17);
        assert!(tree.node(tree.find("dir2").unwrap()).is_dir);
        assert!(tree.find(".hidden").is_some());

        let stats = tree.subtree_stats(tree.root());
        assert_eq!(stats.files, 4);
        assert_eq!(stats.bytes, 26);
        // root, dir1, dir2, subdir
        assert_eq!(stats.folders, 4);
    }

    #[test]
    fn test_for_each_file_skips_dirs() {
        let temp = create_test_tree();
        let mut seen = Vec::new();
        let count = JwalkWalker::new()
            .for_each_file(temp.path(), |entry| seen.push(entry.relative))
            .unwrap();

        assert_eq!(count, 4);
        seen.sort();
        assert_eq!(
            seen,
            vec![".hidden", "dir1/file2.txt", "dir1/subdir/file3.txt", "file1.txt"]
        );
    }

    #[test]
    fn test_root_must_be_directory() {
        let temp = create_test_tree();
        let err = JwalkWalker::new()
            .build_tree(&temp.path().join("file1.txt"))
            .unwrap_err();
        assert!(matches!(err, WalkError::NotADirectory { .. }));

        let err = JwalkWalker::new()
            .build_tree(&temp.path().join("missing"))
            .unwrap_err();
        assert!(matches!(err, WalkError::NotFound { .. }));
    }

    #[test]
    fn test_progress_final_snapshot() {
        let temp = create_test_tree();
        let walker = JwalkWalker::new();
        let mut rx = walker.subscribe();
        walker.build_tree(temp.path()).unwrap();

        let mut last = None;
        while let Ok(progress) = rx.try_recv() {
            last = Some(progress);
        }
        let last = last.unwrap();
        assert_eq!(last.files_found, 4);
        assert_eq!(last.dirs_found, 3);
    }
}
