//! Walk progress reporting.

use std::path::PathBuf;
use std::time::Duration;

/// Progress information during a directory walk.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Number of non-directory entries found so far.
    pub files_found: u64,
    /// Number of directories found so far.
    pub dirs_found: u64,
    /// Total bytes of the files found so far.
    pub bytes_found: u64,
    /// Most recent path when the snapshot was taken.
    pub current_path: PathBuf,
    /// Time elapsed since the walk started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            files_found: 0,
            dirs_found: 0,
            bytes_found: 0,
            current_path: PathBuf::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Walk rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_found as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Get total entries found (files + dirs).
    pub fn total_items(&self) -> u64 {
        self.files_found + self.dirs_found
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}
