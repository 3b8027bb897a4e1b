//! Run-scoped duplicate detection by checksum.

use std::sync::{Mutex, MutexGuard};

/// Records every checksum seen during one indexing run.
///
/// The first caller for a checksum gets `false`, every later caller `true`.
/// Which concurrent caller comes first is decided by the lock and is not
/// deterministic.
#[derive(Debug, Default)]
pub struct DuplicateTracker {
    seen: Mutex<Vec<String>>,
}

impl DuplicateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `checksum` as seen and report whether it was seen before.
    pub fn check_and_mark(&self, checksum: &str) -> bool {
        let mut seen = self.lock();
        match seen.binary_search_by(|c| c.as_str().cmp(checksum)) {
            Ok(_) => true,
            Err(pos) => {
                seen.insert(pos, checksum.to_string());
                false
            }
        }
    }

    /// Forget `checksum`, so the next caller for it is first again.
    ///
    /// Used when the first copy of a checksum could not be committed. Copies
    /// marked as duplicates before the release keep their flag.
    pub fn release(&self, checksum: &str) {
        let mut seen = self.lock();
        if let Ok(pos) = seen.binary_search_by(|c| c.as_str().cmp(checksum)) {
            seen.remove(pos);
        }
    }

    /// Number of distinct checksums seen.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        match self.seen.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
