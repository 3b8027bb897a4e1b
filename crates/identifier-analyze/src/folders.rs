//! Folder statistics rebuilt from stored records.

use serde::Serialize;

use identifier_core::{IndexRecord, NodeId, PathTree};
use identifier_store::{RecordStore, StoreError};

/// Statistics of one folder and everything below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderRow {
    pub files: u64,
    /// Folders in the subtree, the folder itself included.
    pub folders: u64,
    pub bytes: u64,
    /// `/` prefixed path with every segment cleaned.
    pub path: String,
}

/// Builds a [`PathTree`] from records instead of a filesystem walk.
///
/// Record sizes are attached to the leaf segment; intermediate segments
/// become folders.
#[derive(Debug, Default)]
pub struct FolderAggregator {
    tree: PathTree,
    records: u64,
}

impl FolderAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate every record below `prefix`.
    pub fn from_store(store: &RecordStore, prefix: &str) -> Result<Self, StoreError> {
        let mut aggregator = Self::new();
        store.scan_records(prefix, |record| {
            aggregator.add(record);
            Ok(false)
        })?;
        tracing::debug!(prefix, records = aggregator.records, "folders aggregated");
        Ok(aggregator)
    }

    pub fn add(&mut self, record: &IndexRecord) {
        self.tree.insert_path(&record.path, false, record.size);
        self.records += 1;
    }

    pub fn tree(&self) -> &PathTree {
        &self.tree
    }

    /// Number of records added.
    pub fn record_count(&self) -> u64 {
        self.records
    }

    /// One row per folder, children before parents, the root last.
    pub fn rows(&self) -> Vec<FolderRow> {
        self.tree
            .post_order()
            .filter(|&id| self.tree.node(id).is_dir)
            .map(|id| self.row(id))
            .collect()
    }

    fn row(&self, id: NodeId) -> FolderRow {
        let stats = self.tree.subtree_stats(id);
        FolderRow {
            files: stats.files,
            folders: stats.folders,
            bytes: stats.bytes,
            path: format!("/{}", self.tree.clear_string(id)),
        }
    }
}
