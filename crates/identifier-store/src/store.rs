//! RocksDB backed record store.

use std::path::{Path, PathBuf};

use rocksdb::{DB, Direction, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;

use identifier_core::{FolderDescriptor, IndexRecord, ai_key, file_key};

use crate::error::{StoreError, VisitError};

/// Number of keys deleted per write batch after a scan.
pub const DELETE_BATCH_SIZE: usize = 100;

/// How the store is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

/// Outcome of a [`RecordStore::scan_records`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Records handed to the visitor.
    pub visited: u64,
    /// Keys removed after the scan.
    pub deleted: u64,
    /// Keys flagged for removal whose batch failed to commit.
    pub failed: u64,
}

/// Ordered key-value store of index records and folder descriptors.
///
/// Records live under `file:<path>`, descriptors under
/// `ai:<model>:<folder>`. Values are JSON.
pub struct RecordStore {
    db: DB,
    path: PathBuf,
    mode: OpenMode,
}

impl RecordStore {
    /// Open a store, creating it when opened read-write.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut options = Options::default();
        let db = match mode {
            OpenMode::ReadWrite => {
                options.create_if_missing(true);
                DB::open(&options, &path)
            }
            OpenMode::ReadOnly => DB::open_for_read_only(&options, &path, false),
        }
        .map_err(|source| StoreError::Open {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), ?mode, "store opened");
        Ok(Self { db, path, mode })
    }

    /// Open for reading and writing.
    pub fn open_read_write(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open(path, OpenMode::ReadWrite)
    }

    /// Open an existing store for reading only.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open(path, OpenMode::ReadOnly)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_read_only(&self) -> bool {
        self.mode == OpenMode::ReadOnly
    }

    fn ensure_writable(&self) -> Result<(), StoreError> {
        if self.is_read_only() {
            return Err(StoreError::ReadOnly {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.db.get(key.as_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| StoreError::Decode {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    fn encode<T: Serialize>(key: &str, value: &T) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })
    }

    /// Record for a relative path.
    pub fn get(&self, path: &str) -> Result<Option<IndexRecord>, StoreError> {
        self.get_value(&file_key(path))
    }

    /// Insert or replace the record keyed by its path.
    pub fn put(&self, record: &IndexRecord) -> Result<(), StoreError> {
        self.ensure_writable()?;
        let key = record.key();
        let value = Self::encode(&key, record)?;
        self.db.put(key.as_bytes(), value)?;
        Ok(())
    }

    /// Visit every record whose path starts with `prefix`, in key order.
    ///
    /// The visitor returns `Ok(true)` to have the record removed. Removals are
    /// committed only after the whole scan, in batches of
    /// [`DELETE_BATCH_SIZE`]. A visitor error or an undecodable record aborts
    /// the scan and nothing is removed.
    pub fn scan_records<F>(&self, prefix: &str, visit: F) -> Result<ScanSummary, StoreError>
    where
        F: FnMut(&IndexRecord) -> Result<bool, VisitError>,
    {
        self.scan_prefix(&file_key(prefix), visit)
    }

    /// Number of records whose path starts with `prefix`.
    pub fn count_records(&self, prefix: &str) -> Result<u64, StoreError> {
        let prefix = file_key(prefix);
        let mut count = 0;
        for item in self.prefix_iter(&prefix) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// Descriptor stored for a folder by a model.
    pub fn get_descriptor(
        &self,
        model: &str,
        folder: &str,
    ) -> Result<Option<FolderDescriptor>, StoreError> {
        self.get_value(&ai_key(model, folder))
    }

    /// Store descriptors for one model in a single atomic batch.
    pub fn put_descriptors(
        &self,
        model: &str,
        descriptors: &[FolderDescriptor],
    ) -> Result<(), StoreError> {
        self.ensure_writable()?;
        let mut batch = WriteBatch::default();
        for descriptor in descriptors {
            let key = ai_key(model, &descriptor.folder);
            batch.put(key.as_bytes(), Self::encode(&key, descriptor)?);
        }
        self.db.write(batch)?;
        Ok(())
    }

    /// Visit descriptors of a model whose folder starts with `prefix`.
    pub fn scan_descriptors<F>(
        &self,
        model: &str,
        prefix: &str,
        visit: F,
    ) -> Result<ScanSummary, StoreError>
    where
        F: FnMut(&FolderDescriptor) -> Result<bool, VisitError>,
    {
        self.scan_prefix(&ai_key(model, prefix), visit)
    }

    fn prefix_iter<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = Result<(Box<[u8]>, Box<[u8]>), rocksdb::Error>> + 'a {
        self.db
            .iterator(IteratorMode::From(prefix.as_bytes(), Direction::Forward))
            .take_while(move |item| match item {
                Ok((key, _)) => key.starts_with(prefix.as_bytes()),
                Err(_) => true,
            })
    }

    fn scan_prefix<T, F>(&self, prefix: &str, mut visit: F) -> Result<ScanSummary, StoreError>
    where
        T: DeserializeOwned,
        F: FnMut(&T) -> Result<bool, VisitError>,
    {
        let mut summary = ScanSummary::default();
        let mut remove = Vec::new();

        for item in self.prefix_iter(prefix) {
            let (key, value) = item?;
            let key_str = String::from_utf8_lossy(&key).into_owned();
            let decoded: T =
                serde_json::from_slice(&value).map_err(|source| StoreError::Decode {
                    key: key_str.clone(),
                    source,
                })?;
            summary.visited += 1;
            let flagged = visit(&decoded).map_err(|source| StoreError::Visit {
                key: key_str,
                source,
            })?;
            if flagged {
                remove.push(key);
            }
        }

        if remove.is_empty() {
            return Ok(summary);
        }
        self.ensure_writable()?;

        for chunk in remove.chunks(DELETE_BATCH_SIZE) {
            let mut batch = WriteBatch::default();
            for key in chunk {
                batch.delete(key);
            }
            match self.db.write(batch) {
                Ok(()) => summary.deleted += chunk.len() as u64,
                Err(err) => {
                    tracing::error!(error = %err, keys = chunk.len(), "cannot delete keys");
                    summary.failed += chunk.len() as u64;
                }
            }
        }
        tracing::info!(prefix, deleted = summary.deleted, "removed records");
        Ok(summary)
    }
}
