//! Indexing pipeline tests driven by a scripted identification engine.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, SystemTime};

use identifier_core::{ChecksumAlgorithm, Identification, IndexConfig, IndexRecord};
use identifier_index::{
    EngineError, IdentificationEngine, IndexJob, Indexer, IndexingWorkerPool,
};
use identifier_store::RecordStore;
use tempfile::TempDir;

/// Uses the file content as the sha512 "digest" and fails on files whose
/// content starts with `fail`.
#[derive(Default)]
struct ScriptedEngine {
    calls: AtomicUsize,
}

impl ScriptedEngine {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl IdentificationEngine for ScriptedEngine {
    fn identify(
        &self,
        path: &Path,
        actions: &[String],
        algorithms: &[ChecksumAlgorithm],
    ) -> Result<Identification, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        if content.starts_with("fail") {
            return Err(EngineError::Failed {
                path: path.to_path_buf(),
                message: "scripted failure".to_string(),
            });
        }

        let mut ident = Identification {
            mimetype: "text/plain".to_string(),
            kind: "text".to_string(),
            subtype: actions.join("+"),
            size: content.len() as u64,
            ..Default::default()
        };
        for algorithm in algorithms {
            ident
                .checksum
                .insert(algorithm.to_string(), format!("{algorithm}:{content}"));
        }
        Ok(ident)
    }
}

/// Panics on `boom.txt`, otherwise behaves like [`ScriptedEngine`].
#[derive(Default)]
struct PanickingEngine {
    inner: ScriptedEngine,
}

impl IdentificationEngine for PanickingEngine {
    fn identify(
        &self,
        path: &Path,
        actions: &[String],
        algorithms: &[ChecksumAlgorithm],
    ) -> Result<Identification, EngineError> {
        if path.file_name().is_some_and(|name| name == "boom.txt") {
            panic!("engine crashed on {}", path.display());
        }
        self.inner.identify(path, actions, algorithms)
    }
}

/// Rewrite `path` and move its modification time to `secs` after the epoch.
fn rewrite_with_mtime(path: &Path, content: &str, secs: u64) {
    fs::write(path, content).unwrap();
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

struct Fixture {
    data: TempDir,
    db: TempDir,
}

impl Fixture {
    fn new(files: &[(&str, &str)]) -> Self {
        let data = TempDir::new().unwrap();
        for (name, content) in files {
            let path = data.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        Self {
            data,
            db: TempDir::new().unwrap(),
        }
    }

    fn config(&self, workers: usize, started_at: i64) -> IndexConfig {
        IndexConfig::builder()
            .root(self.data.path())
            .workers(workers)
            .started_at(started_at)
            .build()
            .unwrap()
    }

    fn store(&self) -> Arc<RecordStore> {
        Arc::new(RecordStore::open_read_write(self.db.path().join("db")).unwrap())
    }
}

fn all_records(store: &RecordStore) -> Vec<IndexRecord> {
    let mut records = Vec::new();
    store
        .scan_records("", |r| {
            records.push(r.clone());
            Ok(false)
        })
        .unwrap();
    records
}

#[test]
fn test_index_writes_one_record_per_file() {
    let fixture = Fixture::new(&[("a.txt", "alpha"), ("sub/b.txt", "beta"), ("sub/deep/c.txt", "")]);
    let engine = Arc::new(ScriptedEngine::default());
    let store = fixture.store();

    let summary = Indexer::new(fixture.config(3, 1000), engine.clone())
        .run(Arc::clone(&store))
        .unwrap();

    assert_eq!(summary.files, 3);
    assert_eq!(summary.stats.identified, 3);
    assert_eq!(engine.calls(), 3);

    let record = store.get("sub/b.txt").unwrap().unwrap();
    assert_eq!(record.folder, "sub");
    assert_eq!(record.basename, "b.txt");
    assert_eq!(record.size, 4);
    assert_eq!(record.last_seen, 1000);
    assert_eq!(record.identification.subtype, "siegfried+xml");
    assert_eq!(store.get("a.txt").unwrap().unwrap().folder, ".");
}

#[test]
fn test_reindex_unchanged_is_identical_except_last_seen() {
    let fixture = Fixture::new(&[("a.txt", "same"), ("b.txt", "same"), ("c.txt", "other")]);
    let engine = Arc::new(ScriptedEngine::default());
    let store = fixture.store();

    Indexer::new(fixture.config(1, 100), engine.clone())
        .run(Arc::clone(&store))
        .unwrap();
    let first = all_records(&store);

    let summary = Indexer::new(fixture.config(1, 200), engine.clone())
        .run(Arc::clone(&store))
        .unwrap();
    let second = all_records(&store);

    assert_eq!(engine.calls(), 3);
    assert_eq!(summary.stats.cached, 3);
    assert_eq!(first.len(), second.len());
    for (before, after) in first.iter().zip(&second) {
        assert_eq!(after.last_seen, 200);
        let mut after = after.clone();
        after.last_seen = before.last_seen;
        assert_eq!(&after, before);
    }
}

#[test]
fn test_changed_size_forces_recompute() {
    let fixture = Fixture::new(&[("a.txt", "one"), ("b.txt", "two")]);
    let engine = Arc::new(ScriptedEngine::default());
    let store = fixture.store();

    Indexer::new(fixture.config(2, 1), engine.clone())
        .run(Arc::clone(&store))
        .unwrap();
    assert_eq!(engine.calls(), 2);

    fs::write(fixture.data.path().join("a.txt"), "three").unwrap();
    fs::write(fixture.data.path().join("b.txt"), "twotwo").unwrap();
    let summary = Indexer::new(fixture.config(1, 2), engine.clone())
        .run(Arc::clone(&store))
        .unwrap();

    assert_eq!(engine.calls(), 4);
    assert_eq!(summary.stats.identified, 2);
    let a = store.get("a.txt").unwrap().unwrap();
    assert_eq!(a.size, 5);
    assert_eq!(a.checksum(), Some("sha512:three"));
    assert_eq!(store.get("b.txt").unwrap().unwrap().size, 6);
}

#[test]
fn test_changed_mtime_same_size_forces_recompute() {
    let fixture = Fixture::new(&[("a.txt", "one"), ("b.txt", "two")]);
    let engine = Arc::new(ScriptedEngine::default());
    let store = fixture.store();

    Indexer::new(fixture.config(1, 1), engine.clone())
        .run(Arc::clone(&store))
        .unwrap();
    let before = store.get("a.txt").unwrap().unwrap();
    assert_eq!(before.checksum(), Some("sha512:one"));

    rewrite_with_mtime(&fixture.data.path().join("a.txt"), "uno", 1_000_000);
    let summary = Indexer::new(fixture.config(1, 2), engine.clone())
        .run(Arc::clone(&store))
        .unwrap();

    assert_eq!(engine.calls(), 3);
    assert_eq!(summary.stats.identified, 1);
    assert_eq!(summary.stats.cached, 1);
    let after = store.get("a.txt").unwrap().unwrap();
    assert_eq!(after.size, before.size);
    assert_eq!(after.last_modified, 1_000_000);
    assert_eq!(after.checksum(), Some("sha512:uno"));
}

#[test]
fn test_recompute_refreshes_duplicate_flag() {
    let fixture = Fixture::new(&[("a.txt", "same"), ("b.txt", "same")]);
    let engine = Arc::new(ScriptedEngine::default());
    let store = fixture.store();

    Indexer::new(fixture.config(1, 1), engine.clone())
        .run(Arc::clone(&store))
        .unwrap();
    let duplicate = all_records(&store)
        .into_iter()
        .find(|r| r.duplicate)
        .unwrap();

    rewrite_with_mtime(&fixture.data.path().join(&duplicate.path), "diff", 2_000_000);
    let summary = Indexer::new(fixture.config(1, 2), engine.clone())
        .run(Arc::clone(&store))
        .unwrap();

    assert_eq!(engine.calls(), 3);
    assert_eq!(summary.stats.duplicates, 0);
    let refreshed = store.get(&duplicate.path).unwrap().unwrap();
    assert!(!refreshed.duplicate);
    assert_eq!(refreshed.checksum(), Some("sha512:diff"));
    assert!(all_records(&store).iter().all(|r| !r.duplicate));
}

#[test]
fn test_engine_panic_does_not_block_run() {
    let fixture = Fixture::new(&[("a.txt", "a"), ("boom.txt", "b"), ("c.txt", "c")]);
    let store = fixture.store();
    let indexer = Indexer::new(fixture.config(2, 1), Arc::new(PanickingEngine::default()));

    let (tx, rx) = mpsc::channel();
    let run_store = Arc::clone(&store);
    thread::spawn(move || {
        let _ = tx.send(indexer.run(run_store));
    });
    let summary = rx
        .recv_timeout(Duration::from_secs(30))
        .expect("indexing did not finish after a worker panic")
        .unwrap();

    assert_eq!(summary.stats.failed, 1);
    assert_eq!(summary.stats.committed(), 2);
    assert!(store.get("boom.txt").unwrap().is_none());
    assert!(store.get("c.txt").unwrap().is_some());
}

#[test]
fn test_duplicates_any_order() {
    let files = [
        ("1.txt", "a"),
        ("2.txt", "a"),
        ("3.txt", "b"),
        ("4.txt", "a"),
        ("5.txt", "b"),
    ];

    for workers in [1, 2, 3, 5, 8] {
        let fixture = Fixture::new(&files);
        let store = fixture.store();
        let summary = Indexer::new(
            fixture.config(workers, 1),
            Arc::new(ScriptedEngine::default()),
        )
        .run(Arc::clone(&store))
        .unwrap();

        let records = all_records(&store);
        let originals: Vec<_> = records.iter().filter(|r| !r.duplicate).collect();
        assert_eq!(originals.len(), 2, "workers = {workers}");
        assert_eq!(summary.stats.duplicates, 3, "workers = {workers}");

        let mut checksums: Vec<_> = originals.iter().filter_map(|r| r.checksum()).collect();
        checksums.sort_unstable();
        assert_eq!(checksums, vec!["sha512:a", "sha512:b"]);
    }
}

#[test]
fn test_empty_files_never_duplicate() {
    let fixture = Fixture::new(&[("x/empty1", ""), ("y/empty2", ""), ("z/empty3", "")]);
    let store = fixture.store();
    Indexer::new(fixture.config(3, 1), Arc::new(ScriptedEngine::default()))
        .run(Arc::clone(&store))
        .unwrap();

    let records = all_records(&store);
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| !r.duplicate && r.size == 0));
}

#[test]
fn test_engine_failure_skips_file_and_continues() {
    let fixture = Fixture::new(&[("bad.txt", "fail here"), ("good1.txt", "x"), ("good2.txt", "y")]);
    let store = fixture.store();
    let summary = Indexer::new(fixture.config(2, 1), Arc::new(ScriptedEngine::default()))
        .run(Arc::clone(&store))
        .unwrap();

    assert_eq!(summary.stats.failed, 1);
    assert_eq!(summary.stats.committed(), 2);
    assert!(store.get("bad.txt").unwrap().is_none());
    assert!(store.get("good1.txt").unwrap().is_some());
}

#[test]
fn test_directory_job_does_not_block_pool() {
    let fixture = Fixture::new(&[("dir/file.txt", "content")]);
    let config = fixture.config(1, 1);
    let pool = IndexingWorkerPool::start(
        &config,
        Arc::new(ScriptedEngine::default()),
        fixture.store(),
    )
    .unwrap();

    pool.submit(IndexJob::new(fixture.data.path().join("dir"), "dir"))
        .unwrap();
    pool.submit(IndexJob::new(
        fixture.data.path().join("dir/file.txt"),
        "dir/file.txt",
    ))
    .unwrap();
    pool.wait();

    let stats = pool.finish().unwrap();
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.identified, 1);
}

#[test]
fn test_missing_file_reported_as_failure() {
    let fixture = Fixture::new(&[]);
    let config = fixture.config(2, 1);
    let store = fixture.store();
    let pool = IndexingWorkerPool::start(
        &config,
        Arc::new(ScriptedEngine::default()),
        Arc::clone(&store),
    )
    .unwrap();

    pool.submit(IndexJob::new(fixture.data.path().join("ghost"), "ghost"))
        .unwrap();
    let stats = pool.finish().unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(store.count_records("").unwrap(), 0);
}

#[test]
fn test_missing_root_is_error() {
    let fixture = Fixture::new(&[]);
    let config = IndexConfig::builder()
        .root(fixture.data.path().join("absent"))
        .started_at(1i64)
        .build()
        .unwrap();
    let result = Indexer::new(config, Arc::new(ScriptedEngine::default())).run(fixture.store());
    assert!(result.is_err());
}
