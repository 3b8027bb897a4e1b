use identifier_analyze::{FolderAggregator, FormatKey, FormatStats, ReportQuery};
use identifier_core::{Identification, IndexRecord};
use identifier_store::RecordStore;
use regex::Regex;
use tempfile::TempDir;

fn record(path: &str, size: u64, mimetype: &str, duplicate: bool) -> IndexRecord {
    let ident = Identification {
        mimetype: mimetype.to_string(),
        ..Default::default()
    };
    let mut record = IndexRecord::new(path, size, 0, 0, ident);
    record.duplicate = duplicate;
    record
}

fn archive_store(dir: &TempDir) -> RecordStore {
    let store = RecordStore::open_read_write(dir.path().join("db")).unwrap();
    let records = [
        record("meta/schemas/mets.xsd", 7193, "application/xml", false),
        record("meta/info.json", 300, "application/json", false),
        record("meta/copy.json", 300, "application/json", true),
        record("payload/image/a.png", 1000, "image/png", false),
        record("payload/image/b.png", 1000, "image/png", true),
        record("payload/empty.txt", 0, "text/plain", false),
        record("payload/notes.tmp", 12, "text/plain", false),
    ];
    for r in &records {
        store.put(r).unwrap();
    }
    store
}

fn selected(store: &RecordStore, query: &ReportQuery) -> Vec<String> {
    let mut paths = Vec::new();
    query
        .run(store, |r| {
            paths.push(r.path.clone());
            Ok(false)
        })
        .unwrap();
    paths
}

#[test]
fn test_query_prefix_and_filters() {
    let dir = TempDir::new().unwrap();
    let store = archive_store(&dir);

    assert_eq!(selected(&store, &ReportQuery::all("meta/")).len(), 3);

    let query = ReportQuery::builder()
        .duplicates(true)
        .build()
        .unwrap();
    assert_eq!(
        selected(&store, &query),
        vec!["meta/copy.json", "payload/image/b.png"]
    );

    let query = ReportQuery::builder()
        .prefix("payload/")
        .empty(true)
        .regex(Regex::new(r"\.tmp$").unwrap())
        .build()
        .unwrap();
    assert_eq!(
        selected(&store, &query),
        vec!["payload/empty.txt", "payload/notes.tmp"]
    );
}

#[test]
fn test_query_removal_drops_only_confirmed_records() {
    let dir = TempDir::new().unwrap();
    let store = archive_store(&dir);

    let query = ReportQuery::builder()
        .duplicates(true)
        .remove(dir.path().join("data"))
        .build()
        .unwrap();
    let summary = query
        .run(&store, |r| Ok(r.path.starts_with("meta/")))
        .unwrap();

    assert_eq!(summary.visited, 7);
    assert_eq!(summary.deleted, 1);
    assert!(store.get("meta/copy.json").unwrap().is_none());
    assert!(store.get("payload/image/b.png").unwrap().is_some());
}

#[test]
fn test_folder_statistics_from_store() {
    let dir = TempDir::new().unwrap();
    let store = archive_store(&dir);

    let aggregator = FolderAggregator::from_store(&store, "").unwrap();
    assert_eq!(aggregator.record_count(), 7);

    let rows = aggregator.rows();
    let meta = rows.iter().find(|r| r.path == "/meta").unwrap();
    assert_eq!((meta.files, meta.folders, meta.bytes), (3, 2, 7793));

    let root = rows.last().unwrap();
    assert_eq!(root.path, "/");
    assert_eq!((root.files, root.folders, root.bytes), (7, 5, 9805));
}

#[test]
fn test_folder_statistics_with_prefix() {
    let dir = TempDir::new().unwrap();
    let store = archive_store(&dir);

    let rows = FolderAggregator::from_store(&store, "payload/image")
        .unwrap()
        .rows();
    let paths: Vec<_> = rows.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["/payload/image", "/payload", "/"]);
    assert_eq!(rows[0].bytes, 2000);
}

#[test]
fn test_format_statistics() {
    let dir = TempDir::new().unwrap();
    let store = archive_store(&dir);

    let stats = FormatStats::from_store(&store, &ReportQuery::all(""), FormatKey::Mimetype).unwrap();
    let rows: Vec<_> = stats
        .rows()
        .map(|r| (r.format.as_str(), r.count, r.bytes))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("application/json", 2, 600),
            ("application/xml", 1, 7193),
            ("image/png", 2, 2000),
            ("text/plain", 2, 12),
        ]
    );

    let query = ReportQuery::builder().duplicates(true).build().unwrap();
    let stats = FormatStats::from_store(&store, &query, FormatKey::Mimetype).unwrap();
    assert_eq!(stats.len(), 2);
}
