use std::fs;
use std::sync::Mutex;

use identifier_ai::{
    AiError, DescriptionService, RoCrate, describe_folders, export_ro_crate, list_descriptors,
};
use identifier_core::{Identification, IndexRecord};
use identifier_store::RecordStore;
use tempfile::TempDir;

/// Answers with a fixed text and remembers what it was asked.
struct ScriptedService {
    answer: String,
    seen: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedService {
    fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl DescriptionService for ScriptedService {
    fn describe(&self, query: &str, context: &[String]) -> Result<String, AiError> {
        self.seen
            .lock()
            .unwrap()
            .push((query.to_string(), context.to_vec()));
        Ok(self.answer.clone())
    }
}

fn seeded_store(dir: &TempDir) -> RecordStore {
    let store = RecordStore::open_read_write(dir.path().join("db")).unwrap();
    for (path, mimetype, size) in [
        ("letters/1901/a.pdf", "application/pdf", 100),
        ("letters/1901/b.pdf", "application/pdf", 200),
        ("letters/index.txt", "text/plain", 10),
        ("photos/x.png", "image/png", 5000),
    ] {
        let ident = Identification {
            mimetype: mimetype.to_string(),
            ..Default::default()
        };
        store
            .put(&IndexRecord::new(path, size, 0, 0, ident))
            .unwrap();
    }
    store
}

const ANSWER: &str = r#"Sure, here are the descriptions:
```json
[
  {"Folder": "letters", "Title": "Letters", "Description": "Correspondence", "Persons": [{"Name": "Ada", "Role": "sender"}]},
  {"folder": "letters/1901", "title": "Letters of 1901", "description": "One year", "date": "1901"},
  {"folder": "", "title": "ignored"}
]
```"#;

#[test]
fn test_describe_sends_context_and_stores_answers() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let service = ScriptedService::new(ANSWER);

    let stored = describe_folders(&service, &store, "Google-Gemini-Test", "letters/", "describe").unwrap();
    assert_eq!(stored.len(), 2);

    let seen = service.seen.lock().unwrap();
    let (query, context) = &seen[0];
    assert_eq!(query, "describe");
    assert_eq!(context.len(), 2);
    assert!(context[0].starts_with("CSV file (first row contains column headers):\nfolder,filename,mimetype,pronom,type,subtype,size (bytes)\n"));
    assert!(context[0].contains("letters/1901,a.pdf,application/pdf,,,,100"));
    assert!(!context[0].contains("photos"));
    assert!(context[1].starts_with("JSON file:\n"));
    assert!(context[1].contains("\"letters/1901\""));
    assert!(context[1].contains("\"letters\""));

    let listed = list_descriptors(&store, "google-gemini-test", "letters").unwrap();
    let folders: Vec<_> = listed.iter().map(|d| d.folder.as_str()).collect();
    assert_eq!(folders, vec!["letters", "letters/1901"]);
    assert_eq!(listed[0].persons[0].to_string(), "Ada [sender]");
    assert_eq!(listed[1].date, "1901");
}

#[test]
fn test_describe_without_json_fails() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let service = ScriptedService::new("I cannot help with that.");

    let result = describe_folders(&service, &store, "openai-gpt-4o", "", "q");
    assert!(matches!(result, Err(AiError::NoJson { .. })));
    assert!(list_descriptors(&store, "openai-gpt-4o", "").unwrap().is_empty());
}

#[test]
fn test_describe_empty_selection_skips_service() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    let service = ScriptedService::new(ANSWER);

    let stored = describe_folders(&service, &store, "openai-gpt-4o", "nothing/", "q").unwrap();
    assert!(stored.is_empty());
    assert!(service.seen.lock().unwrap().is_empty());
}

#[test]
fn test_ro_crate_export_nests_folders() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    describe_folders(&ScriptedService::new(ANSWER), &store, "openai-gpt-4o", "", "q").unwrap();

    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    let (path, merged) = export_ro_crate(&store, "openai-gpt-4o", "", &data).unwrap();
    assert_eq!(merged, 2);
    assert_eq!(path, data.join("ro-crate-metadata.json"));

    let ro_crate = RoCrate::load_or_create(&path).unwrap();
    let root = ro_crate.get("./").unwrap();
    assert_eq!(root.has_part.len(), 1);
    assert_eq!(root.has_part[0].id, "letters/");

    let letters = ro_crate.get("letters/").unwrap();
    assert_eq!(letters.name, "Letters");
    assert_eq!(letters.has_part[0].id, "letters/1901/");
    assert_eq!(ro_crate.get("letters/1901/").unwrap().description, "One year");
}

#[test]
fn test_ro_crate_export_keeps_existing_document() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);
    describe_folders(&ScriptedService::new(ANSWER), &store, "openai-gpt-4o", "", "q").unwrap();

    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    let existing = r#"{
  "@context": ["https://w3id.org/ro/crate/1.1/context", {"local": "https://example.org/"}],
  "@graph": [
    {"@id": "ro-crate-metadata.json", "@type": "CreativeWork", "about": {"@id": "./"}},
    {"@id": "./", "@type": "Dataset", "name": "Archive", "license": "CC-BY-4.0"},
    {"@id": "letters/", "@type": "Dataset", "name": "old name", "keywords": "mail"}
  ]
}"#;
    fs::write(data.join("ro-crate-metadata.json"), existing).unwrap();

    let (path, _) = export_ro_crate(&store, "openai-gpt-4o", "", &data).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();

    assert_eq!(value["@context"][1]["local"], "https://example.org/");
    let graph = value["@graph"].as_array().unwrap();
    assert_eq!(graph.len(), 4);
    assert_eq!(graph[1]["license"], "CC-BY-4.0");
    assert_eq!(graph[2]["name"], "Letters");
    assert_eq!(graph[2]["keywords"], "mail");
    assert_eq!(graph[2]["hasPart"][0]["@id"], "letters/1901/");
}
