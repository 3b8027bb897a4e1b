//! Query text, context documents and answer parsing.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use identifier_core::FolderDescriptor;
use identifier_store::RecordStore;

use crate::error::AiError;

/// Query sent when none is configured.
pub const DEFAULT_QUERY: &str = "\
You are an archivist describing the folders of a digital archive. \
The attached CSV file lists every file with its folder, name, format and size. \
The attached JSON file contains one entry per folder. \
Fill in title, description, place, date, tags, persons (with name and role) \
and institutions for every entry, using only information that can be derived \
from file and folder names. Leave fields empty when nothing can be derived. \
Answer with the completed JSON list only.";

const CSV_HEADER: [&str; 7] = [
    "folder",
    "filename",
    "mimetype",
    "pronom",
    "type",
    "subtype",
    "size (bytes)",
];

fn json_payload() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)^[^{\[]*([{\[].*[}\]])[^}\]]*$").expect("valid JSON payload pattern")
    })
}

fn env_placeholder() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"%%([A-Z0-9_]+)%%").expect("valid placeholder pattern"))
}

/// Replace an `%%NAME%%` API key with the environment variable `NAME`.
pub fn resolve_api_key(value: &str) -> Result<String, AiError> {
    resolve_api_key_with(value, |name| std::env::var(name).ok())
}

/// Like [`resolve_api_key`] with a custom variable lookup.
pub fn resolve_api_key_with<F>(value: &str, lookup: F) -> Result<String, AiError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(captures) = env_placeholder().captures(value) else {
        return Ok(value.to_string());
    };
    let name = &captures[1];
    lookup(name).ok_or_else(|| AiError::MissingApiKey {
        name: name.to_string(),
    })
}

/// Read `value` from disk when it names an existing file, else use it as is.
pub fn load_query(value: &str) -> Result<String, AiError> {
    let path = Path::new(value);
    if value.is_empty() || !path.is_file() {
        return Ok(value.to_string());
    }
    fs::read_to_string(path).map_err(|e| AiError::io(path, e))
}

/// Put `additional` in front of `query`, separated by a blank line.
pub fn compose_query(query: &str, additional: &str) -> String {
    if additional.trim().is_empty() {
        query.to_string()
    } else {
        format!("{additional}\n\n{query}")
    }
}

/// Documents attached to a description request.
#[derive(Debug, Clone, Default)]
pub struct DescriptionContext {
    /// One CSV row per indexed file.
    pub csv: String,
    /// One empty descriptor per folder, sorted by folder.
    pub stubs: Vec<FolderDescriptor>,
    pub files: u64,
}

impl DescriptionContext {
    /// Collect the file table and folder stubs for records under `prefix`.
    pub fn from_store(store: &RecordStore, prefix: &str) -> Result<Self, AiError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;

        let mut folders = BTreeSet::new();
        let mut files = 0;
        let mut row_error = None;
        store.scan_records(prefix, |record| {
            let ident = &record.identification;
            let size = record.size.to_string();
            if let Err(e) = writer.write_record([
                record.folder.as_str(),
                record.basename.as_str(),
                ident.mimetype.as_str(),
                ident.pronom.as_str(),
                ident.kind.as_str(),
                ident.subtype.as_str(),
                size.as_str(),
            ]) {
                row_error = Some(e);
                return Ok(false);
            }
            folders.insert(record.folder.clone());
            files += 1;
            Ok(false)
        })?;
        if let Some(e) = row_error {
            return Err(e.into());
        }

        let data = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;
        Ok(Self {
            csv: String::from_utf8_lossy(&data).into_owned(),
            stubs: folders.into_iter().map(FolderDescriptor::stub).collect(),
            files,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.files == 0
    }

    /// The documents in the order they are attached to the query.
    pub fn documents(&self) -> Result<Vec<String>, AiError> {
        let stubs = serde_json::to_string_pretty(&self.stubs)?;
        Ok(vec![
            format!("CSV file (first row contains column headers):\n{}", self.csv),
            format!("JSON file:\n{stubs}"),
        ])
    }
}

/// The JSON part of a model answer, dropping any prose or code fences around it.
pub fn extract_json(text: &str) -> Option<&str> {
    json_payload()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<FolderDescriptor>),
    One(FolderDescriptor),
}

/// Parse the descriptors contained in a model answer.
pub fn parse_descriptors(text: &str) -> Result<Vec<FolderDescriptor>, AiError> {
    let json = extract_json(text).ok_or_else(|| AiError::NoJson {
        response: text.to_string(),
    })?;
    let descriptors = match serde_json::from_str(json)? {
        OneOrMany::Many(list) => list,
        OneOrMany::One(one) => vec![one],
    };
    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_api_key() {
        let lookup = |name: &str| (name == "GEMINI_API_KEY").then(|| "secret".to_string());
        assert_eq!(resolve_api_key_with("%%GEMINI_API_KEY%%", lookup).unwrap(), "secret");
        assert_eq!(resolve_api_key_with("plain-key", lookup).unwrap(), "plain-key");
        assert!(matches!(
            resolve_api_key_with("%%OTHER%%", lookup),
            Err(AiError::MissingApiKey { name }) if name == "OTHER"
        ));
    }

    #[test]
    fn test_compose_query() {
        assert_eq!(compose_query("q", ""), "q");
        assert_eq!(compose_query("q", "context"), "context\n\nq");
    }

    #[test]
    fn test_load_query_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("query.txt");
        fs::write(&file, "from file").unwrap();
        assert_eq!(load_query(file.to_str().unwrap()).unwrap(), "from file");
        assert_eq!(load_query("inline query").unwrap(), "inline query");
    }

    #[test]
    fn test_extract_json() {
        let answer = "Here you go:\n```json\n[{\"folder\": \"a\"}]\n```\nDone.";
        assert_eq!(extract_json(answer), Some("[{\"folder\": \"a\"}]"));
        assert_eq!(extract_json("{\"a\": {\"b\": 1}}"), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(extract_json("no payload"), None);
    }

    #[test]
    fn test_parse_descriptors() {
        let list = parse_descriptors("```[{\"Folder\":\"a\",\"Title\":\"A\"},{\"folder\":\"b\"}]```").unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].title, "A");
        assert_eq!(list[1].folder, "b");

        let one = parse_descriptors("{\"folder\":\"c\",\"tags\":[\"x\"]}").unwrap();
        assert_eq!(one[0].tags, vec!["x"]);

        assert!(matches!(parse_descriptors("sorry"), Err(AiError::NoJson { .. })));
    }
}
