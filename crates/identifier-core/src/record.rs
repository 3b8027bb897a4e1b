//! Persisted record types and key namespaces.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Key prefix for index records.
pub const FILE_PREFIX: &str = "file:";

/// Key prefix for folder descriptors.
pub const AI_PREFIX: &str = "ai:";

/// Store key of the record for a relative path.
pub fn file_key(path: &str) -> String {
    format!("{FILE_PREFIX}{path}")
}

/// Store key of the folder descriptor produced by a model.
pub fn ai_key(model: &str, folder: &str) -> String {
    format!("{AI_PREFIX}{model}:{folder}")
}

/// Checksum algorithms understood by the identification engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Sha256,
    Sha512,
    Blake3,
}

/// Result of identifying one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identification {
    #[serde(default)]
    pub mimetype: String,
    /// PRONOM format registry id, empty when unknown.
    #[serde(default)]
    pub pronom: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub subtype: String,
    #[serde(default)]
    pub size: u64,
    /// Hex digests keyed by algorithm name.
    #[serde(default)]
    pub checksum: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub width: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub height: u64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub duration: u64,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

impl Identification {
    /// Digest for one algorithm, if computed.
    pub fn checksum_for(&self, algorithm: ChecksumAlgorithm) -> Option<&str> {
        self.checksum.get(&algorithm.to_string()).map(String::as_str)
    }
}

/// Metadata stored for every indexed file, keyed by `file:<path>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Slash separated path relative to the indexing root.
    pub path: String,
    pub folder: String,
    pub basename: String,
    pub size: u64,
    /// Seconds since the epoch.
    #[serde(rename = "lastmod")]
    pub last_modified: i64,
    /// Start of the run that last saw this file.
    #[serde(rename = "lastseen")]
    pub last_seen: i64,
    pub duplicate: bool,
    #[serde(rename = "indexer")]
    pub identification: Identification,
}

impl IndexRecord {
    /// Build a record, deriving `folder` and `basename` from `path`.
    ///
    /// Files directly below the root get the folder `"."`.
    pub fn new(
        path: impl Into<String>,
        size: u64,
        last_modified: i64,
        last_seen: i64,
        identification: Identification,
    ) -> Self {
        let path = path.into();
        let (folder, basename) = split_path(&path);
        Self {
            folder,
            basename,
            path,
            size,
            last_modified,
            last_seen,
            duplicate: false,
            identification,
        }
    }

    /// Store key of this record.
    pub fn key(&self) -> String {
        file_key(&self.path)
    }

    /// The sha512 digest used for duplicate detection.
    pub fn checksum(&self) -> Option<&str> {
        self.identification.checksum_for(ChecksumAlgorithm::Sha512)
    }

    /// Whether a cached record still describes the file on disk.
    pub fn matches_stat(&self, size: u64, last_modified: i64) -> bool {
        self.size == size && self.last_modified == last_modified
    }
}

fn split_path(path: &str) -> (String, String) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) => ("/".to_string(), trimmed[1..].to_string()),
        Some(idx) => (trimmed[..idx].to_string(), trimmed[idx + 1..].to_string()),
        None => (".".to_string(), trimmed.to_string()),
    }
}

/// A person named in a folder description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Person {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Role")]
    pub role: String,
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.role.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} [{}]", self.name, self.role)
        }
    }
}

/// Descriptive metadata generated for a folder, keyed by `ai:<model>:<folder>`.
///
/// Field names are matched case-insensitively against what language models
/// tend to return (`Folder`, `folder`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolderDescriptor {
    #[serde(alias = "Folder")]
    pub folder: String,
    #[serde(alias = "Title")]
    pub title: String,
    #[serde(alias = "Description")]
    pub description: String,
    #[serde(alias = "Place")]
    pub place: String,
    #[serde(alias = "Date")]
    pub date: String,
    #[serde(alias = "Tags")]
    pub tags: Vec<String>,
    #[serde(alias = "Persons")]
    pub persons: Vec<Person>,
    #[serde(alias = "Institutions")]
    pub institutions: Vec<String>,
}

impl FolderDescriptor {
    /// An empty descriptor for a folder, to be filled in by a model.
    pub fn stub(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            ..Self::default()
        }
    }
}
