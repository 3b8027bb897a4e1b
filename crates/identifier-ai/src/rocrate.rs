//! RO-Crate metadata documents.
//!
//! Only the parts of the JSON-LD graph needed to attach folder descriptions
//! are modelled. Everything else on an element is kept in [`Element::extra`]
//! and written back unchanged.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};

use identifier_core::FolderDescriptor;

use crate::error::AiError;

/// File name of the metadata document inside a crate.
pub const METADATA_FILE: &str = "ro-crate-metadata.json";

const CONTEXT: &str = "https://w3id.org/ro/crate/1.1/context";
const PROFILE: &str = "https://w3id.org/ro/crate/1.1";
const ROOT_ID: &str = "./";

/// A single value or a list of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Self::One(s) => s == value,
            Self::Many(list) => list.iter().any(|s| s == value),
        }
    }
}

impl Default for StringOrList {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

/// A link to another graph element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "@id")]
    pub id: String,
}

/// A node of the `@graph`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type", default)]
    pub kind: StringOrList,
    #[serde(
        rename = "hasPart",
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub has_part: Vec<Reference>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub about: Vec<Reference>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Element {
    /// A `Dataset` element for a folder.
    pub fn dataset(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: StringOrList::One("Dataset".to_string()),
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    /// Link `id` as a part of this element unless it already is.
    pub fn add_part(&mut self, id: &str) {
        if !self.has_part.iter().any(|r| r.id == id) {
            self.has_part.push(Reference { id: id.to_string() });
        }
    }
}

/// An RO-Crate metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoCrate {
    #[serde(rename = "@context")]
    pub context: Value,
    #[serde(rename = "@graph", deserialize_with = "one_or_many")]
    pub graph: Vec<Element>,
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Either<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match Either::deserialize(deserializer)? {
        Either::Many(list) => list,
        Either::One(one) => vec![one],
    })
}

impl Default for RoCrate {
    fn default() -> Self {
        Self::skeleton()
    }
}

impl RoCrate {
    /// A minimal crate: the metadata descriptor and an empty root dataset.
    pub fn skeleton() -> Self {
        let mut descriptor = Element {
            id: METADATA_FILE.to_string(),
            kind: StringOrList::One("CreativeWork".to_string()),
            about: vec![Reference {
                id: ROOT_ID.to_string(),
            }],
            ..Element::default()
        };
        descriptor
            .extra
            .insert("conformsTo".to_string(), json!({ "@id": PROFILE }));
        Self {
            context: Value::String(CONTEXT.to_string()),
            graph: vec![descriptor, Element::dataset(ROOT_ID, "", "")],
        }
    }

    /// Read `path`, or start from [`RoCrate::skeleton`] if it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self, AiError> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "creating new RO-Crate");
                return Ok(Self::skeleton());
            }
            Err(e) => return Err(AiError::io(path, e)),
        };
        serde_json::from_slice(&data).map_err(|e| AiError::RoCrate {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Write the document pretty-printed.
    pub fn save(&self, path: &Path) -> Result<(), AiError> {
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data).map_err(|e| AiError::io(path, e))
    }

    pub fn get(&self, id: &str) -> Option<&Element> {
        self.graph.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.graph.iter_mut().find(|e| e.id == id)
    }

    /// Id of the root dataset, as named by the metadata descriptor.
    pub fn root_id(&self) -> Option<&str> {
        self.get(METADATA_FILE)
            .and_then(|d| d.about.first())
            .map(|r| r.id.as_str())
    }

    /// Add `element` to the graph.
    ///
    /// An existing element with the same id gets its name and description
    /// updated, or is swapped out entirely when `replace` is set. A new
    /// element is linked from its parent folder when that is in the graph,
    /// otherwise from the root dataset.
    pub fn add_element(&mut self, element: Element, replace: bool) {
        if let Some(existing) = self.get_mut(&element.id) {
            if replace {
                *existing = element;
            } else {
                existing.name = element.name;
                existing.description = element.description;
            }
            return;
        }

        let parent = parent_id(&element.id)
            .filter(|p| self.get(p).is_some())
            .or_else(|| self.root_id().map(str::to_string))
            .filter(|p| *p != element.id);
        if let Some(parent) = parent {
            if let Some(parent) = self.get_mut(&parent) {
                parent.add_part(&element.id);
            }
        }
        self.graph.push(element);
    }

    /// Turn folder descriptors into `Dataset` elements, parents first.
    /// A descriptor for the archive root updates the root dataset.
    pub fn merge_descriptors(&mut self, descriptors: &[FolderDescriptor]) -> usize {
        let mut elements: Vec<Element> = descriptors
            .iter()
            .map(|d| Element::dataset(folder_id(&d.folder), d.title.as_str(), d.description.as_str()))
            .collect();
        elements.sort_by(|a, b| a.id.len().cmp(&b.id.len()).then_with(|| a.id.cmp(&b.id)));

        let count = elements.len();
        for element in elements {
            self.add_element(element, false);
        }
        count
    }
}

/// Graph id of a folder: its relative path with a trailing slash.
pub fn folder_id(folder: &str) -> String {
    let trimmed = folder.trim_matches('/');
    if trimmed.is_empty() || trimmed == "." {
        ROOT_ID.to_string()
    } else {
        format!("{trimmed}/")
    }
}

fn parent_id(id: &str) -> Option<String> {
    let trimmed = id.trim_end_matches('/');
    trimmed
        .rsplit_once('/')
        .map(|(parent, _)| format!("{parent}/"))
}
