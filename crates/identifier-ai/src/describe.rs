//! Folder description runs and RO-Crate export over the record store.

use std::path::{Path, PathBuf};

use identifier_core::FolderDescriptor;
use identifier_store::RecordStore;

use crate::error::AiError;
use crate::prompt::{DescriptionContext, parse_descriptors};
use crate::rocrate::{METADATA_FILE, RoCrate};
use crate::service::DescriptionService;

/// Store namespace for a model's descriptors.
pub fn model_key(model: &str) -> String {
    model.to_lowercase()
}

/// Describe every folder that has records under `prefix` and store the
/// answers under `ai:<model>:<folder>`.
///
/// Answers for folders the model was not asked about are stored as well.
/// An empty prefix selection sends nothing and returns no descriptors.
pub fn describe_folders(
    service: &dyn DescriptionService,
    store: &RecordStore,
    model: &str,
    prefix: &str,
    query: &str,
) -> Result<Vec<FolderDescriptor>, AiError> {
    let context = DescriptionContext::from_store(store, prefix)?;
    if context.is_empty() {
        tracing::warn!(prefix, "no records to describe");
        return Ok(Vec::new());
    }
    tracing::info!(
        prefix,
        files = context.files,
        folders = context.stubs.len(),
        "requesting folder descriptions"
    );

    let answer = service.describe(query, &context.documents()?)?;
    let descriptors: Vec<_> = parse_descriptors(&answer)?
        .into_iter()
        .filter(|d| !d.folder.is_empty())
        .collect();

    store.put_descriptors(&model_key(model), &descriptors)?;
    tracing::info!(stored = descriptors.len(), "folder descriptions stored");
    Ok(descriptors)
}

/// Stored descriptors of a model whose folder starts with `prefix`.
pub fn list_descriptors(
    store: &RecordStore,
    model: &str,
    prefix: &str,
) -> Result<Vec<FolderDescriptor>, AiError> {
    let mut descriptors = Vec::new();
    store.scan_descriptors(&model_key(model), prefix, |d| {
        descriptors.push(d.clone());
        Ok(false)
    })?;
    Ok(descriptors)
}

/// Location of the metadata document for `data/prefix`.
pub fn ro_crate_path(data: &Path, prefix: &str) -> PathBuf {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        data.join(METADATA_FILE)
    } else {
        data.join(prefix).join(METADATA_FILE)
    }
}

/// Merge stored descriptors into the crate's metadata document and write it.
/// Returns the document path and the number of descriptors merged.
pub fn export_ro_crate(
    store: &RecordStore,
    model: &str,
    prefix: &str,
    data: &Path,
) -> Result<(PathBuf, usize), AiError> {
    let path = ro_crate_path(data, prefix);
    let mut ro_crate = RoCrate::load_or_create(&path)?;
    let descriptors = list_descriptors(store, model, prefix)?;
    let merged = ro_crate.merge_descriptors(&descriptors);
    ro_crate.save(&path)?;
    tracing::info!(path = %path.display(), merged, "RO-Crate written");
    Ok((path, merged))
}
