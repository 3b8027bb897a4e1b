//! AI folder descriptions for identifier.
//!
//! A description run sends the list of indexed files under a prefix to a
//! language model, asks it to fill in one [`FolderDescriptor`] per folder and
//! stores the answers next to the index records. Stored descriptors can be
//! exported into an RO-Crate metadata document.
//!
//! [`FolderDescriptor`]: identifier_core::FolderDescriptor

mod describe;
mod error;
mod prompt;
mod rocrate;
mod service;

pub use describe::{
    describe_folders, export_ro_crate, list_descriptors, model_key, ro_crate_path,
};
pub use error::AiError;
pub use prompt::{
    DEFAULT_QUERY, DescriptionContext, compose_query, extract_json, load_query,
    parse_descriptors, resolve_api_key, resolve_api_key_with,
};
pub use rocrate::{Element, METADATA_FILE, Reference, RoCrate, StringOrList, folder_id};
pub use service::{DescriptionService, Driver, HttpDescriptionService, ModelSpec};
