//! Core types for identifier.
//!
//! This crate provides the data model shared by the indexing pipeline and the
//! reporting commands: persisted index records, folder descriptors, the
//! in-memory path tree with its cleaning rules, and configuration.

mod clean;
mod config;
mod error;
mod paths;
mod record;
mod tree;

pub use clean::{ClearRule, Replacement, clean_segment};
pub use config::{
    AiSettings, AppConfig, DEFAULT_MODEL, IndexConfig, IndexConfigBuilder, IndexerSettings,
    LogSettings,
};
pub use error::{ConfigError, WalkError};
pub use paths::{modified_secs, relative_slash_path, resolve_full_path, to_slash};
pub use record::{
    AI_PREFIX, ChecksumAlgorithm, FILE_PREFIX, FolderDescriptor, Identification, IndexRecord,
    Person, ai_key, file_key,
};
pub use tree::{
    ClearIter, FindBasename, FindDirname, NodeId, PathNode, PathTree, PostOrder, Rename,
    SubtreeStats,
};
