//! Directory walking for identifier.
//!
//! This crate walks directory trees with jwalk. It is used two ways:
//!
//! - **Path trees** for the clearpath, files and folders commands, built by
//!   [`JwalkWalker::build_tree`] in one full walk
//! - **File enumeration** feeding the indexing pipeline, via
//!   [`JwalkWalker::for_each_file`]
//!
//! Hidden entries are always included and siblings are visited in sorted
//! order.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use identifier_scan::JwalkWalker;
//!
//! let tree = JwalkWalker::new().build_tree(Path::new("/path/to/archive")).unwrap();
//! let stats = tree.subtree_stats(tree.root());
//! println!("{} files, {} bytes", stats.files, stats.bytes);
//! ```

mod progress;
mod walker;

pub use progress::ScanProgress;
pub use walker::{FileEntry, JwalkWalker};

// Re-export core types for convenience
pub use identifier_core::{PathTree, WalkError};
