//! Filesystem mutations for identifier.
//!
//! Renames computed by the clear pass and removals selected by reports. Every
//! operation works below a data root, never fails as a whole because of a
//! single item, and reports an [`OperationComplete`].

mod operation;
mod remove;
mod rename;

pub use operation::{OperationComplete, OperationError, OperationType, resolve_under};
pub use remove::{remove_file, remove_files, remove_folder, remove_folders};
pub use rename::{apply_renames, rename_one, validate_filename};
