//! Reports over indexed records.
//!
//! - **Queries** - select records by emptiness, duplicate flag or basename
//! - **Folder statistics** - rebuild the folder hierarchy from records and
//!   total files, folders and bytes per folder
//! - **Format statistics** - count files and bytes per mimetype or PRONOM id
//!
//! ```rust,no_run
//! use identifier_analyze::{FolderAggregator, ReportQuery};
//! use identifier_store::RecordStore;
//!
//! let store = RecordStore::open_read_only("/tmp/identifier-db").unwrap();
//!
//! let query = ReportQuery::builder().duplicates(true).build().unwrap();
//! query
//!     .run(&store, |record| {
//!         println!("{}", record.path);
//!         Ok(false)
//!     })
//!     .unwrap();
//!
//! for row in FolderAggregator::from_store(&store, "").unwrap().rows() {
//!     println!("{:>6} {:>6} {:>12} {}", row.files, row.folders, row.bytes, row.path);
//! }
//! ```

mod folders;
mod formats;
mod query;

pub use folders::{FolderAggregator, FolderRow};
pub use formats::{FormatKey, FormatRow, FormatStats};
pub use query::{ReportQuery, ReportQueryBuilder, ReportQueryBuilderError};
