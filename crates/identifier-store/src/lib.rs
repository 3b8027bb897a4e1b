//! Persistent storage for identifier.
//!
//! [`RecordStore`] keeps index records and AI folder descriptors in an
//! embedded RocksDB database. Keys are ordered, so every listing is a prefix
//! scan in path order.
//!
//! ```rust,no_run
//! use identifier_store::RecordStore;
//!
//! let store = RecordStore::open_read_only("/var/lib/identifier/db").unwrap();
//! store
//!     .scan_records("payload/", |record| {
//!         println!("{} {}", record.size, record.path);
//!         Ok(false)
//!     })
//!     .unwrap();
//! ```

mod error;
mod store;

pub use error::{StoreError, VisitError};
pub use store::{DELETE_BATCH_SIZE, OpenMode, RecordStore, ScanSummary};
