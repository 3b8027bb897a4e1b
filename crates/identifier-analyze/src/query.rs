//! Record selection shared by the listing commands.

use std::path::PathBuf;

use derive_builder::Builder;
use regex::Regex;

use identifier_core::IndexRecord;
use identifier_store::{RecordStore, ScanSummary, StoreError, VisitError};

/// Which records a listing selects, and whether the files behind them are
/// removed.
///
/// A record matches when it is empty and `empty` is set, when it is a
/// duplicate and `duplicates` is set, or when `regex` matches its basename.
/// Without any filter every record under `prefix` matches.
#[derive(Debug, Clone, Default, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ReportQuery {
    /// Path prefix; only records below it are scanned.
    #[builder(default)]
    pub prefix: String,

    /// Select zero-byte files.
    #[builder(default)]
    pub empty: bool,

    /// Select files flagged as duplicate.
    #[builder(default)]
    pub duplicates: bool,

    /// Select files whose basename matches.
    #[builder(default, setter(strip_option))]
    pub regex: Option<Regex>,

    /// Data root under which matching files are deleted.
    #[builder(default, setter(strip_option))]
    pub remove: Option<PathBuf>,
}

impl ReportQueryBuilder {
    fn validate(&self) -> Result<(), String> {
        let removing = matches!(self.remove, Some(Some(_)));
        let filtered = self.empty == Some(true)
            || self.duplicates == Some(true)
            || matches!(self.regex, Some(Some(_)));
        if removing && !filtered {
            return Err(
                "Removal needs at least one of empty, duplicates or regex".to_string(),
            );
        }
        if let Some(Some(ref root)) = self.remove {
            if root.as_os_str().is_empty() {
                return Err("Removal needs a data root".to_string());
            }
        }
        Ok(())
    }
}

impl ReportQuery {
    /// Create a new query builder.
    pub fn builder() -> ReportQueryBuilder {
        ReportQueryBuilder::default()
    }

    /// A query listing everything below `prefix`.
    pub fn all(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    pub fn is_filtered(&self) -> bool {
        self.empty || self.duplicates || self.regex.is_some()
    }

    /// Whether a record is selected.
    pub fn matches(&self, record: &IndexRecord) -> bool {
        (self.empty && record.size == 0)
            || (self.duplicates && record.duplicate)
            || self
                .regex
                .as_ref()
                .is_some_and(|re| re.is_match(&record.basename))
            || !self.is_filtered()
    }

    /// Scan the store and hand every selected record to `on_match`.
    ///
    /// `on_match` returns `true` when the record should be dropped from the
    /// store, which happens after the scan.
    pub fn run<F>(&self, store: &RecordStore, mut on_match: F) -> Result<ScanSummary, StoreError>
    where
        F: FnMut(&IndexRecord) -> Result<bool, VisitError>,
    {
        store.scan_records(&self.prefix, |record| {
            if self.matches(record) {
                on_match(record)
            } else {
                Ok(false)
            }
        })
    }
}
