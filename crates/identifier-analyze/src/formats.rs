//! Per-format counts and sizes.

use std::collections::BTreeMap;

use serde::Serialize;
use strum::{Display, EnumString};

use identifier_core::IndexRecord;
use identifier_store::{RecordStore, StoreError};

use crate::query::ReportQuery;

/// Record field formats are grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum FormatKey {
    Mimetype,
    Pronom,
}

impl FormatKey {
    fn value<'a>(&self, record: &'a IndexRecord) -> &'a str {
        match self {
            Self::Mimetype => &record.identification.mimetype,
            Self::Pronom => &record.identification.pronom,
        }
    }
}

/// Totals for one format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormatRow {
    pub format: String,
    pub count: u64,
    pub bytes: u64,
}

/// Accumulates file counts and sizes grouped by mimetype or PRONOM id.
#[derive(Debug)]
pub struct FormatStats {
    key: FormatKey,
    rows: BTreeMap<String, FormatRow>,
}

impl FormatStats {
    pub fn new(key: FormatKey) -> Self {
        Self {
            key,
            rows: BTreeMap::new(),
        }
    }

    /// Collect statistics over the records a query selects.
    pub fn from_store(
        store: &RecordStore,
        query: &ReportQuery,
        key: FormatKey,
    ) -> Result<Self, StoreError> {
        let mut stats = Self::new(key);
        query.run(store, |record| {
            stats.add(record);
            Ok(false)
        })?;
        Ok(stats)
    }

    pub fn key(&self) -> FormatKey {
        self.key
    }

    pub fn add(&mut self, record: &IndexRecord) {
        let format = self.key.value(record);
        let row = self
            .rows
            .entry(format.to_string())
            .or_insert_with(|| FormatRow {
                format: format.to_string(),
                ..FormatRow::default()
            });
        row.count += 1;
        row.bytes += record.size;
    }

    /// Rows sorted by format name.
    pub fn rows(&self) -> impl Iterator<Item = &FormatRow> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
