//! Species reference table (conservation statuses).
//!
//! The table is a CSV document holding at least the columns `Common Name`,
//! `Latin Name` and `Status`, in any order. It is read whole on load and
//! rewritten whole by the write-back path; other columns and the header
//! order survive the rewrite.

use crate::data::SpeciesMeta;
use crate::error::{Error, Result};
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

const COMMON_NAME: &str = "Common Name";
const LATIN_NAME: &str = "Latin Name";
const STATUS: &str = "Status";

/// One row of the reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRow {
    /// Display name.
    #[serde(rename = "Common Name")]
    pub common_name: String,
    /// Scientific name (join key).
    #[serde(rename = "Latin Name")]
    pub latin_name: String,
    /// Conservation status.
    #[serde(rename = "Status")]
    pub status: String,
}

/// Whether an upsert touched an existing row or appended a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    /// An existing row was updated.
    Update,
    /// A new row was appended.
    Add,
}

impl std::fmt::Display for UpsertAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Update => write!(f, "Update"),
            Self::Add => write!(f, "Add"),
        }
    }
}

/// Header of the table and the positions of the columns we read.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Layout {
    headers: StringRecord,
    common: usize,
    latin: usize,
    status: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            headers: StringRecord::from(vec![COMMON_NAME, LATIN_NAME, STATUS]),
            common: 0,
            latin: 1,
            status: 2,
        }
    }
}

impl Layout {
    fn from_headers(headers: StringRecord, path: &Path) -> Result<Self> {
        let position = |column: &str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| Error::ReferenceColumn {
                    path: path.to_path_buf(),
                    column: column.to_string(),
                })
        };
        Ok(Self {
            common: position(COMMON_NAME)?,
            latin: position(LATIN_NAME)?,
            status: position(STATUS)?,
            headers,
        })
    }

    fn row(&self, record: &StringRecord) -> ReferenceRow {
        let cell = |i: usize| record.get(i).unwrap_or_default().to_string();
        ReferenceRow {
            common_name: cell(self.common),
            latin_name: cell(self.latin),
            status: cell(self.status),
        }
    }

    /// A record shaped like the header, with the known cells set.
    fn record(&self, base: Option<&StringRecord>, row: &ReferenceRow) -> StringRecord {
        (0..self.headers.len())
            .map(|i| {
                if i == self.common {
                    row.common_name.as_str()
                } else if i == self.latin {
                    row.latin_name.as_str()
                } else if i == self.status {
                    row.status.as_str()
                } else {
                    base.and_then(|r| r.get(i)).unwrap_or_default()
                }
            })
            .collect()
    }
}

/// In-memory copy of the reference table, records in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceTable {
    layout: Layout,
    records: Vec<StringRecord>,
}

impl ReferenceTable {
    /// Build a table with the default header from rows.
    pub fn from_rows(rows: Vec<ReferenceRow>) -> Self {
        let layout = Layout::default();
        let records = rows.iter().map(|row| layout.record(None, row)).collect();
        Self { layout, records }
    }

    /// Load the table from a CSV file.
    ///
    /// A missing file yields an empty table; every species then falls
    /// back to the review sentinel.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Reference table {} not found, all species will need review",
                path.display()
            );
            return Ok(Self::default());
        }

        let read_err = |source| Error::ReferenceRead {
            path: path.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(read_err)?;

        let layout = Layout::from_headers(reader.headers().map_err(read_err)?.clone(), path)?;
        let records = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(read_err)?;

        debug!("Loaded {} reference rows from {}", records.len(), path.display());
        Ok(Self { layout, records })
    }

    /// Serialize the table to CSV bytes, header first.
    pub fn to_csv_bytes(&self) -> std::result::Result<Vec<u8>, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.layout.headers)?;
        for record in &self.records {
            writer.write_record(record)?;
        }
        writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }

    /// Write the whole table to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let map_err = |source| Error::ReferenceWrite {
            path: path.to_path_buf(),
            source,
        };
        let bytes = self.to_csv_bytes().map_err(map_err)?;
        std::fs::write(path, bytes).map_err(|e| map_err(csv::Error::from(e)))
    }

    /// Rows in file order.
    pub fn rows(&self) -> Vec<ReferenceRow> {
        self.records.iter().map(|r| self.layout.row(r)).collect()
    }

    /// Set the display name and status of a species, appending a row if absent.
    ///
    /// Matches on the scientific name; only the first matching row is changed.
    pub fn upsert(&mut self, latin_name: &str, common_name: &str, status: &str) -> UpsertAction {
        let row = ReferenceRow {
            common_name: common_name.to_string(),
            latin_name: latin_name.to_string(),
            status: status.to_string(),
        };
        let latin = self.layout.latin;
        match self
            .records
            .iter_mut()
            .find(|r| r.get(latin) == Some(latin_name))
        {
            Some(record) => {
                *record = self.layout.record(Some(&*record), &row);
                UpsertAction::Update
            }
            None => {
                self.records.push(self.layout.record(None, &row));
                UpsertAction::Add
            }
        }
    }

    /// Species metadata, deduplicated by scientific name (first row wins).
    pub fn species_meta(&self) -> Vec<SpeciesMeta> {
        let mut seen = HashSet::new();
        self.rows()
            .into_iter()
            .filter(|row| seen.insert(row.latin_name.clone()))
            .map(|row| SpeciesMeta {
                scientific_name: row.latin_name,
                common_name: row.common_name,
                status: row.status,
            })
            .collect()
    }
}
