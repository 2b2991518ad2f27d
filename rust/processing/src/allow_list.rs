// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Allow-list of (property set, property) pairs and their report labels.
//!
//! The allow-list is a table with the fixed headers `PSet` and `Property`
//! and an optional `Label` column. Every lookup goes through the combined
//! key `PSet__Property`, so matching an attribute is a single hash probe.

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Header of the property set column.
pub const GROUP_HEADER: &str = "PSet";
/// Header of the property column.
pub const ATTRIBUTE_HEADER: &str = "Property";
/// Header of the optional output label column.
pub const LABEL_HEADER: &str = "Label";
/// Separator between group and attribute in a combined key.
pub const KEY_SEPARATOR: &str = "__";

/// Build the combined key `group__attribute` from trimmed parts.
pub fn combined_key(group: &str, attribute: &str) -> String {
    format!("{}{}{}", group.trim(), KEY_SEPARATOR, attribute.trim())
}

/// One allow-listed attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowListEntry {
    pub group: String,
    pub attribute: String,
    pub output_label: String,
}

impl AllowListEntry {
    /// Entry with trimmed fields; the label defaults to the attribute name.
    pub fn new(group: &str, attribute: &str, output_label: Option<&str>) -> Self {
        let attribute = attribute.trim();
        let output_label = output_label
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .unwrap_or(attribute);
        Self {
            group: group.trim().to_string(),
            attribute: attribute.to_string(),
            output_label: output_label.to_string(),
        }
    }

    /// Combined key of this entry
    pub fn key(&self) -> String {
        combined_key(&self.group, &self.attribute)
    }
}

/// Raw allow-list source: a header row and text rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowListTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl AllowListTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Read a spreadsheet (`.xlsx`, `.xlsm`, `.xls`, `.ods`) or `.csv` file.
    pub fn from_path(path: &Path) -> Result<Self> {
        match extension(&path.to_string_lossy()).as_deref() {
            Some("csv") => {
                let file = std::fs::File::open(path).map_err(|e| {
                    Error::config(format!("cannot open {}: {}", path.display(), e))
                })?;
                Self::from_csv_reader(file)
            }
            Some("xlsx" | "xlsm" | "xls" | "xlsb" | "ods") => {
                let workbook = open_workbook_auto(path).map_err(|e| {
                    Error::config(format!("cannot open {}: {}", path.display(), e))
                })?;
                Self::from_workbook(workbook)
            }
            _ => Err(Error::config(format!(
                "unsupported allow-list format: {}",
                path.display()
            ))),
        }
    }

    /// Read an uploaded allow-list; the format follows the file name.
    pub fn from_bytes(bytes: &[u8], file_name: &str) -> Result<Self> {
        match extension(file_name).as_deref() {
            Some("csv") => Self::from_csv_reader(bytes),
            Some("xlsx" | "xlsm" | "xls" | "xlsb" | "ods") => {
                let workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
                    .map_err(|e| Error::config(format!("cannot read {}: {}", file_name, e)))?;
                Self::from_workbook(workbook)
            }
            _ => Err(Error::config(format!(
                "unsupported allow-list format: {}",
                file_name
            ))),
        }
    }

    /// Read CSV with a header row.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| Error::config(format!("reading CSV headers: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (row_no, record) in reader.records().enumerate() {
            let record = record.map_err(|e| Error::config(format!("CSV row {}: {}", row_no + 2, e)))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    /// First worksheet, first row as headers.
    fn from_workbook<RS: Read + Seek>(mut workbook: Sheets<RS>) -> Result<Self> {
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| Error::config("workbook has no worksheet"))?
            .map_err(|e| Error::config(format!("reading worksheet: {}", e)))?;
        Ok(Self::from_range(&range))
    }

    fn from_range(range: &Range<Data>) -> Self {
        let mut rows = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>());
        let headers = rows.next().unwrap_or_default();
        Self {
            headers,
            rows: rows.collect(),
        }
    }
}

fn extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

/// Normalized allow-list with O(1) lookup by combined key.
#[derive(Debug, Clone, Default)]
pub struct AllowListIndex {
    /// Deduplicated entries in source order
    entries: Vec<AllowListEntry>,
    /// Combined keys, parallel to `entries`
    keys: Vec<String>,
    /// Combined key -> position in `entries`
    positions: FxHashMap<String, usize>,
}

impl AllowListIndex {
    /// Build from a raw table. Fails when a required column is missing.
    pub fn build(source: &AllowListTable) -> Result<Self> {
        let column = |name: &str| source.headers.iter().position(|h| h.trim() == name);

        let group_col = column(GROUP_HEADER).ok_or_else(|| {
            Error::config(format!("allow-list is missing the '{}' column", GROUP_HEADER))
        })?;
        let attribute_col = column(ATTRIBUTE_HEADER).ok_or_else(|| {
            Error::config(format!(
                "allow-list is missing the '{}' column",
                ATTRIBUTE_HEADER
            ))
        })?;
        let label_col = column(LABEL_HEADER);

        let mut entries = Vec::with_capacity(source.rows.len());
        for (row_no, row) in source.rows.iter().enumerate() {
            let cell = |i: usize| row.get(i).map(|s| s.trim()).unwrap_or("");
            let group = cell(group_col);
            let attribute = cell(attribute_col);

            if group.is_empty() || attribute.is_empty() {
                // +2: header row and 1-based numbering
                tracing::warn!(row = row_no + 2, "Skipping allow-list row without PSet or Property");
                continue;
            }

            entries.push(AllowListEntry::new(group, attribute, label_col.map(cell)));
        }

        if entries.is_empty() {
            tracing::warn!("Allow-list has no usable rows; only Laufnummer and area will be reported");
        }

        Ok(Self::from_entries(entries))
    }

    /// Read and build from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let index = Self::build(&AllowListTable::from_path(path)?)?;
        tracing::info!(path = %path.display(), entries = index.len(), "Loaded allow-list");
        Ok(index)
    }

    /// Build from entries; later duplicates of a pair are dropped.
    pub fn from_entries(entries: impl IntoIterator<Item = AllowListEntry>) -> Self {
        let mut index = Self::default();

        for entry in entries {
            let key = entry.key();
            if index.positions.contains_key(&key) {
                tracing::debug!(key = %key, "Ignoring duplicate allow-list pair");
                continue;
            }
            index.positions.insert(key.clone(), index.entries.len());
            index.keys.push(key);
            index.entries.push(entry);
        }

        index
    }

    /// True if the trimmed pair is allow-listed (case-sensitive).
    pub fn matches(&self, group: &str, attribute: &str) -> bool {
        self.matches_key(&combined_key(group, attribute))
    }

    /// True if the combined key is allow-listed.
    pub fn matches_key(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    /// Output label for a pair.
    pub fn label_for(&self, group: &str, attribute: &str) -> Option<&str> {
        self.label_for_key(&combined_key(group, attribute))
    }

    /// Output label for a combined key.
    pub fn label_for_key(&self, key: &str) -> Option<&str> {
        self.positions
            .get(key)
            .map(|&i| self.entries[i].output_label.as_str())
    }

    /// Combined keys in source row order, without duplicates.
    pub fn ordered_keys(&self) -> &[String] {
        &self.keys
    }

    pub fn entries(&self) -> &[AllowListEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stable content hash, used to key cached reports.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (key, entry) in self.keys.iter().zip(&self.entries) {
            hasher.update(key.as_bytes());
            hasher.update([0u8]);
            hasher.update(entry.output_label.as_bytes());
            hasher.update([0xffu8]);
        }
        hex::encode(hasher.finalize())
    }
}
