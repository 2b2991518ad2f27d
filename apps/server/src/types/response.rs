// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Response types for API endpoints.

use raumbuch_processing::{AllowListEntry, DisplayTable, ProcessingStats};
use serde::{Deserialize, Serialize};

/// Room book preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResponse {
    /// Name of the uploaded model
    pub file_name: String,
    /// Name the xlsx download will carry
    pub report_file_name: String,
    /// Confirmation naming the model
    pub message: String,
    /// Cache key of this document and allow-list
    pub cache_key: String,
    /// Report with unique column labels
    pub table: PreviewTable,
    pub stats: ProcessingStats,
    /// Served from cache
    #[serde(default)]
    pub from_cache: bool,
}

/// Table part of a preview. Cells are numbers, strings, booleans or null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl PreviewTable {
    pub fn from_display(table: &DisplayTable) -> Result<Self, serde_json::Error> {
        let rows = table
            .rows
            .iter()
            .map(|row| row.iter().map(serde_json::to_value).collect())
            .collect::<Result<_, _>>()?;
        Ok(Self {
            columns: table.columns.clone(),
            rows,
        })
    }
}

/// Configured allow-list.
#[derive(Debug, Clone, Serialize)]
pub struct AllowListResponse {
    pub count: usize,
    pub fingerprint: String,
    pub entries: Vec<AllowListEntry>,
}
