// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! One room book run: open the document, extract every room, assemble.

use std::path::Path;

use raumbuch_core::IfcDocument;
use serde::{Deserialize, Serialize};

use crate::allow_list::AllowListIndex;
use crate::attributes::AttributeExtractor;
use crate::disambiguate::{disambiguate, DisplayTable};
use crate::error::Result;
use crate::quantities::QuantityExtractor;
use crate::table::{AssemblyStats, FinalTable, TableAssembler};

/// Run statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub schema_version: Option<String>,
    pub entity_count: usize,
    pub rooms_seen: usize,
    pub sentinel_rows_dropped: usize,
    pub rooms_reported: usize,
    pub attribute_gaps: usize,
    pub missing_quantities: usize,
    pub unparsed_identifiers: usize,
    pub elapsed_ms: u64,
}

impl ProcessingStats {
    fn new(doc: &IfcDocument<'_>, assembly: AssemblyStats, elapsed_ms: u64) -> Self {
        Self {
            schema_version: doc.schema_version().map(str::to_string),
            entity_count: doc.entity_count(),
            rooms_seen: assembly.rooms_seen,
            sentinel_rows_dropped: assembly.sentinel_rows_dropped,
            rooms_reported: assembly.rooms_reported,
            attribute_gaps: assembly.attribute_gaps,
            missing_quantities: assembly.missing_quantities,
            unparsed_identifiers: assembly.unparsed_identifiers,
            elapsed_ms,
        }
    }
}

/// Result of a run: the export table and its preview copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Raumbuch {
    pub table: FinalTable,
    pub display: DisplayTable,
    pub stats: ProcessingStats,
}

/// Build the room book for an IFC document.
///
/// Fails only when the document cannot be opened. Rooms with missing
/// attributes, quantities or identifiers still produce rows.
pub fn process(content: &str, allow_list: &AllowListIndex) -> Result<Raumbuch> {
    let start = std::time::Instant::now();
    tracing::info!(
        content_size = content.len(),
        allow_list_entries = allow_list.len(),
        "Starting room book extraction"
    );

    let mut doc = IfcDocument::open(content)?;
    tracing::debug!(
        schema = doc.schema_version().unwrap_or("unknown"),
        entities = doc.entity_count(),
        spaces = doc.space_count(),
        "Document opened"
    );

    let mut assembler = TableAssembler::new(allow_list);
    for room in doc.rooms() {
        let attributes = AttributeExtractor::extract(&room, allow_list);
        let quantities = QuantityExtractor::extract(&room);
        assembler.push(attributes, quantities);
    }

    let (table, assembly) = assembler.finish();
    let display = disambiguate(&table);
    let stats = ProcessingStats::new(&doc, assembly, start.elapsed().as_millis() as u64);

    tracing::info!(
        rooms_seen = stats.rooms_seen,
        rooms_reported = stats.rooms_reported,
        sentinel_rows_dropped = stats.sentinel_rows_dropped,
        attribute_gaps = stats.attribute_gaps,
        missing_quantities = stats.missing_quantities,
        unparsed_identifiers = stats.unparsed_identifiers,
        elapsed_ms = stats.elapsed_ms,
        "Room book extraction complete"
    );

    Ok(Raumbuch {
        table,
        display,
        stats,
    })
}

/// Download name for the report of an uploaded model:
/// `Gebaeude.ifc` -> `Gebaeude_Raumbuch.xlsx`.
pub fn report_file_name(source_name: &str) -> String {
    let stem = Path::new(source_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "output".to_string());
    format!("{}_Raumbuch.xlsx", stem)
}

/// Confirmation shown after a successful run.
pub fn success_message(source_name: &str) -> String {
    format!(
        "Dein Raumbuch aus dem IFC Modell ({}) wurde erfolgreich exportiert!",
        source_name
    )
}
