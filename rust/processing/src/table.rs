// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Merges per-room extraction results into the report table.

use raumbuch_core::ScalarValue;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::allow_list::AllowListIndex;
use crate::attributes::RoomAttributeRow;
use crate::projection::{ColumnProjection, ColumnSource};
use crate::quantities::RoomQuantityRow;

/// Room name of placeholder spaces that never appear in the report
pub const SENTINEL_NAME: &str = "*";

/// One table cell; `None` is a missing value.
pub type Cell = Option<ScalarValue>;

/// Report table: one row per reported room, labels as exported.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinalTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl FinalTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first column with this label
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    /// Cell by row index and (first matching) column label
    pub fn cell(&self, row: usize, label: &str) -> Option<&ScalarValue> {
        let column = self.column_index(label)?;
        self.rows.get(row)?.get(column)?.as_ref()
    }
}

/// Counters collected while assembling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyStats {
    pub rooms_seen: usize,
    pub sentinel_rows_dropped: usize,
    pub rooms_reported: usize,
    /// Missing cells in allow-listed attribute columns
    pub attribute_gaps: usize,
    /// Reported rooms without a net floor area
    pub missing_quantities: usize,
    /// Reported rooms whose name is not a number
    pub unparsed_identifiers: usize,
}

/// Accumulates attribute and quantity rows, then builds the [`FinalTable`].
pub struct TableAssembler {
    projection: ColumnProjection,
    attribute_rows: Vec<RoomAttributeRow>,
    quantity_rows: Vec<RoomQuantityRow>,
}

impl TableAssembler {
    pub fn new(allow_list: &AllowListIndex) -> Self {
        Self::with_projection(ColumnProjection::from_allow_list(allow_list))
    }

    pub fn with_projection(projection: ColumnProjection) -> Self {
        Self {
            projection,
            attribute_rows: Vec::new(),
            quantity_rows: Vec::new(),
        }
    }

    /// Append one room's results.
    pub fn push(&mut self, attributes: RoomAttributeRow, quantities: RoomQuantityRow) {
        self.attribute_rows.push(attributes);
        self.quantity_rows.push(quantities);
    }

    pub fn extend_attributes(&mut self, rows: impl IntoIterator<Item = RoomAttributeRow>) {
        self.attribute_rows.extend(rows);
    }

    pub fn extend_quantities(&mut self, rows: impl IntoIterator<Item = RoomQuantityRow>) {
        self.quantity_rows.extend(rows);
    }

    pub fn projection(&self) -> &ColumnProjection {
        &self.projection
    }

    /// Project, join, filter and coerce.
    pub fn finish(self) -> (FinalTable, AssemblyStats) {
        let mut stats = AssemblyStats {
            rooms_seen: self.attribute_rows.len(),
            ..Default::default()
        };

        // Join by room id; a repeated id keeps its first area
        let mut areas: FxHashMap<&str, Option<f64>> =
            FxHashMap::with_capacity_and_hasher(self.quantity_rows.len(), Default::default());
        for row in &self.quantity_rows {
            areas
                .entry(row.room_id.as_str())
                .or_insert(row.net_floor_area.map(round2));
        }

        let mut rows = Vec::with_capacity(self.attribute_rows.len());
        for attributes in &self.attribute_rows {
            let area = areas.get(attributes.room_id.as_str()).copied().flatten();

            tracing::debug!(
                room = attributes.room_name.as_deref().unwrap_or(""),
                area = ?area,
                "Laufnummer and net floor area"
            );

            if attributes.room_name.as_deref() == Some(SENTINEL_NAME) {
                stats.sentinel_rows_dropped += 1;
                continue;
            }

            let mut cells = Vec::with_capacity(self.projection.len());
            for column in self.projection.columns() {
                let cell = match &column.source {
                    ColumnSource::RoomName => {
                        let id = attributes.room_name.as_deref().and_then(parse_laufnummer);
                        if id.is_none() {
                            stats.unparsed_identifiers += 1;
                        }
                        id
                    }
                    ColumnSource::Attribute(key) => {
                        let value = attributes.value(key).cloned();
                        if value.is_none() {
                            stats.attribute_gaps += 1;
                        }
                        value
                    }
                    ColumnSource::NetFloorArea => {
                        if area.is_none() {
                            stats.missing_quantities += 1;
                        }
                        area.map(ScalarValue::Real)
                    }
                };
                cells.push(cell);
            }
            rows.push(cells);
        }

        stats.rooms_reported = rows.len();

        let table = FinalTable {
            columns: self.projection.labels(),
            rows,
        };
        (table, stats)
    }
}

/// Assemble the report from complete attribute and quantity tables.
pub fn assemble(
    attribute_rows: Vec<RoomAttributeRow>,
    quantity_rows: Vec<RoomQuantityRow>,
    allow_list: &AllowListIndex,
) -> (FinalTable, AssemblyStats) {
    let mut assembler = TableAssembler::new(allow_list);
    assembler.extend_attributes(attribute_rows);
    assembler.extend_quantities(quantity_rows);
    assembler.finish()
}

/// Room name as a running number. Whole numbers become integers,
/// other finite numbers stay real; anything else is missing.
pub fn parse_laufnummer(name: &str) -> Option<ScalarValue> {
    let name = name.trim();
    if let Ok(n) = name.parse::<i64>() {
        return Some(ScalarValue::Integer(n));
    }

    let value = name.parse::<f64>().ok().filter(|v| v.is_finite())?;
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(ScalarValue::Integer(value as i64))
    } else {
        Some(ScalarValue::Real(value))
    }
}

/// Round to two decimals, ties to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allow_list::AllowListEntry;
    use crate::projection::{AREA_LABEL, LAUFNUMMER};

    fn allow_list() -> AllowListIndex {
        AllowListIndex::from_entries([
            AllowListEntry::new("Pset_A", "Width", Some("Breite")),
            AllowListEntry::new("Pset_A", "Height", Some("Höhe")),
        ])
    }

    fn rows(
        id: &str,
        name: Option<&str>,
        attributes: &[(&str, Option<ScalarValue>)],
        area: Option<f64>,
    ) -> (RoomAttributeRow, RoomQuantityRow) {
        (
            RoomAttributeRow {
                room_id: id.to_string(),
                room_name: name.map(str::to_string),
                attributes: attributes
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            },
            RoomQuantityRow {
                room_id: id.to_string(),
                room_name: name.map(str::to_string),
                net_floor_area: area,
            },
        )
    }

    #[test]
    fn test_parse_laufnummer() {
        assert_eq!(parse_laufnummer("12"), Some(ScalarValue::Integer(12)));
        assert_eq!(parse_laufnummer(" 7 "), Some(ScalarValue::Integer(7)));
        assert_eq!(parse_laufnummer("3.0"), Some(ScalarValue::Integer(3)));
        assert_eq!(parse_laufnummer("1.5"), Some(ScalarValue::Real(1.5)));
        assert_eq!(parse_laufnummer("abc"), None);
        assert_eq!(parse_laufnummer(""), None);
        assert_eq!(parse_laufnummer("NaN"), None);
        assert_eq!(parse_laufnummer("inf"), None);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(14.004), 14.0);
        assert_eq!(round2(14.005_1), 14.01);
        assert_eq!(round2(-2.346), -2.35);
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(1.125), 1.12);
        assert_eq!(round2(10.625), 10.62);
    }

    #[test]
    fn test_assemble_example_row() {
        let mut assembler = TableAssembler::new(&allow_list());
        let (a, q) = rows(
            "g1",
            Some("12"),
            &[
                ("Pset_A__Width", Some(ScalarValue::Real(3.5))),
                ("Pset_A__Height", Some(ScalarValue::Real(2.1))),
            ],
            Some(14.004),
        );
        assembler.push(a, q);

        let (table, stats) = assembler.finish();
        assert_eq!(table.columns, vec![LAUFNUMMER, "Breite", "Höhe", AREA_LABEL]);
        assert_eq!(
            table.rows[0],
            vec![
                Some(ScalarValue::Integer(12)),
                Some(ScalarValue::Real(3.5)),
                Some(ScalarValue::Real(2.1)),
                Some(ScalarValue::Real(14.0)),
            ]
        );
        assert_eq!(stats.rooms_reported, 1);
        assert_eq!(stats.attribute_gaps, 0);
    }

    #[test]
    fn test_sentinel_and_unparsed_rows() {
        let mut assembler = TableAssembler::new(&allow_list());
        for (id, name) in [("g1", Some("*")), ("g2", Some("abc")), ("g3", None), ("g4", Some("*"))] {
            let (a, q) = rows(id, name, &[("Pset_A__Width", Some(ScalarValue::Real(1.0)))], None);
            assembler.push(a, q);
        }

        let (table, stats) = assembler.finish();
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, LAUFNUMMER), None);
        assert_eq!(table.cell(0, "Breite"), Some(&ScalarValue::Real(1.0)));
        assert_eq!(
            stats,
            AssemblyStats {
                rooms_seen: 4,
                sentinel_rows_dropped: 2,
                rooms_reported: 2,
                attribute_gaps: 2,
                missing_quantities: 2,
                unparsed_identifiers: 2,
            }
        );
    }

    #[test]
    fn test_quantities_join_by_room_id() {
        let (a1, q1) = rows("g1", Some("1"), &[], Some(10.0));
        let (a2, q2) = rows("g2", Some("2"), &[], Some(20.0));

        // Quantity table in a different order than the attribute table
        let (table, _) = assemble(vec![a1, a2], vec![q2, q1], &allow_list());
        assert_eq!(table.cell(0, AREA_LABEL), Some(&ScalarValue::Real(10.0)));
        assert_eq!(table.cell(1, AREA_LABEL), Some(&ScalarValue::Real(20.0)));
    }

    #[test]
    fn test_found_without_value_is_missing() {
        let (a, q) = rows("g1", Some("5"), &[("Pset_A__Width", None)], Some(1.0));
        let (table, stats) = assemble(vec![a], vec![q], &allow_list());
        assert_eq!(table.cell(0, "Breite"), None);
        assert_eq!(stats.attribute_gaps, 2);
    }
}
