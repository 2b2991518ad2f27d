// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Report schema derived from the allow-list alone.
//!
//! The projection fixes which source feeds each output column, the label
//! it is written under and its position. It never looks at room data, so
//! column order is settled before the first room is read.

use serde::Serialize;

use crate::allow_list::AllowListIndex;
use crate::quantities::NET_FLOOR_AREA_KEY;

/// Label of the identifier column
pub const LAUFNUMMER: &str = "Laufnummer";
/// Label of the net floor area column
pub const AREA_LABEL: &str = "Fläche Ist [m²]";

/// Where a column's values come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum ColumnSource {
    /// Room name, parsed as the running number
    RoomName,
    /// Attribute row value under this combined key
    Attribute(String),
    /// Quantity row net floor area
    NetFloorArea,
}

/// One `(source, label, position)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub source: ColumnSource,
    pub label: String,
    pub position: usize,
}

/// Ordered output schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnProjection {
    columns: Vec<ColumnSpec>,
}

impl ColumnProjection {
    /// `[Laufnummer] ++ allow-list labels in row order ++ [area]`.
    ///
    /// An allow-listed `BaseQuantities__NetFloorArea` does not get a column
    /// of its own; the area is always the last column.
    pub fn from_allow_list(allow_list: &AllowListIndex) -> Self {
        let mut sources = Vec::with_capacity(allow_list.len() + 2);
        sources.push((ColumnSource::RoomName, LAUFNUMMER.to_string()));

        for key in allow_list.ordered_keys() {
            if key == NET_FLOOR_AREA_KEY {
                continue;
            }
            let label = allow_list.label_for_key(key).unwrap_or(key.as_str());
            sources.push((ColumnSource::Attribute(key.clone()), label.to_string()));
        }

        sources.push((ColumnSource::NetFloorArea, AREA_LABEL.to_string()));

        let columns = sources
            .into_iter()
            .enumerate()
            .map(|(position, (source, label))| ColumnSpec {
                source,
                label,
                position,
            })
            .collect();

        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Output labels in order (duplicates kept)
    pub fn labels(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.label.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
