// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Raumbuch Processing
//!
//! Turns an IFC model into a room book: one row per `IfcSpace`, one column
//! per allow-listed property plus the net floor area.
//!
//! ```rust,ignore
//! use raumbuch_processing::{export, process, AllowListIndex};
//!
//! let allow_list = AllowListIndex::load(Path::new("Raumbuch_Attributenliste_IFC.xlsx"))?;
//! let raumbuch = process(&content, &allow_list)?;
//! let xlsx = export::write_xlsx(&raumbuch.table)?;
//! ```

pub mod allow_list;
pub mod attributes;
pub mod disambiguate;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod projection;
pub mod quantities;
pub mod table;

pub use allow_list::{combined_key, AllowListEntry, AllowListIndex, AllowListTable};
pub use attributes::{AttributeExtractor, RoomAttributeRow};
pub use disambiguate::{disambiguate, DisplayTable};
pub use error::{Error, Result};
pub use pipeline::{process, report_file_name, success_message, ProcessingStats, Raumbuch};
pub use projection::{ColumnProjection, ColumnSource, ColumnSpec, AREA_LABEL, LAUFNUMMER};
pub use quantities::{QuantityExtractor, RoomQuantityRow};
pub use table::{assemble, AssemblyStats, Cell, FinalTable, TableAssembler};

pub use raumbuch_core::ScalarValue;
