// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Raumbuch Core
//!
//! STEP/IFC reader built with [nom](https://docs.rs/nom), trimmed to what a
//! room book needs: spaces, the property sets and quantity sets assigned to
//! them, and the scalar values inside.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use raumbuch_core::{IfcDocument, PropertyDefinition};
//!
//! let mut doc = IfcDocument::open(&content)?;
//! for room in doc.rooms() {
//!     for definition in &room.definitions {
//!         if let PropertyDefinition::ScalarPropertySet(pset) = definition {
//!             println!("{:?}: {} properties", room.name, pset.properties.len());
//!         }
//!     }
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support for [`ScalarValue`]

pub mod attribute;
pub mod decoder;
pub mod document;
pub mod error;
pub mod parser;
pub mod schema;

pub use attribute::{AttributeValue, DecodedEntity};
pub use decoder::{build_entity_index, EntityDecoder, EntityIndex};
pub use document::{
    DefinitionVisitor, IfcDocument, Property, PropertyDefinition, PropertyKind, PropertySet,
    Quantity, QuantityKind, QuantitySet, Room, ScalarValue,
};
pub use error::{Error, Result};
pub use parser::{decode_step_string, parse_entity, parse_file_schema, EntityScanner, Token};
pub use schema::IfcType;
