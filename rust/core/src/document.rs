// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC document model - spaces and the property definitions attached to them.
//!
//! [`IfcDocument::open`] indexes a STEP file and the inverse `IsDefinedBy`
//! relation. [`IfcDocument::rooms`] resolves every `IfcSpace` into a [`Room`]
//! whose property definitions are a closed sum type, walked through
//! [`DefinitionVisitor`].

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::attribute::{AttributeValue, DecodedEntity};
use crate::decoder::{build_entity_index, EntityDecoder};
use crate::error::{Error, Result};
use crate::parser::{parse_file_schema, EntityScanner};
use crate::schema::IfcType;

/// Scalar value carried by a single-value property.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ScalarValue {
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    /// IFCLOGICAL; `None` is `.U.`
    Logical(Option<bool>),
}

impl ScalarValue {
    /// Convert an IFC nominal value (usually a defined-type wrapper).
    /// Returns `None` for null and non-scalar values.
    pub fn from_nominal(value: &AttributeValue) -> Option<Self> {
        let (type_name, inner) = match value.as_typed() {
            Some((name, inner)) => (Some(name), inner),
            None => (None, value),
        };

        match inner {
            AttributeValue::String(s) => Some(ScalarValue::Text(s.clone())),
            AttributeValue::Integer(i) => Some(ScalarValue::Integer(*i)),
            AttributeValue::Float(f) => Some(ScalarValue::Real(*f)),
            AttributeValue::Enum(e) => {
                let logical = type_name.is_some_and(|n| n.eq_ignore_ascii_case("IFCLOGICAL"));
                Some(match (e.as_str(), logical) {
                    ("T" | "TRUE", false) => ScalarValue::Boolean(true),
                    ("F" | "FALSE", false) => ScalarValue::Boolean(false),
                    ("T" | "TRUE", true) => ScalarValue::Logical(Some(true)),
                    ("F" | "FALSE", true) => ScalarValue::Logical(Some(false)),
                    ("U" | "UNKNOWN", _) => ScalarValue::Logical(None),
                    (other, _) => ScalarValue::Text(other.to_string()),
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Boolean(b) => write!(f, "{}", b),
            ScalarValue::Integer(i) => write!(f, "{}", i),
            ScalarValue::Real(r) => write!(f, "{}", r),
            ScalarValue::Text(s) => f.write_str(s),
            ScalarValue::Logical(Some(b)) => write!(f, "{}", b),
            ScalarValue::Logical(None) => f.write_str("unknown"),
        }
    }
}

/// Kind of a property inside a property set.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    /// IfcPropertySingleValue; `None` when the nominal value is unset
    SingleValue(Option<ScalarValue>),
    /// Enumerated, list, bounded, table, reference and complex properties
    Complex,
}

/// A named property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub kind: PropertyKind,
}

/// IfcPropertySet.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySet {
    pub name: String,
    pub properties: Vec<Property>,
}

/// Quantity measure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityKind {
    Length,
    Area,
    Volume,
    Count,
    Weight,
    Time,
}

impl QuantityKind {
    fn from_type(ifc_type: IfcType) -> Option<Self> {
        Some(match ifc_type {
            IfcType::IfcQuantityLength => QuantityKind::Length,
            IfcType::IfcQuantityArea => QuantityKind::Area,
            IfcType::IfcQuantityVolume => QuantityKind::Volume,
            IfcType::IfcQuantityCount => QuantityKind::Count,
            IfcType::IfcQuantityWeight => QuantityKind::Weight,
            IfcType::IfcQuantityTime => QuantityKind::Time,
            _ => return None,
        })
    }
}

/// A physical simple quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub name: String,
    pub kind: QuantityKind,
    pub value: Option<f64>,
}

/// IfcElementQuantity.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantitySet {
    pub name: String,
    pub quantities: Vec<Quantity>,
}

impl QuantitySet {
    /// Value of the quantity with the given (trimmed) name
    pub fn value_of(&self, name: &str) -> Option<f64> {
        self.quantities
            .iter()
            .find(|q| q.name.trim() == name)
            .and_then(|q| q.value)
    }
}

/// What a property-assignment relationship points at.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyDefinition {
    ScalarPropertySet(PropertySet),
    QuantitySet(QuantitySet),
    /// Anything else (predefined sets, templates, dangling references)
    Other,
}

/// Visitor over a room's property definitions.
pub trait DefinitionVisitor {
    fn visit_property_set(&mut self, _set: &PropertySet) {}
    fn visit_quantity_set(&mut self, _set: &QuantitySet) {}
    fn visit_other(&mut self) {}
}

/// A resolved IfcSpace.
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub entity_id: u32,
    pub global_id: String,
    pub name: Option<String>,
    /// Property definitions in relationship order
    pub definitions: Vec<PropertyDefinition>,
}

impl Room {
    /// Walk every property definition in order
    pub fn accept<V: DefinitionVisitor>(&self, visitor: &mut V) {
        for definition in &self.definitions {
            match definition {
                PropertyDefinition::ScalarPropertySet(set) => visitor.visit_property_set(set),
                PropertyDefinition::QuantitySet(set) => visitor.visit_quantity_set(set),
                PropertyDefinition::Other => visitor.visit_other(),
            }
        }
    }
}

/// An opened IFC document.
pub struct IfcDocument<'a> {
    decoder: EntityDecoder<'a>,
    schema_version: Option<String>,
    /// IfcSpace ids in file order
    space_ids: Vec<u32>,
    /// Inverse IsDefinedBy: object id -> property definition ids
    defined_by: FxHashMap<u32, Vec<u32>>,
}

impl<'a> IfcDocument<'a> {
    /// Index a STEP file and its property-assignment relationships.
    pub fn open(content: &'a str) -> Result<Self> {
        if !content.trim_start().starts_with("ISO-10303-21") {
            return Err(Error::unreadable("missing ISO-10303-21 header"));
        }

        let index = Arc::new(build_entity_index(content));
        if index.is_empty() {
            return Err(Error::unreadable("no entity records in DATA section"));
        }

        let mut decoder = EntityDecoder::with_arc_index(content, index);
        let mut scanner = EntityScanner::new(content);
        let mut space_ids = Vec::new();
        let mut defined_by: FxHashMap<u32, Vec<u32>> = FxHashMap::default();

        while let Some((id, type_name, start, end)) = scanner.next_entity() {
            if type_name.eq_ignore_ascii_case("IFCSPACE") {
                space_ids.push(id);
            } else if type_name.eq_ignore_ascii_case("IFCRELDEFINESBYPROPERTIES") {
                let Ok(rel) = decoder.decode_at(start, end) else {
                    continue;
                };
                // [4]=RelatedObjects, [5]=RelatingPropertyDefinition
                let definitions = relating_definitions(&rel);
                for object_id in rel.get_ref_list(4) {
                    defined_by
                        .entry(object_id)
                        .or_default()
                        .extend(definitions.iter().copied());
                }
            }
        }

        Ok(Self {
            decoder,
            schema_version: parse_file_schema(content),
            space_ids,
            defined_by,
        })
    }

    /// Schema identifier from FILE_SCHEMA, e.g. "IFC4"
    pub fn schema_version(&self) -> Option<&str> {
        self.schema_version.as_deref()
    }

    /// Number of indexed entity records
    pub fn entity_count(&self) -> usize {
        self.decoder.entity_count()
    }

    /// Number of IfcSpace entities
    pub fn space_count(&self) -> usize {
        self.space_ids.len()
    }

    /// Resolve every IfcSpace in file order. Spaces whose own record does
    /// not decode are skipped.
    pub fn rooms(&mut self) -> Vec<Room> {
        let ids = self.space_ids.clone();
        ids.into_iter().filter_map(|id| self.room(id)).collect()
    }

    fn room(&mut self, id: u32) -> Option<Room> {
        let space = self.decoder.decode_by_id(id).ok()?;

        // [0]=GlobalId, [1]=OwnerHistory, [2]=Name
        let global_id = space.get_string(0).unwrap_or_default().to_string();
        let name = space.get_string(2).map(str::to_string);

        let definition_ids = self.defined_by.get(&id).cloned().unwrap_or_default();
        let definitions = definition_ids
            .into_iter()
            .map(|definition_id| self.definition(definition_id))
            .collect();

        Some(Room {
            entity_id: id,
            global_id,
            name,
            definitions,
        })
    }

    fn definition(&mut self, id: u32) -> PropertyDefinition {
        let Ok(entity) = self.decoder.decode_by_id(id) else {
            return PropertyDefinition::Other;
        };

        match entity.ifc_type {
            IfcType::IfcPropertySet => {
                // [2]=Name, [4]=HasProperties
                let properties = self
                    .decoder
                    .resolve_ref_list(&entity.get_ref_list(4))
                    .iter()
                    .filter_map(|p| property(p))
                    .collect();
                PropertyDefinition::ScalarPropertySet(PropertySet {
                    name: entity.get_string(2).unwrap_or_default().to_string(),
                    properties,
                })
            }
            IfcType::IfcElementQuantity => {
                // [2]=Name, [4]=MethodOfMeasurement, [5]=Quantities
                let quantities = self
                    .decoder
                    .resolve_ref_list(&entity.get_ref_list(5))
                    .iter()
                    .filter_map(|q| quantity(q))
                    .collect();
                PropertyDefinition::QuantitySet(QuantitySet {
                    name: entity.get_string(2).unwrap_or_default().to_string(),
                    quantities,
                })
            }
            _ => PropertyDefinition::Other,
        }
    }
}

/// RelatingPropertyDefinition is a single reference, or a set of them in IFC4.
fn relating_definitions(rel: &DecodedEntity) -> Vec<u32> {
    match rel.get(5) {
        Some(AttributeValue::EntityRef(id)) => vec![*id],
        Some(AttributeValue::List(_)) => rel.get_ref_list(5),
        Some(AttributeValue::Typed(_, inner)) => match inner.as_ref() {
            AttributeValue::List(items) => items.iter().filter_map(|v| v.as_entity_ref()).collect(),
            other => other.as_entity_ref().into_iter().collect(),
        },
        _ => Vec::new(),
    }
}

fn property(entity: &DecodedEntity) -> Option<Property> {
    if !entity.ifc_type.is_property() {
        return None;
    }

    // All IfcProperty subtypes: [0]=Name, [1]=Description
    let name = entity.get_string(0)?.to_string();

    let kind = if entity.ifc_type == IfcType::IfcPropertySingleValue {
        // [2]=NominalValue, [3]=Unit
        PropertyKind::SingleValue(entity.get(2).and_then(ScalarValue::from_nominal))
    } else {
        PropertyKind::Complex
    };

    Some(Property { name, kind })
}

fn quantity(entity: &DecodedEntity) -> Option<Quantity> {
    let kind = QuantityKind::from_type(entity.ifc_type)?;

    // [0]=Name, [1]=Description, [2]=Unit, [3]=*Value, [4]=Formula (IFC4)
    Some(Quantity {
        name: entity.get_string(0)?.to_string(),
        kind,
        value: entity.get_float(3),
    })
}
