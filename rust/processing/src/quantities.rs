// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Net floor area lookup from a room's quantity sets.

use raumbuch_core::{DefinitionVisitor, QuantitySet, Room};

/// Quantity set holding the computed base quantities
pub const BASE_QUANTITIES: &str = "BaseQuantities";
/// Quantity name of the net floor area
pub const NET_FLOOR_AREA: &str = "NetFloorArea";
/// Combined key of the net floor area
pub const NET_FLOOR_AREA_KEY: &str = "BaseQuantities__NetFloorArea";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomQuantityRow {
    pub room_id: String,
    pub room_name: Option<String>,
    pub net_floor_area: Option<f64>,
}

/// Finds `BaseQuantities.NetFloorArea`. Property sets are never consulted.
#[derive(Debug, Default)]
pub struct QuantityExtractor {
    net_floor_area: Option<f64>,
}

impl QuantityExtractor {
    pub fn extract(room: &Room) -> RoomQuantityRow {
        let mut extractor = Self::default();
        room.accept(&mut extractor);
        RoomQuantityRow {
            room_id: room.global_id.clone(),
            room_name: room.name.clone(),
            net_floor_area: extractor.net_floor_area,
        }
    }
}

impl DefinitionVisitor for QuantityExtractor {
    fn visit_quantity_set(&mut self, set: &QuantitySet) {
        if set.name.trim() != BASE_QUANTITIES {
            return;
        }
        if let Some(area) = set.value_of(NET_FLOOR_AREA) {
            self.net_floor_area = Some(area);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raumbuch_core::{
        Property, PropertyDefinition, PropertyKind, PropertySet, Quantity, QuantityKind,
        ScalarValue,
    };

    fn qset(name: &str, quantity: &str, value: Option<f64>) -> PropertyDefinition {
        PropertyDefinition::QuantitySet(QuantitySet {
            name: name.to_string(),
            quantities: vec![Quantity {
                name: quantity.to_string(),
                kind: QuantityKind::Area,
                value,
            }],
        })
    }

    fn room(definitions: Vec<PropertyDefinition>) -> Room {
        Room {
            entity_id: 7,
            global_id: "1xyz".to_string(),
            name: Some("3".to_string()),
            definitions,
        }
    }

    #[test]
    fn test_extract_net_floor_area() {
        let row = QuantityExtractor::extract(&room(vec![
            qset("Qto_SpaceBaseQuantities", NET_FLOOR_AREA, Some(99.0)),
            qset(BASE_QUANTITIES, "GrossFloorArea", Some(15.0)),
            qset(BASE_QUANTITIES, NET_FLOOR_AREA, Some(14.004)),
        ]));
        assert_eq!(row.room_id, "1xyz");
        assert_eq!(row.net_floor_area, Some(14.004));
    }

    #[test]
    fn test_missing_area() {
        let row = QuantityExtractor::extract(&room(vec![qset(BASE_QUANTITIES, NET_FLOOR_AREA, None)]));
        assert_eq!(row.net_floor_area, None);
        assert_eq!(QuantityExtractor::extract(&room(vec![])).net_floor_area, None);
    }

    #[test]
    fn test_property_sets_are_not_quantities() {
        let row = QuantityExtractor::extract(&room(vec![PropertyDefinition::ScalarPropertySet(
            PropertySet {
                name: BASE_QUANTITIES.to_string(),
                properties: vec![Property {
                    name: NET_FLOOR_AREA.to_string(),
                    kind: PropertyKind::SingleValue(Some(ScalarValue::Real(3.0))),
                }],
            },
        )]));
        assert_eq!(row.net_floor_area, None);
    }
}
