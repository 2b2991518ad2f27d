// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Allow-listed scalar attributes of one room.

use raumbuch_core::{DefinitionVisitor, PropertyKind, PropertySet, Room, ScalarValue};
use rustc_hash::FxHashMap;

use crate::allow_list::{combined_key, AllowListIndex};
use crate::quantities::NET_FLOOR_AREA;

/// Attribute name that is only ever sourced from the quantity sets.
pub const RESERVED_ATTRIBUTE: &str = NET_FLOOR_AREA;

/// Matched attributes of one room, keyed by combined key.
/// A key mapped to `None` was found without a value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomAttributeRow {
    pub room_id: String,
    pub room_name: Option<String>,
    pub attributes: FxHashMap<String, Option<ScalarValue>>,
}

impl RoomAttributeRow {
    /// Value for a combined key; `None` when absent or unset
    pub fn value(&self, key: &str) -> Option<&ScalarValue> {
        self.attributes.get(key).and_then(Option::as_ref)
    }
}

/// Collects single-value properties that pass the allow-list.
pub struct AttributeExtractor<'a> {
    allow_list: &'a AllowListIndex,
    attributes: FxHashMap<String, Option<ScalarValue>>,
}

impl<'a> AttributeExtractor<'a> {
    pub fn new(allow_list: &'a AllowListIndex) -> Self {
        Self {
            allow_list,
            attributes: FxHashMap::default(),
        }
    }

    /// Walk a room and return its attribute row.
    pub fn extract(room: &Room, allow_list: &'a AllowListIndex) -> RoomAttributeRow {
        let mut extractor = Self::new(allow_list);
        room.accept(&mut extractor);
        RoomAttributeRow {
            room_id: room.global_id.clone(),
            room_name: room.name.clone(),
            attributes: extractor.attributes,
        }
    }
}

impl DefinitionVisitor for AttributeExtractor<'_> {
    fn visit_property_set(&mut self, set: &PropertySet) {
        for property in &set.properties {
            let PropertyKind::SingleValue(value) = &property.kind else {
                continue;
            };

            if property.name.trim() == RESERVED_ATTRIBUTE {
                continue;
            }

            let key = combined_key(&set.name, &property.name);
            if self.allow_list.matches_key(&key) {
                // Later assignments of the same key overwrite earlier ones
                self.attributes.insert(key, value.clone());
            }
        }
    }
}
