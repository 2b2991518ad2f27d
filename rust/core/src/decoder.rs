// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity Decoder - On-demand entity parsing
//!
//! Lazily decode IFC entities from byte offsets, keeping decoded records
//! in a cache so shared property sets are parsed once.

use crate::attribute::{AttributeValue, DecodedEntity};
use crate::error::{Error, Result};
use crate::parser::{data_section_start, find_record_end, parse_entity};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Pre-built entity index type
pub type EntityIndex = FxHashMap<u32, (usize, usize)>;

/// Build entity index from content - O(n) scan using SIMD-accelerated search
/// Returns index mapping entity IDs to byte offsets
pub fn build_entity_index(content: &str) -> EntityIndex {
    let bytes = content.as_bytes();
    let len = bytes.len();

    // Roughly 1 entity per 50 bytes
    let mut index = FxHashMap::with_capacity_and_hasher(len / 50, Default::default());

    let mut pos = data_section_start(content);

    while pos < len {
        let hash_offset = match memchr::memchr(b'#', &bytes[pos..]) {
            Some(offset) => offset,
            None => break,
        };

        let start = pos + hash_offset;
        pos = start + 1;

        let id_start = pos;
        while pos < len && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        let id_end = pos;

        // Handles both `#45=` and `#45 = `
        while pos < len && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        if id_end > id_start && pos < len && bytes[pos] == b'=' {
            let Ok(id) = content[id_start..id_end].parse::<u32>() else {
                continue;
            };

            match find_record_end(bytes, pos) {
                Some(end) => {
                    index.insert(id, (start, end));
                    pos = end;
                }
                None => break, // No terminator, malformed tail
            }
        }
    }

    index
}

/// Entity decoder for lazy parsing - uses Arc for cheap cache hits
pub struct EntityDecoder<'a> {
    content: &'a str,
    /// Cache of decoded entities (entity_id -> `Arc<DecodedEntity>`)
    cache: FxHashMap<u32, Arc<DecodedEntity>>,
    /// Index of entity offsets (entity_id -> (start, end))
    entity_index: Arc<EntityIndex>,
}

impl<'a> EntityDecoder<'a> {
    /// Create new decoder, building the index eagerly
    pub fn new(content: &'a str) -> Self {
        Self::with_arc_index(content, Arc::new(build_entity_index(content)))
    }

    /// Create decoder with shared Arc index
    pub fn with_arc_index(content: &'a str, index: Arc<EntityIndex>) -> Self {
        Self {
            content,
            cache: FxHashMap::default(),
            entity_index: index,
        }
    }

    /// Decode entity at byte offset
    pub fn decode_at(&mut self, start: usize, end: usize) -> Result<Arc<DecodedEntity>> {
        let line = &self.content[start..end];
        let (id, ifc_type, tokens) = parse_entity(line).map_err(|e| {
            Error::parse(
                start,
                format!("{}, input: {:?}", e, &line[..line.len().min(100)]),
            )
        })?;

        if let Some(entity) = self.cache.get(&id) {
            return Ok(Arc::clone(entity));
        }

        let attributes = tokens.iter().map(AttributeValue::from_token).collect();
        let entity = Arc::new(DecodedEntity::new(id, ifc_type, attributes));
        self.cache.insert(id, Arc::clone(&entity));
        Ok(entity)
    }

    /// Decode entity by ID - O(1) lookup using entity index
    pub fn decode_by_id(&mut self, entity_id: u32) -> Result<Arc<DecodedEntity>> {
        if let Some(entity) = self.cache.get(&entity_id) {
            return Ok(Arc::clone(entity));
        }

        let (start, end) = self
            .entity_index
            .get(&entity_id)
            .copied()
            .ok_or(Error::EntityNotFound(entity_id))?;

        self.decode_at(start, end)
    }

    /// Resolve list of entity references, skipping ones that fail to decode
    pub fn resolve_ref_list(&mut self, ids: &[u32]) -> Vec<Arc<DecodedEntity>> {
        ids.iter()
            .filter_map(|&id| self.decode_by_id(id).ok())
            .collect()
    }

    /// Number of indexed entities
    pub fn entity_count(&self) -> usize {
        self.entity_index.len()
    }

    /// Get cache size
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IfcType;

    const CONTENT: &str = "ISO-10303-21;
HEADER;
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCSPACE('0abc',$,'101',$,$,$,$,$,.ELEMENT.,.INTERNAL.,$);
#2 = IFCPROPERTYSET('1def',$,'Pset_A',$,(#3));
#3=IFCPROPERTYSINGLEVALUE('Note',$,IFCTEXT('a;b'),$);
ENDSEC;
END-ISO-10303-21;
";

    #[test]
    fn test_build_entity_index() {
        let index = build_entity_index(CONTENT);
        assert_eq!(index.len(), 3);
        let (start, end) = index[&3];
        assert!(CONTENT[start..end].ends_with("$);"));
    }

    #[test]
    fn test_decode_by_id_caches() {
        let mut decoder = EntityDecoder::new(CONTENT);
        let pset = decoder.decode_by_id(2).unwrap();
        assert_eq!(pset.ifc_type, IfcType::IfcPropertySet);
        assert_eq!(pset.get_string(2), Some("Pset_A"));

        let again = decoder.decode_by_id(2).unwrap();
        assert!(Arc::ptr_eq(&pset, &again));
        assert_eq!(decoder.cache_size(), 1);
    }

    #[test]
    fn test_missing_entity() {
        let mut decoder = EntityDecoder::new(CONTENT);
        assert!(matches!(
            decoder.decode_by_id(99),
            Err(Error::EntityNotFound(99))
        ));
        assert_eq!(decoder.resolve_ref_list(&[3, 99]).len(), 1);
    }
}
