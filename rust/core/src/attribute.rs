// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoded attribute values and entities.

use crate::parser::{decode_step_string, Token};
use crate::schema::IfcType;

/// IFC entity attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Entity reference
    EntityRef(u32),
    /// String value (escapes decoded)
    String(String),
    /// Integer value
    Integer(i64),
    /// Float value
    Float(f64),
    /// Enum value, without the surrounding dots
    Enum(String),
    /// List of values
    List(Vec<AttributeValue>),
    /// Select value wrapped in a defined type: IFCLABEL('x') -> ("IFCLABEL", "x")
    Typed(String, Box<AttributeValue>),
    /// Null/undefined
    Null,
    /// Derived value (*)
    Derived,
}

impl AttributeValue {
    /// Convert from Token
    pub fn from_token(token: &Token) -> Self {
        match token {
            Token::EntityRef(id) => AttributeValue::EntityRef(*id),
            Token::String(s) => AttributeValue::String(decode_step_string(s).into_owned()),
            Token::Integer(i) => AttributeValue::Integer(*i),
            Token::Float(f) => AttributeValue::Float(*f),
            Token::Enum(e) => AttributeValue::Enum(e.to_string()),
            Token::List(items) => AttributeValue::List(items.iter().map(Self::from_token).collect()),
            Token::TypedValue(type_name, args) => {
                // Defined types wrap exactly one value; anything else keeps the list
                let inner = match args.as_slice() {
                    [single] => Self::from_token(single),
                    many => AttributeValue::List(many.iter().map(Self::from_token).collect()),
                };
                AttributeValue::Typed(type_name.to_string(), Box::new(inner))
            }
            Token::Null => AttributeValue::Null,
            Token::Derived => AttributeValue::Derived,
        }
    }

    /// Get as entity reference
    #[inline]
    pub fn as_entity_ref(&self) -> Option<u32> {
        match self {
            AttributeValue::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as string
    #[inline]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as float, looking through a defined-type wrapper
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::Integer(i) => Some(*i as f64),
            AttributeValue::Typed(_, inner) => inner.as_float(),
            _ => None,
        }
    }

    /// Get as list
    #[inline]
    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Split a defined-type wrapper into its type name and inner value
    #[inline]
    pub fn as_typed(&self) -> Option<(&str, &AttributeValue)> {
        match self {
            AttributeValue::Typed(name, inner) => Some((name, inner)),
            _ => None,
        }
    }

    /// Check if null/derived
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null | AttributeValue::Derived)
    }
}

/// Decoded IFC entity with attributes
#[derive(Debug, Clone)]
pub struct DecodedEntity {
    pub id: u32,
    pub ifc_type: IfcType,
    pub attributes: Vec<AttributeValue>,
}

impl DecodedEntity {
    /// Create new decoded entity
    pub fn new(id: u32, ifc_type: IfcType, attributes: Vec<AttributeValue>) -> Self {
        Self {
            id,
            ifc_type,
            attributes,
        }
    }

    /// Get attribute by index
    pub fn get(&self, index: usize) -> Option<&AttributeValue> {
        self.attributes.get(index)
    }

    /// Get entity reference attribute
    pub fn get_ref(&self, index: usize) -> Option<u32> {
        self.get(index).and_then(|v| v.as_entity_ref())
    }

    /// Get string attribute
    pub fn get_string(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(|v| v.as_string())
    }

    /// Get float attribute
    pub fn get_float(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(|v| v.as_float())
    }

    /// Get list attribute
    pub fn get_list(&self, index: usize) -> Option<&[AttributeValue]> {
        self.get(index).and_then(|v| v.as_list())
    }

    /// Entity references held in a list attribute; other items are skipped
    pub fn get_ref_list(&self, index: usize) -> Vec<u32> {
        self.get_list(index)
            .map(|items| items.iter().filter_map(|v| v.as_entity_ref()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_value_unwraps_single_argument() {
        let token = Token::TypedValue("IFCAREAMEASURE", vec![Token::Float(14.004)]);
        let value = AttributeValue::from_token(&token);
        let (name, inner) = value.as_typed().unwrap();
        assert_eq!(name, "IFCAREAMEASURE");
        assert_eq!(inner, &AttributeValue::Float(14.004));
        assert_eq!(value.as_float(), Some(14.004));
    }

    #[test]
    fn test_strings_are_decoded() {
        let value = AttributeValue::from_token(&Token::String("H\\X2\\00F6\\X0\\he"));
        assert_eq!(value.as_string(), Some("Höhe"));
    }

    #[test]
    fn test_ref_list_skips_non_refs() {
        let entity = DecodedEntity::new(
            1,
            IfcType::IfcPropertySet,
            vec![AttributeValue::List(vec![
                AttributeValue::EntityRef(5),
                AttributeValue::Null,
                AttributeValue::EntityRef(7),
            ])],
        );
        assert_eq!(entity.get_ref_list(0), vec![5, 7]);
        assert!(entity.get_ref_list(3).is_empty());
    }
}
