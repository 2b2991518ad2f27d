// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC Schema Types
//!
//! Fast type checking using an enum instead of string comparison.
//! Only the entities a room book touches are named; everything else
//! decodes as [`IfcType::Unknown`].

use std::fmt;

/// IFC Entity Types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IfcType {
    // Spatial structure
    IfcProject,
    IfcSite,
    IfcBuilding,
    IfcBuildingStorey,
    IfcSpace,

    // Relationships
    IfcRelAggregates,
    IfcRelDefinesByProperties,
    IfcRelDefinesByType,

    // Property definitions
    IfcPropertySet,
    IfcElementQuantity,

    // Properties
    IfcPropertySingleValue,
    IfcPropertyEnumeratedValue,
    IfcPropertyListValue,
    IfcPropertyBoundedValue,
    IfcPropertyTableValue,
    IfcPropertyReferenceValue,
    IfcComplexProperty,

    // Quantities
    IfcQuantityLength,
    IfcQuantityArea,
    IfcQuantityVolume,
    IfcQuantityCount,
    IfcQuantityWeight,
    IfcQuantityTime,

    IfcOwnerHistory,

    // Fallback for unknown types
    Unknown(u16), // Store hash for unknown types
}

impl IfcType {
    /// Parse IFC type from its upper-case STEP keyword
    pub fn from_str(s: &str) -> Option<Self> {
        if s.is_empty() {
            return None;
        }

        let t = match s {
            "IFCPROJECT" => Self::IfcProject,
            "IFCSITE" => Self::IfcSite,
            "IFCBUILDING" => Self::IfcBuilding,
            "IFCBUILDINGSTOREY" => Self::IfcBuildingStorey,
            "IFCSPACE" => Self::IfcSpace,

            "IFCRELAGGREGATES" => Self::IfcRelAggregates,
            "IFCRELDEFINESBYPROPERTIES" => Self::IfcRelDefinesByProperties,
            "IFCRELDEFINESBYTYPE" => Self::IfcRelDefinesByType,

            "IFCPROPERTYSET" => Self::IfcPropertySet,
            "IFCELEMENTQUANTITY" => Self::IfcElementQuantity,

            "IFCPROPERTYSINGLEVALUE" => Self::IfcPropertySingleValue,
            "IFCPROPERTYENUMERATEDVALUE" => Self::IfcPropertyEnumeratedValue,
            "IFCPROPERTYLISTVALUE" => Self::IfcPropertyListValue,
            "IFCPROPERTYBOUNDEDVALUE" => Self::IfcPropertyBoundedValue,
            "IFCPROPERTYTABLEVALUE" => Self::IfcPropertyTableValue,
            "IFCPROPERTYREFERENCEVALUE" => Self::IfcPropertyReferenceValue,
            "IFCCOMPLEXPROPERTY" => Self::IfcComplexProperty,

            "IFCQUANTITYLENGTH" => Self::IfcQuantityLength,
            "IFCQUANTITYAREA" => Self::IfcQuantityArea,
            "IFCQUANTITYVOLUME" => Self::IfcQuantityVolume,
            "IFCQUANTITYCOUNT" => Self::IfcQuantityCount,
            "IFCQUANTITYWEIGHT" => Self::IfcQuantityWeight,
            "IFCQUANTITYTIME" => Self::IfcQuantityTime,

            "IFCOWNERHISTORY" => Self::IfcOwnerHistory,

            _ => Self::Unknown(simple_hash(s)),
        };
        Some(t)
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IfcProject => "IFCPROJECT",
            Self::IfcSite => "IFCSITE",
            Self::IfcBuilding => "IFCBUILDING",
            Self::IfcBuildingStorey => "IFCBUILDINGSTOREY",
            Self::IfcSpace => "IFCSPACE",

            Self::IfcRelAggregates => "IFCRELAGGREGATES",
            Self::IfcRelDefinesByProperties => "IFCRELDEFINESBYPROPERTIES",
            Self::IfcRelDefinesByType => "IFCRELDEFINESBYTYPE",

            Self::IfcPropertySet => "IFCPROPERTYSET",
            Self::IfcElementQuantity => "IFCELEMENTQUANTITY",

            Self::IfcPropertySingleValue => "IFCPROPERTYSINGLEVALUE",
            Self::IfcPropertyEnumeratedValue => "IFCPROPERTYENUMERATEDVALUE",
            Self::IfcPropertyListValue => "IFCPROPERTYLISTVALUE",
            Self::IfcPropertyBoundedValue => "IFCPROPERTYBOUNDEDVALUE",
            Self::IfcPropertyTableValue => "IFCPROPERTYTABLEVALUE",
            Self::IfcPropertyReferenceValue => "IFCPROPERTYREFERENCEVALUE",
            Self::IfcComplexProperty => "IFCCOMPLEXPROPERTY",

            Self::IfcQuantityLength => "IFCQUANTITYLENGTH",
            Self::IfcQuantityArea => "IFCQUANTITYAREA",
            Self::IfcQuantityVolume => "IFCQUANTITYVOLUME",
            Self::IfcQuantityCount => "IFCQUANTITYCOUNT",
            Self::IfcQuantityWeight => "IFCQUANTITYWEIGHT",
            Self::IfcQuantityTime => "IFCQUANTITYTIME",

            Self::IfcOwnerHistory => "IFCOWNERHISTORY",

            Self::Unknown(_) => "UNKNOWN",
        }
    }

    /// Check if this is a spatial structure element
    pub fn is_spatial(&self) -> bool {
        matches!(
            self,
            Self::IfcProject
                | Self::IfcSite
                | Self::IfcBuilding
                | Self::IfcBuildingStorey
                | Self::IfcSpace
        )
    }

    /// Check if this is a physical simple quantity (IfcQuantity*)
    pub fn is_quantity(&self) -> bool {
        matches!(
            self,
            Self::IfcQuantityLength
                | Self::IfcQuantityArea
                | Self::IfcQuantityVolume
                | Self::IfcQuantityCount
                | Self::IfcQuantityWeight
                | Self::IfcQuantityTime
        )
    }

    /// Check if this is a property held by a property set
    pub fn is_property(&self) -> bool {
        matches!(
            self,
            Self::IfcPropertySingleValue
                | Self::IfcPropertyEnumeratedValue
                | Self::IfcPropertyListValue
                | Self::IfcPropertyBoundedValue
                | Self::IfcPropertyTableValue
                | Self::IfcPropertyReferenceValue
                | Self::IfcComplexProperty
        )
    }
}

impl fmt::Display for IfcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Simple hash function for unknown IFC types
fn simple_hash(s: &str) -> u16 {
    let mut hash: u32 = 5381;
    for byte in s.bytes() {
        hash = ((hash << 5).wrapping_add(hash)).wrapping_add(byte as u32);
    }
    (hash & 0xFFFF) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(IfcType::from_str("IFCSPACE"), Some(IfcType::IfcSpace));
        assert_eq!(
            IfcType::from_str("IFCELEMENTQUANTITY"),
            Some(IfcType::IfcElementQuantity)
        );
        assert_eq!(IfcType::from_str(""), None);
    }

    #[test]
    fn test_as_str() {
        assert_eq!(IfcType::IfcPropertySet.as_str(), "IFCPROPERTYSET");
        assert_eq!(IfcType::IfcQuantityArea.to_string(), "IFCQUANTITYAREA");
    }

    #[test]
    fn test_categories() {
        assert!(IfcType::IfcSpace.is_spatial());
        assert!(IfcType::IfcQuantityArea.is_quantity());
        assert!(!IfcType::IfcPropertySingleValue.is_quantity());
        assert!(IfcType::IfcComplexProperty.is_property());
    }

    #[test]
    fn test_unknown_type() {
        let unknown = IfcType::from_str("IFCWALL").unwrap();
        assert!(matches!(unknown, IfcType::Unknown(_)));
    }
}
