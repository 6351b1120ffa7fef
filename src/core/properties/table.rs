//! Managed property table
//!
//! Each device owns a bounded table of named, typed properties with defaults
//! and optional bounds. Writes are validated against type, bounds and the
//! read-only flag before they take effect; drivers read the current values
//! when they configure the chip.

use super::value::{PropertyType, PropertyValue};
use bitflags::bitflags;
use core::fmt;
use heapless::Vec;

/// Maximum number of properties per device
pub const MAX_PROPERTIES: usize = 8;

bitflags! {
    /// Property flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PropertyFlags: u8 {
        /// Property is hidden from listings
        const HIDDEN = 0b00000001;
        /// Property is read-only (cannot be modified by the application)
        const READ_ONLY = 0b00000010;
    }
}

/// Property table error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PropertyError {
    /// Property not found
    NotFound,
    /// Property is read-only
    ReadOnly,
    /// Invalid property value (out of bounds or wrong type)
    InvalidValue,
    /// A property with this name already exists
    Duplicate,
    /// Property table full
    Full,
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyError::NotFound => write!(f, "Property not found"),
            PropertyError::ReadOnly => write!(f, "Property is read-only"),
            PropertyError::InvalidValue => write!(f, "Invalid property value"),
            PropertyError::Duplicate => write!(f, "Duplicate property"),
            PropertyError::Full => write!(f, "Property table full"),
        }
    }
}

/// Property metadata (definition and current value)
#[derive(Debug, Clone)]
pub struct PropertyMetadata {
    /// Property name
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Property type
    pub property_type: PropertyType,
    /// Current value
    pub value: PropertyValue,
    /// Default value
    pub default: PropertyValue,
    /// Minimum allowed value (numeric types only)
    pub min: Option<PropertyValue>,
    /// Maximum allowed value (numeric types only)
    pub max: Option<PropertyValue>,
    /// Property flags
    pub flags: PropertyFlags,
    /// Modified flag (true if changed from default)
    pub modified: bool,
}

impl PropertyMetadata {
    /// Create an unbounded property
    pub fn new(name: &'static str, description: &'static str, default: PropertyValue) -> Self {
        Self {
            name,
            description,
            property_type: default.property_type(),
            value: default.clone(),
            default,
            min: None,
            max: None,
            flags: PropertyFlags::empty(),
            modified: false,
        }
    }

    /// Create a Uint8 property bounded to `min..=max`
    pub fn new_uint8(
        name: &'static str,
        description: &'static str,
        default: u8,
        min: u8,
        max: u8,
    ) -> Self {
        Self {
            min: Some(PropertyValue::Uint8(min)),
            max: Some(PropertyValue::Uint8(max)),
            ..Self::new(name, description, PropertyValue::Uint8(default))
        }
    }

    /// Create a Uint32 property bounded to `min..=max`
    pub fn new_uint32(
        name: &'static str,
        description: &'static str,
        default: u32,
        min: u32,
        max: u32,
    ) -> Self {
        Self {
            min: Some(PropertyValue::Uint32(min)),
            max: Some(PropertyValue::Uint32(max)),
            ..Self::new(name, description, PropertyValue::Uint32(default))
        }
    }

    /// Create a Float property bounded to `min..=max`
    pub fn new_float(
        name: &'static str,
        description: &'static str,
        default: f32,
        min: f32,
        max: f32,
    ) -> Self {
        Self {
            min: Some(PropertyValue::Float(min)),
            max: Some(PropertyValue::Float(max)),
            ..Self::new(name, description, PropertyValue::Float(default))
        }
    }

    /// Add flags to the property
    pub fn with_flags(mut self, flags: PropertyFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Validate value type and bounds
    pub fn is_valid(&self, value: &PropertyValue) -> bool {
        if value.property_type() != self.property_type {
            return false;
        }

        if let (Some(v), Some(min)) = (value.as_f32(), self.min.as_ref().and_then(|m| m.as_f32())) {
            if v < min {
                return false;
            }
        }
        if let (Some(v), Some(max)) = (value.as_f32(), self.max.as_ref().and_then(|m| m.as_f32())) {
            if v > max {
                return false;
            }
        }
        if let PropertyValue::Float(v) = value {
            if v.is_nan() {
                return false;
            }
        }
        true
    }
}

/// Bounded table of device properties
#[derive(Debug, Clone, Default)]
pub struct PropertyTable {
    properties: Vec<PropertyMetadata, MAX_PROPERTIES>,
}

impl PropertyTable {
    /// Create an empty table
    pub const fn new() -> Self {
        Self {
            properties: Vec::new(),
        }
    }

    /// Define a new property
    ///
    /// # Errors
    ///
    /// `Duplicate` if the name is taken, `Full` if the table is at capacity.
    pub fn define(&mut self, metadata: PropertyMetadata) -> Result<(), PropertyError> {
        if self.find(metadata.name).is_some() {
            return Err(PropertyError::Duplicate);
        }
        self.properties
            .push(metadata)
            .map_err(|_| PropertyError::Full)
    }

    /// Get current value by name
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.find(name).map(|p| &p.value)
    }

    /// Get full metadata by name
    pub fn metadata(&self, name: &str) -> Option<&PropertyMetadata> {
        self.find(name)
    }

    /// Set a property value from the application
    ///
    /// Read-only properties reject the write; use `set_internal` for
    /// values the driver itself publishes.
    pub fn set(&mut self, name: &str, value: PropertyValue) -> Result<(), PropertyError> {
        let property = self.find_mut(name).ok_or(PropertyError::NotFound)?;
        if property.flags.contains(PropertyFlags::READ_ONLY) {
            return Err(PropertyError::ReadOnly);
        }
        Self::store(property, value)
    }

    /// Set a property value from the owning driver, bypassing `READ_ONLY`
    pub fn set_internal(&mut self, name: &str, value: PropertyValue) -> Result<(), PropertyError> {
        let property = self.find_mut(name).ok_or(PropertyError::NotFound)?;
        Self::store(property, value)
    }

    /// Restore a property to its default value
    pub fn reset(&mut self, name: &str) -> Result<(), PropertyError> {
        let property = self.find_mut(name).ok_or(PropertyError::NotFound)?;
        property.value = property.default.clone();
        property.modified = false;
        Ok(())
    }

    /// Get a Uint8 property, falling back to `fallback` if missing or mistyped
    pub fn get_u8(&self, name: &str, fallback: u8) -> u8 {
        self.get(name).and_then(PropertyValue::as_u8).unwrap_or(fallback)
    }

    /// Get a Uint32 property, falling back to `fallback` if missing or mistyped
    pub fn get_u32(&self, name: &str, fallback: u32) -> u32 {
        self.get(name).and_then(PropertyValue::as_u32).unwrap_or(fallback)
    }

    /// Get a Float property, falling back to `fallback` if missing or mistyped
    pub fn get_f32(&self, name: &str, fallback: f32) -> f32 {
        match self.get(name) {
            Some(PropertyValue::Float(v)) => *v,
            _ => fallback,
        }
    }

    /// Iterate over all properties
    pub fn iter(&self) -> impl Iterator<Item = &PropertyMetadata> {
        self.properties.iter()
    }

    /// Iterate over properties not flagged `HIDDEN`
    pub fn visible(&self) -> impl Iterator<Item = &PropertyMetadata> {
        self.properties
            .iter()
            .filter(|p| !p.flags.contains(PropertyFlags::HIDDEN))
    }

    /// Number of defined properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if no properties are defined
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    fn store(property: &mut PropertyMetadata, value: PropertyValue) -> Result<(), PropertyError> {
        if !property.is_valid(&value) {
            return Err(PropertyError::InvalidValue);
        }
        property.modified = value != property.default;
        property.value = value;
        Ok(())
    }

    fn find(&self, name: &str) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|p| p.name == name)
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut PropertyMetadata> {
        self.properties.iter_mut().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PropertyTable {
        let mut table = PropertyTable::new();
        table
            .define(PropertyMetadata::new_uint8("averaging", "Conversion averaging", 1, 0, 3))
            .unwrap();
        table
            .define(PropertyMetadata::new_float("sea_level_hpa", "Sea level pressure", 1013.25, 300.0, 1100.0))
            .unwrap();
        table
            .define(
                PropertyMetadata::new("serial", "Serial number", PropertyValue::Uint32(0))
                    .with_flags(PropertyFlags::READ_ONLY | PropertyFlags::HIDDEN),
            )
            .unwrap();
        table
    }

    #[test]
    fn test_property_metadata_validation() {
        let prop = PropertyMetadata::new_float("TEST", "test", 10.0, 0.0, 100.0);

        assert!(prop.is_valid(&PropertyValue::Float(50.0)));
        assert!(prop.is_valid(&PropertyValue::Float(0.0)));
        assert!(prop.is_valid(&PropertyValue::Float(100.0)));
        assert!(!prop.is_valid(&PropertyValue::Float(-1.0)));
        assert!(!prop.is_valid(&PropertyValue::Float(101.0)));
        assert!(!prop.is_valid(&PropertyValue::Float(f32::NAN)));
        assert!(!prop.is_valid(&PropertyValue::Uint32(50)));
    }

    #[test]
    fn test_set_and_get() {
        let mut table = table();
        assert_eq!(table.get_u8("averaging", 0), 1);

        table.set("averaging", PropertyValue::Uint8(3)).unwrap();
        assert_eq!(table.get("averaging"), Some(&PropertyValue::Uint8(3)));
        assert!(table.metadata("averaging").unwrap().modified);

        assert_eq!(
            table.set("averaging", PropertyValue::Uint8(4)),
            Err(PropertyError::InvalidValue)
        );
        assert_eq!(
            table.set("averaging", PropertyValue::Float(1.0)),
            Err(PropertyError::InvalidValue)
        );
        assert_eq!(
            table.set("missing", PropertyValue::Uint8(1)),
            Err(PropertyError::NotFound)
        );
    }

    #[test]
    fn test_read_only_and_internal() {
        let mut table = table();
        assert_eq!(
            table.set("serial", PropertyValue::Uint32(42)),
            Err(PropertyError::ReadOnly)
        );
        table.set_internal("serial", PropertyValue::Uint32(42)).unwrap();
        assert_eq!(table.get_u32("serial", 0), 42);
    }

    #[test]
    fn test_reset() {
        let mut table = table();
        table.set("sea_level_hpa", PropertyValue::Float(1000.0)).unwrap();
        table.reset("sea_level_hpa").unwrap();
        assert_eq!(table.get_f32("sea_level_hpa", 0.0), 1013.25);
        assert!(!table.metadata("sea_level_hpa").unwrap().modified);
    }

    #[test]
    fn test_visible_skips_hidden() {
        let table = table();
        assert_eq!(table.len(), 3);
        let names: std::vec::Vec<_> = table.visible().map(|p| p.name).collect();
        assert_eq!(names, ["averaging", "sea_level_hpa"]);
    }

    #[test]
    fn test_duplicate_and_full() {
        let mut table = table();
        assert_eq!(
            table.define(PropertyMetadata::new_uint8("averaging", "dup", 0, 0, 1)),
            Err(PropertyError::Duplicate)
        );

        const NAMES: [&str; 5] = ["a", "b", "c", "d", "e"];
        for name in NAMES {
            table
                .define(PropertyMetadata::new(name, "", PropertyValue::Bool(false)))
                .unwrap();
        }
        assert_eq!(table.len(), MAX_PROPERTIES);
        assert_eq!(
            table.define(PropertyMetadata::new("f", "", PropertyValue::Bool(false))),
            Err(PropertyError::Full)
        );
    }
}
