//! Managed properties
//!
//! Named, typed configuration values owned by each device, plus the static
//! descriptions of the output parameters a device can be read for.

pub mod table;
pub mod value;

pub use table::{PropertyError, PropertyFlags, PropertyMetadata, PropertyTable, MAX_PROPERTIES};
pub use value::{PropertyType, PropertyValue, MAX_STRING_LEN};

/// Static description of a readable output parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterInfo {
    /// Parameter name
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Unit of the returned value ("" if dimensionless)
    pub unit: &'static str,
    /// Type of the returned value
    pub value_type: PropertyType,
}

impl ParameterInfo {
    /// Describe a float parameter
    pub const fn float(name: &'static str, description: &'static str, unit: &'static str) -> Self {
        Self {
            name,
            description,
            unit,
            value_type: PropertyType::Float,
        }
    }

    /// Describe an unsigned integer parameter
    pub const fn uint32(name: &'static str, description: &'static str, unit: &'static str) -> Self {
        Self {
            name,
            description,
            unit,
            value_type: PropertyType::Uint32,
        }
    }
}
