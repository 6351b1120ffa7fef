//! Property value types
//!
//! Typed values shared by managed properties (configuration written by the
//! application) and output parameters (values read from a device).

use core::fmt;
use heapless::String;

/// Maximum string property length
pub const MAX_STRING_LEN: usize = 31;

/// Property type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PropertyType {
    /// Boolean flag
    Bool,
    /// 8-bit unsigned integer (register fields, enum selectors)
    Uint8,
    /// 32-bit unsigned integer
    Uint32,
    /// 32-bit signed integer
    Int32,
    /// 32-bit floating point
    Float,
    /// Bounded string
    String,
}

/// Property value (union of supported types)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PropertyValue {
    /// Boolean value
    Bool(bool),
    /// 8-bit unsigned value
    Uint8(u8),
    /// 32-bit unsigned value
    Uint32(u32),
    /// 32-bit signed value
    Int32(i32),
    /// Float value
    Float(f32),
    /// String value (max 31 chars)
    String(String<MAX_STRING_LEN>),
}

impl PropertyValue {
    /// Get property type
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::Bool(_) => PropertyType::Bool,
            PropertyValue::Uint8(_) => PropertyType::Uint8,
            PropertyValue::Uint32(_) => PropertyType::Uint32,
            PropertyValue::Int32(_) => PropertyType::Int32,
            PropertyValue::Float(_) => PropertyType::Float,
            PropertyValue::String(_) => PropertyType::String,
        }
    }

    /// Build a string value, truncating at `MAX_STRING_LEN` bytes on a char boundary
    pub fn from_str_truncated(text: &str) -> Self {
        let mut value = String::new();
        for c in text.chars() {
            if value.push(c).is_err() {
                break;
            }
        }
        PropertyValue::String(value)
    }

    /// Numeric view of the value, `None` for bool and string
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            PropertyValue::Uint8(v) => Some(f32::from(v)),
            PropertyValue::Uint32(v) => Some(v as f32),
            PropertyValue::Int32(v) => Some(v as f32),
            PropertyValue::Float(v) => Some(v),
            PropertyValue::Bool(_) | PropertyValue::String(_) => None,
        }
    }

    /// Get the value as u8 if it is a `Uint8`
    pub fn as_u8(&self) -> Option<u8> {
        match *self {
            PropertyValue::Uint8(v) => Some(v),
            _ => None,
        }
    }

    /// Get the value as u32 if it is a `Uint32`
    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            PropertyValue::Uint32(v) => Some(v),
            _ => None,
        }
    }

    /// Get the value as bool if it is a `Bool`
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            PropertyValue::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{}", v),
            PropertyValue::Uint8(v) => write!(f, "{}", v),
            PropertyValue::Uint32(v) => write!(f, "{}", v),
            PropertyValue::Int32(v) => write!(f, "{}", v),
            PropertyValue::Float(v) => write!(f, "{}", v),
            PropertyValue::String(v) => write!(f, "{}", v.as_str()),
        }
    }
}
