//! Platform abstraction traits
//!
//! This module defines the bus traits that platform implementations must provide.

pub mod i2c;
pub mod register;

// Re-export trait interfaces
pub use i2c::{I2cConfig, I2cInterface};
pub use register::I2cRegisterExt;
