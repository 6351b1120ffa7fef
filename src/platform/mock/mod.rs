//! Mock platform implementation for testing
//!
//! This module provides a simulated I2C bus that can be used for unit
//! testing drivers and discovery without actual hardware.
//!
//! # Feature Gate
//!
//! This module is available in two contexts:
//! - During test builds (`#[cfg(test)]`)
//! - When the `mock` feature is enabled
//!
//! # Example
//!
//! ```ignore
//! use qwiic_devices::platform::mock::{MockI2c, MockTarget};
//! use qwiic_devices::platform::traits::I2cInterface;
//!
//! let mut bus = MockI2c::new(Default::default());
//! bus.attach(0x48, MockTarget::new().with_registers(0x0F, &[0x01, 0x17]));
//! assert!(bus.ping(0x48));
//! assert!(!bus.ping(0x49));
//! ```

#![cfg(any(test, feature = "mock"))]

mod i2c;

pub use i2c::{I2cTransaction, MockI2c, MockTarget};
