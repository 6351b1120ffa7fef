//! Platform abstraction layer
//!
//! This module provides the bus abstraction device drivers are written
//! against. Concrete buses come from a HAL through the `hal` adapter, or from
//! the simulated bus in `mock` for host tests.

pub mod error;
pub mod hal;
pub mod traits;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export commonly used types
pub use error::{I2cError, PlatformError, Result};
pub use traits::{I2cConfig, I2cInterface, I2cRegisterExt};
