//! Blocking I2C bus interface
//!
//! The one bus abstraction drivers, probes and the discovery scan use.
//! Implemented by `HalI2c` for real hardware and by `MockI2c` in tests.

use crate::platform::Result;

/// Bus settings
#[derive(Debug, Clone, Copy)]
pub struct I2cConfig {
    /// SCL frequency in Hz
    pub frequency: u32,
    /// Per-transaction timeout in microseconds
    pub timeout_us: u32,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self {
            // Standard mode; every Qwiic part supports it
            frequency: 100_000,
            timeout_us: 50_000,
        }
    }
}

/// Blocking I2C bus
///
/// Object safe. Drivers take `&mut dyn I2cInterface` so a single bus serves
/// every device on it; the caller owns the bus and serializes access.
/// Addresses are 7-bit.
pub trait I2cInterface {
    /// Write `data` to the device at `addr` (START, ADDR+W, data, STOP)
    ///
    /// # Errors
    ///
    /// `PlatformError::I2c` on NACK, bus error or timeout.
    fn write(&mut self, addr: u8, data: &[u8]) -> Result<()>;

    /// Fill `buffer` from the device at `addr` (START, ADDR+R, data, STOP)
    fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<()>;

    /// Write `write_data`, then read into `read_buffer` after a repeated START
    ///
    /// The usual register access: write the register pointer, read its value.
    fn write_read(&mut self, addr: u8, write_data: &[u8], read_buffer: &mut [u8]) -> Result<()>;

    /// Change the SCL frequency
    ///
    /// # Errors
    ///
    /// `PlatformError::InvalidConfig` if the bus cannot run at `frequency`.
    fn set_frequency(&mut self, frequency: u32) -> Result<()>;

    /// Block for `us` microseconds
    ///
    /// Chips need settle time between some commands (wake-up, soft reset).
    /// Buses without a delay source leave this as a no-op.
    fn delay_us(&mut self, _us: u32) {}

    /// Check whether any device acknowledges `addr`
    ///
    /// Issues a single-byte read. Used by discovery to skip chip-specific
    /// probes on silent addresses. Several HALs reject zero-length writes
    /// without touching the bus, so an empty write is not used here.
    fn ping(&mut self, addr: u8) -> bool {
        let mut byte = [0u8; 1];
        self.read(addr, &mut byte).is_ok()
    }
}
