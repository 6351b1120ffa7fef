//! embedded-hal I2C adapter
//!
//! Wraps any blocking `embedded_hal::i2c::I2c` bus together with a
//! `DelayNs` source so that it implements `I2cInterface`.
//!
//! # Example
//!
//! ```ignore
//! use qwiic_devices::platform::{hal::HalI2c, traits::I2cConfig};
//!
//! let i2c = hal::i2c::I2c::new(peripherals.I2C0, sda, scl, 400.kHz());
//! let mut bus = HalI2c::new(i2c, delay, I2cConfig { frequency: 400_000, ..Default::default() });
//! ```

use crate::platform::{
    error::{I2cError, PlatformError},
    traits::{I2cConfig, I2cInterface},
    Result,
};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

/// `I2cInterface` implementation over embedded-hal 1.0 traits
pub struct HalI2c<I2C, D> {
    i2c: I2C,
    delay: D,
    config: I2cConfig,
}

impl<I2C: I2c, D: DelayNs> HalI2c<I2C, D> {
    /// Create a new adapter
    ///
    /// # Note
    ///
    /// The frequency in `config` is informational only; embedded-hal has no
    /// runtime clock control, so the HAL must be configured at construction.
    pub fn new(i2c: I2C, delay: D, config: I2cConfig) -> Self {
        Self { i2c, delay, config }
    }

    /// Release the wrapped bus and delay
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    /// Configured bus frequency in Hz
    pub fn frequency(&self) -> u32 {
        self.config.frequency
    }
}

impl<I2C: I2c, D: DelayNs> I2cInterface for HalI2c<I2C, D> {
    fn write(&mut self, addr: u8, data: &[u8]) -> Result<()> {
        self.i2c.write(addr, data).map_err(|e| map_error_kind(e.kind()))
    }

    fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<()> {
        self.i2c.read(addr, buffer).map_err(|e| map_error_kind(e.kind()))
    }

    fn write_read(&mut self, addr: u8, write_data: &[u8], read_buffer: &mut [u8]) -> Result<()> {
        self.i2c
            .write_read(addr, write_data, read_buffer)
            .map_err(|e| map_error_kind(e.kind()))
    }

    fn set_frequency(&mut self, frequency: u32) -> Result<()> {
        if frequency == 0 {
            return Err(PlatformError::InvalidConfig);
        }
        // Recorded only; the HAL clock was fixed when the peripheral was built
        self.config.frequency = frequency;
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }
}

/// Map embedded-hal error kinds to platform I2C errors
fn map_error_kind(kind: ErrorKind) -> PlatformError {
    match kind {
        ErrorKind::NoAcknowledge(_) => PlatformError::I2c(I2cError::Nack),
        ErrorKind::ArbitrationLoss => PlatformError::I2c(I2cError::ArbitrationLost),
        _ => PlatformError::I2c(I2cError::BusError),
    }
}
