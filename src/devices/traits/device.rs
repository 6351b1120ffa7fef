//! Device Trait and Common State
//!
//! Bus-independent interface every driver exposes to the factory and to the
//! application: identity (name, bus address, autoload flag), an
//! initialization hook, managed properties and readable output parameters.
//!
//! ## Usage
//!
//! ```ignore
//! use qwiic_devices::devices::traits::Device;
//!
//! fn dump(device: &mut dyn Device, bus: &mut dyn I2cInterface) {
//!     for info in device.parameters() {
//!         if let Ok(value) = device.read_parameter(bus, info.name) {
//!             log_info!("{}.{} = {}", device.name(), info.name, value);
//!         }
//!     }
//! }
//! ```

use crate::core::properties::{
    ParameterInfo, PropertyError, PropertyMetadata, PropertyTable, PropertyValue,
};
use crate::platform::{I2cInterface, PlatformError};
use core::fmt;
use heapless::String;

/// Maximum device display name length
pub const MAX_NAME_LEN: usize = 32;

/// Bus a device is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusKind {
    /// I2C device, identified by a 7-bit address
    I2c,
    /// SPI device, identified by its chip-select line
    Spi,
}

/// Device error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceError {
    /// Bus communication failed
    Bus(PlatformError),

    /// Operation requires a successful `initialize`
    NotInitialized,

    /// Chip did not identify as the expected part
    NotConnected,

    /// Checksum on received data did not match
    CrcMismatch,

    /// Data validation failed (e.g., chip reported an error flag)
    InvalidData,

    /// Device has no output parameter with this name
    UnknownParameter,

    /// Property access failed
    Property(PropertyError),
}

impl From<PlatformError> for DeviceError {
    fn from(e: PlatformError) -> Self {
        DeviceError::Bus(e)
    }
}

impl From<PropertyError> for DeviceError {
    fn from(e: PropertyError) -> Self {
        DeviceError::Property(e)
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Bus(e) => write!(f, "{}", e),
            DeviceError::NotInitialized => write!(f, "Device not initialized"),
            DeviceError::NotConnected => write!(f, "Device not connected"),
            DeviceError::CrcMismatch => write!(f, "CRC mismatch"),
            DeviceError::InvalidData => write!(f, "Invalid data"),
            DeviceError::UnknownParameter => write!(f, "Unknown parameter"),
            DeviceError::Property(e) => write!(f, "{}", e),
        }
    }
}

/// Identity and configuration state shared by every driver
#[derive(Debug, Clone)]
pub struct DeviceCore {
    name: String<MAX_NAME_LEN>,
    address: u8,
    autoload: bool,
    initialized: bool,
    /// Managed properties of the device
    pub properties: PropertyTable,
}

impl DeviceCore {
    /// Create core state with a display name and default address
    pub fn new(name: &str, address: u8) -> Self {
        let mut core = Self {
            name: String::new(),
            address,
            autoload: false,
            initialized: false,
            properties: PropertyTable::new(),
        };
        core.set_name(name);
        core
    }

    /// Display name
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Set the display name, truncated to `MAX_NAME_LEN` bytes
    pub fn set_name(&mut self, name: &str) {
        self.name.clear();
        for c in name.chars() {
            if self.name.push(c).is_err() {
                break;
            }
        }
    }

    /// Bus address
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Set bus address
    pub fn set_address(&mut self, address: u8) {
        self.address = address;
    }

    /// Created by a discovery scan rather than by application code
    pub fn is_autoload(&self) -> bool {
        self.autoload
    }

    /// Set the autoload flag
    pub fn set_autoload(&mut self, autoload: bool) {
        self.autoload = autoload;
    }

    /// Whether `initialize` has completed successfully
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Record the outcome of `initialize`
    pub fn set_initialized(&mut self, initialized: bool) {
        self.initialized = initialized;
    }

    /// Define a managed property, logging (not failing) if the table rejects it
    pub fn define_property(&mut self, metadata: PropertyMetadata) {
        let name = metadata.name;
        if let Err(e) = self.properties.define(metadata) {
            crate::log_error!("{}: property {} not defined: {:?}", self.name(), name, e);
        }
    }
}

/// Uniform device interface
///
/// Drivers implement `core`, `core_mut`, `driver`, `initialize`,
/// `parameters` and `read_parameter`; identity and property access come
/// from default methods over `DeviceCore`.
pub trait Device: Send {
    /// Common identity state
    fn core(&self) -> &DeviceCore;

    /// Common identity state, mutable
    fn core_mut(&mut self) -> &mut DeviceCore;

    /// Driver type name; two devices with the same driver and address are
    /// the same physical part
    fn driver(&self) -> &'static str;

    /// Bus the device is attached to
    fn kind(&self) -> BusKind {
        BusKind::I2c
    }

    /// Configure the chip
    ///
    /// Called once after the device is created, with the current property
    /// values. Drivers must call `core_mut().set_initialized(true)` on
    /// success.
    fn initialize(&mut self, bus: &mut dyn I2cInterface) -> Result<(), DeviceError>;

    /// Output parameters this device can be read for
    fn parameters(&self) -> &'static [ParameterInfo];

    /// Read one output parameter from the chip
    fn read_parameter(
        &mut self,
        bus: &mut dyn I2cInterface,
        name: &str,
    ) -> Result<PropertyValue, DeviceError>;

    /// Display name
    fn name(&self) -> &str {
        self.core().name()
    }

    /// Set the display name
    fn set_name(&mut self, name: &str) {
        self.core_mut().set_name(name);
    }

    /// Bus address
    fn address(&self) -> u8 {
        self.core().address()
    }

    /// Set the bus address (before `initialize`)
    fn set_address(&mut self, address: u8) {
        self.core_mut().set_address(address);
    }

    /// Created by a discovery scan
    fn is_autoload(&self) -> bool {
        self.core().is_autoload()
    }

    /// Set the autoload flag
    fn set_autoload(&mut self, autoload: bool) {
        self.core_mut().set_autoload(autoload);
    }

    /// Whether `initialize` has completed successfully
    fn is_initialized(&self) -> bool {
        self.core().is_initialized()
    }

    /// Managed properties
    fn properties(&self) -> &PropertyTable {
        &self.core().properties
    }

    /// Write a managed property
    ///
    /// The value takes effect at the next `initialize`.
    fn set_property(&mut self, name: &str, value: PropertyValue) -> Result<(), DeviceError> {
        self.core_mut().properties.set(name, value)?;
        Ok(())
    }

    /// Same physical part: same driver type and same bus address
    fn is_same_part(&self, other: &dyn Device) -> bool {
        self.driver() == other.driver()
            && self.kind() == other.kind()
            && self.address() == other.address()
    }
}
