//! Device factory
//!
//! Builder registry, bus discovery and the connected-device list, plus the
//! process-wide instance that `register_device!` and `discover_devices`
//! operate on.
//!
//! ## Usage
//!
//! ```ignore
//! use qwiic_devices::devices::{drivers, factory};
//!
//! drivers::register_builtin_drivers();
//! let found = factory::discover_devices(&mut bus);
//! factory::with_connected(|devices| {
//!     for device in devices.iter() {
//!         log_info!("{} at {:#x}", device.name(), device.address());
//!     }
//! });
//! ```

pub mod builder;
pub mod connected;
pub mod discovery;
pub mod registry;

pub use builder::{DeviceBuilder, DeviceDriver, NULL_ADDRESS};
pub use connected::ConnectedDevices;
pub use discovery::{DeviceFactory, DiscoveryConfig, MAX_RESERVED};
pub use registry::{BuilderRegistry, MAX_BUILDERS};

use crate::devices::traits::Device;
use crate::platform::I2cInterface;
use alloc::boxed::Box;
use core::cell::RefCell;
use core::fmt;
use critical_section::Mutex;

/// Factory error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FactoryError {
    /// Fixed-capacity table is full
    RegistryFull,
    /// A builder with the same name is already registered
    DuplicateBuilder,
    /// Another I2C device already claims this address
    AddressInUse(u8),
}

impl fmt::Display for FactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactoryError::RegistryFull => write!(f, "Registry full"),
            FactoryError::DuplicateBuilder => write!(f, "Builder already registered"),
            FactoryError::AddressInUse(addr) => write!(f, "Address {:#04x} in use", addr),
        }
    }
}

/// Process-wide factory
static FACTORY: Mutex<RefCell<DeviceFactory>> = Mutex::new(RefCell::new(DeviceFactory::new()));

/// Register a builder with the process-wide registry
///
/// Normally called through `register_device!`.
pub fn register_builder(builder: &'static DeviceBuilder) -> Result<usize, FactoryError> {
    let result = critical_section::with(|cs| FACTORY.borrow_ref_mut(cs).register(builder));
    match result {
        Ok(index) => crate::log_debug!("Registered builder {} at index {}", builder.name, index),
        Err(e) => crate::log_warn!("Builder {} not registered: {:?}", builder.name, e),
    }
    result
}

/// Number of builders waiting for the next discovery pass
pub fn builder_count() -> usize {
    critical_section::with(|cs| FACTORY.borrow_ref(cs).builders().len())
}

/// Drop every registered builder
pub fn clear_builders() {
    critical_section::with(|cs| FACTORY.borrow_ref_mut(cs).builders_mut().clear());
}

/// Replace the discovery settings of the process-wide factory
pub fn set_discovery_config(config: DiscoveryConfig) {
    critical_section::with(|cs| *FACTORY.borrow_ref_mut(cs).config_mut() = config);
}

/// Run discovery with every registered builder, then clear the builders
///
/// The factory is moved out of the critical section for the duration of the
/// scan. Devices attached from another context while the scan runs are
/// merged back afterwards; builders registered meanwhile are dropped along
/// with the scanned ones.
///
/// # Returns
///
/// Number of devices created.
pub fn discover_devices(bus: &mut dyn I2cInterface) -> usize {
    let mut factory =
        critical_section::with(|cs| core::mem::take(&mut *FACTORY.borrow_ref_mut(cs)));

    let created = factory.discover(bus);
    factory.builders_mut().clear();

    critical_section::with(|cs| {
        let mut slot = FACTORY.borrow_ref_mut(cs);
        let mut pending = core::mem::replace(&mut *slot, factory);
        for device in pending.connected_mut().drain() {
            if let Err(e) = slot.attach(device) {
                crate::log_warn!("Device attached during discovery dropped: {:?}", e);
            }
        }
    });

    created
}

/// Add an explicitly constructed device to the process-wide list
///
/// An autoloaded instance of the same part is pruned first.
pub fn attach_device(device: Box<dyn Device>) -> Result<(), FactoryError> {
    critical_section::with(|cs| FACTORY.borrow_ref_mut(cs).attach(device))
}

/// Run `f` with the process-wide connected-device list
///
/// `f` runs inside a critical section; keep bus I/O short or move devices
/// out with `ConnectedDevices::remove` first.
pub fn with_connected<R>(f: impl FnOnce(&mut ConnectedDevices) -> R) -> R {
    critical_section::with(|cs| f(FACTORY.borrow_ref_mut(cs).connected_mut()))
}

#[cfg(test)]
fn reset() {
    critical_section::with(|cs| *FACTORY.borrow_ref_mut(cs) = DeviceFactory::new());
}
