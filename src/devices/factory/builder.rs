//! Device builder descriptors
//!
//! A `DeviceBuilder` is the static, immutable description of one driver
//! type: its name, the bus addresses it can appear at, a probe that checks
//! whether the chip is present at an address, and a factory that creates a
//! default instance.

use crate::devices::traits::{BusKind, Device};
use crate::platform::I2cInterface;
use alloc::boxed::Box;

/// Sentinel terminating a candidate address list
///
/// Address 0x00 is the I2C general-call address and never a device address.
pub const NULL_ADDRESS: u8 = 0x00;

/// Static builder metadata carried by a driver type
///
/// Implemented by every driver that can be discovered on a bus. The
/// `register_device!` macro turns an implementation into a registered
/// `DeviceBuilder`.
pub trait DeviceDriver: Device + Default + 'static {
    /// Driver name; also the default display name of created devices
    const NAME: &'static str;

    /// Bus the driver talks to
    const KIND: BusKind = BusKind::I2c;

    /// Candidate addresses in probe order
    const ADDRESSES: &'static [u8];

    /// Check whether this chip answers at `address`
    ///
    /// Must not panic and must not leave the chip in a state that prevents
    /// a later `initialize`.
    fn probe(bus: &mut dyn I2cInterface, address: u8) -> bool;
}

/// Immutable descriptor of a driver type
#[derive(Clone, Copy)]
pub struct DeviceBuilder {
    /// Driver name
    pub name: &'static str,
    /// Bus the driver talks to
    pub kind: BusKind,
    /// Candidate addresses, optionally terminated by `NULL_ADDRESS`
    pub addresses: &'static [u8],
    /// Connectivity probe
    pub probe: fn(&mut dyn I2cInterface, u8) -> bool,
    /// Default-construction factory
    pub create: fn() -> Box<dyn Device>,
}

impl DeviceBuilder {
    /// Builder for a driver type
    pub const fn of<T: DeviceDriver>() -> Self {
        Self {
            name: T::NAME,
            kind: T::KIND,
            addresses: T::ADDRESSES,
            probe: T::probe,
            create: create_device::<T>,
        }
    }

    /// Candidate addresses up to (not including) the first `NULL_ADDRESS`
    pub fn candidates(&self) -> impl Iterator<Item = u8> + '_ {
        self.addresses
            .iter()
            .copied()
            .take_while(|&addr| addr != NULL_ADDRESS)
    }

    /// Create a default instance named after the builder
    pub fn build(&self) -> Box<dyn Device> {
        let mut device = (self.create)();
        device.set_name(self.name);
        device
    }
}

impl core::fmt::Debug for DeviceBuilder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceBuilder")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("addresses", &self.addresses)
            .finish()
    }
}

fn create_device<T: DeviceDriver>() -> Box<dyn Device> {
    Box::new(T::default())
}

/// Register a driver type with the process-wide builder registry
///
/// Declares a `static` `DeviceBuilder` for the type and appends it to the
/// registry. Evaluates to `Result<usize, FactoryError>` with the builder's
/// index.
///
/// # Example
///
/// ```rust,ignore
/// use qwiic_devices::devices::drivers::Bme280;
///
/// qwiic_devices::register_device!(Bme280).ok();
/// ```
#[macro_export]
macro_rules! register_device {
    ($driver:ty) => {{
        static BUILDER: $crate::devices::factory::DeviceBuilder =
            $crate::devices::factory::DeviceBuilder::of::<$driver>();
        $crate::devices::factory::register_builder(&BUILDER)
    }};
}
