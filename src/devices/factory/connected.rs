//! Connected-device registry
//!
//! Ordered list of instantiated devices. The list owns its devices and
//! enforces that no two I2C devices claim the same bus address. Devices
//! created by discovery are marked autoload; an explicitly constructed
//! device for the same part replaces (prunes) the autoloaded one.

use super::FactoryError;
use crate::core::properties::{ParameterInfo, PropertyValue};
use crate::devices::traits::{BusKind, Device, DeviceError};
use crate::platform::I2cInterface;
use alloc::boxed::Box;
use alloc::vec::Vec;

/// Ordered list of connected devices
#[derive(Default)]
pub struct ConnectedDevices {
    devices: Vec<Box<dyn Device>>,
}

impl ConnectedDevices {
    /// Create an empty list
    pub const fn new() -> Self {
        Self {
            devices: Vec::new(),
        }
    }

    /// Check whether an I2C address is claimed by a connected device
    ///
    /// SPI devices never claim I2C addresses.
    pub fn is_address_claimed(&self, kind: BusKind, address: u8) -> bool {
        kind == BusKind::I2c
            && self
                .devices
                .iter()
                .any(|d| d.kind() == BusKind::I2c && d.address() == address)
    }

    /// Append a device
    ///
    /// # Errors
    ///
    /// `AddressInUse` if another I2C device already claims the address; the
    /// rejected device is dropped.
    pub fn add(&mut self, device: Box<dyn Device>) -> Result<(), FactoryError> {
        if self.is_address_claimed(device.kind(), device.address()) {
            return Err(FactoryError::AddressInUse(device.address()));
        }
        self.devices.push(device);
        Ok(())
    }

    /// Add an explicitly constructed device
    ///
    /// Marks the device as not autoloaded, prunes an autoloaded instance of
    /// the same part, then adds it.
    pub fn attach(&mut self, mut device: Box<dyn Device>) -> Result<(), FactoryError> {
        device.set_autoload(false);
        if let Some(pruned) = self.prune(device.as_ref()) {
            crate::log_info!(
                "Replacing autoloaded {} at {:#x} with explicit instance",
                pruned.name(),
                pruned.address()
            );
        }
        self.add(device)
    }

    /// Remove the autoloaded device that represents the same part as `candidate`
    ///
    /// At most one entry is removed per call. Explicitly constructed entries
    /// are never pruned.
    pub fn prune(&mut self, candidate: &dyn Device) -> Option<Box<dyn Device>> {
        let index = self
            .devices
            .iter()
            .position(|d| d.is_autoload() && d.is_same_part(candidate))?;
        Some(self.devices.remove(index))
    }

    /// Iterate over devices in connection order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Device> + '_ {
        self.devices.iter().map(|d| d.as_ref())
    }

    /// Iterate mutably over devices in connection order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Device>> + '_ {
        self.devices.iter_mut()
    }

    /// Get device by display name
    pub fn get(&self, name: &str) -> Option<&dyn Device> {
        self.iter().find(|d| d.name() == name)
    }

    /// Get device by display name, mutable
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Box<dyn Device>> {
        self.devices.iter_mut().find(|d| d.name() == name)
    }

    /// Get the I2C device claiming `address`
    pub fn at_address(&self, address: u8) -> Option<&dyn Device> {
        self.iter()
            .find(|d| d.kind() == BusKind::I2c && d.address() == address)
    }

    /// Remove and return a device by display name
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Device>> {
        let index = self.devices.iter().position(|d| d.name() == name)?;
        Some(self.devices.remove(index))
    }

    /// Number of connected devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Check if no devices are connected
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Drop every device
    pub fn clear(&mut self) {
        self.devices.clear();
    }

    /// Remove every device, in connection order
    pub fn drain(&mut self) -> impl Iterator<Item = Box<dyn Device>> + '_ {
        self.devices.drain(..)
    }

    /// Read every output parameter of every initialized device
    ///
    /// Each successful read is passed to `visitor`. A failing read is logged
    /// and skipped; the remaining parameters and devices are still read.
    ///
    /// # Returns
    ///
    /// Number of values delivered to `visitor`.
    pub fn read_all<F>(&mut self, bus: &mut dyn I2cInterface, mut visitor: F) -> usize
    where
        F: FnMut(&dyn Device, &ParameterInfo, &PropertyValue),
    {
        let mut delivered = 0;
        for device in self.devices.iter_mut() {
            if !device.is_initialized() {
                continue;
            }
            for info in device.parameters() {
                match device.read_parameter(bus, info.name) {
                    Ok(value) => {
                        visitor(device.as_ref(), info, &value);
                        delivered += 1;
                    }
                    Err(e) => {
                        log_read_failure(device.name(), info.name, e);
                    }
                }
            }
        }
        delivered
    }
}

fn log_read_failure(device: &str, parameter: &str, error: DeviceError) {
    crate::log_warn!("{}.{} read failed: {:?}", device, parameter, error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::testing::{fake_bus, Fake};
    use crate::devices::traits::DeviceCore;

    fn fake(address: u8, autoload: bool) -> Box<dyn Device> {
        let mut device = Box::new(Fake::default());
        device.set_address(address);
        device.set_autoload(autoload);
        device
    }

    #[test]
    fn test_add_rejects_claimed_address() {
        let mut list = ConnectedDevices::new();
        list.add(fake(0x10, true)).unwrap();

        assert_eq!(list.add(fake(0x10, false)), Err(FactoryError::AddressInUse(0x10)));
        assert_eq!(list.len(), 1);

        list.add(fake(0x11, false)).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_spi_devices_do_not_claim_addresses() {
        struct SpiFake(DeviceCore);
        impl Device for SpiFake {
            fn core(&self) -> &DeviceCore {
                &self.0
            }
            fn core_mut(&mut self) -> &mut DeviceCore {
                &mut self.0
            }
            fn driver(&self) -> &'static str {
                "SPI_FAKE"
            }
            fn kind(&self) -> BusKind {
                BusKind::Spi
            }
            fn initialize(&mut self, _bus: &mut dyn I2cInterface) -> Result<(), DeviceError> {
                Ok(())
            }
            fn parameters(&self) -> &'static [ParameterInfo] {
                &[]
            }
            fn read_parameter(
                &mut self,
                _bus: &mut dyn I2cInterface,
                _name: &str,
            ) -> Result<PropertyValue, DeviceError> {
                Err(DeviceError::UnknownParameter)
            }
        }

        let mut list = ConnectedDevices::new();
        list.add(Box::new(SpiFake(DeviceCore::new("spi", 0x10)))).unwrap();
        assert!(!list.is_address_claimed(BusKind::I2c, 0x10));
        list.add(fake(0x10, true)).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_prune_removes_at_most_one_autoloaded_match() {
        let mut list = ConnectedDevices::new();
        list.add(fake(0x10, true)).unwrap();
        list.add(fake(0x11, true)).unwrap();

        let candidate = fake(0x10, false);
        let pruned = list.prune(candidate.as_ref()).expect("autoloaded match");
        assert_eq!(pruned.address(), 0x10);
        assert_eq!(list.len(), 1);

        // Nothing left to prune at 0x10
        assert!(list.prune(candidate.as_ref()).is_none());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_prune_keeps_explicit_devices() {
        let mut list = ConnectedDevices::new();
        list.add(fake(0x10, false)).unwrap();

        assert!(list.prune(fake(0x10, false).as_ref()).is_none());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_attach_replaces_autoloaded_instance() {
        let mut list = ConnectedDevices::new();
        list.add(fake(0x10, true)).unwrap();

        let mut explicit = fake(0x10, true);
        explicit.set_name("explicit");
        list.attach(explicit).unwrap();

        assert_eq!(list.len(), 1);
        let device = list.at_address(0x10).unwrap();
        assert_eq!(device.name(), "explicit");
        assert!(!device.is_autoload());

        // A second explicit instance of the same part collides
        assert_eq!(list.attach(fake(0x10, false)), Err(FactoryError::AddressInUse(0x10)));
    }

    #[test]
    fn test_lookup_and_remove() {
        let mut list = ConnectedDevices::new();
        let mut device = fake(0x10, false);
        device.set_name("left");
        list.add(device).unwrap();

        assert!(list.get("left").is_some());
        list.get_mut("left").unwrap().set_name("right");
        assert!(list.get("left").is_none());

        let removed = list.remove("right").unwrap();
        assert_eq!(removed.address(), 0x10);
        assert!(list.is_empty());
    }

    #[test]
    fn test_read_all_skips_uninitialized_and_failures() {
        let mut bus = fake_bus(&[0x10, 0x11]);
        let mut list = ConnectedDevices::new();

        let mut ready = fake(0x10, true);
        ready.initialize(&mut bus).unwrap();
        list.add(ready).unwrap();
        list.add(fake(0x11, true)).unwrap(); // never initialized

        let mut seen = std::vec::Vec::new();
        let delivered = list.read_all(&mut bus, |device, info, value| {
            seen.push((device.address(), info.name, value.clone()));
        });

        assert_eq!(delivered, 1);
        assert_eq!(seen, [(0x10, "value", PropertyValue::Uint32(0x42))]);

        // Chip vanishes: the read fails and nothing is delivered
        bus.detach(0x10);
        assert_eq!(list.read_all(&mut bus, |_, _, _| {}), 0);
    }
}
