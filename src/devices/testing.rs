//! Test driver and bus fixtures shared by the factory tests

use crate::core::properties::{ParameterInfo, PropertyValue};
use crate::devices::factory::{DeviceDriver, NULL_ADDRESS};
use crate::devices::traits::{Device, DeviceCore, DeviceError};
use crate::platform::mock::{MockI2c, MockTarget};
use crate::platform::{I2cConfig, I2cInterface, I2cRegisterExt};

pub const FAKE_ID_REG: u8 = 0x00;
pub const FAKE_STATUS_REG: u8 = 0x01;
pub const FAKE_INIT_REG: u8 = 0x02;
pub const FAKE_VALUE_REG: u8 = 0x03;

pub const FAKE_ID: u8 = 0xFA;
/// Status value that makes `initialize` fail
pub const FAKE_FAIL_MARKER: u8 = 0xEE;

const PARAMETERS: &[ParameterInfo] = &[ParameterInfo::uint32("value", "Raw value", "")];

/// Minimal register-file driver
#[derive(Debug)]
pub struct Fake {
    core: DeviceCore,
}

impl Default for Fake {
    fn default() -> Self {
        Self {
            core: DeviceCore::new(Self::NAME, Self::ADDRESSES[0]),
        }
    }
}

impl Device for Fake {
    fn core(&self) -> &DeviceCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut DeviceCore {
        &mut self.core
    }

    fn driver(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&mut self, bus: &mut dyn I2cInterface) -> Result<(), DeviceError> {
        let address = self.address();
        if bus.read_reg(address, FAKE_STATUS_REG)? == FAKE_FAIL_MARKER {
            return Err(DeviceError::InvalidData);
        }
        bus.write_reg(address, FAKE_INIT_REG, 1)?;
        self.core.set_initialized(true);
        Ok(())
    }

    fn parameters(&self) -> &'static [ParameterInfo] {
        PARAMETERS
    }

    fn read_parameter(
        &mut self,
        bus: &mut dyn I2cInterface,
        name: &str,
    ) -> Result<PropertyValue, DeviceError> {
        if name != "value" {
            return Err(DeviceError::UnknownParameter);
        }
        if !self.is_initialized() {
            return Err(DeviceError::NotInitialized);
        }
        let raw = bus.read_reg(self.address(), FAKE_VALUE_REG)?;
        Ok(PropertyValue::Uint32(u32::from(raw)))
    }
}

impl DeviceDriver for Fake {
    const NAME: &'static str = "FAKE";
    // 0x12 sits behind the sentinel and is never probed
    const ADDRESSES: &'static [u8] = &[0x10, 0x11, NULL_ADDRESS, 0x12];

    fn probe(bus: &mut dyn I2cInterface, address: u8) -> bool {
        matches!(bus.read_reg(address, FAKE_ID_REG), Ok(FAKE_ID))
    }
}

/// Bus with a fake chip at each of `addresses`
pub fn fake_bus(addresses: &[u8]) -> MockI2c {
    let mut bus = MockI2c::new(I2cConfig::default());
    for &address in addresses {
        bus.attach(
            address,
            MockTarget::new().with_registers(u16::from(FAKE_ID_REG), &[FAKE_ID, 0x00, 0x00, 0x42]),
        );
    }
    bus
}
