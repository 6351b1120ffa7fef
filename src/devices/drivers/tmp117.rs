//! TMP117 High-Accuracy Temperature Sensor
//!
//! TI TMP117, 16-bit big-endian registers. The chip converts continuously
//! after power-up; initialization only applies the averaging mode.

use crate::core::properties::{ParameterInfo, PropertyMetadata, PropertyValue};
use crate::devices::factory::DeviceDriver;
use crate::devices::traits::{Device, DeviceCore, DeviceError};
use crate::platform::{I2cInterface, I2cRegisterExt};

/// Temperature result
const REG_TEMP_RESULT: u8 = 0x00;

/// Configuration
const REG_CONFIGURATION: u8 = 0x01;

/// Device ID
const REG_DEVICE_ID: u8 = 0x0F;

/// DID field of the device id register
const DEVICE_ID_MASK: u16 = 0x0FFF;

/// Expected DID
const DEVICE_ID: u16 = 0x0117;

/// AVG[1:0] field of the configuration register
const AVG_SHIFT: u16 = 5;
const AVG_MASK: u16 = 0b11 << AVG_SHIFT;

/// °C per LSB
pub const RESOLUTION: f32 = 0.0078125;

const PARAMETERS: &[ParameterInfo] = &[ParameterInfo::float("temperature", "Temperature", "C")];

/// Conversion averaging mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Averaging {
    /// No averaging
    None,
    /// 8 averaged conversions (power-on default)
    #[default]
    Avg8,
    /// 32 averaged conversions
    Avg32,
    /// 64 averaged conversions
    Avg64,
}

impl Averaging {
    /// Mode for a property index (0..=3)
    pub fn from_index(index: u8) -> Self {
        match index {
            0 => Averaging::None,
            2 => Averaging::Avg32,
            3 => Averaging::Avg64,
            _ => Averaging::Avg8,
        }
    }

    /// AVG field value
    pub fn register_value(self) -> u16 {
        match self {
            Averaging::None => 0b00,
            Averaging::Avg8 => 0b01,
            Averaging::Avg32 => 0b10,
            Averaging::Avg64 => 0b11,
        }
    }
}

/// TMP117 driver
#[derive(Debug)]
pub struct Tmp117 {
    core: DeviceCore,
}

impl Default for Tmp117 {
    fn default() -> Self {
        let mut core = DeviceCore::new(Self::NAME, Self::ADDRESSES[0]);
        core.define_property(PropertyMetadata::new_uint8(
            "averaging",
            "Conversion averaging (0=off, 1=8, 2=32, 3=64)",
            1,
            0,
            3,
        ));
        Self { core }
    }
}

impl Tmp117 {
    /// Averaging mode from the current property value
    pub fn averaging(&self) -> Averaging {
        Averaging::from_index(self.core.properties.get_u8("averaging", 1))
    }
}

impl Device for Tmp117 {
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
        let config = bus.read_reg_u16_be(address, REG_CONFIGURATION)?;
        let config = (config & !AVG_MASK) | (self.averaging().register_value() << AVG_SHIFT);
        bus.write_reg_u16_be(address, REG_CONFIGURATION, config)?;

        self.core.set_initialized(true);
        crate::log_info!("TMP117 initialized at {:#x}", address);
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
        if name != "temperature" {
            return Err(DeviceError::UnknownParameter);
        }
        if !self.is_initialized() {
            return Err(DeviceError::NotInitialized);
        }

        let raw = bus.read_reg_u16_be(self.address(), REG_TEMP_RESULT)? as i16;
        Ok(PropertyValue::Float(f32::from(raw) * RESOLUTION))
    }
}

impl DeviceDriver for Tmp117 {
    const NAME: &'static str = "TMP117";
    const ADDRESSES: &'static [u8] = &[0x48, 0x49, 0x4A, 0x4B];

    fn probe(bus: &mut dyn I2cInterface, address: u8) -> bool {
        match bus.read_reg_u16_be(address, REG_DEVICE_ID) {
            Ok(id) => id & DEVICE_ID_MASK == DEVICE_ID,
            Err(_) => false,
        }
    }
}
