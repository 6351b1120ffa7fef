//! VL53L1X Time-of-Flight Distance Sensor
//!
//! ST VL53L1X. Registers sit behind a 16-bit pointer. Initialization waits
//! for firmware boot, programs the inter-measurement period and starts
//! continuous ranging with the chip's power-on configuration.

use crate::core::properties::{ParameterInfo, PropertyMetadata, PropertyValue};
use crate::devices::factory::DeviceDriver;
use crate::devices::traits::{Device, DeviceCore, DeviceError};
use crate::platform::{I2cInterface, I2cRegisterExt};

// =============================================================================
// Registers
// =============================================================================

const SYSTEM_INTERRUPT_CLEAR: u16 = 0x0086;
const SYSTEM_MODE_START: u16 = 0x0087;
const RESULT_FINAL_RANGE_MM: u16 = 0x0096;
const SYSTEM_INTERMEASUREMENT_PERIOD: u16 = 0x006C;
const RESULT_OSC_CALIBRATE_VAL: u16 = 0x00DE;
const FIRMWARE_SYSTEM_STATUS: u16 = 0x00E5;
const IDENTIFICATION_MODEL_ID: u16 = 0x010F;

/// Model id and module type
const MODEL_ID: [u8; 2] = [0xEA, 0xCC];

const MODE_START_CONTINUOUS: u8 = 0x40;
const INTERRUPT_CLEAR: u8 = 0x01;

/// Oscillator calibration field
const OSC_CALIBRATE_MASK: u16 = 0x03FF;

/// Boot polling
const BOOT_ATTEMPTS: u32 = 10;
const BOOT_POLL_US: u32 = 1_000;

pub const DEFAULT_INTERMEASUREMENT_MS: u32 = 100;

const PARAMETERS: &[ParameterInfo] = &[ParameterInfo::uint32("distance", "Distance", "mm")];

/// VL53L1X driver
#[derive(Debug)]
pub struct Vl53l1x {
    core: DeviceCore,
}

impl Default for Vl53l1x {
    fn default() -> Self {
        let mut core = DeviceCore::new(Self::NAME, Self::ADDRESSES[0]);
        core.define_property(PropertyMetadata::new_uint32(
            "intermeasurement_ms",
            "Period between ranging measurements",
            DEFAULT_INTERMEASUREMENT_MS,
            20,
            10_000,
        ));
        Self { core }
    }
}

impl Vl53l1x {
    fn wait_for_boot(&self, bus: &mut dyn I2cInterface) -> Result<(), DeviceError> {
        let mut state = [0u8; 1];
        for _ in 0..BOOT_ATTEMPTS {
            bus.read_regs16(self.address(), FIRMWARE_SYSTEM_STATUS, &mut state)?;
            if state[0] & 0x01 != 0 {
                return Ok(());
            }
            bus.delay_us(BOOT_POLL_US);
        }
        crate::log_error!("VL53L1X at {:#x} did not boot", self.address());
        Err(DeviceError::NotConnected)
    }

    /// Program the inter-measurement period, scaled by the oscillator trim
    fn set_intermeasurement(&self, bus: &mut dyn I2cInterface, ms: u32) -> Result<(), DeviceError> {
        let mut osc = [0u8; 2];
        bus.read_regs16(self.address(), RESULT_OSC_CALIBRATE_VAL, &mut osc)?;
        let clock_pll = u16::from_be_bytes(osc) & OSC_CALIBRATE_MASK;

        let period = (f32::from(clock_pll) * ms as f32 * 1.075) as u32;
        bus.write_reg16_u32_be(self.address(), SYSTEM_INTERMEASUREMENT_PERIOD, period)?;
        Ok(())
    }
}

impl Device for Vl53l1x {
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
        self.wait_for_boot(bus)?;

        let ms = self
            .core
            .properties
            .get_u32("intermeasurement_ms", DEFAULT_INTERMEASUREMENT_MS);
        self.set_intermeasurement(bus, ms)?;

        bus.write_reg16(address, SYSTEM_INTERRUPT_CLEAR, INTERRUPT_CLEAR)?;
        bus.write_reg16(address, SYSTEM_MODE_START, MODE_START_CONTINUOUS)?;

        self.core.set_initialized(true);
        crate::log_info!("VL53L1X initialized at {:#x}, period {} ms", address, ms);
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
        if name != "distance" {
            return Err(DeviceError::UnknownParameter);
        }
        if !self.is_initialized() {
            return Err(DeviceError::NotInitialized);
        }

        let address = self.address();
        let mut raw = [0u8; 2];
        bus.read_regs16(address, RESULT_FINAL_RANGE_MM, &mut raw)?;
        bus.write_reg16(address, SYSTEM_INTERRUPT_CLEAR, INTERRUPT_CLEAR)?;

        Ok(PropertyValue::Uint32(u32::from(u16::from_be_bytes(raw))))
    }
}

impl DeviceDriver for Vl53l1x {
    const NAME: &'static str = "VL53L1X";
    const ADDRESSES: &'static [u8] = &[0x29];

    fn probe(bus: &mut dyn I2cInterface, address: u8) -> bool {
        let mut id = [0u8; 2];
        bus.read_regs16(address, IDENTIFICATION_MODEL_ID, &mut id).is_ok() && id == MODEL_ID
    }
}
