//! CCS811 Air Quality Sensor
//!
//! ams CCS811 eCO2/TVOC sensor. After reset the chip runs its boot loader;
//! initialization starts the application firmware and selects the drive
//! mode.

use crate::core::properties::{ParameterInfo, PropertyMetadata, PropertyValue};
use crate::devices::factory::DeviceDriver;
use crate::devices::traits::{Device, DeviceCore, DeviceError};
use crate::platform::{I2cInterface, I2cRegisterExt};

// =============================================================================
// Registers
// =============================================================================

const REG_STATUS: u8 = 0x00;
const REG_MEAS_MODE: u8 = 0x01;
const REG_ALG_RESULT_DATA: u8 = 0x02;
const REG_HW_ID: u8 = 0x20;
const REG_ERROR_ID: u8 = 0xE0;

/// Boot loader command: start application firmware (no data)
const CMD_APP_START: u8 = 0xF4;

/// Expected HW_ID
const HW_ID: u8 = 0x81;

/// STATUS bits
const STATUS_ERROR: u8 = 0x01;
const STATUS_APP_VALID: u8 = 0x10;
const STATUS_FW_MODE: u8 = 0x80;

/// DRIVE_MODE field of MEAS_MODE
const DRIVE_MODE_SHIFT: u8 = 4;

/// Application start time (max 1 ms)
const APP_START_US: u32 = 1_000;

const PARAMETERS: &[ParameterInfo] = &[
    ParameterInfo::uint32("eco2", "Equivalent CO2", "ppm"),
    ParameterInfo::uint32("tvoc", "Total volatile organic compounds", "ppb"),
];

/// Measurement drive mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveMode {
    /// Measurements disabled
    Idle,
    /// Constant power, one measurement per second
    #[default]
    Every1s,
    /// Pulse heating, one measurement every 10 s
    Every10s,
    /// Low power pulse heating, one measurement every 60 s
    Every60s,
    /// Constant power, raw data every 250 ms (no algorithm results)
    Every250ms,
}

impl DriveMode {
    /// Mode for a property index (0..=4)
    pub fn from_index(index: u8) -> Self {
        match index {
            0 => DriveMode::Idle,
            2 => DriveMode::Every10s,
            3 => DriveMode::Every60s,
            4 => DriveMode::Every250ms,
            _ => DriveMode::Every1s,
        }
    }

    /// MEAS_MODE register value (interrupts disabled)
    pub fn register_value(self) -> u8 {
        let mode = match self {
            DriveMode::Idle => 0,
            DriveMode::Every1s => 1,
            DriveMode::Every10s => 2,
            DriveMode::Every60s => 3,
            DriveMode::Every250ms => 4,
        };
        mode << DRIVE_MODE_SHIFT
    }
}

/// CCS811 driver
#[derive(Debug)]
pub struct Ccs811 {
    core: DeviceCore,
}

impl Default for Ccs811 {
    fn default() -> Self {
        let mut core = DeviceCore::new(Self::NAME, Self::ADDRESSES[0]);
        core.define_property(PropertyMetadata::new_uint8(
            "drive_mode",
            "Drive mode (0=idle, 1=1s, 2=10s, 3=60s, 4=250ms raw)",
            1,
            0,
            4,
        ));
        Self { core }
    }
}

impl Ccs811 {
    /// Drive mode from the current property value
    pub fn drive_mode(&self) -> DriveMode {
        DriveMode::from_index(self.core.properties.get_u8("drive_mode", 1))
    }

    fn check_status(&self, bus: &mut dyn I2cInterface, status: u8) -> Result<(), DeviceError> {
        if status & STATUS_ERROR != 0 {
            let error_id = bus.read_reg(self.address(), REG_ERROR_ID)?;
            crate::log_warn!("CCS811 at {:#x} error {:#x}", self.address(), error_id);
            return Err(DeviceError::InvalidData);
        }
        Ok(())
    }
}

impl Device for Ccs811 {
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

        let status = bus.read_reg(address, REG_STATUS)?;
        self.check_status(bus, status)?;
        if status & STATUS_APP_VALID == 0 {
            crate::log_error!("CCS811 at {:#x}: no valid application firmware", address);
            return Err(DeviceError::InvalidData);
        }

        bus.write(address, &[CMD_APP_START])?;
        bus.delay_us(APP_START_US);

        let status = bus.read_reg(address, REG_STATUS)?;
        self.check_status(bus, status)?;
        if status & STATUS_FW_MODE == 0 {
            crate::log_error!("CCS811 at {:#x}: still in boot mode", address);
            return Err(DeviceError::InvalidData);
        }

        bus.write_reg(address, REG_MEAS_MODE, self.drive_mode().register_value())?;

        self.core.set_initialized(true);
        crate::log_info!("CCS811 initialized at {:#x}", address);
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
        let eco2 = match name {
            "eco2" => true,
            "tvoc" => false,
            _ => return Err(DeviceError::UnknownParameter),
        };
        if !self.is_initialized() {
            return Err(DeviceError::NotInitialized);
        }

        // eCO2, TVOC, STATUS, ERROR_ID
        let mut data = [0u8; 6];
        bus.read_regs(self.address(), REG_ALG_RESULT_DATA, &mut data)?;
        self.check_status(bus, data[4])?;

        let value = if eco2 {
            u16::from_be_bytes([data[0], data[1]])
        } else {
            u16::from_be_bytes([data[2], data[3]])
        };
        Ok(PropertyValue::Uint32(u32::from(value)))
    }
}

impl DeviceDriver for Ccs811 {
    const NAME: &'static str = "CCS811";
    const ADDRESSES: &'static [u8] = &[0x5B, 0x5A];

    fn probe(bus: &mut dyn I2cInterface, address: u8) -> bool {
        matches!(bus.read_reg(address, REG_HW_ID), Ok(HW_ID))
    }
}
