//! ICM-20948 9-Axis IMU
//!
//! TDK InvenSense ICM-20948, accelerometer, gyroscope and die temperature.
//! The chip uses a 4-bank register architecture; bank selection goes
//! through REG_BANK_SEL (0x7F), which is present in every bank.
//!
//! All seven values come from one 14-byte burst starting at ACCEL_XOUT_H and
//! are served from that burst until each one has been read.

use crate::core::properties::{ParameterInfo, PropertyMetadata, PropertyValue};
use crate::devices::factory::DeviceDriver;
use crate::devices::traits::{Device, DeviceCore, DeviceError};
use crate::platform::{I2cInterface, I2cRegisterExt};

// =============================================================================
// Registers
// =============================================================================

/// Register bank selection (all banks)
const REG_BANK_SEL: u8 = 0x7F;

/// Bank 0: device id
const WHO_AM_I: u8 = 0x00;

/// Bank 0: power management
const PWR_MGMT_1: u8 = 0x06;
const PWR_MGMT_2: u8 = 0x07;

/// Bank 0: first byte of the accel/gyro/temp burst
const ACCEL_XOUT_H: u8 = 0x2D;

/// Bank 2: gyro configuration
const GYRO_CONFIG_1: u8 = 0x01;

/// Bank 2: accel configuration
const ACCEL_CONFIG: u8 = 0x14;

/// Expected WHO_AM_I
const WHO_AM_I_VALUE: u8 = 0xEA;

/// Clear sleep, auto-select clock
const PWR_MGMT_1_CLKSEL_AUTO: u8 = 0x01;

/// All accel and gyro axes on
const PWR_MGMT_2_ENABLE_ALL: u8 = 0x00;

/// Clock settle time after wakeup
const WAKEUP_US: u32 = 10_000;

/// Temperature: (raw - offset) / sensitivity + 21 °C
const TEMP_SENSITIVITY: f32 = 333.87;
const TEMP_OFFSET: f32 = 21.0;

/// Burst length: accel xyz, gyro xyz, temperature
const BURST_LEN: usize = 14;

/// Register bank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterBank {
    Bank0,
    Bank2,
}

impl RegisterBank {
    /// REG_BANK_SEL value (USER_BANK in bits [5:4])
    pub fn register_value(self) -> u8 {
        match self {
            RegisterBank::Bank0 => 0x00,
            RegisterBank::Bank2 => 0x20,
        }
    }
}

/// Accelerometer full scale range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccelRange {
    /// ±2 g
    G2,
    /// ±4 g
    G4,
    /// ±8 g
    #[default]
    G8,
    /// ±16 g
    G16,
}

impl AccelRange {
    /// Range for a property index (0..=3)
    pub fn from_index(index: u8) -> Self {
        match index {
            0 => AccelRange::G2,
            1 => AccelRange::G4,
            3 => AccelRange::G16,
            _ => AccelRange::G8,
        }
    }

    /// ACCEL_FS_SEL field (bits [2:1])
    pub fn register_value(self) -> u8 {
        let fs_sel = match self {
            AccelRange::G2 => 0,
            AccelRange::G4 => 1,
            AccelRange::G8 => 2,
            AccelRange::G16 => 3,
        };
        fs_sel << 1
    }

    /// LSB per g
    pub fn sensitivity(self) -> f32 {
        match self {
            AccelRange::G2 => 16384.0,
            AccelRange::G4 => 8192.0,
            AccelRange::G8 => 4096.0,
            AccelRange::G16 => 2048.0,
        }
    }
}

/// Gyroscope full scale range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GyroRange {
    /// ±250 °/s
    Dps250,
    /// ±500 °/s
    Dps500,
    /// ±1000 °/s
    Dps1000,
    /// ±2000 °/s
    #[default]
    Dps2000,
}

impl GyroRange {
    /// Range for a property index (0..=3)
    pub fn from_index(index: u8) -> Self {
        match index {
            0 => GyroRange::Dps250,
            1 => GyroRange::Dps500,
            2 => GyroRange::Dps1000,
            _ => GyroRange::Dps2000,
        }
    }

    /// GYRO_FS_SEL field (bits [2:1])
    pub fn register_value(self) -> u8 {
        let fs_sel = match self {
            GyroRange::Dps250 => 0,
            GyroRange::Dps500 => 1,
            GyroRange::Dps1000 => 2,
            GyroRange::Dps2000 => 3,
        };
        fs_sel << 1
    }

    /// LSB per °/s
    pub fn sensitivity(self) -> f32 {
        match self {
            GyroRange::Dps250 => 131.0,
            GyroRange::Dps500 => 65.5,
            GyroRange::Dps1000 => 32.8,
            GyroRange::Dps2000 => 16.4,
        }
    }
}

const PARAMETERS: &[ParameterInfo] = &[
    ParameterInfo::float("accel_x", "Acceleration X", "g"),
    ParameterInfo::float("accel_y", "Acceleration Y", "g"),
    ParameterInfo::float("accel_z", "Acceleration Z", "g"),
    ParameterInfo::float("gyro_x", "Angular rate X", "dps"),
    ParameterInfo::float("gyro_y", "Angular rate Y", "dps"),
    ParameterInfo::float("gyro_z", "Angular rate Z", "dps"),
    ParameterInfo::float("temperature", "Die temperature", "C"),
];

fn select_bank(bus: &mut dyn I2cInterface, address: u8, bank: RegisterBank) -> Result<(), DeviceError> {
    bus.write_reg(address, REG_BANK_SEL, bank.register_value())?;
    Ok(())
}

/// ICM-20948 driver
#[derive(Debug)]
pub struct Icm20948 {
    core: DeviceCore,
    accel_range: AccelRange,
    gyro_range: GyroRange,
    /// Raw burst, big-endian words in `PARAMETERS` order
    burst: [i16; 7],
    /// Bit n set: value n of `burst` not yet read
    fresh: u8,
}

impl Default for Icm20948 {
    fn default() -> Self {
        let mut core = DeviceCore::new(Self::NAME, Self::ADDRESSES[0]);
        core.define_property(PropertyMetadata::new_uint8(
            "accel_range",
            "Accel range (0=2g, 1=4g, 2=8g, 3=16g)",
            2,
            0,
            3,
        ));
        core.define_property(PropertyMetadata::new_uint8(
            "gyro_range",
            "Gyro range (0=250, 1=500, 2=1000, 3=2000 dps)",
            3,
            0,
            3,
        ));
        Self {
            core,
            accel_range: AccelRange::default(),
            gyro_range: GyroRange::default(),
            burst: [0; 7],
            fresh: 0,
        }
    }
}

impl Icm20948 {
    /// Accel range applied at the last initialization
    pub fn accel_range(&self) -> AccelRange {
        self.accel_range
    }

    /// Gyro range applied at the last initialization
    pub fn gyro_range(&self) -> GyroRange {
        self.gyro_range
    }

    fn read_burst(&mut self, bus: &mut dyn I2cInterface) -> Result<(), DeviceError> {
        let mut raw = [0u8; BURST_LEN];
        bus.read_regs(self.address(), ACCEL_XOUT_H, &mut raw)?;
        for (value, bytes) in self.burst.iter_mut().zip(raw.chunks_exact(2)) {
            *value = i16::from_be_bytes([bytes[0], bytes[1]]);
        }
        self.fresh = 0x7F;
        Ok(())
    }

    fn scale(&self, index: usize) -> f32 {
        let raw = f32::from(self.burst[index]);
        match index {
            0..=2 => raw / self.accel_range.sensitivity(),
            3..=5 => raw / self.gyro_range.sensitivity(),
            _ => (raw - TEMP_OFFSET) / TEMP_SENSITIVITY + TEMP_OFFSET,
        }
    }
}

impl Device for Icm20948 {
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
        self.accel_range = AccelRange::from_index(self.core.properties.get_u8("accel_range", 2));
        self.gyro_range = GyroRange::from_index(self.core.properties.get_u8("gyro_range", 3));

        select_bank(bus, address, RegisterBank::Bank0)?;
        let whoami = bus.read_reg(address, WHO_AM_I)?;
        if whoami != WHO_AM_I_VALUE {
            crate::log_error!(
                "ICM-20948 WHO_AM_I mismatch: expected {:#x}, got {:#x}",
                WHO_AM_I_VALUE,
                whoami
            );
            return Err(DeviceError::NotConnected);
        }

        bus.write_reg(address, PWR_MGMT_1, PWR_MGMT_1_CLKSEL_AUTO)?;
        bus.delay_us(WAKEUP_US);
        bus.write_reg(address, PWR_MGMT_2, PWR_MGMT_2_ENABLE_ALL)?;

        select_bank(bus, address, RegisterBank::Bank2)?;
        bus.write_reg(address, GYRO_CONFIG_1, self.gyro_range.register_value())?;
        bus.write_reg(address, ACCEL_CONFIG, self.accel_range.register_value())?;
        select_bank(bus, address, RegisterBank::Bank0)?;

        self.fresh = 0;
        self.core.set_initialized(true);
        crate::log_info!(
            "ICM-20948 initialized at {:#x} ({:?}, {:?})",
            address,
            self.accel_range,
            self.gyro_range
        );
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
        let index = PARAMETERS
            .iter()
            .position(|p| p.name == name)
            .ok_or(DeviceError::UnknownParameter)?;
        if !self.is_initialized() {
            return Err(DeviceError::NotInitialized);
        }

        let bit = 1u8 << index;
        if self.fresh & bit == 0 {
            self.read_burst(bus)?;
        }
        self.fresh &= !bit;
        Ok(PropertyValue::Float(self.scale(index)))
    }
}

impl DeviceDriver for Icm20948 {
    const NAME: &'static str = "ICM20948";
    const ADDRESSES: &'static [u8] = &[0x69, 0x68];

    fn probe(bus: &mut dyn I2cInterface, address: u8) -> bool {
        if select_bank(bus, address, RegisterBank::Bank0).is_err() {
            return false;
        }
        matches!(bus.read_reg(address, WHO_AM_I), Ok(WHO_AM_I_VALUE))
    }
}
