//! SHTC3 Humidity and Temperature Sensor
//!
//! Sensirion SHTC3. Command based: the chip sleeps between measurements and
//! every transaction starts with a wakeup. Each 16-bit word read from the
//! chip is followed by a CRC-8 byte.

use crate::core::properties::{ParameterInfo, PropertyValue};
use crate::devices::factory::DeviceDriver;
use crate::devices::traits::{Device, DeviceCore, DeviceError};
use crate::platform::I2cInterface;
use crc::{Crc, CRC_8_NRSC_5};

/// Sensirion CRC-8: polynomial 0x31, init 0xFF, no reflection
const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

const CMD_WAKEUP: [u8; 2] = [0x35, 0x17];
const CMD_SLEEP: [u8; 2] = [0xB0, 0x98];
const CMD_READ_ID: [u8; 2] = [0xEF, 0xC8];

/// Normal mode, clock stretching, temperature first
const CMD_MEASURE_T_FIRST: [u8; 2] = [0x7C, 0xA2];

/// Wakeup time (max 240 µs)
const WAKEUP_US: u32 = 240;

/// Bits of the ID register that identify an SHTC3
const ID_MASK: u16 = 0x083F;
const ID_VALUE: u16 = 0x0807;

const PARAMETERS: &[ParameterInfo] = &[
    ParameterInfo::float("temperature", "Temperature", "C"),
    ParameterInfo::float("humidity", "Relative humidity", "%"),
];

/// Sensirion CRC-8 of a data word
pub fn crc8(data: &[u8]) -> u8 {
    CRC8.checksum(data)
}

/// Check the CRC of a `[msb, lsb, crc]` triple and return the word
fn checked_word(chunk: &[u8]) -> Result<u16, DeviceError> {
    if crc8(&chunk[..2]) != chunk[2] {
        return Err(DeviceError::CrcMismatch);
    }
    Ok(u16::from_be_bytes([chunk[0], chunk[1]]))
}

fn wake(bus: &mut dyn I2cInterface, address: u8) -> Result<(), DeviceError> {
    bus.write(address, &CMD_WAKEUP)?;
    bus.delay_us(WAKEUP_US);
    Ok(())
}

fn read_id(bus: &mut dyn I2cInterface, address: u8) -> Result<u16, DeviceError> {
    wake(bus, address)?;
    bus.write(address, &CMD_READ_ID)?;
    let mut buf = [0u8; 3];
    bus.read(address, &mut buf)?;
    checked_word(&buf)
}

/// SHTC3 driver
#[derive(Debug)]
pub struct Shtc3 {
    core: DeviceCore,
    temperature: f32,
    humidity: f32,
    fresh_temperature: bool,
    fresh_humidity: bool,
}

impl Default for Shtc3 {
    fn default() -> Self {
        Self {
            core: DeviceCore::new(Self::NAME, Self::ADDRESSES[0]),
            temperature: 0.0,
            humidity: 0.0,
            fresh_temperature: false,
            fresh_humidity: false,
        }
    }
}

impl Shtc3 {
    /// Wake, measure, and put the chip back to sleep
    fn measure(&mut self, bus: &mut dyn I2cInterface) -> Result<(), DeviceError> {
        let address = self.address();
        wake(bus, address)?;
        bus.write(address, &CMD_MEASURE_T_FIRST)?;

        let mut buf = [0u8; 6];
        bus.read(address, &mut buf)?;
        let raw_t = checked_word(&buf[0..3])?;
        let raw_rh = checked_word(&buf[3..6])?;

        bus.write(address, &CMD_SLEEP)?;

        self.temperature = -45.0 + 175.0 * f32::from(raw_t) / 65536.0;
        self.humidity = 100.0 * f32::from(raw_rh) / 65536.0;
        self.fresh_temperature = true;
        self.fresh_humidity = true;
        Ok(())
    }
}

impl Device for Shtc3 {
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
        let id = read_id(bus, address)?;
        if id & ID_MASK != ID_VALUE {
            return Err(DeviceError::NotConnected);
        }
        bus.write(address, &CMD_SLEEP)?;

        self.core.set_initialized(true);
        crate::log_info!("SHTC3 initialized at {:#x} (id {:#x})", address, id);
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
        let temperature = match name {
            "temperature" => true,
            "humidity" => false,
            _ => return Err(DeviceError::UnknownParameter),
        };
        if !self.is_initialized() {
            return Err(DeviceError::NotInitialized);
        }

        let fresh = if temperature {
            self.fresh_temperature
        } else {
            self.fresh_humidity
        };
        if !fresh {
            self.measure(bus)?;
        }

        let value = if temperature {
            self.fresh_temperature = false;
            self.temperature
        } else {
            self.fresh_humidity = false;
            self.humidity
        };
        Ok(PropertyValue::Float(value))
    }
}

impl DeviceDriver for Shtc3 {
    const NAME: &'static str = "SHTC3";
    const ADDRESSES: &'static [u8] = &[0x70];

    fn probe(bus: &mut dyn I2cInterface, address: u8) -> bool {
        match read_id(bus, address) {
            Ok(id) => id & ID_MASK == ID_VALUE,
            Err(e) => {
                crate::log_trace!("SHTC3 id read at {:#x} failed: {:?}", address, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::{MockI2c, MockTarget};

    // ID 0x0887 with CRC 0x5B
    const ID_RESPONSE: [u8; 3] = [0x08, 0x87, 0x5B];
    // T = 0x6666 (CRC 0x93), RH = 0x8000 (CRC 0xA2)
    const MEASUREMENT: [u8; 6] = [0x66, 0x66, 0x93, 0x80, 0x00, 0xA2];

    fn bus_with(id: &[u8], measurement: &[u8]) -> MockI2c {
        let mut bus = MockI2c::new(Default::default());
        bus.attach(
            0x70,
            MockTarget::new()
                .with_command(&CMD_READ_ID, id)
                .with_command(&CMD_MEASURE_T_FIRST, measurement),
        );
        bus
    }

    #[test]
    fn test_crc8_reference_value() {
        // Datasheet example: 0xBEEF -> 0x92
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
    }

    #[test]
    fn test_probe() {
        let mut bus = bus_with(&ID_RESPONSE, &MEASUREMENT);
        assert!(Shtc3::probe(&mut bus, 0x70));
        assert!(bus.delayed_us() >= u64::from(WAKEUP_US));

        // Valid CRC, but not an SHTC3 id pattern
        let mut other = bus_with(&[0x12, 0x34, 0x37], &MEASUREMENT);
        assert!(!Shtc3::probe(&mut other, 0x70));

        // Corrupted CRC
        let mut corrupt = bus_with(&[0x08, 0x87, 0x00], &MEASUREMENT);
        assert!(!Shtc3::probe(&mut corrupt, 0x70));

        assert!(!Shtc3::probe(&mut MockI2c::new(Default::default()), 0x70));
    }

    #[test]
    fn test_measurement_conversion_and_cache() {
        let mut bus = bus_with(&ID_RESPONSE, &MEASUREMENT);
        let mut device = Shtc3::default();
        device.initialize(&mut bus).unwrap();

        let t = device
            .read_parameter(&mut bus, "temperature")
            .unwrap()
            .as_f32()
            .unwrap();
        assert!((t - 24.9989).abs() < 0.001, "temperature {}", t);

        bus.clear_transactions();
        let rh = device.read_parameter(&mut bus, "humidity").unwrap();
        assert_eq!(rh, PropertyValue::Float(50.0));
        // Served from the cached measurement
        assert!(bus.transactions().is_empty());
    }

    #[test]
    fn test_measurement_crc_error() {
        let mut bus = bus_with(&ID_RESPONSE, &[0x66, 0x66, 0x00, 0x80, 0x00, 0xA2]);
        let mut device = Shtc3::default();
        device.initialize(&mut bus).unwrap();

        assert_eq!(
            device.read_parameter(&mut bus, "temperature"),
            Err(DeviceError::CrcMismatch)
        );
    }
}
