//! BME280 Temperature, Humidity and Pressure Sensor
//!
//! Bosch BME280 on I2C. Initialization reads the factory trim parameters and
//! puts the chip in normal mode with x1 oversampling on all channels. One
//! burst read of the data registers serves all four parameters; a parameter
//! that was already consumed triggers the next burst.
//!
//! Compensation uses the floating-point formulas from the datasheet
//! (section 8.1).

use crate::core::properties::{ParameterInfo, PropertyMetadata, PropertyValue};
use crate::devices::factory::DeviceDriver;
use crate::devices::traits::{Device, DeviceCore, DeviceError};
use crate::platform::{I2cInterface, I2cRegisterExt};
use bitflags::bitflags;

// =============================================================================
// Registers
// =============================================================================

/// Chip identification
pub const REG_CHIP_ID: u8 = 0xD0;

/// Expected chip id
pub const CHIP_ID: u8 = 0x60;

/// First temperature/pressure trim register (0x88..=0xA1)
const REG_CALIB_00: u8 = 0x88;

/// First humidity trim register (0xE1..=0xE7)
const REG_CALIB_26: u8 = 0xE1;

/// Humidity oversampling; only latched by a following ctrl_meas write
const REG_CTRL_HUM: u8 = 0xF2;

/// Temperature/pressure oversampling and mode
const REG_CTRL_MEAS: u8 = 0xF4;

/// Standby time and IIR filter
const REG_CONFIG: u8 = 0xF5;

/// First data register: press_msb
const REG_PRESS_MSB: u8 = 0xF7;

/// osrs_h = x1
const CTRL_HUM_X1: u8 = 0x01;

/// osrs_t = x1, osrs_p = x1, normal mode
const CTRL_MEAS_NORMAL_X1: u8 = 0x27;

/// t_sb = 0.5 ms, filter off
const CONFIG_DEFAULT: u8 = 0x00;

/// Default sea-level reference pressure (hPa)
pub const DEFAULT_SEA_LEVEL_HPA: f32 = 1013.25;

const PARAMETERS: &[ParameterInfo] = &[
    ParameterInfo::float("temperature", "Temperature", "C"),
    ParameterInfo::float("humidity", "Relative humidity", "%"),
    ParameterInfo::float("pressure", "Barometric pressure", "Pa"),
    ParameterInfo::float("altitude", "Altitude above sea level", "m"),
];

bitflags! {
    /// Values of the cached sample that have not been read yet
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Fresh: u8 {
        const TEMPERATURE = 0b0001;
        const HUMIDITY = 0b0010;
        const PRESSURE = 0b0100;
        const ALTITUDE = 0b1000;
    }
}

/// Factory trim parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calibration {
    pub t1: u16,
    pub t2: i16,
    pub t3: i16,
    pub p1: u16,
    pub p2: i16,
    pub p3: i16,
    pub p4: i16,
    pub p5: i16,
    pub p6: i16,
    pub p7: i16,
    pub p8: i16,
    pub p9: i16,
    pub h1: u8,
    pub h2: i16,
    pub h3: u8,
    pub h4: i16,
    pub h5: i16,
    pub h6: i8,
}

impl Calibration {
    /// Decode the 0x88..=0xA1 and 0xE1..=0xE7 trim blocks
    pub fn from_registers(tp: &[u8; 26], hum: &[u8; 7]) -> Self {
        let u16_at = |i: usize| u16::from_le_bytes([tp[i], tp[i + 1]]);
        let i16_at = |i: usize| i16::from_le_bytes([tp[i], tp[i + 1]]);

        Self {
            t1: u16_at(0),
            t2: i16_at(2),
            t3: i16_at(4),
            p1: u16_at(6),
            p2: i16_at(8),
            p3: i16_at(10),
            p4: i16_at(12),
            p5: i16_at(14),
            p6: i16_at(16),
            p7: i16_at(18),
            p8: i16_at(20),
            p9: i16_at(22),
            // tp[24] (0xA0) is unused
            h1: tp[25],
            h2: i16::from_le_bytes([hum[0], hum[1]]),
            h3: hum[2],
            // H4 and H5 are 12-bit values sharing the nibbles of 0xE5
            h4: (i16::from(hum[3] as i8) << 4) | i16::from(hum[4] & 0x0F),
            h5: (i16::from(hum[5] as i8) << 4) | i16::from(hum[4] >> 4),
            h6: hum[6] as i8,
        }
    }

    /// Fine temperature shared by all three compensations
    fn t_fine(&self, adc_t: i32) -> f64 {
        let adc_t = f64::from(adc_t);
        let t1 = f64::from(self.t1);
        let var1 = (adc_t / 16384.0 - t1 / 1024.0) * f64::from(self.t2);
        let d = adc_t / 131072.0 - t1 / 8192.0;
        let var2 = d * d * f64::from(self.t3);
        var1 + var2
    }

    /// Temperature in °C
    pub fn temperature(&self, t_fine: f64) -> f64 {
        t_fine / 5120.0
    }

    /// Pressure in Pa
    pub fn pressure(&self, t_fine: f64, adc_p: i32) -> f64 {
        let mut var1 = t_fine / 2.0 - 64000.0;
        let mut var2 = var1 * var1 * f64::from(self.p6) / 32768.0;
        var2 += var1 * f64::from(self.p5) * 2.0;
        var2 = var2 / 4.0 + f64::from(self.p4) * 65536.0;
        var1 = (f64::from(self.p3) * var1 * var1 / 524288.0 + f64::from(self.p2) * var1) / 524288.0;
        var1 = (1.0 + var1 / 32768.0) * f64::from(self.p1);
        if var1 == 0.0 {
            return 0.0;
        }

        let mut p = 1048576.0 - f64::from(adc_p);
        p = (p - var2 / 4096.0) * 6250.0 / var1;
        let var1 = f64::from(self.p9) * p * p / 2147483648.0;
        let var2 = p * f64::from(self.p8) / 32768.0;
        p + (var1 + var2 + f64::from(self.p7)) / 16.0
    }

    /// Relative humidity in %, clamped to 0..=100
    pub fn humidity(&self, t_fine: f64, adc_h: i32) -> f64 {
        let h = t_fine - 76800.0;
        let h = (f64::from(adc_h) - (f64::from(self.h4) * 64.0 + f64::from(self.h5) / 16384.0 * h))
            * (f64::from(self.h2) / 65536.0
                * (1.0
                    + f64::from(self.h6) / 67108864.0
                        * h
                        * (1.0 + f64::from(self.h3) / 67108864.0 * h)));
        let h = h * (1.0 - f64::from(self.h1) * h / 524288.0);
        h.clamp(0.0, 100.0)
    }
}

/// Altitude (m) from pressure (Pa) and sea-level reference (hPa)
pub fn altitude(pressure_pa: f32, sea_level_hpa: f32) -> f32 {
    let ratio = f64::from(pressure_pa) / 100.0 / f64::from(sea_level_hpa);
    (44330.0 * (1.0 - libm::pow(ratio, 1.0 / 5.255))) as f32
}

/// Compensated sample
#[derive(Debug, Clone, Copy, Default)]
struct Sample {
    temperature: f32,
    humidity: f32,
    pressure: f32,
}

/// BME280 driver
#[derive(Debug)]
pub struct Bme280 {
    core: DeviceCore,
    calibration: Calibration,
    sample: Sample,
    fresh: Fresh,
}

impl Default for Bme280 {
    fn default() -> Self {
        let mut core = DeviceCore::new(Self::NAME, Self::ADDRESSES[0]);
        core.define_property(PropertyMetadata::new_float(
            "sea_level_hpa",
            "Sea-level pressure reference for altitude",
            DEFAULT_SEA_LEVEL_HPA,
            300.0,
            1100.0,
        ));
        Self {
            core,
            calibration: Calibration::default(),
            sample: Sample::default(),
            fresh: Fresh::empty(),
        }
    }
}

impl Bme280 {
    /// Trim parameters read at initialization
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    fn read_calibration(&mut self, bus: &mut dyn I2cInterface) -> Result<(), DeviceError> {
        let address = self.address();
        let mut tp = [0u8; 26];
        let mut hum = [0u8; 7];
        bus.read_regs(address, REG_CALIB_00, &mut tp)?;
        bus.read_regs(address, REG_CALIB_26, &mut hum)?;
        self.calibration = Calibration::from_registers(&tp, &hum);
        crate::log_debug!("BME280 trim: T1={} P1={}", self.calibration.t1, self.calibration.p1);
        Ok(())
    }

    /// Burst-read and compensate one sample
    fn update(&mut self, bus: &mut dyn I2cInterface) -> Result<(), DeviceError> {
        let mut raw = [0u8; 8];
        bus.read_regs(self.address(), REG_PRESS_MSB, &mut raw)?;

        let adc_p = (i32::from(raw[0]) << 12) | (i32::from(raw[1]) << 4) | (i32::from(raw[2]) >> 4);
        let adc_t = (i32::from(raw[3]) << 12) | (i32::from(raw[4]) << 4) | (i32::from(raw[5]) >> 4);
        let adc_h = (i32::from(raw[6]) << 8) | i32::from(raw[7]);

        let t_fine = self.calibration.t_fine(adc_t);
        self.sample = Sample {
            temperature: self.calibration.temperature(t_fine) as f32,
            humidity: self.calibration.humidity(t_fine, adc_h) as f32,
            pressure: self.calibration.pressure(t_fine, adc_p) as f32,
        };
        self.fresh = Fresh::all();
        Ok(())
    }

    /// Consume one value of the cached sample, refreshing it if already read
    fn take(&mut self, bus: &mut dyn I2cInterface, which: Fresh) -> Result<(), DeviceError> {
        if !self.fresh.contains(which) {
            self.update(bus)?;
        }
        self.fresh.remove(which);
        Ok(())
    }
}

impl Device for Bme280 {
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
        if bus.read_reg(address, REG_CHIP_ID)? != CHIP_ID {
            return Err(DeviceError::NotConnected);
        }

        self.read_calibration(bus)?;

        // ctrl_hum must be written before ctrl_meas
        bus.write_reg(address, REG_CTRL_HUM, CTRL_HUM_X1)?;
        bus.write_reg(address, REG_CTRL_MEAS, CTRL_MEAS_NORMAL_X1)?;
        bus.write_reg(address, REG_CONFIG, CONFIG_DEFAULT)?;

        self.fresh = Fresh::empty();
        self.core.set_initialized(true);
        crate::log_info!("BME280 initialized at {:#x}", address);
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
        let which = match name {
            "temperature" => Fresh::TEMPERATURE,
            "humidity" => Fresh::HUMIDITY,
            "pressure" => Fresh::PRESSURE,
            "altitude" => Fresh::ALTITUDE,
            _ => return Err(DeviceError::UnknownParameter),
        };
        if !self.is_initialized() {
            return Err(DeviceError::NotInitialized);
        }

        self.take(bus, which)?;
        let value = if which == Fresh::TEMPERATURE {
            self.sample.temperature
        } else if which == Fresh::HUMIDITY {
            self.sample.humidity
        } else if which == Fresh::PRESSURE {
            self.sample.pressure
        } else {
            let sea_level = self
                .core
                .properties
                .get_f32("sea_level_hpa", DEFAULT_SEA_LEVEL_HPA);
            altitude(self.sample.pressure, sea_level)
        };
        Ok(PropertyValue::Float(value))
    }
}

impl DeviceDriver for Bme280 {
    const NAME: &'static str = "BME280";
    const ADDRESSES: &'static [u8] = &[0x77, 0x76];

    fn probe(bus: &mut dyn I2cInterface, address: u8) -> bool {
        matches!(bus.read_reg(address, REG_CHIP_ID), Ok(CHIP_ID))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::{MockI2c, MockTarget};

    const TRIM_TP: [u8; 24] = [
        0x70, 0x6B, 0x43, 0x67, 0x18, 0xFC, 0x7D, 0x8E, 0x43, 0xD6, 0xD0, 0x0B, 0x27, 0x0B, 0x8C,
        0x00, 0xF9, 0xFF, 0x8C, 0x3C, 0xF8, 0xC6, 0x70, 0x17,
    ];
    const TRIM_H1: u8 = 75;
    const TRIM_HUM: [u8; 7] = [0x6A, 0x01, 0x00, 0x13, 0x29, 0x03, 0x1E];
    const RAW_SAMPLE: [u8; 8] = [0x65, 0x5A, 0xC0, 0x7E, 0xED, 0x00, 0x75, 0x30];

    fn chip() -> MockTarget {
        MockTarget::new()
            .with_registers(u16::from(REG_CHIP_ID), &[CHIP_ID])
            .with_registers(u16::from(REG_CALIB_00), &TRIM_TP)
            .with_registers(0xA1, &[TRIM_H1])
            .with_registers(u16::from(REG_CALIB_26), &TRIM_HUM)
            .with_registers(u16::from(REG_PRESS_MSB), &RAW_SAMPLE)
    }

    fn initialized(bus: &mut MockI2c) -> Bme280 {
        let mut device = Bme280::default();
        device.initialize(bus).unwrap();
        device
    }

    fn read_f32(device: &mut Bme280, bus: &mut MockI2c, name: &str) -> f32 {
        device.read_parameter(bus, name).unwrap().as_f32().unwrap()
    }

    #[test]
    fn test_probe() {
        let mut bus = MockI2c::new(Default::default());
        bus.attach(0x77, chip());
        bus.attach(0x76, MockTarget::new().with_registers(u16::from(REG_CHIP_ID), &[0x58]));

        assert!(Bme280::probe(&mut bus, 0x77));
        // BMP280 answers with 0x58
        assert!(!Bme280::probe(&mut bus, 0x76));
        assert!(!Bme280::probe(&mut bus, 0x10));
    }

    #[test]
    fn test_calibration_decode() {
        let mut tp = [0u8; 26];
        tp[..24].copy_from_slice(&TRIM_TP);
        tp[25] = TRIM_H1;
        let cal = Calibration::from_registers(&tp, &TRIM_HUM);

        assert_eq!((cal.t1, cal.t2, cal.t3), (27504, 26435, -1000));
        assert_eq!((cal.p1, cal.p2, cal.p9), (36477, -10685, 6000));
        assert_eq!((cal.h1, cal.h2, cal.h3), (75, 362, 0));
        assert_eq!((cal.h4, cal.h5, cal.h6), (313, 50, 30));
    }

    #[test]
    fn test_initialize_configures_chip() {
        let mut bus = MockI2c::new(Default::default());
        bus.attach(0x77, chip());
        let device = initialized(&mut bus);

        assert!(device.is_initialized());
        let target = bus.target(0x77).unwrap();
        assert_eq!(target.register(u16::from(REG_CTRL_HUM)), CTRL_HUM_X1);
        assert_eq!(target.register(u16::from(REG_CTRL_MEAS)), CTRL_MEAS_NORMAL_X1);
        assert_eq!(device.calibration().t1, 27504);
    }

    #[test]
    fn test_initialize_rejects_wrong_chip() {
        let mut bus = MockI2c::new(Default::default());
        bus.attach(0x77, chip().with_registers(u16::from(REG_CHIP_ID), &[0x58]));

        let mut device = Bme280::default();
        assert_eq!(device.initialize(&mut bus), Err(DeviceError::NotConnected));
        assert!(!device.is_initialized());
    }

    #[test]
    fn test_compensated_values() {
        let mut bus = MockI2c::new(Default::default());
        bus.attach(0x77, chip());
        let mut device = initialized(&mut bus);

        let t = read_f32(&mut device, &mut bus, "temperature");
        let h = read_f32(&mut device, &mut bus, "humidity");
        let p = read_f32(&mut device, &mut bus, "pressure");
        let alt = read_f32(&mut device, &mut bus, "altitude");

        assert!((t - 25.0825).abs() < 0.01, "temperature {}", t);
        assert!((h - 55.0007).abs() < 0.01, "humidity {}", h);
        assert!((p - 100_653.27).abs() < 1.0, "pressure {}", p);
        assert!((alt - 56.08).abs() < 0.1, "altitude {}", alt);
    }

    #[test]
    fn test_one_burst_serves_every_parameter() {
        let mut bus = MockI2c::new(Default::default());
        bus.attach(0x77, chip());
        let mut device = initialized(&mut bus);

        bus.clear_transactions();
        for name in ["temperature", "humidity", "pressure", "altitude"] {
            device.read_parameter(&mut bus, name).unwrap();
        }
        assert_eq!(bus.transactions().len(), 1);

        // Reading a consumed value triggers the next burst
        device.read_parameter(&mut bus, "temperature").unwrap();
        assert_eq!(bus.transactions().len(), 2);
    }

    #[test]
    fn test_sea_level_property_moves_altitude() {
        let mut bus = MockI2c::new(Default::default());
        bus.attach(0x77, chip());
        let mut device = initialized(&mut bus);

        device
            .set_property("sea_level_hpa", PropertyValue::Float(1006.5327))
            .unwrap();
        let alt = read_f32(&mut device, &mut bus, "altitude");
        assert!(alt.abs() < 0.1, "altitude {}", alt);

        assert!(device
            .set_property("sea_level_hpa", PropertyValue::Float(50.0))
            .is_err());
    }

    #[test]
    fn test_read_before_initialize() {
        let mut bus = MockI2c::new(Default::default());
        let mut device = Bme280::default();
        assert_eq!(
            device.read_parameter(&mut bus, "temperature"),
            Err(DeviceError::NotInitialized)
        );
        assert_eq!(
            device.read_parameter(&mut bus, "co2"),
            Err(DeviceError::UnknownParameter)
        );
    }
}
