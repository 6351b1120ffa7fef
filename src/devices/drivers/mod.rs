//! Built-in Qwiic sensor drivers
//!
//! Each driver implements `Device` for the runtime interface and
//! `DeviceDriver` for discovery (name, candidate addresses, probe).
//!
//! | Driver | Addresses | Parameters |
//! |---|---|---|
//! | `Bme280` | 0x77, 0x76 | temperature, humidity, pressure, altitude |
//! | `Tmp117` | 0x48..=0x4B | temperature |
//! | `Shtc3` | 0x70 | temperature, humidity |
//! | `Ccs811` | 0x5B, 0x5A | eco2, tvoc |
//! | `Vl53l1x` | 0x29 | distance |
//! | `Icm20948` | 0x69, 0x68 | accel, gyro, temperature |

pub mod bme280;
pub mod ccs811;
pub mod icm20948;
pub mod shtc3;
pub mod tmp117;
pub mod vl53l1x;

pub use bme280::Bme280;
pub use ccs811::{Ccs811, DriveMode};
pub use icm20948::{AccelRange, GyroRange, Icm20948};
pub use shtc3::Shtc3;
pub use tmp117::{Averaging, Tmp117};
pub use vl53l1x::Vl53l1x;

/// Register every built-in driver with the process-wide builder registry
///
/// Drivers are registered in probe order. Already registered drivers are
/// skipped.
///
/// # Returns
///
/// Number of builders newly registered.
pub fn register_builtin_drivers() -> usize {
    let results = [
        crate::register_device!(Bme280),
        crate::register_device!(Tmp117),
        crate::register_device!(Shtc3),
        crate::register_device!(Ccs811),
        crate::register_device!(Vl53l1x),
        crate::register_device!(Icm20948),
    ];
    results.iter().filter(|r| r.is_ok()).count()
}
