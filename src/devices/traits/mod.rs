//! Device traits
//!
//! Bus-independent interface shared by every driver. The factory only deals
//! in `Box<dyn Device>`; driver-specific behavior stays behind the trait.

pub mod device;

pub use device::{BusKind, Device, DeviceCore, DeviceError, MAX_NAME_LEN};
