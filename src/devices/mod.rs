//! Device drivers and discovery
//!
//! ## Modules
//!
//! - `traits`: `Device` trait and shared identity state
//! - `factory`: builder registry, bus discovery, connected devices
//! - `drivers`: built-in Qwiic sensor drivers

pub mod drivers;
pub mod factory;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;
