#![cfg_attr(not(test), no_std)]

//! qwiic_devices - Qwiic/I2C sensor drivers with bus auto-discovery
//!
//! This library provides a bus abstraction, a small managed-property table,
//! and device drivers that register with a central factory. The factory
//! probes an I2C bus for every registered driver and keeps the list of
//! connected devices.
//!
//! The crate is `no_std` and uses `alloc` for boxed devices; the application
//! provides the global allocator.
//!
//! # Example
//!
//! ```ignore
//! use qwiic_devices::devices::{drivers, factory};
//!
//! drivers::register_builtin_drivers();
//! let found = factory::discover_devices(&mut bus);
//! log_info!("{} devices found", found);
//! ```

extern crate alloc;

// Bus abstraction and platform adapters
pub mod platform;

// Logging and managed properties
pub mod core;

// Device trait, factory and drivers
pub mod devices;

// Note: Logging macros (log_info!, log_warn!, log_error!, log_debug!, log_trace!)
// are exported at crate root via #[macro_export] in core::logging
