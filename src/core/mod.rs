//! Core systems
//!
//! Cross-cutting infrastructure used by every driver: logging macros and the
//! managed property table.

pub mod logging;
pub mod properties;
