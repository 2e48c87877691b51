//! Driver registration.
//!
//! Drivers are registered by name before the root process starts and looked
//! up later when a port is opened.

pub mod builtin;
pub mod registry;

pub use builtin::{builtin_drivers, BuiltinDriver, BUILTIN_DRIVERS};
pub use registry::DriverTable;
