//! Driver interfaces.

use std::fmt;

use crate::error::Result;

/// A pluggable native I/O capability, activated later by name.
pub trait Driver: Send + Sync + fmt::Debug {
    /// Name used by dynamic open requests, e.g. `tcp_inet`.
    fn name(&self) -> &str;

    /// One-time initialization run by the registry on registration.
    fn init(&self) -> Result<()> {
        Ok(())
    }
}

/// Runtime-wide registry of drivers keyed by their declared name.
///
/// Ownership of a driver moves into the registry on registration; the
/// caller keeps no reference. Duplicate handling is the registry's policy.
pub trait DriverRegistry: Send + Sync {
    /// Register a driver under [`Driver::name`].
    fn register(&self, driver: Box<dyn Driver>) -> Result<()>;
}
