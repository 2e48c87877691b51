//! Driver Table
//!
//! Keeps registered drivers by name.

use std::collections::HashMap;
use std::sync::Arc;

use ember_core::error::{DriverError, Error, Result};
use ember_core::traits::{Driver, DriverRegistry};
use parking_lot::RwLock;
use tracing::{error, info};

#[derive(Default)]
struct Entries {
    by_name: HashMap<String, Arc<dyn Driver>>,
    order: Vec<String>,
}

/// Name-keyed table of initialized drivers
#[derive(Default)]
pub struct DriverTable {
    entries: RwLock<Entries>,
}

impl DriverTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a driver by name
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Driver>> {
        self.entries.read().by_name.get(name).cloned()
    }

    /// Check if a driver is registered
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().by_name.contains_key(name)
    }

    /// Names of all drivers, in registration order
    pub fn names(&self) -> Vec<String> {
        self.entries.read().order.clone()
    }

    /// Number of registered drivers
    pub fn len(&self) -> usize {
        self.entries.read().order.len()
    }

    /// Whether no driver is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DriverRegistry for DriverTable {
    fn register(&self, driver: Box<dyn Driver>) -> Result<()> {
        let name = driver.name().to_string();

        // Hold the write lock across init so a concurrent registration of
        // the same name cannot slip in between the check and the insert.
        let mut entries = self.entries.write();
        if entries.by_name.contains_key(&name) {
            return Err(DriverError::AlreadyRegistered(name).into());
        }

        driver.init().map_err(|e| {
            error!("Driver {} failed to initialize: {}", name, e);
            match e {
                Error::Driver(inner) => Error::Driver(inner),
                other => DriverError::InitFailed {
                    name: name.clone(),
                    reason: other.to_string(),
                }
                .into(),
            }
        })?;

        entries.by_name.insert(name.clone(), Arc::from(driver));
        entries.order.push(name.clone());

        info!("Registered driver: {}", name);

        Ok(())
    }
}

impl std::fmt::Debug for DriverTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverTable")
            .field("drivers", &self.names())
            .finish()
    }
}
