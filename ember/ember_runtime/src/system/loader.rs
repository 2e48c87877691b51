//! Preloaded module and driver loading.
//!
//! The loading strategy is chosen once per call: if the bootstrap
//! directory can be served from the resource bundle, every module is read
//! from the bundle; otherwise every module is resolved on the filesystem.
//! The two are never mixed within a call.

use std::fmt;
use std::sync::Arc;

use ember_core::error::{ModuleError, Result};
use ember_core::traits::{Driver, DriverRegistry, ModuleLoader, ResourceBundle};
use ember_core::types::ModuleDescriptor;
use tracing::{debug, info};

/// Standard-library modules installed before the root process starts.
pub const PRELOADED_MODULES: [&str; 8] = [
    "erl_prim_loader",
    "erlang",
    "init",
    "otp_ring0",
    "prim_file",
    "prim_inet",
    "prim_zip",
    "zlib",
];

/// Extension of compiled module images.
pub const IMAGE_EXTENSION: &str = "beam";

/// Bundle path of a module image: `<dir>/<name>.beam`.
pub fn image_path(dir: &str, name: &str) -> String {
    format!("{}/{}.{}", dir.trim_end_matches('/'), name, IMAGE_EXTENSION)
}

/// Where module images come from for one loading call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStrategy {
    /// Read every image from the resource bundle under this directory
    Bundle {
        /// Bundle directory holding the images
        dir: String,
    },

    /// Ask the module loader to locate each module on the filesystem
    Filesystem,
}

impl LoadStrategy {
    /// Probe the bundle once and pick the strategy.
    pub fn select(bundle: &dyn ResourceBundle, bootstrap_dir: &str) -> Self {
        if bundle.is_available(bootstrap_dir) {
            Self::Bundle {
                dir: bootstrap_dir.to_string(),
            }
        } else {
            Self::Filesystem
        }
    }
}

impl fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bundle { dir } => write!(f, "bundle:{}", dir),
            Self::Filesystem => write!(f, "filesystem"),
        }
    }
}

/// Drivers supplied by embedding code in addition to the builtin set.
///
/// Callers build this before startup and hand it to the bootstrap, which
/// consumes it exactly once.
#[derive(Debug, Default)]
pub struct ExtraDrivers(Vec<Box<dyn Driver>>);

impl ExtraDrivers {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a driver.
    pub fn add(&mut self, driver: Box<dyn Driver>) {
        self.0.push(driver);
    }

    /// Append a driver, builder style.
    pub fn with(mut self, driver: Box<dyn Driver>) -> Self {
        self.add(driver);
        self
    }

    /// Number of drivers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Take the drivers out, in insertion order.
    pub fn into_inner(self) -> Vec<Box<dyn Driver>> {
        self.0
    }
}

/// Outcome of one loading call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Strategy used for the module phase, if it ran
    pub strategy: Option<LoadStrategy>,

    /// Modules installed, in order
    pub modules: Vec<String>,

    /// Drivers registered, in order
    pub drivers: Vec<String>,
}

/// Installs modules and registers drivers.
pub struct ModuleDriverLoader {
    bundle: Arc<dyn ResourceBundle>,
    loader: Arc<dyn ModuleLoader>,
    registry: Arc<dyn DriverRegistry>,
    bootstrap_dir: String,
}

impl ModuleDriverLoader {
    /// Create a loader over the given collaborators.
    pub fn new(
        bundle: Arc<dyn ResourceBundle>,
        loader: Arc<dyn ModuleLoader>,
        registry: Arc<dyn DriverRegistry>,
        bootstrap_dir: impl Into<String>,
    ) -> Self {
        Self {
            bundle,
            loader,
            registry,
            bootstrap_dir: bootstrap_dir.into(),
        }
    }

    /// Run the module phase and then the driver phase.
    ///
    /// Either list may be absent, which skips that phase. A failure in the
    /// module phase aborts the call before any driver is registered.
    /// Modules installed before the failure stay installed.
    pub fn load<S: AsRef<str>>(
        &self,
        modules: Option<&[S]>,
        drivers: Option<Vec<Box<dyn Driver>>>,
    ) -> Result<LoadReport> {
        let mut report = LoadReport::default();

        if let Some(modules) = modules {
            let (strategy, installed) = self.load_modules(modules)?;
            report.strategy = Some(strategy);
            report.modules = installed;
        }

        if let Some(drivers) = drivers {
            report.drivers = self.register_drivers(drivers)?;
        }

        Ok(report)
    }

    /// Install every module with a single strategy.
    pub fn load_modules<S: AsRef<str>>(&self, modules: &[S]) -> Result<(LoadStrategy, Vec<String>)> {
        let strategy = LoadStrategy::select(self.bundle.as_ref(), &self.bootstrap_dir);
        info!("Loading {} modules via {}", modules.len(), strategy);

        let mut installed = Vec::with_capacity(modules.len());
        for name in modules {
            let name = name.as_ref();
            match &strategy {
                LoadStrategy::Bundle { dir } => {
                    let path = image_path(dir, name);
                    let image = self
                        .bundle
                        .read(&path)?
                        .ok_or(ModuleError::ResourceNotFound { path })?;
                    self.loader.install(ModuleDescriptor::new(name, image))?;
                }
                LoadStrategy::Filesystem => self.loader.resolve_and_install(name)?,
            }
            debug!("Installed module {}", name);
            installed.push(name.to_string());
        }

        Ok((strategy, installed))
    }

    /// Register drivers in the given order.
    pub fn register_drivers(&self, drivers: Vec<Box<dyn Driver>>) -> Result<Vec<String>> {
        let mut registered = Vec::with_capacity(drivers.len());
        for driver in drivers {
            let name = driver.name().to_string();
            self.registry.register(driver)?;
            debug!("Registered driver {}", name);
            registered.push(name);
        }

        if !registered.is_empty() {
            info!("Registered {} drivers", registered.len());
        }

        Ok(registered)
    }
}
