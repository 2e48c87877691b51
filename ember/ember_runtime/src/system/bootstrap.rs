//! System Bootstrap for the Ember runtime
//!
//! Runs the startup sequence once:
//!
//! 1. translate the command line (may set banner suppression)
//! 2. print the banner
//! 3. install the preloaded modules and register the builtin drivers
//! 4. register the extra drivers supplied by the embedder
//! 5. run the root process to completion and shut everything down
//!
//! Any failure before step 5 aborts startup; the root process is never
//! created and the scheduler and timers are shut down.

use std::io::{self, Write};
use std::sync::Arc;

use ember_core::error::{Error, Result};
use ember_core::traits::{
    Driver, DriverRegistry, ModuleLoader, ResourceBundle, RootProcessFactory, Scheduler,
    TimerSubsystem,
};
use ember_core::types::{EntryPoint, Environment, ExitReason, ROOT_ENTRY};
use tracing::{error, info};

use super::args::{ArgumentTranslator, SuppressionFlag};
use super::banner::BannerReporter;
use super::config::{RuntimeConfig, RuntimeInfo};
use super::loader::{ExtraDrivers, ModuleDriverLoader, PRELOADED_MODULES};
use super::phase::{BootPhase, PhaseTracker};
use super::supervisor::RootProcessSupervisor;
use crate::driver::builtin_drivers;

/// The subsystems startup drives
#[derive(Clone)]
pub struct Collaborators {
    /// Packaged module images
    pub bundle: Arc<dyn ResourceBundle>,

    /// Module installer
    pub loader: Arc<dyn ModuleLoader>,

    /// Driver registry
    pub registry: Arc<dyn DriverRegistry>,

    /// Builds the root process
    pub root_factory: Arc<dyn RootProcessFactory>,

    /// Process scheduler
    pub scheduler: Arc<dyn Scheduler>,

    /// Timer subsystem
    pub timers: Arc<dyn TimerSubsystem>,
}

/// Startup parameters
#[derive(Debug, Clone)]
pub struct BootSettings {
    /// Bundle directory probed for preloaded images
    pub bootstrap_dir: String,

    /// Modules installed before anything else, in order
    pub modules: Vec<String>,

    /// Environment handed to the root process
    pub environment: Environment,

    /// Entry point of the root process
    pub entry: EntryPoint,

    /// Runtime description for the banner
    pub runtime_info: Option<RuntimeInfo>,

    /// Scheduler threads, for the banner
    pub threads: usize,

    /// Async threads, for the banner
    pub async_threads: usize,

    /// Suppression switch read by the banner
    pub suppression: SuppressionFlag,
}

impl BootSettings {
    /// Settings for `config`, using the process-wide suppression flag.
    ///
    /// A configuration that disables the banner sets that flag.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        let suppression = SuppressionFlag::process();
        if config.suppress_banner {
            suppression.set();
        }

        Self {
            bootstrap_dir: config.bootstrap_dir.clone(),
            modules: PRELOADED_MODULES.iter().map(|m| m.to_string()).collect(),
            environment: Environment::new(),
            entry: ROOT_ENTRY,
            runtime_info: config.runtime.clone(),
            threads: config.scheduler.threads,
            async_threads: config.scheduler.async_threads,
            suppression,
        }
    }
}

/// Runs the startup sequence
pub struct Bootstrap {
    loader: ModuleDriverLoader,
    supervisor: RootProcessSupervisor,
    translator: ArgumentTranslator,
    banner: BannerReporter,
    banner_out: Box<dyn Write + Send>,
    modules: Vec<String>,
    drivers: Vec<Box<dyn Driver>>,
    environment: Environment,
    phases: PhaseTracker,
    started: bool,
}

impl Bootstrap {
    /// Create a bootstrap over `collaborators`.
    ///
    /// The builtin driver set is registered unless replaced with
    /// [`Bootstrap::with_drivers`]. The banner goes to standard output.
    pub fn new(collaborators: Collaborators, settings: BootSettings) -> Self {
        let loader = ModuleDriverLoader::new(
            collaborators.bundle,
            collaborators.loader,
            collaborators.registry,
            settings.bootstrap_dir,
        );
        let supervisor = RootProcessSupervisor::new(
            collaborators.root_factory,
            collaborators.scheduler,
            collaborators.timers,
        )
        .with_entry(settings.entry);
        let banner = BannerReporter::new(
            settings.runtime_info,
            settings.threads,
            settings.async_threads,
            settings.suppression.clone(),
        );

        Self {
            loader,
            supervisor,
            translator: ArgumentTranslator::new(settings.suppression),
            banner,
            banner_out: Box::new(io::stdout()),
            modules: settings.modules,
            drivers: builtin_drivers(),
            environment: settings.environment,
            phases: PhaseTracker::new(),
            started: false,
        }
    }

    /// Register `drivers` instead of the builtin set.
    pub fn with_drivers(mut self, drivers: Vec<Box<dyn Driver>>) -> Self {
        self.drivers = drivers;
        self
    }

    /// Write the banner to `out` instead of standard output.
    pub fn with_banner_output(mut self, out: Box<dyn Write + Send>) -> Self {
        self.banner_out = out;
        self
    }

    /// Current startup phase.
    pub fn phase(&self) -> BootPhase {
        self.phases.current()
    }

    /// Run the startup sequence and return how the root process exited.
    ///
    /// Blocks until the root process terminates. `Ok` means the runtime
    /// ran and shut down, whatever the exit reason. Startup runs at most
    /// once; a second call fails.
    pub fn run<I, S>(&mut self, tokens: I, extra: ExtraDrivers) -> Result<ExitReason>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.started {
            return Err(Error::Runtime("startup has already run".to_string()));
        }
        self.started = true;

        info!("Starting runtime");

        let argv = self.translator.translate(tokens);
        self.banner.emit(&mut *self.banner_out);

        if let Err(e) = self.preload(extra) {
            error!("Startup failed after phase {}: {}", self.phases.current(), e);
            self.supervisor.teardown();
            return Err(e);
        }

        self.supervisor
            .run(argv, self.environment.clone(), &self.phases)
    }

    fn preload(&mut self, extra: ExtraDrivers) -> Result<()> {
        let drivers = std::mem::take(&mut self.drivers);

        let (strategy, modules) = self.loader.load_modules(&self.modules[..])?;
        info!("Loaded {} preloaded modules via {}", modules.len(), strategy);
        self.phases.advance(BootPhase::ModulesLoaded)?;

        self.loader.register_drivers(drivers)?;
        let report = self.loader.load(None::<&[&str]>, Some(extra.into_inner()))?;
        if !report.drivers.is_empty() {
            info!("Registered extra drivers: {}", report.drivers.join(", "));
        }
        self.phases.advance(BootPhase::DriversRegistered)?;

        Ok(())
    }
}
