//! Ember Runtime - startup and teardown for the Ember runtime
//!
//! This crate brings a runtime from a bare process to a running root
//! process: it installs the preloaded modules, registers drivers, starts
//! `otp_ring0:start/2` on the scheduler, waits for it, and then stops the
//! scheduler and the timer subsystem.

pub mod code;
pub mod driver;
pub mod system;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use ember_concurrency::{ProcessScheduler, TimerService};
use ember_core::error::Error;
use ember_core::types::ExitReason;
use tracing::info;

use code::{CodeSpace, MemoryBundle, NativeEntryFactory};
use driver::DriverTable;
use system::{BootSettings, Bootstrap, Collaborators, ExtraDrivers, RuntimeConfig};

/// Runtime facade that owns the concrete subsystems.
pub struct Runtime {
    config: RuntimeConfig,

    /// Installed modules and native entry points
    pub code: Arc<CodeSpace>,

    /// Registered drivers
    pub drivers: Arc<DriverTable>,

    /// Packaged module images
    pub bundle: Arc<MemoryBundle>,

    /// Process scheduler
    pub scheduler: Arc<ProcessScheduler>,

    /// Timer service
    pub timers: Arc<TimerService>,

    started: AtomicBool,
}

impl Runtime {
    /// Create the subsystems described by `config`.
    ///
    /// Worker threads and the timer thread start here.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        info!("Initializing Ember runtime");

        let bundle = match &config.bundle {
            Some(dir) => MemoryBundle::from_directory(dir, &config.bootstrap_dir)
                .with_context(|| format!("Failed to package bundle from {}", dir.display()))?,
            None => MemoryBundle::new(),
        };

        let scheduler =
            ProcessScheduler::new(config.scheduler_config()).context("Failed to start scheduler")?;
        let timers = TimerService::start().context("Failed to start timer service")?;

        info!(
            "Ember runtime initialized ({} scheduler threads, {} async threads)",
            scheduler.threads(),
            scheduler.async_threads()
        );

        Ok(Self {
            code: Arc::new(CodeSpace::new(config.code_path.clone())),
            drivers: Arc::new(DriverTable::new()),
            bundle: Arc::new(bundle),
            scheduler: Arc::new(scheduler),
            timers: Arc::new(timers),
            config,
            started: AtomicBool::new(false),
        })
    }

    /// The configuration the runtime was built from.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The subsystems as startup collaborators.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            bundle: self.bundle.clone(),
            loader: self.code.clone(),
            registry: self.drivers.clone(),
            root_factory: Arc::new(NativeEntryFactory::new(self.code.clone())),
            scheduler: self.scheduler.clone(),
            timers: self.timers.clone(),
        }
    }

    /// The startup sequence over this runtime's subsystems.
    ///
    /// The subsystems can be started once; every call after the first
    /// fails without touching them.
    pub fn bootstrap(&self) -> ember_core::Result<Bootstrap> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(Error::Runtime("startup has already run".to_string()));
        }
        Ok(Bootstrap::new(self.collaborators(), BootSettings::from_config(&self.config)))
    }

    /// Run startup to completion with `tokens` as the command line.
    pub fn run<I, S>(&self, tokens: I, extra: ExtraDrivers) -> ember_core::Result<ExitReason>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.bootstrap()?.run(tokens, extra)
    }
}
