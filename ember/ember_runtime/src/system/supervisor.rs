//! Root process supervision.
//!
//! The supervisor builds the root process, submits it, blocks until it
//! terminates, and then retires the scheduler and the timer subsystem in
//! that order. Scheduled work may still hold timers while the scheduler
//! drains, so the timer subsystem always goes last.

use std::sync::Arc;

use ember_core::error::Result;
use ember_core::traits::{RootProcessFactory, Scheduler, TimerSubsystem};
use ember_core::types::{ArgList, EntryPoint, Environment, ExitReason, ProcessArgs, ROOT_ENTRY};
use tracing::{error, info, warn};

use super::phase::{BootPhase, PhaseTracker};

/// Launches the root process and tears the runtime down after it exits
pub struct RootProcessSupervisor {
    factory: Arc<dyn RootProcessFactory>,
    scheduler: Arc<dyn Scheduler>,
    timers: Arc<dyn TimerSubsystem>,
    entry: EntryPoint,
}

impl RootProcessSupervisor {
    /// Create a supervisor that starts the root process in [`ROOT_ENTRY`].
    pub fn new(
        factory: Arc<dyn RootProcessFactory>,
        scheduler: Arc<dyn Scheduler>,
        timers: Arc<dyn TimerSubsystem>,
    ) -> Self {
        Self {
            factory,
            scheduler,
            timers,
            entry: ROOT_ENTRY,
        }
    }

    /// Start the root process somewhere else.
    pub fn with_entry(mut self, entry: EntryPoint) -> Self {
        self.entry = entry;
        self
    }

    /// The root entry point.
    pub fn entry(&self) -> &EntryPoint {
        &self.entry
    }

    /// Run the root process to completion, then shut everything down.
    ///
    /// `phases` must be at [`BootPhase::DriversRegistered`]. The exit
    /// reason is returned but not acted on: normal and abnormal
    /// termination lead to the same unconditional shutdown. If the root
    /// process cannot be created or submitted, the scheduler and timers
    /// are still shut down before the error is returned.
    pub fn run(&self, argv: ArgList, env: Environment, phases: &PhaseTracker) -> Result<ExitReason> {
        phases.expect(BootPhase::DriversRegistered)?;

        let launched = self
            .factory
            .create(&self.entry, ProcessArgs::new(argv, env))
            .and_then(|process| self.scheduler.submit(process));

        let handle = match launched {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to launch root process {}: {}", self.entry, e);
                self.teardown();
                return Err(e);
            }
        };

        phases.advance(BootPhase::RootRunning)?;
        info!("Root process {} started in {}", handle.pid(), self.entry);

        let reason = self.scheduler.join(&handle);
        phases.advance(BootPhase::RootTerminated)?;
        match &reason {
            ExitReason::Normal => info!("Root process {} exited normally", handle.pid()),
            ExitReason::Abnormal(why) => {
                warn!("Root process {} exited abnormally: {}", handle.pid(), why)
            }
        }

        self.scheduler.shutdown();
        phases.advance(BootPhase::SchedulerShutdown)?;

        self.timers.shutdown();
        phases.advance(BootPhase::TimersShutdown)?;

        info!("Runtime shut down");
        Ok(reason)
    }

    /// Shut down the scheduler, then the timer subsystem.
    ///
    /// Used when startup fails before the root process is running.
    pub fn teardown(&self) {
        info!("Tearing down scheduler and timers");
        self.scheduler.shutdown();
        self.timers.shutdown();
    }
}
