//! Process scheduling, timer and root-process interfaces.

use crate::error::Result;
use crate::types::{EntryPoint, ExitReason, Process, ProcessArgs, ProcessHandle};

/// Worker pool that executes processes.
pub trait Scheduler: Send + Sync {
    /// Queue a process for execution and return a handle that observes it.
    fn submit(&self, process: Process) -> Result<ProcessHandle>;

    /// Block the calling thread until the process terminates.
    ///
    /// Normal and abnormal termination both unblock the caller.
    fn join(&self, handle: &ProcessHandle) -> ExitReason {
        handle.join()
    }

    /// Stop accepting work and block until the pool has drained or stopped.
    fn shutdown(&self);
}

/// Time-based event delivery for scheduled processes.
pub trait TimerSubsystem: Send + Sync {
    /// Retire the timer service. Pending timers are dropped.
    fn shutdown(&self);
}

/// Builds the root process from an entry point and its `(argv, env)` tuple.
///
/// Substituting the factory lets tests run an alternative root body
/// without touching the sequencer.
pub trait RootProcessFactory: Send + Sync {
    /// Create the process that will be submitted to the scheduler.
    fn create(&self, entry: &EntryPoint, args: ProcessArgs) -> Result<Process>;
}
