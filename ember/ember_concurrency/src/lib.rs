#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

//! # Ember Concurrency
//!
//! Execution infrastructure driven by the Ember bootstrap sequencer:
//!
//! - A worker thread pool with panic capture and statistics
//! - The process scheduler, with a synchronous and an asynchronous pool
//! - The timer service that delivers time-based events to processes
//!
//! The scheduler and timer service implement the `Scheduler` and
//! `TimerSubsystem` interfaces from `ember_core`. The sequencer shuts the
//! scheduler down first and the timer service second.

/// Worker thread pools
pub mod pool;

/// Process scheduling on top of the worker pools
pub mod scheduler;

/// Timer service
pub mod timer;

pub use pool::thread::ThreadPool;
pub use scheduler::process::{ProcessScheduler, SchedulerConfig};
pub use timer::service::{TimerError, TimerService};
