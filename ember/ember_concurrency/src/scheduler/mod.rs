//! Process scheduling.

pub mod process;

pub use process::{ProcessScheduler, SchedulerConfig};
