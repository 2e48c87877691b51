//! Collaborator interfaces driven by the bootstrap sequencer.
//!
//! The sequencer owns none of these subsystems. It only calls the narrow
//! operations below, in a fixed order:
//!
//! - `ResourceBundle` / `ModuleLoader`: locate and install preloaded modules
//! - `DriverRegistry`: register driver instances by name
//! - `RootProcessFactory`: build the root process
//! - `Scheduler`: submit, join and shut down
//! - `TimerSubsystem`: shut down after the scheduler

pub mod driver;
pub mod loader;
pub mod scheduler;

pub use driver::{Driver, DriverRegistry};
pub use loader::{ModuleLoader, ResourceBundle};
pub use scheduler::{RootProcessFactory, Scheduler, TimerSubsystem};
