//! # Ember Core
//!
//! `ember_core` provides the shared building blocks for the Ember runtime
//! bootstrap: error types, identifiers, the data that flows between the
//! sequencer and its collaborators, and the collaborator interfaces
//! themselves.
//!
//! The bootstrap sequencer in `ember_runtime` never talks to a concrete
//! module loader, driver registry, scheduler or timer service. It talks to
//! the traits defined here, so that each subsystem can be substituted in
//! tests or by an embedding host.
//!
//! ## Crate Structure
//!
//! - **error**: Error hierarchy for loading, registration and scheduling
//! - **id**: Strongly-typed identifiers
//! - **traits**: Collaborator interfaces (loader, bundle, registry, scheduler, timers)
//! - **types**: Argument lists, module images, processes and exit reasons

pub mod error;
pub mod id;
pub mod traits;
pub mod types;

pub use error::{DriverError, Error, ErrorKind, ModuleError, Result, SchedulerError};
pub use id::{ProcessId, TimerId};
pub use traits::{
    Driver, DriverRegistry, ModuleLoader, ResourceBundle, RootProcessFactory, Scheduler,
    TimerSubsystem,
};
pub use types::{
    ArgList, EntryPoint, Environment, ExitReason, ModuleDescriptor, ModuleImage, Process,
    ProcessArgs, ProcessBody, ProcessContext, ProcessHandle, ROOT_ENTRY,
};
