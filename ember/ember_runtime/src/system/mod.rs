//! System management for the Ember runtime
//!
//! This module provides the startup sequence and its parts: argument
//! translation, the banner, module and driver loading, root process
//! supervision, configuration and the log sink.

pub mod args;
pub mod banner;
pub mod bootstrap;
pub mod config;
pub mod loader;
pub mod logging;
pub mod phase;
pub mod supervisor;

// Re-export key types for convenience
pub use args::{ArgumentTranslator, SuppressionFlag};
pub use banner::BannerReporter;
pub use bootstrap::{BootSettings, Bootstrap, Collaborators};
pub use config::{ConfigOverrides, RuntimeConfig, RuntimeInfo};
pub use loader::{ExtraDrivers, LoadReport, LoadStrategy, ModuleDriverLoader, PRELOADED_MODULES};
pub use logging::{attach_file_sink, LogConfig, LogGuard};
pub use phase::{BootPhase, PhaseTracker};
pub use supervisor::RootProcessSupervisor;
