//! Error types for the Ember runtime bootstrap.
//!
//! Errors are organized by the collaborator that raises them. The root
//! error type, `Error`, wraps each of the subsystem-specific errors so the
//! top-level startup sequence can surface any of them uniformly.

use std::path::PathBuf;

use thiserror::Error;

/// Root error type for the bootstrap.
#[derive(Debug, Error)]
pub enum Error {
    /// Module location, read or install errors
    #[error("Module error: {0}")]
    Module(#[from] ModuleError),

    /// Driver registration errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Process scheduling errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Invalid runtime configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors not tied to a specific module
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Violated sequencing or other runtime invariant
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Errors raised while locating, reading or installing a module image.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// A preloaded image is missing from the resource bundle
    #[error("resource not found: {path}")]
    ResourceNotFound {
        /// The bundle path that was probed
        path: String,
    },

    /// The image is not a well-formed module container
    #[error("malformed image for module {module}: {reason}")]
    MalformedImage {
        /// Module name
        module: String,
        /// What was wrong with the image
        reason: String,
    },

    /// The image refers to something the runtime cannot resolve
    #[error("type resolution failed for module {module}: {reason}")]
    TypeResolution {
        /// Module name
        module: String,
        /// What could not be resolved
        reason: String,
    },

    /// The filesystem resolver found no image for the module
    #[error("module {module} not found on the code path")]
    NotFound {
        /// Module name
        module: String,
    },

    /// Reading an image failed
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The file or bundle path being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the driver registry.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Another driver already owns the name
    #[error("driver {0} is already registered")]
    AlreadyRegistered(String),

    /// The driver refused to initialize
    #[error("driver {name} failed to initialize: {reason}")]
    InitFailed {
        /// Driver name
        name: String,
        /// Reason reported by the driver
        reason: String,
    },
}

/// Errors raised by the process scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler no longer accepts work
    #[error("scheduler is shutting down")]
    ShuttingDown,

    /// The run queue is full
    #[error("scheduler run queue is full")]
    QueueFull,

    /// A worker thread could not be started
    #[error("failed to spawn worker: {0}")]
    SpawnFailed(String),
}

/// Coarse classification of a startup failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required image is missing
    ResourceNotFound,
    /// An image could not be installed
    MalformedImage,
    /// An image references something that cannot be resolved
    TypeResolution,
    /// Filesystem or bundle I/O failed
    Io,
    /// A driver could not be registered
    DriverRegistration,
    /// The scheduler rejected work
    Scheduling,
    /// Configuration was invalid
    Config,
    /// Anything else
    Runtime,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Module(ModuleError::ResourceNotFound { .. }) => ErrorKind::ResourceNotFound,
            Self::Module(ModuleError::NotFound { .. }) => ErrorKind::ResourceNotFound,
            Self::Module(ModuleError::MalformedImage { .. }) => ErrorKind::MalformedImage,
            Self::Module(ModuleError::TypeResolution { .. }) => ErrorKind::TypeResolution,
            Self::Module(ModuleError::Io { .. }) | Self::Io(_) => ErrorKind::Io,
            Self::Driver(_) => ErrorKind::DriverRegistration,
            Self::Scheduler(_) => ErrorKind::Scheduling,
            Self::Config(_) => ErrorKind::Config,
            Self::Runtime(_) => ErrorKind::Runtime,
        }
    }
}

/// Result type used throughout the bootstrap.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_not_found_names_path() {
        let err: Error = ModuleError::ResourceNotFound {
            path: "erts/ebin/m2.beam".to_string(),
        }
        .into();

        assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
        assert!(err.to_string().contains("erts/ebin/m2.beam"));
    }

    #[test]
    fn test_error_kinds() {
        let malformed: Error = ModuleError::MalformedImage {
            module: "m1".to_string(),
            reason: "bad magic".to_string(),
        }
        .into();
        assert_eq!(malformed.kind(), ErrorKind::MalformedImage);

        let io: Error = ModuleError::Io {
            path: PathBuf::from("/tmp/m1.beam"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        }
        .into();
        assert_eq!(io.kind(), ErrorKind::Io);
        assert!(io.to_string().contains("/tmp/m1.beam"));

        let driver: Error = DriverError::AlreadyRegistered("efile".to_string()).into();
        assert_eq!(driver.kind(), ErrorKind::DriverRegistration);

        let sched: Error = SchedulerError::ShuttingDown.into();
        assert_eq!(sched.kind(), ErrorKind::Scheduling);
    }
}
