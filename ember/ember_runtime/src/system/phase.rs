//! Startup phase tracking.
//!
//! A single startup moves through the phases below strictly in order.
//! There is no way back and no restart.

use std::fmt;

use ember_core::error::{Error, Result};
use parking_lot::Mutex;
use tracing::debug;

/// Phase of a startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BootPhase {
    /// Nothing has happened yet
    NotStarted = 0,

    /// Preloaded modules are installed
    ModulesLoaded = 1,

    /// Builtin and extra drivers are registered
    DriversRegistered = 2,

    /// The root process has been submitted
    RootRunning = 3,

    /// The root process has terminated
    RootTerminated = 4,

    /// The scheduler worker pool is stopped
    SchedulerShutdown = 5,

    /// The timer subsystem is stopped
    TimersShutdown = 6,
}

impl BootPhase {
    /// The phase that must follow this one.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::ModulesLoaded),
            Self::ModulesLoaded => Some(Self::DriversRegistered),
            Self::DriversRegistered => Some(Self::RootRunning),
            Self::RootRunning => Some(Self::RootTerminated),
            Self::RootTerminated => Some(Self::SchedulerShutdown),
            Self::SchedulerShutdown => Some(Self::TimersShutdown),
            Self::TimersShutdown => None,
        }
    }

    /// Whether this is the final phase.
    pub fn is_terminal(self) -> bool {
        self == Self::TimersShutdown
    }
}

impl fmt::Display for BootPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not-started",
            Self::ModulesLoaded => "modules-loaded",
            Self::DriversRegistered => "drivers-registered",
            Self::RootRunning => "root-running",
            Self::RootTerminated => "root-terminated",
            Self::SchedulerShutdown => "scheduler-shutdown",
            Self::TimersShutdown => "timers-shutdown",
        };
        f.write_str(name)
    }
}

/// Records the current phase and rejects out-of-order transitions
#[derive(Debug)]
pub struct PhaseTracker {
    current: Mutex<BootPhase>,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracker {
    /// Start in [`BootPhase::NotStarted`].
    pub fn new() -> Self {
        Self {
            current: Mutex::new(BootPhase::NotStarted),
        }
    }

    /// The current phase.
    pub fn current(&self) -> BootPhase {
        *self.current.lock()
    }

    /// Move to `to`, which must be the immediate successor of the current phase.
    pub fn advance(&self, to: BootPhase) -> Result<()> {
        let mut current = self.current.lock();
        if current.next() != Some(to) {
            return Err(Error::Runtime(format!(
                "invalid startup transition {} -> {}",
                *current, to
            )));
        }
        debug!("Startup phase {} -> {}", *current, to);
        *current = to;
        Ok(())
    }

    /// Fail unless the current phase is `expected`.
    pub fn expect(&self, expected: BootPhase) -> Result<()> {
        let current = self.current();
        if current == expected {
            Ok(())
        } else {
            Err(Error::Runtime(format!(
                "startup is in phase {}, expected {}",
                current, expected
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_sequence() {
        let tracker = PhaseTracker::new();
        let mut phase = BootPhase::NotStarted;

        while let Some(next) = phase.next() {
            tracker.advance(next).unwrap();
            phase = next;
        }

        assert_eq!(tracker.current(), BootPhase::TimersShutdown);
        assert!(tracker.current().is_terminal());
    }

    #[test]
    fn test_skipping_is_rejected() {
        let tracker = PhaseTracker::new();
        let err = tracker.advance(BootPhase::RootRunning).unwrap_err();

        assert!(err.to_string().contains("not-started -> root-running"));
        assert_eq!(tracker.current(), BootPhase::NotStarted);
    }

    #[test]
    fn test_no_going_back() {
        let tracker = PhaseTracker::new();
        tracker.advance(BootPhase::ModulesLoaded).unwrap();

        assert!(tracker.advance(BootPhase::NotStarted).is_err());
        assert!(tracker.advance(BootPhase::ModulesLoaded).is_err());
        assert!(tracker.expect(BootPhase::ModulesLoaded).is_ok());
        assert!(tracker.expect(BootPhase::NotStarted).is_err());
    }
}
