//! Strongly-typed identifiers.
//!
//! Each identifier is a UUID wrapped with a phantom marker so that a
//! process id can never be passed where a timer id is expected.
//!
//! # Examples
//!
//! ```
//! use ember_core::id::{ProcessId, TimerId};
//! use std::str::FromStr;
//!
//! let pid = ProcessId::new();
//! let timer = TimerId::new();
//! assert_ne!(pid.to_string(), timer.to_string());
//!
//! let id_str = "550e8400-e29b-41d4-a716-446655440000";
//! let pid = ProcessId::from_str(id_str).unwrap();
//! assert_eq!(pid.to_string(), id_str);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use uuid::Uuid;

/// A type-safe identifier based on UUID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Id<T> {
    uuid: Uuid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T> Id<T> {
    /// Create a new random identifier.
    pub fn new() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// Create an identifier from a specific UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            _marker: PhantomData,
        }
    }

    /// Get the underlying UUID.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Create a nil (all zeros) identifier.
    pub fn nil() -> Self {
        Self::from_uuid(Uuid::nil())
    }

    /// Check if this is a nil identifier.
    pub fn is_nil(&self) -> bool {
        self.uuid.is_nil()
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uuid)
    }
}

impl<T> FromStr for Id<T> {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_uuid(Uuid::parse_str(s)?))
    }
}

/// Marker type for processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessMarker;
/// Identifier for a scheduled process.
pub type ProcessId = Id<ProcessMarker>;

/// Marker type for timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerMarker;
/// Identifier for a pending timer.
pub type TimerId = Id<TimerMarker>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_new() {
        let id1 = ProcessId::new();
        let id2 = ProcessId::new();
        assert_ne!(id1, id2, "Generated IDs should be unique");
    }

    #[test]
    fn test_id_nil() {
        let nil_id = TimerId::nil();
        assert_eq!(nil_id.to_string(), "00000000-0000-0000-0000-000000000000");
        assert!(nil_id.is_nil());
        assert!(!TimerId::new().is_nil());
    }

    #[test]
    fn test_id_serde() {
        let id = ProcessId::new();
        let serialized = serde_json::to_string(&id).unwrap();
        let deserialized: ProcessId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(id, deserialized);
    }
}
