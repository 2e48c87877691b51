//! Time-based event delivery.

pub mod service;

pub use service::{TimerError, TimerService};
