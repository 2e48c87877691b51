//! Worker thread pools.
//!
//! The process scheduler owns two of these: one running processes and one
//! running asynchronous jobs.

pub mod thread;

pub use thread::{ThreadPool, ThreadPoolConfig, ThreadPoolError, ThreadPoolStats};
