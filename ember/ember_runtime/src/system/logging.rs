//! Log file sink.
//!
//! Runtime events go to a single file through a non-blocking writer. The
//! sink is attached once, early in startup, before anything is loaded.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// File that receives log records
    #[serde(default = "default_file")]
    pub file: PathBuf,

    /// Level filter, e.g. `info` or `ember_runtime=debug`; `RUST_LOG` wins
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_file() -> PathBuf {
    PathBuf::from("ember.log")
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: default_file(),
            level: default_level(),
        }
    }
}

impl LogConfig {
    fn build_filter(&self) -> Result<EnvFilter> {
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => EnvFilter::try_new(&self.level)
                .map_err(|e| anyhow!("invalid log level '{}': {}", self.level, e)),
        }
    }
}

/// Keeps the background log writer alive; records are flushed on drop.
#[must_use = "dropping the guard stops the log writer"]
pub struct LogGuard {
    path: PathBuf,
    _worker: WorkerGuard,
}

impl LogGuard {
    /// File the sink writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for LogGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogGuard").field("path", &self.path).finish()
    }
}

/// Attach the log file sink as the global subscriber.
///
/// The parent directory is created if needed and the file is appended to.
/// If a global subscriber is already installed it is kept and a warning
/// is logged through it.
pub fn attach_file_sink(config: &LogConfig) -> Result<LogGuard> {
    let filter = config.build_filter()?;

    let file_name = config
        .file
        .file_name()
        .ok_or_else(|| anyhow!("log file has no file name: {}", config.file.display()))?;
    let dir = match config.file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(&dir, file_name);
    let (writer, worker) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_thread_names(true)
        .with_target(true);

    match tracing_subscriber::registry().with(filter).with(layer).try_init() {
        Ok(()) => debug!("Logging to {}", config.file.display()),
        Err(e) => warn!("Log sink not attached, a subscriber is already installed: {}", e),
    }

    Ok(LogGuard {
        path: dir.join(file_name),
        _worker: worker,
    })
}
