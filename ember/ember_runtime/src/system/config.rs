//! Configuration for the Ember runtime
//!
//! Handles loading, validating and overriding runtime configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ember_concurrency::SchedulerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::logging::LogConfig;

/// Errors that can occur in configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Description of the installed runtime, shown in the startup banner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInfo {
    /// Release of the standard library the runtime ships with
    #[serde(default = "default_otp_version")]
    pub otp_version: String,

    /// Version of the runtime system
    #[serde(default = "default_erts_version")]
    pub erts_version: String,

    /// Installation root
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Whether drivers receive unicode data
    #[serde(default = "default_unicode")]
    pub unicode_driver_interface: bool,
}

fn default_otp_version() -> String {
    "R16B03".to_string()
}

fn default_erts_version() -> String {
    "5.10.4".to_string()
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_unicode() -> bool {
    true
}

impl Default for RuntimeInfo {
    fn default() -> Self {
        Self {
            otp_version: default_otp_version(),
            erts_version: default_erts_version(),
            root_dir: default_root_dir(),
            unicode_driver_interface: default_unicode(),
        }
    }
}

/// Worker pool sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerSection {
    /// Scheduler worker threads
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Asynchronous I/O worker threads
    #[serde(default = "default_async_threads")]
    pub async_threads: usize,

    /// Pending work per pool before submission is refused
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
}

fn default_threads() -> usize {
    num_cpus::get()
}

fn default_async_threads() -> usize {
    10
}

fn default_queue_size() -> usize {
    1024
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            async_threads: default_async_threads(),
            queue_size: default_queue_size(),
        }
    }
}

impl From<&SchedulerSection> for SchedulerConfig {
    fn from(section: &SchedulerSection) -> Self {
        SchedulerConfig {
            threads: section.threads,
            async_threads: section.async_threads,
            queue_size: section.queue_size,
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Installed runtime description; without it no banner is printed
    #[serde(default)]
    pub runtime: Option<RuntimeInfo>,

    /// Bundle directory holding the preloaded module images
    #[serde(default = "default_bootstrap_dir")]
    pub bootstrap_dir: String,

    /// Scheduler sizing
    #[serde(default)]
    pub scheduler: SchedulerSection,

    /// Directories searched for module images when no bundle is available
    #[serde(default)]
    pub code_path: Vec<PathBuf>,

    /// Directory packaged into the in-memory bundle at startup
    #[serde(default)]
    pub bundle: Option<PathBuf>,

    /// Log file settings
    #[serde(default)]
    pub logging: LogConfig,

    /// Never print the startup banner
    #[serde(default)]
    pub suppress_banner: bool,
}

fn default_bootstrap_dir() -> String {
    "erts/ebin".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            runtime: None,
            bootstrap_dir: default_bootstrap_dir(),
            scheduler: SchedulerSection::default(),
            code_path: Vec::new(),
            bundle: None,
            logging: LogConfig::default(),
            suppress_banner: false,
        }
    }
}

/// Values given on the command line, applied on top of a loaded configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Installation root
    pub root_dir: Option<PathBuf>,

    /// Bundle directory
    pub bundle: Option<PathBuf>,

    /// Extra code path entries, searched before configured ones
    pub code_path: Vec<PathBuf>,

    /// Log file
    pub log_file: Option<PathBuf>,
}

impl RuntimeConfig {
    /// Load configuration from a file
    ///
    /// `.json` files are parsed as JSON, everything else as TOML. A path
    /// that does not exist yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = RuntimeConfig::default();

        if let Some(path) = path {
            info!("Loading configuration from {}", path.display());

            if !path.exists() {
                warn!("Configuration file not found: {}", path.display());
                return Ok(config);
            }

            let content = fs::read_to_string(path)
                .map_err(|e| ConfigError::LoadFailed(e.to_string()))
                .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

            config = Self::parse(path, &content)
                .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;
        } else {
            info!("No configuration file specified, using defaults");
        }

        config.validate()?;

        Ok(config)
    }

    fn parse(path: &Path, content: &str) -> std::result::Result<Self, ConfigError> {
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            serde_json::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
        } else {
            toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.bootstrap_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("Bootstrap directory cannot be empty".to_string()).into());
        }

        if self.scheduler.threads == 0 {
            return Err(ConfigError::Invalid("Scheduler threads cannot be zero".to_string()).into());
        }

        if self.scheduler.async_threads == 0 {
            return Err(ConfigError::Invalid("Async threads cannot be zero".to_string()).into());
        }

        if self.scheduler.queue_size == 0 {
            return Err(ConfigError::Invalid("Queue size cannot be zero".to_string()).into());
        }

        if self.logging.file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("Log file cannot be empty".to_string()).into());
        }

        if self.runtime.is_none() && !self.suppress_banner {
            warn!("No runtime description configured, the banner will not be printed");
        }

        if self.code_path.is_empty() && self.bundle.is_none() {
            warn!("Neither a bundle nor a code path is configured");
        }

        Ok(())
    }

    /// Apply command-line overrides
    pub fn merge(&mut self, overrides: ConfigOverrides) {
        if let Some(root_dir) = overrides.root_dir {
            self.runtime.get_or_insert_with(RuntimeInfo::default).root_dir = root_dir;
        }

        if overrides.bundle.is_some() {
            self.bundle = overrides.bundle;
        }

        if !overrides.code_path.is_empty() {
            let mut code_path = overrides.code_path;
            code_path.append(&mut self.code_path);
            self.code_path = code_path;
        }

        if let Some(file) = overrides.log_file {
            self.logging.file = file;
        }
    }

    /// Scheduler configuration derived from this configuration.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::from(&self.scheduler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    fn write_config(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_toml_config() {
        let file = write_config(
            ".toml",
            r#"
            bootstrap_dir = "boot/ebin"
            code_path = ["/opt/ember/lib"]
            suppress_banner = true

            [runtime]
            otp_version = "R16B02"
            root_dir = "/opt/ember"

            [scheduler]
            threads = 3
            async_threads = 2

            [logging]
            level = "debug"
            "#,
        );

        let config = RuntimeConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.bootstrap_dir, "boot/ebin");
        assert_eq!(config.code_path, vec![PathBuf::from("/opt/ember/lib")]);
        assert!(config.suppress_banner);

        let runtime = config.runtime.unwrap();
        assert_eq!(runtime.otp_version, "R16B02");
        assert_eq!(runtime.erts_version, "5.10.4");
        assert_eq!(runtime.root_dir, PathBuf::from("/opt/ember"));
        assert!(runtime.unicode_driver_interface);

        assert_eq!(config.scheduler.threads, 3);
        assert_eq!(config.scheduler.async_threads, 2);
        assert_eq!(config.scheduler.queue_size, 1024);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, PathBuf::from("ember.log"));
    }

    #[test]
    fn test_load_json_config() {
        let file = write_config(
            ".json",
            r#"{ "bundle": "/srv/ebin", "scheduler": { "queue_size": 8 } }"#,
        );

        let config = RuntimeConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.bundle, Some(PathBuf::from("/srv/ebin")));
        assert_eq!(config.scheduler.queue_size, 8);
        assert_eq!(config.scheduler.async_threads, 10);
        assert!(config.runtime.is_none());
    }

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::load(None).unwrap();

        assert_eq!(config.bootstrap_dir, "erts/ebin");
        assert_eq!(config.scheduler.threads, num_cpus::get());
        assert_eq!(config.scheduler.async_threads, 10);
        assert!(config.runtime.is_none());
        assert!(!config.suppress_banner);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RuntimeConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_unparseable_file_is_an_error() {
        let file = write_config(".toml", "scheduler = [not toml");
        let err = RuntimeConfig::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Failed to parse configuration file"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let file = write_config(".toml", "[scheduler]\nthreads = 0\n");
        let err = RuntimeConfig::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Scheduler threads cannot be zero"));

        let config = RuntimeConfig {
            bootstrap_dir: "  ".to_string(),
            ..RuntimeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_overrides() {
        let mut config = RuntimeConfig {
            code_path: vec![PathBuf::from("/configured")],
            ..RuntimeConfig::default()
        };

        config.merge(ConfigOverrides {
            root_dir: Some(PathBuf::from("/override/root")),
            bundle: Some(PathBuf::from("/override/ebin")),
            code_path: vec![PathBuf::from("/first")],
            log_file: Some(PathBuf::from("/tmp/run.log")),
        });

        assert_eq!(
            config.runtime.as_ref().map(|r| r.root_dir.clone()),
            Some(PathBuf::from("/override/root"))
        );
        assert_eq!(config.bundle, Some(PathBuf::from("/override/ebin")));
        assert_eq!(
            config.code_path,
            vec![PathBuf::from("/first"), PathBuf::from("/configured")]
        );
        assert_eq!(config.logging.file, PathBuf::from("/tmp/run.log"));
    }

    #[test]
    fn test_empty_overrides_change_nothing() {
        let mut config = RuntimeConfig::default();
        config.merge(ConfigOverrides::default());
        assert_eq!(config, RuntimeConfig::default());
    }
}
