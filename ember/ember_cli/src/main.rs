use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ember_core::types::ExitReason;
use ember_runtime::system::{attach_file_sink, ConfigOverrides, ExtraDrivers, RuntimeConfig, SuppressionFlag};
use ember_runtime::Runtime;
use tracing::info;

/// Ember runtime launcher
///
/// Installs the preloaded modules, registers the builtin drivers and runs
/// the root process. Arguments after the options are handed to the root
/// process unchanged.
#[derive(Parser, Debug)]
#[clap(name = "ember", author, version, about)]
struct Cli {
    /// Configuration file (TOML, or JSON with a .json extension)
    #[clap(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Installation root shown in the banner
    #[clap(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Directory of module images to package as the resource bundle
    #[clap(long, value_name = "DIR")]
    bundle: Option<PathBuf>,

    /// Directory searched for module images; may be repeated
    #[clap(long = "code-path", value_name = "DIR")]
    code_path: Vec<PathBuf>,

    /// Log file
    #[clap(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Arguments for the root process
    #[clap(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    args: Vec<String>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            root_dir: self.root.clone(),
            bundle: self.bundle.clone(),
            code_path: self.code_path.clone(),
            log_file: self.log_file.clone(),
        }
    }
}

fn run(cli: Cli) -> Result<ExitReason> {
    if let Some(path) = cli.config.as_deref() {
        if !path.exists() {
            bail!("Configuration file not found: {}", path.display());
        }
    }

    let mut config = RuntimeConfig::load(cli.config.as_deref())?;
    config.merge(cli.overrides());

    SuppressionFlag::process().apply_env();

    let _log = attach_file_sink(&config.logging)?;

    // Re-validated with overrides applied and the log sink attached.
    config.validate()?;

    let runtime = Runtime::new(config)?;
    let reason = runtime
        .run(&cli.args, ExtraDrivers::new())
        .context("Startup failed")?;

    info!("Root process exited: {}", reason);
    Ok(reason)
}

fn main() {
    let cli = Cli::parse();

    match run(cli) {
        Ok(ExitReason::Normal) => {}
        Ok(ExitReason::Abnormal(reason)) => {
            eprintln!("ember: root process exited: {}", reason);
        }
        Err(e) => {
            eprintln!("ember: {:#}", e);
            std::process::exit(1);
        }
    }
}
