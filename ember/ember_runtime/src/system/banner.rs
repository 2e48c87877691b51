//! Startup banner.

use std::io::Write;

use tracing::debug;

use super::args::SuppressionFlag;
use super::config::RuntimeInfo;

/// Version of the host runtime, shown next to the platform.
pub const HOST_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prints a one-line description of the runtime at startup
#[derive(Debug, Clone)]
pub struct BannerReporter {
    info: Option<RuntimeInfo>,
    threads: usize,
    async_threads: usize,
    suppression: SuppressionFlag,
}

impl BannerReporter {
    /// Create a reporter. Without `info` nothing is ever printed.
    pub fn new(
        info: Option<RuntimeInfo>,
        threads: usize,
        async_threads: usize,
        suppression: SuppressionFlag,
    ) -> Self {
        Self {
            info,
            threads,
            async_threads,
            suppression,
        }
    }

    /// The banner line, or `None` when it must not be shown.
    ///
    /// The suppression flag is read at call time, so this has to run after
    /// argument translation.
    pub fn render(&self) -> Option<String> {
        if self.suppression.is_set() {
            return None;
        }
        let info = self.info.as_ref()?;

        let mut line = format!(
            "** Ember {} **  [root:{}] [erts:{}] [smp S:{} A:{}] [host:{}-{} ember-{}]",
            info.otp_version,
            info.root_dir.display(),
            info.erts_version,
            self.threads,
            self.async_threads,
            std::env::consts::OS,
            std::env::consts::ARCH,
            HOST_VERSION,
        );
        if info.unicode_driver_interface {
            line.push_str(" [unicode]");
        }
        Some(line)
    }

    /// Write the banner to `out`. Write failures are ignored.
    pub fn emit<W: Write + ?Sized>(&self, out: &mut W) -> bool {
        match self.render() {
            Some(line) => {
                if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
                    debug!("Could not write banner: {}", e);
                }
                true
            }
            None => {
                debug!("Banner suppressed");
                false
            }
        }
    }
}
