//! Command-line argument translation.
//!
//! Every raw token becomes one byte-string argument of the root process,
//! in input order. Two tokens also suppress the startup banner as a side
//! effect, since interactive output would interleave with it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ember_core::types::ArgList;
use once_cell::sync::Lazy;
use tracing::debug;

/// Flag that runs the node without a shell.
pub const NOSHELL_FLAG: &str = "-noshell";

/// Flag that runs the node without reading input.
pub const NOINPUT_FLAG: &str = "-noinput";

/// Environment variable that suppresses the banner when set to `true` or `1`.
pub const SUPPRESS_ENV: &str = "EMBER_PROGRESS_SUPPRESS";

static PROCESS_SUPPRESSION: Lazy<SuppressionFlag> = Lazy::new(SuppressionFlag::new);

/// Shared switch that silences interactive-mode output.
///
/// Clones share the same state. [`SuppressionFlag::process`] returns the
/// process-wide instance; tests construct their own with
/// [`SuppressionFlag::new`].
#[derive(Debug, Clone, Default)]
pub struct SuppressionFlag(Arc<AtomicBool>);

impl SuppressionFlag {
    /// A fresh, unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide flag.
    pub fn process() -> Self {
        PROCESS_SUPPRESSION.clone()
    }

    /// Turn suppression on. It is never turned back off.
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether suppression has been requested.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Set the flag if [`SUPPRESS_ENV`] asks for it.
    pub fn apply_env(&self) {
        if let Ok(value) = std::env::var(SUPPRESS_ENV) {
            if matches!(value.trim(), "1" | "true" | "TRUE" | "True") {
                self.set();
            }
        }
    }
}

/// Whether `token` is one of the interactive-mode suppression flags.
pub fn is_suppression_flag(token: &str) -> bool {
    token == NOSHELL_FLAG || token == NOINPUT_FLAG
}

/// Converts raw command-line tokens into the root process's argument list.
#[derive(Debug, Clone)]
pub struct ArgumentTranslator {
    suppression: SuppressionFlag,
}

impl ArgumentTranslator {
    /// Create a translator that records suppression in `suppression`.
    pub fn new(suppression: SuppressionFlag) -> Self {
        Self { suppression }
    }

    /// Translate `tokens` into an argument list.
    ///
    /// Tokens are not validated. Any suppression flag among them sets the
    /// translator's [`SuppressionFlag`]; the flag itself is still passed
    /// through to the root process.
    pub fn translate<I, S>(&self, tokens: I) -> ArgList
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let argv: ArgList = tokens
            .into_iter()
            .map(|token| {
                let token = token.as_ref();
                if is_suppression_flag(token) {
                    self.suppression.set();
                }
                token.as_bytes().to_vec()
            })
            .collect();

        debug!(
            "Translated {} arguments (suppressed: {})",
            argv.len(),
            self.suppression.is_set()
        );

        argv
    }
}
