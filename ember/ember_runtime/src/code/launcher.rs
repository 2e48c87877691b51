//! Root process factory backed by the code space's native table.

use std::sync::Arc;

use ember_core::error::Result;
use ember_core::traits::RootProcessFactory;
use ember_core::types::{EntryPoint, ExitReason, Process, ProcessArgs, ProcessBody};
use tracing::{debug, warn};

use super::space::CodeSpace;

/// Builds processes whose body is the native function registered for the
/// entry point.
///
/// An entry point with no native function still yields a process; it
/// terminates at once with an `undef` reason.
#[derive(Debug, Clone)]
pub struct NativeEntryFactory {
    code: Arc<CodeSpace>,
}

impl NativeEntryFactory {
    /// Create a factory over `code`.
    pub fn new(code: Arc<CodeSpace>) -> Self {
        Self { code }
    }
}

impl RootProcessFactory for NativeEntryFactory {
    fn create(&self, entry: &EntryPoint, args: ProcessArgs) -> Result<Process> {
        let body: ProcessBody = match self.code.native(entry) {
            Some(native) => {
                debug!("Resolved {} to a native function", entry);
                Box::new(move |ctx, args| native(ctx, args))
            }
            None => {
                warn!("No function {} is loaded", entry);
                let reason = format!("undef: {}", entry);
                Box::new(move |_, _| ExitReason::Abnormal(reason))
            }
        };

        Ok(Process::new(entry.clone(), args, body))
    }
}
