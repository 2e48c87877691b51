//! Process data: entry points, exit reasons and termination handles.
//!
//! A [`Process`] is built by a root-process factory, moved into the
//! scheduler on submission, and observed afterwards only through its
//! [`ProcessHandle`].

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::args::{ArgList, Environment};
use crate::id::ProcessId;

/// A `module:function/arity` triple naming the code a process starts in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryPoint {
    /// Module name
    pub module: Cow<'static, str>,

    /// Exported function name
    pub function: Cow<'static, str>,

    /// Number of arguments
    pub arity: u8,
}

/// Entry point of the root process: `otp_ring0:start/2`.
pub const ROOT_ENTRY: EntryPoint = EntryPoint::from_static("otp_ring0", "start", 2);

impl EntryPoint {
    /// Create an entry point from owned or borrowed names.
    pub fn new(
        module: impl Into<Cow<'static, str>>,
        function: impl Into<Cow<'static, str>>,
        arity: u8,
    ) -> Self {
        Self {
            module: module.into(),
            function: function.into(),
            arity,
        }
    }

    /// Const constructor for static names.
    pub const fn from_static(module: &'static str, function: &'static str, arity: u8) -> Self {
        Self {
            module: Cow::Borrowed(module),
            function: Cow::Borrowed(function),
            arity,
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.module, self.function, self.arity)
    }
}

/// Why a process terminated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// The process returned normally
    Normal,

    /// The process crashed or exited with an error reason
    Abnormal(String),
}

impl ExitReason {
    /// Whether the process exited normally.
    pub fn is_normal(&self) -> bool {
        matches!(self, Self::Normal)
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Abnormal(reason) => write!(f, "{}", reason),
        }
    }
}

/// The two-element `(argv, env)` argument tuple.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessArgs {
    /// Translated command-line arguments
    pub argv: ArgList,

    /// Environment entries
    pub env: Environment,
}

impl ProcessArgs {
    /// Build the argument tuple.
    pub fn new(argv: ArgList, env: Environment) -> Self {
        Self { argv, env }
    }
}

/// Context visible to a running process body.
#[derive(Debug, Clone)]
pub struct ProcessContext {
    pid: ProcessId,
    entry: EntryPoint,
}

impl ProcessContext {
    /// Identifier of the running process.
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Entry point the process was started in.
    pub fn entry(&self) -> &EntryPoint {
        &self.entry
    }
}

/// The code a process runs once a scheduler worker picks it up.
pub type ProcessBody = Box<dyn FnOnce(&ProcessContext, ProcessArgs) -> ExitReason + Send + 'static>;

/// A process ready to be submitted to a scheduler.
pub struct Process {
    pid: ProcessId,
    entry: EntryPoint,
    args: ProcessArgs,
    body: ProcessBody,
}

impl Process {
    /// Create a process with a fresh identifier.
    pub fn new(entry: EntryPoint, args: ProcessArgs, body: ProcessBody) -> Self {
        Self {
            pid: ProcessId::new(),
            entry,
            args,
            body,
        }
    }

    /// Identifier of this process.
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Entry point of this process.
    pub fn entry(&self) -> &EntryPoint {
        &self.entry
    }

    /// Arguments the body will be invoked with.
    pub fn args(&self) -> &ProcessArgs {
        &self.args
    }

    /// Run the body to completion on the current thread.
    pub fn run(self) -> ExitReason {
        let ctx = ProcessContext {
            pid: self.pid,
            entry: self.entry,
        };
        (self.body)(&ctx, self.args)
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("entry", &self.entry)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

struct Termination {
    reason: Mutex<Option<ExitReason>>,
    signal: Condvar,
}

/// Observer side of a submitted process.
///
/// Cloning a handle shares the same termination cell. The first call to
/// [`ProcessHandle::terminate`] wins; later calls are ignored.
#[derive(Clone)]
pub struct ProcessHandle {
    pid: ProcessId,
    termination: Arc<Termination>,
}

impl ProcessHandle {
    /// Create a handle for a process that has not terminated yet.
    pub fn new(pid: ProcessId) -> Self {
        Self {
            pid,
            termination: Arc::new(Termination {
                reason: Mutex::new(None),
                signal: Condvar::new(),
            }),
        }
    }

    /// Identifier of the observed process.
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    fn lock(&self) -> MutexGuard<'_, Option<ExitReason>> {
        self.termination
            .reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Record termination and wake every joiner.
    ///
    /// Returns `false` if the process had already terminated.
    pub fn terminate(&self, reason: ExitReason) -> bool {
        let mut slot = self.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(reason);
        self.termination.signal.notify_all();
        true
    }

    /// Whether termination has been recorded.
    pub fn is_terminated(&self) -> bool {
        self.lock().is_some()
    }

    /// Exit reason, if the process has terminated.
    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.lock().clone()
    }

    /// Block until the process terminates. There is no timeout.
    pub fn join(&self) -> ExitReason {
        let mut slot = self.lock();
        loop {
            if let Some(reason) = slot.as_ref() {
                return reason.clone();
            }
            slot = self
                .termination
                .signal
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until the process terminates or `timeout` elapses.
    pub fn join_timeout(&self, timeout: Duration) -> Option<ExitReason> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.lock();
        loop {
            if let Some(reason) = slot.as_ref() {
                return Some(reason.clone());
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _) = self
                .termination
                .signal
                .wait_timeout(slot, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            slot = guard;
        }
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("exit_reason", &self.exit_reason())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_root_entry() {
        assert_eq!(ROOT_ENTRY.to_string(), "otp_ring0:start/2");
        assert_eq!(ROOT_ENTRY, EntryPoint::new("otp_ring0", "start", 2));
    }

    #[test]
    fn test_process_run_passes_args() {
        let argv: ArgList = vec![b"-noshell".to_vec()].into_iter().collect();
        let args = ProcessArgs::new(argv, Environment::new().with("k", "v"));

        let process = Process::new(
            ROOT_ENTRY,
            args,
            Box::new(|ctx, args| {
                assert_eq!(ctx.entry(), &ROOT_ENTRY);
                if args.argv.len() == 1 && args.env.get("k") == Some("v") {
                    ExitReason::Normal
                } else {
                    ExitReason::Abnormal("badarg".to_string())
                }
            }),
        );

        assert_eq!(process.run(), ExitReason::Normal);
    }

    #[test]
    fn test_handle_join_across_threads() {
        let handle = ProcessHandle::new(ProcessId::new());
        let remote = handle.clone();

        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.terminate(ExitReason::Abnormal("killed".to_string()));
        });

        assert_eq!(handle.join(), ExitReason::Abnormal("killed".to_string()));
        worker.join().unwrap();
    }

    #[test]
    fn test_first_termination_wins() {
        let handle = ProcessHandle::new(ProcessId::new());
        assert!(handle.terminate(ExitReason::Normal));
        assert!(!handle.terminate(ExitReason::Abnormal("late".to_string())));
        assert_eq!(handle.exit_reason(), Some(ExitReason::Normal));
    }

    #[test]
    fn test_join_timeout_expires() {
        let handle = ProcessHandle::new(ProcessId::new());
        assert_eq!(handle.join_timeout(Duration::from_millis(10)), None);
        assert!(!handle.is_terminated());
    }
}
