//! Integration tests for the scheduler interface.
//!
//! These tests exercise the default `join` behavior with a scheduler that
//! runs each process on its own thread.

use std::sync::{Arc, Mutex};
use std::thread;

use ember_core::error::{Result, SchedulerError};
use ember_core::traits::Scheduler;
use ember_core::types::{
    ArgList, Environment, ExitReason, Process, ProcessArgs, ProcessHandle, ROOT_ENTRY,
};

/// Spawns one thread per process and records what happened.
struct ThreadPerProcess {
    events: Arc<Mutex<Vec<String>>>,
    stopped: Mutex<bool>,
}

impl ThreadPerProcess {
    fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            stopped: Mutex::new(false),
        }
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl Scheduler for ThreadPerProcess {
    fn submit(&self, process: Process) -> Result<ProcessHandle> {
        if *self.stopped.lock().unwrap() {
            return Err(SchedulerError::ShuttingDown.into());
        }

        let handle = ProcessHandle::new(process.pid());
        let remote = handle.clone();
        let events = self.events.clone();
        events.lock().unwrap().push(format!("submit {}", process.entry()));

        thread::spawn(move || {
            let reason = process.run();
            events.lock().unwrap().push(format!("exit {}", reason));
            remote.terminate(reason);
        });

        Ok(handle)
    }

    fn shutdown(&self) {
        *self.stopped.lock().unwrap() = true;
        self.events.lock().unwrap().push("shutdown".to_string());
    }
}

fn root_process(reason: ExitReason) -> Process {
    let argv: ArgList = vec![b"-noshell".to_vec()].into_iter().collect();
    Process::new(
        ROOT_ENTRY,
        ProcessArgs::new(argv, Environment::new()),
        Box::new(move |_, _| reason),
    )
}

#[test]
fn test_join_observes_normal_exit() {
    let scheduler = ThreadPerProcess::new();
    let handle = scheduler.submit(root_process(ExitReason::Normal)).unwrap();

    assert_eq!(scheduler.join(&handle), ExitReason::Normal);
    scheduler.shutdown();

    assert_eq!(
        scheduler.events(),
        vec!["submit otp_ring0:start/2", "exit normal", "shutdown"]
    );
}

#[test]
fn test_join_observes_abnormal_exit() {
    let scheduler = ThreadPerProcess::new();
    let handle = scheduler
        .submit(root_process(ExitReason::Abnormal("badarg".to_string())))
        .unwrap();

    assert_eq!(
        scheduler.join(&handle),
        ExitReason::Abnormal("badarg".to_string())
    );
}

#[test]
fn test_submit_after_shutdown_is_rejected() {
    let scheduler = ThreadPerProcess::new();
    scheduler.shutdown();

    let err = scheduler.submit(root_process(ExitReason::Normal)).unwrap_err();
    assert!(err.to_string().contains("shutting down"));
}
