//! Process scheduler.
//!
//! Runs submitted processes on a synchronous worker pool and offers a
//! separate asynchronous pool for blocking jobs. Every submitted process
//! is tracked until it terminates, so that shutdown can settle the
//! handles of processes that never got to run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ember_core::error::{Result as EmberResult, SchedulerError};
use ember_core::id::ProcessId;
use ember_core::traits::Scheduler;
use ember_core::types::{ExitReason, Process, ProcessHandle};
use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::pool::thread::{panic_message, ThreadPool, ThreadPoolConfig, ThreadPoolError, ThreadPoolStats};

/// Exit reason given to processes still queued when the scheduler stops
pub const SHUTDOWN_REASON: &str = "shutdown";

/// Configuration for the process scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Workers in the synchronous (process) pool
    pub threads: usize,

    /// Workers in the asynchronous pool
    pub async_threads: usize,

    /// Run-queue capacity of each pool
    pub queue_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            threads: num_cpus::get(),
            async_threads: 10,
            queue_size: 1024,
        }
    }
}

impl From<ThreadPoolError> for SchedulerError {
    fn from(err: ThreadPoolError) -> Self {
        match err {
            ThreadPoolError::ShuttingDown => SchedulerError::ShuttingDown,
            ThreadPoolError::QueueFull => SchedulerError::QueueFull,
            ThreadPoolError::SpawnFailed { name, reason } => {
                SchedulerError::SpawnFailed(format!("{}: {}", name, reason))
            }
        }
    }
}

/// Scheduler backed by two worker pools
pub struct ProcessScheduler {
    /// Pool running process bodies
    pool: ThreadPool,

    /// Pool running asynchronous jobs
    async_pool: ThreadPool,

    /// Handles of processes that have not terminated yet
    live: Arc<Mutex<HashMap<ProcessId, ProcessHandle>>>,

    /// Set once shutdown starts
    stopped: AtomicBool,
}

impl ProcessScheduler {
    /// Start both worker pools.
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        if config.threads == 0 {
            return Err(SchedulerError::SpawnFailed(
                "scheduler needs at least one thread".to_string(),
            ));
        }

        let pool = ThreadPool::with_config(ThreadPoolConfig {
            queue_size: config.queue_size,
            threads: config.threads,
            thread_name_prefix: "ember-sched".to_string(),
        })?;

        let async_pool = ThreadPool::with_config(ThreadPoolConfig {
            queue_size: config.queue_size,
            threads: config.async_threads,
            thread_name_prefix: "ember-async".to_string(),
        })?;

        info!(
            "Process scheduler started (S:{} A:{})",
            config.threads, config.async_threads
        );

        Ok(Self {
            pool,
            async_pool,
            live: Arc::new(Mutex::new(HashMap::new())),
            stopped: AtomicBool::new(false),
        })
    }

    /// Size of the synchronous pool.
    pub fn threads(&self) -> usize {
        self.pool.worker_count()
    }

    /// Size of the asynchronous pool.
    pub fn async_threads(&self) -> usize {
        self.async_pool.worker_count()
    }

    /// Number of submitted processes that have not terminated.
    pub fn live_processes(&self) -> usize {
        self.live.lock().len()
    }

    /// Whether shutdown has started.
    pub fn is_shut_down(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Statistics of the synchronous pool.
    pub fn stats(&self) -> ThreadPoolStats {
        self.pool.get_stats()
    }

    /// Run a job on the asynchronous pool.
    pub fn spawn_async<F>(&self, job: F) -> Result<(), SchedulerError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_shut_down() {
            return Err(SchedulerError::ShuttingDown);
        }
        if self.async_pool.worker_count() == 0 {
            // No async threads configured: run on a process worker instead
            return Ok(self.pool.execute(job)?);
        }
        Ok(self.async_pool.execute(job)?)
    }
}

impl Scheduler for ProcessScheduler {
    fn submit(&self, process: Process) -> EmberResult<ProcessHandle> {
        if self.is_shut_down() {
            return Err(SchedulerError::ShuttingDown.into());
        }

        let pid = process.pid();
        let handle = ProcessHandle::new(pid);
        debug!("Submitting process {} ({})", pid, process.entry());

        self.live.lock().insert(pid, handle.clone());

        let live = Arc::clone(&self.live);
        let observer = handle.clone();
        let queued = self.pool.execute(move || {
            let reason = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| process.run()))
                .unwrap_or_else(|e| ExitReason::Abnormal(panic_message(&*e)));

            debug!("Process {} exited: {}", pid, reason);
            live.lock().remove(&pid);
            observer.terminate(reason);
        });

        if let Err(e) = queued {
            self.live.lock().remove(&pid);
            return Err(SchedulerError::from(e).into());
        }

        Ok(handle)
    }

    fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            debug!("Process scheduler already shut down");
            return;
        }

        info!("Shutting down process scheduler");
        self.pool.shutdown();
        self.async_pool.shutdown();

        // Anything still tracked was queued but never picked up
        let orphans: Vec<ProcessHandle> = self.live.lock().drain().map(|(_, h)| h).collect();
        if !orphans.is_empty() {
            warn!(
                "{} queued processes stopped before running",
                orphans.len()
            );
        }
        for handle in orphans {
            handle.terminate(ExitReason::Abnormal(SHUTDOWN_REASON.to_string()));
        }

        info!("Process scheduler shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::types::{EntryPoint, ProcessArgs};
    use std::sync::mpsc;
    use std::time::Duration;

    fn process<F>(body: F) -> Process
    where
        F: FnOnce() -> ExitReason + Send + 'static,
    {
        Process::new(
            EntryPoint::new("test", "run", 0),
            ProcessArgs::default(),
            Box::new(move |_, _| body()),
        )
    }

    fn small() -> ProcessScheduler {
        ProcessScheduler::new(SchedulerConfig {
            threads: 2,
            async_threads: 1,
            queue_size: 16,
        })
        .unwrap()
    }

    #[test]
    fn test_submit_and_join() {
        let scheduler = small();
        let handle = scheduler.submit(process(|| ExitReason::Normal)).unwrap();

        assert_eq!(scheduler.join(&handle), ExitReason::Normal);
        assert_eq!(scheduler.threads(), 2);
        assert_eq!(scheduler.async_threads(), 1);
        scheduler.shutdown();
    }

    #[test]
    fn test_panicking_process_terminates_abnormally() {
        let scheduler = small();
        let handle = scheduler
            .submit(process(|| panic!("boom")))
            .unwrap();

        assert_eq!(
            scheduler.join(&handle),
            ExitReason::Abnormal("boom".to_string())
        );
        assert_eq!(scheduler.live_processes(), 0);
        scheduler.shutdown();
    }

    #[test]
    fn test_submit_after_shutdown() {
        let scheduler = small();
        scheduler.shutdown();

        let err = scheduler.submit(process(|| ExitReason::Normal)).unwrap_err();
        assert!(matches!(
            err,
            ember_core::Error::Scheduler(SchedulerError::ShuttingDown)
        ));
        assert!(scheduler.spawn_async(|| {}).is_err());

        // Idempotent
        scheduler.shutdown();
    }

    #[test]
    fn test_shutdown_settles_queued_processes() {
        let scheduler = ProcessScheduler::new(SchedulerConfig {
            threads: 1,
            async_threads: 0,
            queue_size: 16,
        })
        .unwrap();

        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let running = scheduler
            .submit(process(move || {
                started_tx.send(()).unwrap();
                let _ = release_rx.recv();
                ExitReason::Normal
            }))
            .unwrap();
        started_rx.recv_timeout(Duration::from_secs(1)).unwrap();

        // Queued behind the running process on the single worker
        let queued = scheduler.submit(process(|| ExitReason::Normal)).unwrap();

        release_tx.send(()).unwrap();
        scheduler.shutdown();

        assert_eq!(running.join(), ExitReason::Normal);
        // Either the worker reached it before stopping, or shutdown settled it
        let reason = queued.join();
        assert!(
            reason == ExitReason::Normal
                || reason == ExitReason::Abnormal(SHUTDOWN_REASON.to_string())
        );
    }

    #[test]
    fn test_spawn_async() {
        let scheduler = small();
        let (tx, rx) = mpsc::channel();

        scheduler
            .spawn_async(move || {
                tx.send(std::thread::current().name().map(str::to_string))
                    .unwrap();
            })
            .unwrap();

        let name = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(name.as_deref(), Some("ember-async-0"));
        scheduler.shutdown();
    }
}
