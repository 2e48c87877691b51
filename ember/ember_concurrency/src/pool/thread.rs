//! Thread pool implementation for parallel execution.
//!
//! Tasks are queued on a bounded channel and picked up by named worker
//! threads. A panicking task is recorded in the statistics and does not
//! take its worker down.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use log::{debug, error, info, trace};
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// How often idle workers re-check the shutdown flag
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Error when submitting a task to the thread pool
#[derive(Error, Debug)]
pub enum ThreadPoolError {
    /// The thread pool is shutting down
    #[error("thread pool is shutting down")]
    ShuttingDown,

    /// The task queue is full
    #[error("thread pool queue is full")]
    QueueFull,

    /// A worker thread could not be spawned
    #[error("failed to spawn worker thread {name}: {reason}")]
    SpawnFailed {
        /// Thread name
        name: String,
        /// OS error
        reason: String,
    },
}

/// Statistics about the thread pool
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ThreadPoolStats {
    /// Number of tasks queued
    pub tasks_queued: usize,

    /// Number of tasks completed
    pub tasks_completed: usize,

    /// Number of tasks that panicked
    pub tasks_panicked: usize,

    /// Total task execution time (microseconds)
    pub total_execution_time_us: u64,

    /// Maximum task execution time (microseconds)
    pub max_execution_time_us: u64,
}

/// Configuration for the thread pool
#[derive(Debug, Clone)]
pub struct ThreadPoolConfig {
    /// Maximum size of the task queue
    pub queue_size: usize,

    /// Number of worker threads
    pub threads: usize,

    /// Name prefix for worker threads
    pub thread_name_prefix: String,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            queue_size: 1024,
            threads: num_cpus::get(),
            thread_name_prefix: "ember-worker".to_string(),
        }
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Task with metadata for tracking
struct Task {
    func: Job,
    enqueued_at: Instant,
}

#[derive(Default)]
struct Counters {
    queued: AtomicUsize,
    completed: AtomicUsize,
    panicked: AtomicUsize,
    total_execution_us: AtomicU64,
    max_execution_us: AtomicU64,
}

impl Counters {
    fn record_execution(&self, elapsed: Duration) {
        let us = elapsed.as_micros() as u64;
        self.total_execution_us.fetch_add(us, Ordering::Relaxed);
        self.max_execution_us.fetch_max(us, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ThreadPoolStats {
        ThreadPoolStats {
            tasks_queued: self.queued.load(Ordering::Relaxed),
            tasks_completed: self.completed.load(Ordering::Relaxed),
            tasks_panicked: self.panicked.load(Ordering::Relaxed),
            total_execution_time_us: self.total_execution_us.load(Ordering::Relaxed),
            max_execution_time_us: self.max_execution_us.load(Ordering::Relaxed),
        }
    }
}

/// A fixed-size thread pool
pub struct ThreadPool {
    /// Channel for sending tasks to worker threads
    task_sender: Sender<Task>,

    /// Worker threads, drained on shutdown
    workers: Mutex<Vec<JoinHandle<()>>>,

    /// Number of workers the pool was started with
    worker_count: usize,

    /// Flag indicating if the pool is shutting down
    is_shutting_down: Arc<AtomicBool>,

    /// Statistics counters
    counters: Arc<Counters>,
}

impl ThreadPool {
    /// Create a thread pool with `threads` workers and default settings
    pub fn new(threads: usize) -> Result<Self, ThreadPoolError> {
        Self::with_config(ThreadPoolConfig {
            threads,
            ..Default::default()
        })
    }

    /// Create a thread pool with the specified configuration
    pub fn with_config(config: ThreadPoolConfig) -> Result<Self, ThreadPoolError> {
        let (task_sender, task_receiver) = bounded(config.queue_size);
        let is_shutting_down = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());

        info!(
            "Creating thread pool '{}' with {} workers and queue size {}",
            config.thread_name_prefix, config.threads, config.queue_size
        );

        let mut workers = Vec::with_capacity(config.threads);

        for id in 0..config.threads {
            let name = format!("{}-{}", config.thread_name_prefix, id);
            let receiver = task_receiver.clone();
            let shutdown_flag = Arc::clone(&is_shutting_down);
            let counters = Arc::clone(&counters);

            let spawned = thread::Builder::new()
                .name(name.clone())
                .spawn(move || Self::worker_loop(id, receiver, shutdown_flag, counters));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Stop the workers that did start before reporting
                    is_shutting_down.store(true, Ordering::SeqCst);
                    for worker in workers {
                        let _ = worker.join();
                    }
                    return Err(ThreadPoolError::SpawnFailed {
                        name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(Self {
            task_sender,
            worker_count: workers.len(),
            workers: Mutex::new(workers),
            is_shutting_down,
            counters,
        })
    }

    /// Worker thread main loop
    fn worker_loop(
        id: usize,
        receiver: Receiver<Task>,
        shutdown_flag: Arc<AtomicBool>,
        counters: Arc<Counters>,
    ) {
        debug!("Worker {}: Starting", id);

        while !shutdown_flag.load(Ordering::SeqCst) {
            let task = match receiver.recv_timeout(IDLE_POLL) {
                Ok(task) => task,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            trace!(
                "Worker {}: Executing task (queue time: {:.2}ms)",
                id,
                task.enqueued_at.elapsed().as_micros() as f64 / 1000.0
            );

            let exec_start = Instant::now();
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task.func));
            counters.record_execution(exec_start.elapsed());

            match result {
                Ok(()) => {
                    counters.completed.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    error!("Worker {}: Task panicked: {}", id, panic_message(&*e));
                    counters.panicked.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        debug!("Worker {}: Shutting down", id);
    }

    /// Submit a task to be executed by the thread pool
    pub fn execute<F>(&self, f: F) -> Result<(), ThreadPoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_shutting_down() {
            return Err(ThreadPoolError::ShuttingDown);
        }

        let task = Task {
            func: Box::new(f),
            enqueued_at: Instant::now(),
        };

        match self.task_sender.try_send(task) {
            Ok(()) => {
                self.counters.queued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(ThreadPoolError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(ThreadPoolError::ShuttingDown),
        }
    }

    /// Get current statistics for the thread pool
    pub fn get_stats(&self) -> ThreadPoolStats {
        self.counters.snapshot()
    }

    /// Stop accepting tasks and wait for the workers to exit.
    ///
    /// Tasks already running finish; tasks still queued are dropped.
    /// Calling this again, or from one of the pool's own workers, is safe.
    pub fn shutdown(&self) {
        if self.is_shutting_down.swap(true, Ordering::SeqCst) {
            debug!("Thread pool already shut down");
        } else {
            info!("Shutting down thread pool");
        }

        let current = thread::current().id();
        let workers: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();

        for worker in workers {
            if worker.thread().id() == current {
                continue;
            }
            worker.join().unwrap_or_else(|e| {
                error!(
                    "Worker thread panicked during shutdown: {}",
                    panic_message(&*e)
                );
            });
        }

        info!("Thread pool shutdown complete");
    }

    /// Get the number of worker threads
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Check if the thread pool is shutting down
    pub fn is_shutting_down(&self) -> bool {
        self.is_shutting_down.load(Ordering::SeqCst)
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Workers notice the flag on their next poll and exit on their own
        self.is_shutting_down.store(true, Ordering::SeqCst);
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<unknown panic>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn test_thread_pool_basic() {
        let pool = ThreadPool::new(4).unwrap();
        let (tx, rx) = mpsc::channel();

        pool.execute(move || {
            tx.send(42).unwrap();
        })
        .unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), 42);
        pool.shutdown();
    }

    #[test]
    fn test_thread_pool_multiple_tasks() {
        let pool = ThreadPool::new(2).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();

        for _ in 0..10 {
            let counter = counter.clone();
            let tx = tx.clone();
            pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                tx.send(()).unwrap();
            })
            .unwrap();
        }

        for _ in 0..10 {
            rx.recv_timeout(Duration::from_secs(1)).unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_thread_pool_panic_handling() {
        let pool = ThreadPool::new(1).unwrap();
        let (tx, rx) = mpsc::channel();

        pool.execute(|| {
            panic!("This task should panic");
        })
        .unwrap();

        // The single worker must survive to run the second task
        pool.execute(move || {
            tx.send(()).unwrap();
        })
        .unwrap();

        rx.recv_timeout(Duration::from_secs(1)).unwrap();
        pool.shutdown();

        let stats = pool.get_stats();
        assert_eq!(stats.tasks_panicked, 1);
        assert_eq!(stats.tasks_completed, 1);
        assert_eq!(stats.tasks_queued, 2);
    }

    #[test]
    fn test_shutdown_waits_for_running_task() {
        let pool = ThreadPool::new(1).unwrap();
        let finished = Arc::new(AtomicBool::new(false));
        let (started_tx, started_rx) = mpsc::channel();

        let flag = finished.clone();
        pool.execute(move || {
            started_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(50));
            flag.store(true, Ordering::SeqCst);
        })
        .unwrap();

        started_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        pool.shutdown();

        assert!(finished.load(Ordering::SeqCst));
        assert!(matches!(
            pool.execute(|| {}),
            Err(ThreadPoolError::ShuttingDown)
        ));

        // A second shutdown is a no-op
        pool.shutdown();
    }

    #[test]
    fn test_thread_pool_queue_full() {
        let pool = ThreadPool::with_config(ThreadPoolConfig {
            queue_size: 1,
            threads: 1,
            thread_name_prefix: "test".to_string(),
        })
        .unwrap();

        let barrier = Arc::new(StdMutex::new(()));
        let lock = barrier.lock().unwrap();
        let (started_tx, started_rx) = mpsc::channel();

        let barrier_clone = barrier.clone();
        pool.execute(move || {
            started_tx.send(()).unwrap();
            let _lock = barrier_clone.lock().unwrap();
        })
        .unwrap();

        started_rx.recv_timeout(Duration::from_secs(1)).unwrap();

        // Fill the queue
        pool.execute(|| {}).unwrap();

        let result = pool.execute(|| {});
        assert!(matches!(result, Err(ThreadPoolError::QueueFull)));

        drop(lock);
        pool.shutdown();
    }
}
