//! Timer service.
//!
//! A single thread owns a deadline queue. Callers schedule callbacks with
//! a delay and may cancel them before they fire. Callbacks run on the
//! timer thread, so they must be short; anything heavier should hand off
//! to the scheduler.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use ember_core::id::TimerId;
use ember_core::traits::TimerSubsystem;
use log::{debug, error, info, trace};
use parking_lot::Mutex;
use thiserror::Error;

use crate::pool::thread::panic_message;

/// Errors raised by the timer service
#[derive(Debug, Error)]
pub enum TimerError {
    /// The service has been shut down
    #[error("timer service is shut down")]
    ShutDown,

    /// The timer thread could not be started
    #[error("failed to spawn timer thread: {0}")]
    SpawnFailed(String),
}

type Callback = Box<dyn FnOnce() + Send + 'static>;

enum Command {
    Schedule {
        id: TimerId,
        deadline: Instant,
        callback: Callback,
    },
    Cancel {
        id: TimerId,
        reply: Sender<bool>,
    },
    Shutdown,
}

/// Handle to the timer thread
pub struct TimerService {
    commands: Sender<Command>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl TimerService {
    /// Start the timer thread.
    pub fn start() -> Result<Self, TimerError> {
        let (commands, receiver) = unbounded();

        let thread = thread::Builder::new()
            .name("ember-timer".to_string())
            .spawn(move || timer_loop(receiver))
            .map_err(|e| TimerError::SpawnFailed(e.to_string()))?;

        info!("Timer service started");

        Ok(Self {
            commands,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Run `callback` once `delay` has elapsed.
    pub fn schedule<F>(&self, delay: Duration, callback: F) -> Result<TimerId, TimerError>
    where
        F: FnOnce() + Send + 'static,
    {
        let id = TimerId::new();
        self.commands
            .send(Command::Schedule {
                id,
                deadline: Instant::now() + delay,
                callback: Box::new(callback),
            })
            .map_err(|_| TimerError::ShutDown)?;
        Ok(id)
    }

    /// Cancel a pending timer.
    ///
    /// Returns `true` if the timer was pending and will not fire.
    pub fn cancel(&self, id: TimerId) -> bool {
        let (reply, answer) = bounded(1);
        if self.commands.send(Command::Cancel { id, reply }).is_err() {
            return false;
        }
        answer.recv().unwrap_or(false)
    }

    /// Whether the timer thread is still running.
    pub fn is_running(&self) -> bool {
        self.thread.lock().is_some()
    }

    /// Stop the timer thread and drop every pending timer. Idempotent.
    pub fn shutdown(&self) {
        let Some(thread) = self.thread.lock().take() else {
            debug!("Timer service already shut down");
            return;
        };

        info!("Shutting down timer service");
        let _ = self.commands.send(Command::Shutdown);
        if let Err(e) = thread.join() {
            error!("Timer thread panicked: {}", panic_message(&*e));
        }
        info!("Timer service shutdown complete");
    }
}

impl TimerSubsystem for TimerService {
    fn shutdown(&self) {
        TimerService::shutdown(self);
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

fn timer_loop(commands: Receiver<Command>) {
    let mut deadlines: BinaryHeap<Reverse<(Instant, TimerId)>> = BinaryHeap::new();
    let mut pending: HashMap<TimerId, Callback> = HashMap::new();

    loop {
        fire_due(&mut deadlines, &mut pending);

        let next = deadlines.peek().map(|Reverse((deadline, _))| *deadline);
        let command = match next {
            Some(deadline) => {
                let wait = deadline.saturating_duration_since(Instant::now());
                match commands.recv_timeout(wait) {
                    Ok(command) => command,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match commands.recv() {
                Ok(command) => command,
                Err(_) => break,
            },
        };

        match command {
            Command::Schedule {
                id,
                deadline,
                callback,
            } => {
                trace!("Timer {} scheduled", id);
                deadlines.push(Reverse((deadline, id)));
                pending.insert(id, callback);
            }
            Command::Cancel { id, reply } => {
                // The heap entry stays and is skipped when it comes due
                let cancelled = pending.remove(&id).is_some();
                let _ = reply.send(cancelled);
            }
            Command::Shutdown => break,
        }
    }

    if !pending.is_empty() {
        debug!("Dropping {} pending timers", pending.len());
    }
}

fn fire_due(
    deadlines: &mut BinaryHeap<Reverse<(Instant, TimerId)>>,
    pending: &mut HashMap<TimerId, Callback>,
) {
    let now = Instant::now();
    while let Some(Reverse((deadline, id))) = deadlines.peek().copied() {
        if deadline > now {
            break;
        }
        deadlines.pop();

        if let Some(callback) = pending.remove(&id) {
            trace!("Timer {} fired", id);
            if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(callback)) {
                error!("Timer {} callback panicked: {}", id, panic_message(&*e));
            }
        }
    }
}
