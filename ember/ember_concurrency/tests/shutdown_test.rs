//! Integration tests for scheduler and timer teardown.
//!
//! Processes reference the timer service while they run, so the scheduler
//! is stopped first and the timer service second.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use ember_concurrency::{ProcessScheduler, SchedulerConfig, TimerService};
use ember_core::traits::{Scheduler, TimerSubsystem};
use ember_core::types::{EntryPoint, ExitReason, Process, ProcessArgs};

fn scheduler() -> ProcessScheduler {
    ProcessScheduler::new(SchedulerConfig {
        threads: 2,
        async_threads: 1,
        queue_size: 32,
    })
    .unwrap()
}

#[test]
fn test_process_uses_timer_then_ordered_teardown() {
    let scheduler = scheduler();
    let timers = Arc::new(TimerService::start().unwrap());
    let (tx, rx) = mpsc::channel();

    let process_timers = Arc::clone(&timers);
    let process = Process::new(
        EntryPoint::new("sleeper", "run", 0),
        ProcessArgs::default(),
        Box::new(move |_, _| {
            let (fired_tx, fired_rx) = mpsc::channel();
            process_timers
                .schedule(Duration::from_millis(10), move || {
                    fired_tx.send(()).unwrap();
                })
                .unwrap();

            match fired_rx.recv_timeout(Duration::from_secs(1)) {
                Ok(()) => {
                    tx.send("timeout delivered").unwrap();
                    ExitReason::Normal
                }
                Err(_) => ExitReason::Abnormal("timer never fired".to_string()),
            }
        }),
    );

    let handle = scheduler.submit(process).unwrap();
    assert_eq!(scheduler.join(&handle), ExitReason::Normal);
    assert_eq!(rx.recv().unwrap(), "timeout delivered");

    Scheduler::shutdown(&scheduler);
    assert!(scheduler.is_shut_down());
    assert!(timers.is_running());

    TimerSubsystem::shutdown(timers.as_ref());
    assert!(!timers.is_running());
}

#[test]
fn test_many_processes_all_join() {
    let scheduler = scheduler();

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let process = Process::new(
                EntryPoint::new("worker", "run", 1),
                ProcessArgs::default(),
                Box::new(move |_, _| {
                    if i % 2 == 0 {
                        ExitReason::Normal
                    } else {
                        ExitReason::Abnormal(format!("odd {}", i))
                    }
                }),
            );
            scheduler.submit(process).unwrap()
        })
        .collect();

    for (i, handle) in handles.iter().enumerate() {
        let reason = handle.join();
        assert_eq!(reason.is_normal(), i % 2 == 0);
    }

    assert_eq!(scheduler.live_processes(), 0);

    // Workers are joined by shutdown, so the counters are final afterwards
    Scheduler::shutdown(&scheduler);
    assert_eq!(scheduler.stats().tasks_completed, 16);
}
