// Run-loop behavior under a paused clock: fault isolation per tick,
// the consecutive-error ceiling, and the give-up path when the broker
// never becomes reachable.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use rpimon_core::CoreError;
use rpimon_core::collectors::{Collector, RunLoopOptions, run_collector};

struct ScriptedCollector {
    ticks: Arc<AtomicU32>,
    /// Tick indices (1-based) that fail.
    fail_from: u32,
    /// Cancel after this many ticks (0 = never).
    cancel_after: u32,
    cancel: CancellationToken,
    connect_fails: bool,
}

impl Collector for ScriptedCollector {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn ensure_connected(&mut self) -> Result<(), CoreError> {
        if self.connect_fails {
            return Err(CoreError::Connection(
                rpimon_mqtt::Error::RetriesExhausted { attempts: 3 },
            ));
        }
        Ok(())
    }

    async fn tick(&mut self) -> Result<(), CoreError> {
        let n = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        if self.cancel_after > 0 && n >= self.cancel_after {
            self.cancel.cancel();
        }
        if n >= self.fail_from {
            return Err(CoreError::Command {
                command: "scripted".into(),
                reason: "simulated failure".into(),
            });
        }
        Ok(())
    }

    fn log_statistics(&self) {}
}

fn options() -> RunLoopOptions {
    RunLoopOptions::fixed_interval(Duration::from_secs(3), Duration::ZERO)
}

#[tokio::test(start_paused = true)]
async fn ticks_until_cancelled() {
    let ticks = Arc::new(AtomicU32::new(0));
    let cancel = CancellationToken::new();
    let collector = ScriptedCollector {
        ticks: Arc::clone(&ticks),
        fail_from: u32::MAX,
        cancel_after: 5,
        cancel: cancel.clone(),
        connect_fails: false,
    };

    run_collector(collector, options(), cancel)
        .await
        .expect("run loop returns cleanly");
    assert_eq!(ticks.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn error_ceiling_stops_the_loop() {
    let ticks = Arc::new(AtomicU32::new(0));
    let cancel = CancellationToken::new();
    let collector = ScriptedCollector {
        ticks: Arc::clone(&ticks),
        fail_from: 1,
        cancel_after: 0,
        cancel: cancel.clone(),
        connect_fails: false,
    };

    run_collector(collector, options(), cancel)
        .await
        .expect("abort is a clean exit");
    // Ceiling of 10 consecutive errors: the 11th failed tick trips it.
    assert_eq!(ticks.load(Ordering::SeqCst), 11);
}

#[tokio::test(start_paused = true)]
async fn a_recovered_tick_resets_the_error_count() {
    let ticks = Arc::new(AtomicU32::new(0));
    let cancel = CancellationToken::new();
    // Fails from tick 30 on; the first 29 ticks succeed, so the loop
    // must survive well past a single ceiling's worth of total errors.
    let collector = ScriptedCollector {
        ticks: Arc::clone(&ticks),
        fail_from: 30,
        cancel_after: 0,
        cancel: cancel.clone(),
        connect_fails: false,
    };

    run_collector(collector, options(), cancel)
        .await
        .expect("clean exit");
    assert_eq!(ticks.load(Ordering::SeqCst), 29 + 11);
}

#[tokio::test(start_paused = true)]
async fn unreachable_broker_gives_up_cleanly() {
    let ticks = Arc::new(AtomicU32::new(0));
    let cancel = CancellationToken::new();
    let collector = ScriptedCollector {
        ticks: Arc::clone(&ticks),
        fail_from: u32::MAX,
        cancel_after: 0,
        cancel: cancel.clone(),
        connect_fails: true,
    };

    // Exhausted retries are reported, not fatal: the loop exits Ok
    // without ever ticking.
    run_collector(collector, options(), cancel)
        .await
        .expect("give-up is a clean exit");
    assert_eq!(ticks.load(Ordering::SeqCst), 0);
}
