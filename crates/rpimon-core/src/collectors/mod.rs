// ── Collector run loop ──
//
// One loop per collector process. Connectivity is checked before every
// tick; a dropped session is re-established through the connection
// manager, and a reconnect failure (retry disabled or exhausted) ends
// the loop cleanly. Tick errors are caught per tick, logged, and
// followed by a longer cool-down sleep; crossing the consecutive-error
// ceiling aborts with a final statistics log. Cancellation is observed
// between iterations only — that is the clean shutdown point.

pub mod broker;
pub mod system;
pub mod wifi;

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::CoreError;
use crate::sched::STATS_LOG_PERIOD;

pub use broker::BrokerStatsCollector;
pub use system::SystemMetricsCollector;
pub use wifi::WifiStatsCollector;

/// Consecutive tick failures tolerated before the loop aborts.
pub const MAX_CONSECUTIVE_ERRORS: u32 = 10;

/// A telemetry collector driven by [`run_collector`].
#[allow(async_fn_in_trait)]
pub trait Collector {
    fn name(&self) -> &'static str;

    /// Check the broker session(s) and reconnect through the manager if
    /// anything dropped. An error here ends the run loop.
    async fn ensure_connected(&mut self) -> Result<(), CoreError>;

    /// One-time setup after the first successful connect.
    async fn initialize(&mut self) -> Result<(), CoreError> {
        Ok(())
    }

    /// One collection pass. Individual metric failures must be absorbed
    /// inside — an error returned here counts toward the abort ceiling.
    async fn tick(&mut self) -> Result<(), CoreError>;

    /// Periodic statistics line (runtime, messages, errors, failures).
    fn log_statistics(&self);
}

/// Pacing and failure-tolerance knobs for [`run_collector`].
#[derive(Debug, Clone)]
pub struct RunLoopOptions {
    /// Sleep between ticks: the 100 ms scheduler quantum for the system
    /// collector, the configured update interval for the others.
    pub tick_interval: Duration,
    /// Cool-down after a failed tick.
    pub error_cooldown: Duration,
    /// Delay before the first connection attempt, letting the broker
    /// come up after boot.
    pub startup_delay: Duration,
    pub max_consecutive_errors: u32,
    pub stats_log_period: Duration,
}

impl RunLoopOptions {
    /// Fixed-interval pacing (broker stats, WiFi collectors).
    pub fn fixed_interval(interval: Duration, startup_delay: Duration) -> Self {
        Self {
            tick_interval: interval,
            error_cooldown: Duration::from_secs(10),
            startup_delay,
            max_consecutive_errors: MAX_CONSECUTIVE_ERRORS,
            stats_log_period: STATS_LOG_PERIOD,
        }
    }

    /// Quantum pacing for the multi-rate system collector.
    pub fn quantum_paced(startup_delay: Duration) -> Self {
        Self {
            tick_interval: crate::sched::QUANTUM,
            error_cooldown: Duration::from_secs(5),
            startup_delay,
            max_consecutive_errors: MAX_CONSECUTIVE_ERRORS,
            stats_log_period: STATS_LOG_PERIOD,
        }
    }
}

/// Drive a collector until cancellation, retry exhaustion, or the
/// consecutive-error ceiling. Always finishes with a statistics log;
/// giving up is a clean exit, not a process failure.
pub async fn run_collector<C: Collector>(
    mut collector: C,
    options: RunLoopOptions,
    cancel: CancellationToken,
) -> Result<(), CoreError> {
    info!(collector = collector.name(), "starting collector");

    if !options.startup_delay.is_zero() {
        info!(
            delay_secs = options.startup_delay.as_secs(),
            "waiting before first connection"
        );
        tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            () = sleep(options.startup_delay) => {}
        }
    }

    if let Err(e) = collector.ensure_connected().await {
        error!(error = %e, "could not connect to the broker, giving up");
        collector.log_statistics();
        return Ok(());
    }

    collector.initialize().await?;
    info!(collector = collector.name(), "collector operational");

    let mut consecutive_errors: u32 = 0;
    let mut last_stats_log = Instant::now();

    loop {
        if cancel.is_cancelled() {
            break;
        }

        if let Err(e) = collector.ensure_connected().await {
            error!(error = %e, "reconnection failed, stopping collector");
            break;
        }

        match collector.tick().await {
            Ok(()) => consecutive_errors = 0,
            Err(e) => {
                consecutive_errors += 1;
                error!(error = %e, consecutive_errors, "collection tick failed");

                if consecutive_errors > options.max_consecutive_errors {
                    error!("too many consecutive errors, stopping collector");
                    break;
                }

                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = sleep(options.error_cooldown) => {}
                }
                continue;
            }
        }

        if last_stats_log.elapsed() >= options.stats_log_period {
            collector.log_statistics();
            last_stats_log = Instant::now();
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            () = sleep(options.tick_interval) => {}
        }
    }

    collector.log_statistics();
    info!(collector = collector.name(), "collector stopped");
    Ok(())
}
