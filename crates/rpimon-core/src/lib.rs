//! Domain layer for the rpimon telemetry collectors.
//!
//! Three collectors share one architecture: a broker session (or pair)
//! owned through [`rpimon_mqtt::ConnectionManager`], a
//! [`TelemetryPublisher`] stamping JSON payloads, and a run loop
//! ([`run_collector`]) that checks connectivity before every tick and
//! fault-isolates each collection pass.
//!
//! - **[`SystemMetricsCollector`]** — CPU, memory, thermal, frequency and
//!   uptime gauges on three independent cadences driven by the
//!   [`MultiRateScheduler`].
//! - **[`BrokerStatsCollector`]** — aggregates the broker's `$SYS`
//!   namespace and a bounded window of recently-seen user topics, fed by
//!   a dedicated listener session.
//! - **[`WifiStatsCollector`]** — enumerates associated stations from the
//!   wireless driver, joins DHCP lease data, and keeps per-MAC first-seen
//!   continuity so client uptime survives incomplete dumps.
//!
//! Topic strings are part of the wire contract with existing dashboard
//! subscribers and are kept byte-identical to the deployed fleet
//! (`<prefix>/system/cpu/core<N>`, `<prefix>/network/mqtt/stats`, ...).

pub mod collectors;
pub mod error;
pub mod model;
pub mod publisher;
pub mod sched;
pub mod source;

// ── Primary re-exports ──────────────────────────────────────────────
pub use collectors::{
    BrokerStatsCollector, Collector, MAX_CONSECUTIVE_ERRORS, RunLoopOptions,
    SystemMetricsCollector, WifiStatsCollector, run_collector,
};
pub use error::CoreError;
pub use publisher::{TelemetryPublisher, utc_timestamp};
pub use sched::{MultiRateScheduler, QUANTUM, STATS_LOG_PERIOD, Tier, TierIntervals};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ActiveTopicWindow, ApStatus, BrokerStats, BrokerStatus, MacAddress, MetricPayload,
    MetricValue, UptimeBreakdown, WifiClient, WifiMode,
};
