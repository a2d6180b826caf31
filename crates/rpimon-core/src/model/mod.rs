// ── Domain model ──

pub mod broker;
pub mod mac;
pub mod metric;
pub mod wifi;

pub use broker::{
    ActiveTopicWindow, BrokerStats, BrokerStatus, TOPIC_WINDOW_CAPACITY, UptimeBreakdown,
};
pub use mac::MacAddress;
pub use metric::{MetricPayload, MetricValue, round1, round2};
pub use wifi::{ApStatus, WifiClient, WifiMode, format_uptime, signal_quality};
