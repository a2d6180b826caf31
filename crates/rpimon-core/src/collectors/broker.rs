// ── Broker statistics aggregator ──
//
// Two independent sessions through the same ConnectionManager
// abstraction: a publisher for outgoing stats and a listener subscribed
// to the broker's internal namespace (`$SYS/#`) plus the user-topic
// wildcard (`#`). Inbound messages mutate shared state from the
// listener's driver task; the scheduler tick reads it and publishes two
// snapshots. The collector's own publish prefix is filtered out of the
// topic window so it never counts its own traffic.

use std::sync::{Arc, Mutex, LazyLock};
use std::time::Instant;

use regex::Regex;
use serde_json::json;
use tracing::{debug, info, warn};

use rpimon_mqtt::{
    BrokerSession, ConnectionManager, DisconnectCounter, MqttDialer, QoS, RetryPolicy,
    SessionConfig, SessionEvents, manager::MULTI_SESSION_TIMEOUT,
};

use crate::collectors::Collector;
use crate::error::CoreError;
use crate::model::{ActiveTopicWindow, BrokerStats, BrokerStatus};
use crate::publisher::TelemetryPublisher;

const PUBLISHER_CLIENT_ID: &str = "mqttstats-publisher";
const LISTENER_CLIENT_ID: &str = "mqttstats-listener";

/// Throwaway topic for the latency probe.
const LATENCY_PROBE_TOPIC: &str = "test/latency/ping";

/// Latency samples are capped here; anything slower reads as "broken".
const LATENCY_CAP_MS: u64 = 999;

/// Settle time after connecting, letting retained `$SYS` values arrive
/// before the first snapshot goes out.
const SETTLE_DELAY: std::time::Duration = std::time::Duration::from_secs(5);

// ── $SYS dispatch ───────────────────────────────────────────────────

const SYS_CLIENTS_CONNECTED: &str = "$SYS/broker/clients/connected";
const SYS_MESSAGES_RECEIVED: &str = "$SYS/broker/messages/received";
const SYS_MESSAGES_SENT: &str = "$SYS/broker/messages/sent";
const SYS_UPTIME: &str = "$SYS/broker/uptime";
const SYS_VERSION: &str = "$SYS/broker/version";
const SYS_LOAD_PREFIX: &str = "$SYS/broker/load/";

static UPTIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*seconds?").expect("valid regex"));

/// Apply one `$SYS` message to the aggregate state. Dispatch is by exact
/// topic; payloads that fail to parse are ignored silently — the broker
/// will publish a fresh value shortly.
pub fn apply_sys_message(stats: &mut BrokerStats, topic: &str, payload: &str) {
    match topic {
        SYS_CLIENTS_CONNECTED => {
            if let Ok(count) = payload.trim().parse() {
                stats.clients_connected = count;
            }
        }
        SYS_MESSAGES_RECEIVED => {
            if let Ok(count) = payload.trim().parse() {
                stats.messages_received = count;
            }
        }
        SYS_MESSAGES_SENT => {
            if let Ok(count) = payload.trim().parse() {
                stats.messages_sent = count;
            }
        }
        SYS_UPTIME => {
            // Format: "<N> seconds". The breakdown is recomputed in the
            // same call so the four sub-fields can never be torn.
            if let Some(seconds) = UPTIME_RE
                .captures(payload.trim())
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
            {
                stats.set_uptime_seconds(seconds);
            }
        }
        SYS_VERSION => {
            stats.broker_version = payload.trim().to_owned();
        }
        _ => {
            if let Some(label) = topic.strip_prefix(SYS_LOAD_PREFIX) {
                let label = label.rsplit('/').next().unwrap_or(label);
                if let Ok(value) = payload.trim().parse::<f64>() {
                    stats.broker_load.insert(label.to_owned(), value);
                }
            }
        }
    }
}

// ── Listener adapter ────────────────────────────────────────────────

/// Session observer feeding the shared aggregate state from the driver
/// task. Lock failures (a poisoned mutex from a panicked tick) drop the
/// sample rather than propagate.
struct StatsListener {
    stats: Arc<Mutex<BrokerStats>>,
    window: Arc<Mutex<ActiveTopicWindow>>,
    /// Own publish prefix (`<prefix>/network/mqtt/`), excluded from the
    /// user-topic window.
    own_prefix: String,
}

impl SessionEvents for StatsListener {
    fn on_connect(&self) {
        debug!("listener session subscribed to $SYS and user topics");
    }

    fn on_disconnect(&self) {
        debug!("listener session disconnected");
    }

    fn on_message(&self, topic: &str, payload: &[u8]) {
        let payload = String::from_utf8_lossy(payload);
        if topic.starts_with("$SYS/") {
            if let Ok(mut stats) = self.stats.lock() {
                apply_sys_message(&mut stats, topic, &payload);
            }
        } else if !topic.starts_with(&self.own_prefix) {
            if let Ok(mut window) = self.window.lock() {
                window.observe(topic, Instant::now());
            }
        }
    }
}

// ── Collector ───────────────────────────────────────────────────────

pub struct BrokerStatsCollector {
    prefix: String,
    publisher: TelemetryPublisher,
    publisher_manager: ConnectionManager<MqttDialer>,
    listener_manager: ConnectionManager<MqttDialer>,
    listener: Option<BrokerSession>,
    stats: Arc<Mutex<BrokerStats>>,
    window: Arc<Mutex<ActiveTopicWindow>>,
    disconnects: Arc<DisconnectCounter>,
    started_at: Instant,
}

impl BrokerStatsCollector {
    pub fn new(prefix: impl Into<String>, session: &SessionConfig, policy: &RetryPolicy) -> Self {
        let prefix = prefix.into();
        let stats = Arc::new(Mutex::new(BrokerStats::default()));
        let window = Arc::new(Mutex::new(ActiveTopicWindow::default()));

        let listener_observer = Arc::new(StatsListener {
            stats: Arc::clone(&stats),
            window: Arc::clone(&window),
            own_prefix: format!("{prefix}/network/mqtt/"),
        });

        let disconnects = Arc::new(DisconnectCounter::default());
        let publisher_dialer = MqttDialer::new(session.with_client_id(PUBLISHER_CLIENT_ID))
            .with_observer(disconnects.clone());
        let listener_dialer = MqttDialer::new(session.with_client_id(LISTENER_CLIENT_ID))
            .with_subscriptions(vec![
                ("$SYS/#".to_owned(), QoS::AtMostOnce),
                ("#".to_owned(), QoS::AtMostOnce),
            ])
            .with_observer(listener_observer);

        Self {
            prefix,
            publisher: TelemetryPublisher::new(),
            publisher_manager: ConnectionManager::new(publisher_dialer, policy.clone())
                .with_connect_timeout(MULTI_SESSION_TIMEOUT),
            listener_manager: ConnectionManager::new(listener_dialer, policy.clone())
                .with_connect_timeout(MULTI_SESSION_TIMEOUT),
            listener: None,
            stats,
            window,
            disconnects,
            started_at: Instant::now(),
        }
    }

    fn listener_connected(&self) -> bool {
        self.listener.as_ref().is_some_and(BrokerSession::connected)
    }

    /// Publish a throwaway probe and record the wall-clock duration of
    /// the local publish call, capped at 999 ms.
    ///
    /// This is a local-call-latency proxy, NOT a broker round trip: no
    /// acknowledgement is awaited. Dashboards calibrate against this
    /// behavior, so it is preserved as-is.
    async fn measure_latency(&mut self) {
        let Some(session) = self.publisher.session() else {
            return;
        };
        if !session.connected() {
            return;
        }

        let start = Instant::now();
        let probe = json!({ "timestamp": chrono::Utc::now().timestamp_millis() });
        let Ok(payload) = serde_json::to_vec(&probe) else {
            return;
        };
        if session
            .publish(LATENCY_PROBE_TOPIC, payload, QoS::AtLeastOnce)
            .await
            .is_ok()
        {
            let elapsed_ms =
                u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            if let Ok(mut stats) = self.stats.lock() {
                stats.latency_ms = elapsed_ms.min(LATENCY_CAP_MS);
            }
        }
    }

    /// Read a coherent snapshot of the aggregate state plus the sorted
    /// topic list.
    fn snapshot(&self) -> (BrokerStats, Vec<String>) {
        let mut stats = self
            .stats
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();
        stats.status = if self.publisher.connected() {
            BrokerStatus::Ok
        } else {
            BrokerStatus::Error
        };
        let topics = self
            .window
            .lock()
            .map(|guard| guard.topics())
            .unwrap_or_default();
        (stats, topics)
    }
}

impl Collector for BrokerStatsCollector {
    fn name(&self) -> &'static str {
        "mqtt-stats"
    }

    async fn ensure_connected(&mut self) -> Result<(), CoreError> {
        if self.publisher.connected() && self.listener_connected() {
            return Ok(());
        }

        if self.publisher.session().is_some() || self.listener.is_some() {
            warn!("broker connection lost, reconnecting both sessions");
        }

        // Both sessions are re-dialed together: a half-alive pair would
        // publish stale aggregates.
        self.publisher.detach();
        self.listener = None;

        let session = self.publisher_manager.connect().await?;
        self.publisher.attach(session);

        let listener = self.listener_manager.connect().await?;
        self.listener = Some(listener);
        Ok(())
    }

    async fn initialize(&mut self) -> Result<(), CoreError> {
        // Give the broker time to deliver the retained $SYS values
        // before the first snapshot.
        info!("waiting for initial broker statistics");
        tokio::time::sleep(SETTLE_DELAY).await;
        Ok(())
    }

    async fn tick(&mut self) -> Result<(), CoreError> {
        self.measure_latency().await;

        let (stats, topics) = self.snapshot();

        let stats_topic = format!("{}/network/mqtt/stats", self.prefix);
        let _ = self
            .publisher
            .record(
                &stats_topic,
                json!({
                    "messages_received": stats.messages_received,
                    "messages_sent": stats.messages_sent,
                    "clients_connected": stats.clients_connected,
                    "uptime_seconds": stats.uptime_seconds,
                    "uptime": stats.uptime,
                    "latency_ms": stats.latency_ms,
                    "broker_version": stats.broker_version,
                    "status": stats.status,
                }),
            )
            .await;

        let topics_topic = format!("{}/network/mqtt/topics", self.prefix);
        let _ = self
            .publisher
            .record(
                &topics_topic,
                json!({
                    "topics": topics,
                    "count": topics.len(),
                }),
            )
            .await;

        info!(
            received = stats.messages_received,
            sent = stats.messages_sent,
            clients = stats.clients_connected,
            active_topics = topics.len(),
            "broker statistics published"
        );
        Ok(())
    }

    fn log_statistics(&self) {
        let runtime = self.started_at.elapsed();
        info!(
            runtime_hours = runtime.as_secs() / 3600,
            runtime_minutes = (runtime.as_secs() % 3600) / 60,
            messages_sent = self.publisher.sent(),
            errors = self.publisher.errors(),
            connection_failures = self.publisher_manager.connection_failures()
                + self.listener_manager.connection_failures(),
            disconnects = self.disconnects.count(),
            "collector statistics"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn integer_counters_dispatch_by_exact_topic() {
        let mut stats = BrokerStats::default();
        apply_sys_message(&mut stats, SYS_CLIENTS_CONNECTED, "4");
        apply_sys_message(&mut stats, SYS_MESSAGES_RECEIVED, "1234");
        apply_sys_message(&mut stats, SYS_MESSAGES_SENT, "987");

        assert_eq!(stats.clients_connected, 4);
        assert_eq!(stats.messages_received, 1234);
        assert_eq!(stats.messages_sent, 987);
    }

    #[test]
    fn uptime_payload_parses_and_derives_breakdown() {
        let mut stats = BrokerStats::default();
        apply_sys_message(&mut stats, SYS_UPTIME, "90000 seconds");

        assert_eq!(stats.uptime_seconds, 90_000);
        assert_eq!(stats.uptime.days, 1);
        assert_eq!(stats.uptime.hours, 1);
        assert_eq!(stats.uptime.minutes, 0);
        assert_eq!(stats.uptime.seconds, 0);
    }

    #[test]
    fn malformed_uptime_is_ignored_silently() {
        let mut stats = BrokerStats::default();
        stats.set_uptime_seconds(10);
        apply_sys_message(&mut stats, SYS_UPTIME, "about an hour");
        assert_eq!(stats.uptime_seconds, 10);
    }

    #[test]
    fn version_is_stored_verbatim() {
        let mut stats = BrokerStats::default();
        apply_sys_message(&mut stats, SYS_VERSION, "mosquitto version 2.0.18");
        assert_eq!(stats.broker_version, "mosquitto version 2.0.18");
    }

    #[test]
    fn load_samples_key_by_label() {
        let mut stats = BrokerStats::default();
        apply_sys_message(&mut stats, "$SYS/broker/load/messages/received/1min", "12.5");
        apply_sys_message(&mut stats, "$SYS/broker/load/sockets/1min", "not-a-number");

        assert!((stats.broker_load["1min"] - 12.5).abs() < f64::EPSILON);
        assert_eq!(stats.broker_load.len(), 1);
    }

    #[test]
    fn unknown_sys_topics_are_ignored() {
        let mut stats = BrokerStats::default();
        apply_sys_message(&mut stats, "$SYS/broker/heap/current", "4096");
        assert_eq!(stats.messages_received, 0);
        assert_eq!(stats.messages_sent, 0);
        assert_eq!(stats.clients_connected, 0);
        assert!(stats.broker_load.is_empty());
    }

    #[test]
    fn listener_skips_own_traffic_but_counts_user_topics() {
        let stats = Arc::new(Mutex::new(BrokerStats::default()));
        let window = Arc::new(Mutex::new(ActiveTopicWindow::default()));
        let listener = StatsListener {
            stats: Arc::clone(&stats),
            window: Arc::clone(&window),
            own_prefix: "rpi/network/mqtt/".into(),
        };

        listener.on_message("rpi/network/mqtt/stats", b"{}");
        listener.on_message("rpi/system/cpu/core1", b"{}");
        listener.on_message("sensors/garage/door", b"open");
        listener.on_message("$SYS/broker/messages/sent", b"3");

        let window = window.lock().unwrap();
        let topics = window.topics();
        assert_eq!(
            topics,
            vec!["rpi/system/cpu/core1".to_owned(), "sensors/garage/door".to_owned()]
        );
        assert_eq!(stats.lock().unwrap().messages_sent, 3);
    }
}
