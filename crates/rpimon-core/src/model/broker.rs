// ── Broker statistics domain types ──
//
// Aggregate state fed by the broker's $SYS namespace, plus the bounded
// window of recently-seen user topics. Both are written from the listener
// session's callback and read by the publish tick, so the collector keeps
// each behind a mutex; the uptime breakdown is recomputed in the same
// critical section as the seconds value to rule out torn reads.

use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;

/// Capacity of the recently-seen topic window.
pub const TOPIC_WINDOW_CAPACITY: usize = 15;

// ── Uptime ──────────────────────────────────────────────────────────

/// Broker uptime split into calendar components.
///
/// Always derived from the single authoritative seconds value — the four
/// fields are never updated independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UptimeBreakdown {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl UptimeBreakdown {
    pub fn from_seconds(total: u64) -> Self {
        Self {
            days: total / 86_400,
            hours: (total % 86_400) / 3_600,
            minutes: (total % 3_600) / 60,
            seconds: total % 60,
        }
    }
}

// ── BrokerStats ─────────────────────────────────────────────────────

/// Health of the publisher session, as seen by dashboard consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerStatus {
    Ok,
    Error,
}

/// Aggregate broker counters, mutated only by inbound `$SYS` messages
/// (latency by the collection tick).
#[derive(Debug, Clone)]
pub struct BrokerStats {
    pub messages_received: u64,
    pub messages_sent: u64,
    pub clients_connected: u64,
    pub uptime_seconds: u64,
    pub uptime: UptimeBreakdown,
    /// Local publish-call latency in milliseconds, capped at 999.
    pub latency_ms: u64,
    pub broker_version: String,
    /// Load samples keyed by load-type label (`messages/received/1min`
    /// style suffix labels).
    pub broker_load: HashMap<String, f64>,
    pub status: BrokerStatus,
}

impl Default for BrokerStats {
    fn default() -> Self {
        Self {
            messages_received: 0,
            messages_sent: 0,
            clients_connected: 0,
            uptime_seconds: 0,
            uptime: UptimeBreakdown::default(),
            latency_ms: 0,
            broker_version: "N/A".into(),
            broker_load: HashMap::new(),
            status: BrokerStatus::Error,
        }
    }
}

impl BrokerStats {
    /// Set the uptime and recompute the breakdown together.
    pub fn set_uptime_seconds(&mut self, total: u64) {
        self.uptime_seconds = total;
        self.uptime = UptimeBreakdown::from_seconds(total);
    }
}

// ── ActiveTopicWindow ───────────────────────────────────────────────

/// Bounded set of the most-recently-seen non-internal topic names.
///
/// Capacity is a hard bound: inserting beyond it evicts the entry with
/// the oldest last-seen timestamp (a linear scan, ties arbitrary).
/// Entries are never evicted by age alone.
#[derive(Debug)]
pub struct ActiveTopicWindow {
    capacity: usize,
    last_seen: HashMap<String, Instant>,
}

impl ActiveTopicWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            last_seen: HashMap::new(),
        }
    }

    /// Record a sighting of `topic` at `seen_at`, evicting the
    /// least-recently-seen entry if the window would overflow.
    pub fn observe(&mut self, topic: &str, seen_at: Instant) {
        self.last_seen.insert(topic.to_owned(), seen_at);

        if self.last_seen.len() > self.capacity {
            let oldest = self
                .last_seen
                .iter()
                .min_by_key(|(_, seen)| **seen)
                .map(|(topic, _)| topic.clone());
            if let Some(topic) = oldest {
                self.last_seen.remove(&topic);
            }
        }
    }

    /// Current topic names, sorted, capped at the window capacity.
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.last_seen.keys().cloned().collect();
        topics.sort_unstable();
        topics.truncate(self.capacity);
        topics
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}

impl Default for ActiveTopicWindow {
    fn default() -> Self {
        Self::new(TOPIC_WINDOW_CAPACITY)
    }
}
