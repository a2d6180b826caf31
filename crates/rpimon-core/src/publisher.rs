// ── Telemetry publisher ──
//
// Wraps the current broker session and stamps every outgoing payload with
// a UTC ISO-8601 timestamp. Metrics are a live gauge stream: a failed
// publish bumps the error counter and is never retried or buffered — the
// next scheduled tick simply publishes a fresh sample.

use chrono::{SecondsFormat, Utc};
use rpimon_mqtt::{BrokerSession, QoS};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::model::MetricValue;

/// Current UTC time in the wire format consumers parse
/// (`2024-05-01T12:34:56.123456Z`).
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Publishes timestamped scalar metrics and composite records at QoS 1
/// (at-least-once), tracking per-process sent/error counters.
pub struct TelemetryPublisher {
    session: Option<BrokerSession>,
    sent: u64,
    errors: u64,
}

impl TelemetryPublisher {
    pub fn new() -> Self {
        Self {
            session: None,
            sent: 0,
            errors: 0,
        }
    }

    /// Install a freshly connected session, replacing any previous one.
    pub fn attach(&mut self, session: BrokerSession) {
        self.session = Some(session);
    }

    /// Drop the current session (before a reconnect).
    pub fn detach(&mut self) {
        self.session = None;
    }

    pub fn connected(&self) -> bool {
        self.session.as_ref().is_some_and(BrokerSession::connected)
    }

    /// Borrow the underlying session (latency probes publish through it
    /// directly so they don't skew the message counters).
    pub fn session(&self) -> Option<&BrokerSession> {
        self.session.as_ref()
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }

    /// Publish a scalar metric: `{"timestamp", "value", "unit"?}`.
    pub async fn metric(
        &mut self,
        topic: &str,
        value: impl Into<MetricValue>,
        unit: Option<&str>,
    ) -> Result<(), CoreError> {
        let mut payload = Map::new();
        payload.insert("timestamp".into(), Value::String(utc_timestamp()));
        payload.insert("value".into(), serde_json::to_value(value.into())?);
        if let Some(unit) = unit {
            payload.insert("unit".into(), Value::String(unit.to_owned()));
        }
        self.send(topic, Value::Object(payload)).await
    }

    /// Publish a composite record: `{"timestamp", ...fields}`. Fields
    /// shadow the timestamp if they carry their own.
    pub async fn record(&mut self, topic: &str, fields: Value) -> Result<(), CoreError> {
        let Value::Object(fields) = fields else {
            return Err(CoreError::InvalidRecord {
                topic: topic.to_owned(),
            });
        };

        let mut payload = Map::new();
        payload.insert("timestamp".into(), Value::String(utc_timestamp()));
        payload.extend(fields);
        self.send(topic, Value::Object(payload)).await
    }

    async fn send(&mut self, topic: &str, payload: Value) -> Result<(), CoreError> {
        let Some(session) = &self.session else {
            return Err(CoreError::Connection(rpimon_mqtt::Error::NotConnected));
        };
        if !session.connected() {
            return Err(CoreError::Connection(rpimon_mqtt::Error::NotConnected));
        }

        let bytes = serde_json::to_vec(&payload)?;
        match session.publish(topic, bytes, QoS::AtLeastOnce).await {
            Ok(()) => {
                self.sent += 1;
                Ok(())
            }
            Err(e) => {
                self.errors += 1;
                Err(CoreError::Connection(e))
            }
        }
    }
}

impl Default for TelemetryPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::MetricPayload;

    #[test]
    fn timestamp_is_utc_iso8601_with_z() {
        let ts = utc_timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    /// The round-trip property: a payload built the way `metric()` builds
    /// one decodes back to the same value, unit, and timestamp format.
    #[test]
    fn scalar_payload_round_trips() {
        let ts = utc_timestamp();
        let mut payload = Map::new();
        payload.insert("timestamp".into(), Value::String(ts.clone()));
        payload.insert(
            "value".into(),
            serde_json::to_value(MetricValue::from(42.5)).unwrap(),
        );
        payload.insert("unit".into(), Value::String("%".into()));

        let encoded = serde_json::to_vec(&Value::Object(payload)).unwrap();
        let decoded: MetricPayload = serde_json::from_slice(&encoded).unwrap();

        assert_eq!(decoded.timestamp, ts);
        assert_eq!(decoded.value, MetricValue::from(42.5));
        assert_eq!(decoded.unit.as_deref(), Some("%"));
    }

    #[tokio::test]
    async fn publish_without_session_is_a_connection_error() {
        let mut publisher = TelemetryPublisher::new();
        let result = publisher.metric("rpi/system/uptime", 1_u64, None).await;
        assert!(matches!(
            result,
            Err(CoreError::Connection(rpimon_mqtt::Error::NotConnected))
        ));
        // Not counted as a publish error: nothing was attempted.
        assert_eq!(publisher.errors(), 0);
        assert_eq!(publisher.sent(), 0);
    }
}
