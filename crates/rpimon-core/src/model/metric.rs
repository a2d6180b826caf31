// ── Metric values ──

use serde::{Deserialize, Serialize};

/// A scalar metric value: numeric or string, serialized transparently.
///
/// Distinct metrics published in the same tick carry no ordering
/// guarantee relative to each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Unsigned(u64),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        Self::Unsigned(v)
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Wire form of a scalar metric message:
/// `{"timestamp": <ISO-8601 UTC>, "value": ..., "unit": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricPayload {
    pub timestamp: String,
    pub value: MetricValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Round a reading to one decimal, the precision the dashboard renders.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round a reading to two decimals (frequencies in GHz).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
