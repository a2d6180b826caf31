// ── Station dump parser ──
//
// Line-oriented state machine over `iw dev <iface> station dump` output:
// a `Station <mac>` line starts a new accumulator, subsequent lines fill
// known fields on the current one, and the accumulator commits on the
// next `Station` line or end of input. Lines that match nothing are
// skipped silently.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{ApStatus, MacAddress, WifiMode};

static SIGNAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"signal:\s*(-?\d+)").expect("valid regex"));
static CONNECTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"connected time:\s*(\d+)").expect("valid regex"));
static RX_BYTES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"rx bytes:\s*(\d+)").expect("valid regex"));
static TX_BYTES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"tx bytes:\s*(\d+)").expect("valid regex"));
static SSID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ssid\s+(.+)").expect("valid regex"));
static CHANNEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"channel\s+(\d+)\s+\((\d+)\s*MHz").expect("valid regex"));

/// Raw per-station attributes from one dump record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationRecord {
    pub mac: MacAddress,
    pub signal_dbm: Option<i32>,
    pub connected_secs: Option<u64>,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

impl StationRecord {
    fn new(mac: MacAddress) -> Self {
        Self {
            mac,
            signal_dbm: None,
            connected_secs: None,
            rx_bytes: 0,
            tx_bytes: 0,
        }
    }
}

fn capture_u64(re: &Regex, line: &str) -> Option<u64> {
    re.captures(line)?.get(1)?.as_str().parse().ok()
}

fn capture_i32(re: &Regex, line: &str) -> Option<i32> {
    re.captures(line)?.get(1)?.as_str().parse().ok()
}

/// Parse a full station dump into per-client records.
pub fn parse_station_dump(output: &str) -> Vec<StationRecord> {
    let mut records = Vec::new();
    let mut current: Option<StationRecord> = None;

    for line in output.lines() {
        if line.starts_with("Station") {
            if let Some(record) = current.take() {
                records.push(record);
            }
            current = line
                .split_whitespace()
                .nth(1)
                .map(|mac| StationRecord::new(MacAddress::new(mac)));
        } else if let Some(record) = current.as_mut() {
            if let Some(signal) = capture_i32(&SIGNAL_RE, line) {
                record.signal_dbm = Some(signal);
            } else if let Some(secs) = capture_u64(&CONNECTED_RE, line) {
                record.connected_secs = Some(secs);
            } else if let Some(rx) = capture_u64(&RX_BYTES_RE, line) {
                record.rx_bytes = rx;
            } else if let Some(tx) = capture_u64(&TX_BYTES_RE, line) {
                record.tx_bytes = tx;
            }
        }
    }

    if let Some(record) = current.take() {
        records.push(record);
    }

    records
}

/// Parse `iw dev <iface> info` output into an [`ApStatus`].
pub fn parse_interface_info(output: &str) -> ApStatus {
    let mut status = ApStatus::default();

    for line in output.lines() {
        if let Some(captures) = SSID_RE.captures(line) {
            if let Some(ssid) = captures.get(1) {
                status.ssid = Some(ssid.as_str().trim().to_owned());
            }
        } else if line.contains("type") {
            if line.contains("AP") {
                status.mode = WifiMode::Ap;
            } else if line.contains("managed") {
                status.mode = WifiMode::Client;
            }
        } else if let Some(captures) = CHANNEL_RE.captures(line) {
            status.channel = captures.get(1).and_then(|m| m.as_str().parse().ok());
            status.frequency_mhz = captures.get(2).and_then(|m| m.as_str().parse().ok());
        }
    }

    status
}

/// True when the interface reports access-point mode. In station mode
/// there is nothing to enumerate.
pub fn is_access_point(info_output: &str) -> bool {
    info_output.contains("type AP")
}
