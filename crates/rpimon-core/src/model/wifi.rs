// ── WiFi client domain types ──
//
// A client's identity is its MAC; everything else is optional and filled
// in by the enumeration pipeline (station dump → continuity cache → DHCP
// lease join → hostname lookup → vendor fallback). Every client leaving
// the pipeline carries a non-empty display name and uptime string.

use serde::Serialize;
use std::net::IpAddr;

use super::mac::MacAddress;

/// Signal strength (dBm) mapped onto the quality band the dashboard
/// renders: −90 dBm and below is 0 %, −30 dBm and above is 100 %,
/// linear in between. Values outside the band clamp.
pub fn signal_quality(signal_dbm: i32) -> u8 {
    const FLOOR_DBM: i32 = -90;
    const CEIL_DBM: i32 = -30;

    let clamped = signal_dbm.clamp(FLOOR_DBM, CEIL_DBM);
    let span = CEIL_DBM - FLOOR_DBM;
    let quality = (clamped - FLOOR_DBM) * 100 / span;
    u8::try_from(quality).unwrap_or(100)
}

/// Render connected-seconds in the dashboard's fixed-width form:
/// `00j 00h 00m 00s`.
pub fn format_uptime(total_seconds: u64) -> String {
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;
    format!("{days:02}j {hours:02}h {minutes:02}m {seconds:02}s")
}

/// One wireless client associated with the access point.
#[derive(Debug, Clone, Serialize)]
pub struct WifiClient {
    pub mac: MacAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<IpAddr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_quality: Option<u8>,
    /// Driver-reported connected time, or derived from the first-seen
    /// cache when the dump omits it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<String>,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

impl WifiClient {
    pub fn new(mac: MacAddress) -> Self {
        Self {
            mac,
            ip: None,
            name: None,
            signal: None,
            signal_quality: None,
            connected_secs: None,
            uptime: None,
            rx_bytes: 0,
            tx_bytes: 0,
        }
    }

    /// Display name, guaranteed non-empty after the naming pipeline.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }

    /// Uptime string, defaulting to the pipeline's `0s` sentinel.
    pub fn uptime_label(&self) -> &str {
        self.uptime.as_deref().unwrap_or("0s")
    }
}

// ── Access point status ─────────────────────────────────────────────

/// Operating mode of the wireless interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WifiMode {
    #[serde(rename = "AP")]
    Ap,
    #[serde(rename = "client")]
    Client,
    #[serde(rename = "unknown")]
    Unknown,
}

/// Snapshot of the interface state. Read fresh on every poll, never
/// cached.
#[derive(Debug, Clone, Serialize)]
pub struct ApStatus {
    pub ssid: Option<String>,
    pub channel: Option<u32>,
    pub frequency_mhz: Option<u32>,
    pub mode: WifiMode,
}

impl Default for ApStatus {
    fn default() -> Self {
        Self {
            ssid: None,
            channel: None,
            frequency_mhz: None,
            mode: WifiMode::Unknown,
        }
    }
}
