// ── WiFi client collector ──
//
// Enumerates stations associated with the access-point interface and
// joins them with DHCP lease data so every published client carries a
// durable identity. The pipeline, in order:
//
//   1. continuity fix-up   — first-seen cache keyed by MAC, so uptime
//                            survives a dump that omits connected-time
//   2. DHCP lease join     — attach IP and lease-announced name
//   3. hostname lookup     — `getent hosts <ip>` for named-less clients
//   4. vendor fallback     — OUI table, else the generic Device-<suffix>
//
// If the interface is not in AP mode there is nothing to enumerate and
// the client list is empty (not an error).

use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tracing::{debug, info, warn};

use rpimon_mqtt::{ConnectionManager, DisconnectCounter, MqttDialer, RetryPolicy, SessionConfig};

use crate::collectors::Collector;
use crate::error::CoreError;
use crate::model::{ApStatus, MacAddress, WifiClient, format_uptime, signal_quality};
use crate::publisher::TelemetryPublisher;
use crate::source::leases::{LeaseRecord, read_leases};
use crate::source::oui::{generic_name, vendor_name};
use crate::source::station::{StationRecord, is_access_point, parse_interface_info, parse_station_dump};
use crate::source::{CommandRunner, SystemCommandRunner};

// ── Continuity cache ────────────────────────────────────────────────

/// Cross-poll identity: remembers when each MAC was first observed so a
/// dump that omits the driver's connected-time field still yields a
/// monotonic uptime (now − first_seen) instead of dropping to zero.
///
/// Entries for departed MACs are retained indefinitely: eviction would
/// break continuity for clients that flap between polls, and the cache
/// costs a few dozen bytes per MAC ever seen on a home AP.
#[derive(Debug, Default)]
pub struct ContinuityCache {
    first_seen: HashMap<MacAddress, Instant>,
}

impl ContinuityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register sightings at `now` and fill missing connected-times from
    /// the cache.
    pub fn apply(&mut self, clients: &mut [WifiClient], now: Instant) {
        for client in clients {
            let first = *self.first_seen.entry(client.mac.clone()).or_insert(now);
            if client.connected_secs.is_none() {
                let seconds = now.duration_since(first).as_secs();
                client.connected_secs = Some(seconds);
                client.uptime = Some(format_uptime(seconds));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.first_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_seen.is_empty()
    }
}

// ── Pipeline stages ─────────────────────────────────────────────────

impl WifiClient {
    fn from_station(record: StationRecord) -> Self {
        let mut client = WifiClient::new(record.mac);
        client.signal = record.signal_dbm;
        client.signal_quality = record.signal_dbm.map(signal_quality);
        client.connected_secs = record.connected_secs;
        client.uptime = record.connected_secs.map(format_uptime);
        client.rx_bytes = record.rx_bytes;
        client.tx_bytes = record.tx_bytes;
        client
    }
}

/// Attach IP and lease-announced display name, joined on lowercased MAC.
pub fn join_leases(clients: &mut [WifiClient], leases: &[LeaseRecord]) {
    for client in clients {
        if let Some(lease) = leases.iter().find(|lease| lease.mac == client.mac) {
            if client.ip.is_none() {
                client.ip = lease.ip;
            }
            if client.name.is_none() {
                client.name.clone_from(&lease.hostname);
            }
        }
    }
}

/// Guarantee a non-empty name and uptime on every client leaving the
/// pipeline.
pub fn ensure_identity(client: &mut WifiClient) {
    if client.name.is_none() {
        client.name = Some(vendor_name(&client.mac).unwrap_or_else(|| generic_name(&client.mac)));
    }
    if client.uptime.is_none() {
        client.uptime = Some("0s".to_owned());
    }
}

// ── Collector ───────────────────────────────────────────────────────

pub struct WifiStatsCollector<R: CommandRunner = SystemCommandRunner> {
    prefix: String,
    interface: String,
    leases_path: PathBuf,
    extended: bool,
    manager: ConnectionManager<MqttDialer>,
    publisher: TelemetryPublisher,
    continuity: ContinuityCache,
    disconnects: Arc<DisconnectCounter>,
    runner: R,
    started_at: Instant,
}

impl WifiStatsCollector<SystemCommandRunner> {
    pub fn new(
        prefix: impl Into<String>,
        interface: impl Into<String>,
        leases_path: PathBuf,
        session: SessionConfig,
        policy: RetryPolicy,
    ) -> Self {
        Self::with_runner(
            prefix,
            interface,
            leases_path,
            session,
            policy,
            SystemCommandRunner,
        )
    }
}

impl<R: CommandRunner> WifiStatsCollector<R> {
    pub fn with_runner(
        prefix: impl Into<String>,
        interface: impl Into<String>,
        leases_path: PathBuf,
        session: SessionConfig,
        policy: RetryPolicy,
        runner: R,
    ) -> Self {
        let disconnects = Arc::new(DisconnectCounter::default());
        let dialer = MqttDialer::new(session).with_observer(disconnects.clone());
        Self {
            prefix: prefix.into(),
            interface: interface.into(),
            leases_path,
            extended: false,
            manager: ConnectionManager::new(dialer, policy),
            publisher: TelemetryPublisher::new(),
            continuity: ContinuityCache::new(),
            disconnects,
            runner,
            started_at: Instant::now(),
        }
    }

    /// Publish the extended per-client record (ip, signal, byte
    /// counters) instead of the simplified name/mac/uptime triple.
    pub fn with_extended(mut self, extended: bool) -> Self {
        self.extended = extended;
        self
    }

    /// Fresh AP status; never cached between polls.
    pub fn ap_status(&self) -> ApStatus {
        match self.runner.run("iw", &["dev", &self.interface, "info"]) {
            Ok(output) => parse_interface_info(&output),
            Err(e) => {
                debug!(error = %e, "wireless interface info unavailable");
                ApStatus::default()
            }
        }
    }

    /// Run the full enumeration pipeline without publishing.
    pub fn enumerate_clients(&mut self) -> Vec<WifiClient> {
        let info = match self.runner.run("iw", &["dev", &self.interface, "info"]) {
            Ok(output) => output,
            Err(e) => {
                debug!(error = %e, "wireless interface unavailable");
                return Vec::new();
            }
        };
        if !is_access_point(&info) {
            debug!(interface = %self.interface, "interface not in AP mode");
            return Vec::new();
        }

        let dump = match self
            .runner
            .run("iw", &["dev", &self.interface, "station", "dump"])
        {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "station dump failed");
                return Vec::new();
            }
        };

        let mut clients: Vec<WifiClient> = parse_station_dump(&dump)
            .into_iter()
            .map(WifiClient::from_station)
            .collect();

        self.continuity.apply(&mut clients, Instant::now());

        match read_leases(&self.leases_path) {
            Ok(leases) => join_leases(&mut clients, &leases),
            Err(e) => debug!(error = %e, "DHCP leases unavailable"),
        }

        for client in &mut clients {
            if client.name.is_none() {
                if let Some(ip) = client.ip {
                    client.name = self.lookup_hostname(ip);
                }
            }
            ensure_identity(client);
        }

        clients
    }

    /// Reverse lookup through the resolver database; best-effort.
    fn lookup_hostname(&self, ip: IpAddr) -> Option<String> {
        let output = self.runner.run("getent", &["hosts", &ip.to_string()]).ok()?;
        output
            .split_whitespace()
            .nth(1)
            .map(std::borrow::ToOwned::to_owned)
    }

    fn client_records(&self, clients: &[WifiClient]) -> Vec<serde_json::Value> {
        clients
            .iter()
            .map(|client| {
                if self.extended {
                    json!({
                        "name": client.display_name(),
                        "mac": client.mac,
                        "ip": client.ip,
                        "signal": client.signal,
                        "signal_quality": client.signal_quality,
                        "uptime": client.uptime_label(),
                        "rx_bytes": client.rx_bytes,
                        "tx_bytes": client.tx_bytes,
                    })
                } else {
                    json!({
                        "name": client.display_name(),
                        "mac": client.mac,
                        "uptime": client.uptime_label(),
                    })
                }
            })
            .collect()
    }
}

impl<R: CommandRunner> Collector for WifiStatsCollector<R> {
    fn name(&self) -> &'static str {
        "wifi-stats"
    }

    async fn ensure_connected(&mut self) -> Result<(), CoreError> {
        if self.publisher.connected() {
            return Ok(());
        }
        if self.publisher.session().is_some() {
            warn!("broker connection lost, reconnecting");
            self.publisher.detach();
        }
        let session = self.manager.connect().await?;
        self.publisher.attach(session);
        Ok(())
    }

    async fn tick(&mut self) -> Result<(), CoreError> {
        let clients = self.enumerate_clients();
        let records = self.client_records(&clients);

        let clients_topic = format!("{}/network/wifi/clients", self.prefix);
        let _ = self
            .publisher
            .record(
                &clients_topic,
                json!({
                    "clients": records,
                    "count": clients.len(),
                }),
            )
            .await;

        let status = self.ap_status();
        debug!(
            ssid = status.ssid.as_deref().unwrap_or("-"),
            channel = status.channel,
            frequency_mhz = status.frequency_mhz,
            "access point status"
        );

        let status_topic = format!("{}/network/wifi/status", self.prefix);
        let _ = self
            .publisher
            .record(
                &status_topic,
                json!({
                    "ssid": status.ssid,
                    "mode": status.mode,
                    "clients_count": clients.len(),
                }),
            )
            .await;

        debug!(clients = clients.len(), "wifi data published");
        Ok(())
    }

    fn log_statistics(&self) {
        let runtime = self.started_at.elapsed();
        info!(
            runtime_hours = runtime.as_secs() / 3600,
            runtime_minutes = (runtime.as_secs() % 3600) / 60,
            messages_sent = self.publisher.sent(),
            errors = self.publisher.errors(),
            connection_failures = self.manager.connection_failures(),
            disconnects = self.disconnects.count(),
            "collector statistics"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client(mac: &str) -> WifiClient {
        WifiClient::new(MacAddress::new(mac))
    }

    #[test]
    fn continuity_derives_uptime_from_first_seen() {
        let mut cache = ContinuityCache::new();
        let t0 = Instant::now();

        // First poll: no driver-reported connected time.
        let mut clients = vec![client("aa:bb:cc:dd:ee:01")];
        cache.apply(&mut clients, t0);
        assert_eq!(clients[0].connected_secs, Some(0));

        // Thirty seconds later, still no field: uptime comes from the
        // cache, not zero.
        let mut clients = vec![client("aa:bb:cc:dd:ee:01")];
        cache.apply(&mut clients, t0 + Duration::from_secs(30));
        assert!(clients[0].connected_secs.unwrap() >= 30);
        assert_eq!(clients[0].uptime.as_deref(), Some("00j 00h 00m 30s"));
    }

    #[test]
    fn driver_reported_time_wins_over_cache() {
        let mut cache = ContinuityCache::new();
        let t0 = Instant::now();

        let mut clients = vec![client("aa:bb:cc:dd:ee:02")];
        clients[0].connected_secs = Some(500);
        cache.apply(&mut clients, t0);
        assert_eq!(clients[0].connected_secs, Some(500));
    }

    #[test]
    fn departed_macs_stay_cached() {
        let mut cache = ContinuityCache::new();
        let t0 = Instant::now();

        let mut clients = vec![client("aa:bb:cc:dd:ee:03")];
        cache.apply(&mut clients, t0);

        // The client disappears from the next dump; the cache entry is
        // intentionally retained.
        let mut clients: Vec<WifiClient> = Vec::new();
        cache.apply(&mut clients, t0 + Duration::from_secs(60));
        assert_eq!(cache.len(), 1);

        // On return, uptime continues from the original sighting.
        let mut clients = vec![client("aa:bb:cc:dd:ee:03")];
        cache.apply(&mut clients, t0 + Duration::from_secs(120));
        assert!(clients[0].connected_secs.unwrap() >= 120);
    }

    #[test]
    fn lease_join_attaches_ip_and_name() {
        let mut clients = vec![client("dc:a6:32:aa:bb:01")];
        let leases = vec![LeaseRecord {
            mac: MacAddress::new("DC:A6:32:AA:BB:01"),
            ip: "192.168.4.23".parse().ok(),
            hostname: Some("laptop-anna".into()),
        }];

        join_leases(&mut clients, &leases);
        assert_eq!(clients[0].ip.unwrap().to_string(), "192.168.4.23");
        assert_eq!(clients[0].name.as_deref(), Some("laptop-anna"));
    }

    #[test]
    fn identity_fallbacks_guarantee_name_and_uptime() {
        let mut vendor = client("b8:27:eb:00:a9:c1");
        ensure_identity(&mut vendor);
        assert_eq!(vendor.name.as_deref(), Some("RaspberryPi-A9C1"));
        assert_eq!(vendor.uptime.as_deref(), Some("0s"));

        let mut unknown = client("02:00:00:33:44:55");
        ensure_identity(&mut unknown);
        assert_eq!(unknown.name.as_deref(), Some("Device-334455"));
    }
}
