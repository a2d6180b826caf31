// Full WiFi enumeration pipeline against canned command output and a
// real lease file on disk: AP-mode gate, station parsing, DHCP join,
// hostname lookup, and the naming fallbacks.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use rpimon_core::CoreError;
use rpimon_core::collectors::WifiStatsCollector;
use rpimon_core::source::CommandRunner;
use rpimon_mqtt::{RetryPolicy, SessionConfig};

const INFO_AP: &str = "\
Interface wlan0
\taddr dc:a6:32:01:02:03
\tssid HomeNet
\ttype AP
\tchannel 6 (2437 MHz), width: 20 MHz, no HT
";

const INFO_MANAGED: &str = "\
Interface wlan0
\taddr dc:a6:32:01:02:03
\ttype managed
";

const DUMP: &str = "\
Station dc:a6:32:aa:bb:01 (on wlan0)
\trx bytes:\t10240
\ttx bytes:\t20480
\tsignal:  \t-54 [-58, -55] dBm
\tconnected time:\t1024 seconds
Station b8:27:eb:cc:dd:02 (on wlan0)
\trx bytes:\t512
\ttx bytes:\t256
\tsignal:  \t-71 dBm
Station 02:00:00:33:44:55 (on wlan0)
\tsignal:  \t-88 dBm
\tconnected time:\t7 seconds
";

const LEASES: &str = "\
1714581023 dc:a6:32:aa:bb:01 192.168.4.23 laptop-anna 01:dc:a6:32:aa:bb:01
1714581900 02:00:00:33:44:55 192.168.4.31 * *
";

struct StubRunner {
    info: &'static str,
}

impl CommandRunner for StubRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, CoreError> {
        match (program, args) {
            ("iw", [_, _, "info"]) => Ok(self.info.to_owned()),
            ("iw", [_, _, "station", "dump"]) => Ok(DUMP.to_owned()),
            ("getent", ["hosts", "192.168.4.31"]) => {
                Ok("192.168.4.31     sensor-hall.lan\n".to_owned())
            }
            _ => Err(CoreError::Command {
                command: program.to_owned(),
                reason: "not stubbed".into(),
            }),
        }
    }
}

fn session() -> SessionConfig {
    SessionConfig {
        host: "127.0.0.1".into(),
        port: 1883,
        client_id: "wifistats-test".into(),
        username: None,
        password: None,
        keep_alive_secs: 60,
    }
}

fn collector(info: &'static str, leases_path: PathBuf) -> WifiStatsCollector<StubRunner> {
    WifiStatsCollector::with_runner(
        "rpi",
        "wlan0",
        leases_path,
        session(),
        RetryPolicy::new(true, Duration::from_secs(1), 0),
        StubRunner { info },
    )
}

#[tokio::test]
async fn pipeline_yields_named_clients_with_uptime() {
    let mut leases = tempfile::NamedTempFile::new().expect("temp lease file");
    write!(leases, "{LEASES}").expect("write leases");

    let mut collector = collector(INFO_AP, leases.path().to_path_buf());
    let clients = collector.enumerate_clients();
    assert_eq!(clients.len(), 3);

    // DHCP-named client with driver-reported uptime.
    let anna = &clients[0];
    assert_eq!(anna.name.as_deref(), Some("laptop-anna"));
    assert_eq!(anna.ip.map(|ip| ip.to_string()).as_deref(), Some("192.168.4.23"));
    assert_eq!(anna.uptime.as_deref(), Some("00j 00h 17m 04s"));
    assert_eq!(anna.signal_quality, Some(60));

    // No lease, known vendor OUI: synthetic vendor name, uptime from the
    // first-seen cache rather than an empty field.
    let pi = &clients[1];
    assert_eq!(pi.name.as_deref(), Some("RaspberryPi-DD02"));
    assert_eq!(pi.connected_secs, Some(0));
    assert_eq!(pi.uptime.as_deref(), Some("00j 00h 00m 00s"));

    // Lease with a '*' hostname: resolved through the hostname lookup.
    let sensor = &clients[2];
    assert_eq!(sensor.name.as_deref(), Some("sensor-hall.lan"));
    assert_eq!(sensor.uptime.as_deref(), Some("00j 00h 00m 07s"));
}

#[tokio::test]
async fn station_mode_enumerates_nothing() {
    let mut collector = collector(INFO_MANAGED, PathBuf::from("/nonexistent/leases"));
    assert!(collector.enumerate_clients().is_empty());

    // The status read still works: it reports the managed mode.
    let status = collector.ap_status();
    assert_eq!(
        serde_json::to_value(status.mode).expect("serializable"),
        serde_json::json!("client")
    );
}

#[tokio::test]
async fn missing_lease_file_falls_back_to_synthetic_names() {
    let mut collector = collector(INFO_AP, PathBuf::from("/nonexistent/leases"));
    let clients = collector.enumerate_clients();
    assert_eq!(clients.len(), 3);

    // Without leases nobody has an IP, so the unknown-OUI client gets
    // the generic label.
    let unknown = &clients[2];
    assert_eq!(unknown.name.as_deref(), Some("Device-334455"));
    for client in &clients {
        assert!(client.name.as_deref().is_some_and(|n| !n.is_empty()));
        assert!(client.uptime.as_deref().is_some_and(|u| !u.is_empty()));
    }
}
