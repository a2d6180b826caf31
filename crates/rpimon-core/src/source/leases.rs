// ── DHCP lease file ──
//
// dnsmasq persists one lease per line:
//
//   <expiry-epoch> <mac> <ip> <hostname|*> <client-id>
//
// Hostnames the client did not announce are recorded as `*`. Short or
// otherwise malformed lines are skipped silently.

use std::net::IpAddr;
use std::path::Path;

use crate::model::MacAddress;

/// One DHCP lease: MAC → assigned IP, plus the announced hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseRecord {
    pub mac: MacAddress,
    pub ip: Option<IpAddr>,
    pub hostname: Option<String>,
}

/// Parse lease-file text into records.
pub fn parse_leases(content: &str) -> Vec<LeaseRecord> {
    content
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 {
                return None;
            }
            let hostname = (parts[3] != "*").then(|| parts[3].to_owned());
            Some(LeaseRecord {
                mac: MacAddress::new(parts[1]),
                ip: parts[2].parse().ok(),
                hostname,
            })
        })
        .collect()
}

/// Read and parse the lease file. A missing file is an I/O error the
/// caller downgrades to a debug log — clients then fall through to the
/// synthetic naming stages.
pub fn read_leases(path: &Path) -> std::io::Result<Vec<LeaseRecord>> {
    Ok(parse_leases(&std::fs::read_to_string(path)?))
}
