// ── MAC address identity ──
//
// The MAC is the identity key for WiFi clients: the station dump, the
// DHCP lease file, and the cross-poll continuity cache all join on it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// MAC address, normalized to lowercase colon-separated form
/// (`aa:bb:cc:dd:ee:ff`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddress(String);

impl MacAddress {
    /// Create a normalized MAC address from any common format.
    /// Accepts colon-separated, dash-separated, or mixed-case input.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let normalized = raw.as_ref().to_lowercase().replace('-', ":");
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last `n` hex digits, uppercased — the stem for synthetic device
    /// names (`Device-3FA9C1`).
    pub fn suffix(&self, n: usize) -> String {
        let hex: String = self.0.chars().filter(char::is_ascii_hexdigit).collect();
        let start = hex.len().saturating_sub(n);
        hex[start..].to_uppercase()
    }

    /// First three octets (`aa:bb:cc`) — the vendor OUI prefix.
    pub fn oui(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .filter(|&(_, c)| c == ':')
            .nth(2)
            .map_or(self.0.len(), |(i, _)| i);
        &self.0[..end]
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_dashes() {
        let mac = MacAddress::new("AA-BB-CC-DD-EE-FF");
        assert_eq!(mac.as_str(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn suffix_takes_trailing_hex() {
        let mac = MacAddress::new("b8:27:eb:3f:a9:c1");
        assert_eq!(mac.suffix(6), "3FA9C1");
        assert_eq!(mac.suffix(4), "A9C1");
    }

    #[test]
    fn oui_is_first_three_octets() {
        let mac = MacAddress::new("B8:27:EB:3F:A9:C1");
        assert_eq!(mac.oui(), "b8:27:eb");
    }

    #[test]
    fn from_str_round_trips() {
        let mac: MacAddress = "DC:A6:32:01:02:03".parse().unwrap();
        assert_eq!(mac.to_string(), "dc:a6:32:01:02:03");
    }
}
