// ── Vendor OUI table ──
//
// Last-resort naming for clients with no DHCP hostname and no reverse
// lookup result. The table covers the vendors that actually show up on a
// Pi access point; everything else gets the generic `Device-<suffix>`
// label so every published client has a non-empty name.

use crate::model::MacAddress;

/// OUI prefix → vendor label, for the handful of vendors worth naming.
const VENDOR_PREFIXES: &[(&str, &str)] = &[
    // Raspberry Pi Foundation / Trading
    ("b8:27:eb", "RaspberryPi"),
    ("dc:a6:32", "RaspberryPi"),
    ("e4:5f:01", "RaspberryPi"),
    ("d8:3a:dd", "RaspberryPi"),
    // Espressif (ESP8266/ESP32 sensor nodes)
    ("24:0a:c4", "Espressif"),
    ("30:ae:a4", "Espressif"),
    ("a4:cf:12", "Espressif"),
    ("84:cc:a8", "Espressif"),
    // Apple
    ("3c:22:fb", "Apple"),
    ("f0:18:98", "Apple"),
    ("a4:83:e7", "Apple"),
    // Samsung
    ("8c:f5:a3", "Samsung"),
    ("fc:fb:fb", "Samsung"),
];

/// Vendor-derived name (`RaspberryPi-A9C1`) when the OUI is known.
pub fn vendor_name(mac: &MacAddress) -> Option<String> {
    let oui = mac.oui();
    VENDOR_PREFIXES
        .iter()
        .find(|(prefix, _)| *prefix == oui)
        .map(|(_, vendor)| format!("{vendor}-{}", mac.suffix(4)))
}

/// Generic fallback name built from the MAC tail (`Device-3FA9C1`).
pub fn generic_name(mac: &MacAddress) -> String {
    format!("Device-{}", mac.suffix(6))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn known_oui_yields_vendor_name() {
        let mac = MacAddress::new("B8:27:EB:3F:A9:C1");
        assert_eq!(vendor_name(&mac).unwrap(), "RaspberryPi-A9C1");
    }

    #[test]
    fn unknown_oui_yields_none() {
        let mac = MacAddress::new("00:11:22:33:44:55");
        assert_eq!(vendor_name(&mac), None);
    }

    #[test]
    fn generic_name_uses_mac_tail() {
        let mac = MacAddress::new("00:11:22:33:44:55");
        assert_eq!(generic_name(&mac), "Device-334455");
    }
}
