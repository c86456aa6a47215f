//! Network interface enumeration.
//!
//! Used to find the interface the OS created for a P2P group by matching
//! hardware addresses.

use serde::{Deserialize, Serialize};

/// A local network interface and its link-layer address, if it has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub name: String,
    /// Lowercase, colon separated (`02:00:00:aa:bb:cc`).
    pub hardware_address: Option<String>,
}

impl NetworkInterface {
    /// Case-insensitive hardware address match.
    pub fn has_address(&self, mac: &str) -> bool {
        self.hardware_address
            .as_deref()
            .is_some_and(|hw| hw.eq_ignore_ascii_case(mac))
    }
}

/// Format a 6-byte MAC as `aa:bb:cc:dd:ee:ff`.
pub fn format_mac(mac: &[u8; 6]) -> String {
    mac.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Enumerate interfaces via `getifaddrs`, one entry per interface name.
pub fn system_interfaces() -> std::io::Result<Vec<NetworkInterface>> {
    let addrs = nix::ifaddrs::getifaddrs().map_err(std::io::Error::from)?;

    let mut out: Vec<NetworkInterface> = Vec::new();
    for ifa in addrs {
        let hw = ifa
            .address
            .as_ref()
            .and_then(|a| a.as_link_addr())
            .and_then(|l| l.addr())
            .filter(|mac| mac.iter().any(|b| *b != 0))
            .map(|mac| format_mac(&mac));

        match out.iter_mut().find(|i| i.name == ifa.interface_name) {
            Some(existing) => {
                if existing.hardware_address.is_none() {
                    existing.hardware_address = hw;
                }
            }
            None => out.push(NetworkInterface {
                name: ifa.interface_name,
                hardware_address: hw,
            }),
        }
    }
    Ok(out)
}
