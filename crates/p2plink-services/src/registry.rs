//! Discovered-service registry: which bus names each remote device offers.

use std::sync::Arc;

use dashmap::DashMap;

/// One bus name learned from a device's TXT record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredService {
    /// Decoded bus name.
    pub name: String,
    /// Decoded prefix the name was found under.
    pub prefix: String,
    pub guid: String,
}

/// Services grouped by device address.
#[derive(Clone, Default)]
pub struct DiscoveredServices {
    devices: Arc<DashMap<String, Vec<DiscoveredService>>>,
}

impl DiscoveredServices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a TXT update. A nonzero timer records the service unless a
    /// service of that name is already known; a zero timer removes it.
    /// Devices left without services are dropped.
    pub fn update(&self, device: &str, service: DiscoveredService, timer: u32) {
        if timer != 0 {
            let mut entry = self.devices.entry(device.to_string()).or_default();
            if !entry.iter().any(|s| s.name == service.name) {
                entry.push(service);
            }
            return;
        }

        let now_empty = match self.devices.get_mut(device) {
            Some(mut list) => {
                list.retain(|s| s.name != service.name);
                list.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.devices.remove_if(device, |_, list| list.is_empty());
        }
    }

    /// Forget a device, returning what it offered.
    pub fn remove_device(&self, device: &str) -> Vec<DiscoveredService> {
        self.devices
            .remove(device)
            .map(|(_, list)| list)
            .unwrap_or_default()
    }

    pub fn services_of(&self, device: &str) -> Vec<DiscoveredService> {
        self.devices
            .get(device)
            .map(|list| list.clone())
            .unwrap_or_default()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn service_count(&self) -> usize {
        self.devices.iter().map(|e| e.value().len()).sum()
    }

    pub fn clear(&self) {
        self.devices.clear();
    }
}
