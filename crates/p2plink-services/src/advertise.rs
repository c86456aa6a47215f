//! Names this device advertises.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use p2plink_core::encode_name;

use crate::platform::{LocalService, ADVERTISE_TIMER};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisedName {
    pub name: String,
    pub guid: String,
    pub timer: u32,
    pub encoded_name: String,
}

impl AdvertisedName {
    pub fn new(name: &str, guid: &str) -> Self {
        Self {
            name: name.to_string(),
            guid: guid.to_string(),
            timer: ADVERTISE_TIMER,
            encoded_name: encode_name(name),
        }
    }

    pub fn local_service(&self) -> LocalService {
        LocalService::bus_name(&self.encoded_name, &self.guid, self.timer)
    }

    /// The record published while the name is being withdrawn.
    pub fn withdrawal(&self) -> LocalService {
        LocalService::bus_name(&self.encoded_name, &self.guid, 0)
    }
}

/// Advertised names keyed by (unencoded) name.
#[derive(Clone, Default)]
pub struct AdvertisedNames {
    names: Arc<Mutex<HashMap<String, AdvertisedName>>>,
}

impl AdvertisedNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a name, replacing an earlier advertisement of it.
    pub async fn insert(&self, name: AdvertisedName) -> Option<AdvertisedName> {
        self.names.lock().await.insert(name.name.clone(), name)
    }

    pub async fn remove(&self, name: &str) -> Option<AdvertisedName> {
        self.names.lock().await.remove(name)
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.names.lock().await.contains_key(name)
    }

    pub async fn all(&self) -> Vec<AdvertisedName> {
        self.names.lock().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.names.lock().await.len()
    }

    pub async fn clear(&self) {
        self.names.lock().await.clear();
    }
}
