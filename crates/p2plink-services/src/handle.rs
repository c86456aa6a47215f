//! Bijective device address ↔ link handle table.

use std::sync::Arc;

use dashmap::DashMap;

use p2plink_core::handle::{preferred_handle, NO_HANDLE};

/// Hands out one positive handle per device address.
///
/// The first choice is the hash-derived [`preferred_handle`], which bus
/// daemons compute on their own. On a collision (or a
/// zero hash) the next free positive value is used instead.
///
/// Entries are never evicted while the coordinator runs, so a handle stays
/// valid for late releases; the table grows by one entry per distinct peer
/// address linked to and is emptied on shutdown.
#[derive(Clone, Default)]
pub struct HandleTable {
    by_address: Arc<DashMap<String, i32>>,
    by_handle: Arc<DashMap<i32, String>>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for `address`, allocating one on first use. An empty address
    /// has no handle.
    pub fn handle_for(&self, address: &str) -> i32 {
        if address.is_empty() {
            return NO_HANDLE;
        }
        if let Some(h) = self.by_address.get(address) {
            return *h;
        }

        let mut candidate = preferred_handle(address);
        loop {
            if candidate <= NO_HANDLE {
                candidate = 1;
            }
            match self.by_handle.entry(candidate) {
                dashmap::mapref::entry::Entry::Occupied(e) if e.get() == address => {
                    return candidate;
                }
                dashmap::mapref::entry::Entry::Occupied(_) => {
                    candidate = candidate.wrapping_add(1);
                }
                dashmap::mapref::entry::Entry::Vacant(e) => {
                    e.insert(address.to_string());
                    break;
                }
            }
        }

        // Another task may have allocated for the same address meanwhile.
        match self.by_address.entry(address.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(e) => {
                let winner = *e.get();
                drop(e);
                self.by_handle.remove(&candidate);
                winner
            }
            dashmap::mapref::entry::Entry::Vacant(e) => {
                e.insert(candidate);
                candidate
            }
        }
    }

    /// Handle previously allocated for `address`, without allocating.
    pub fn lookup(&self, address: &str) -> Option<i32> {
        self.by_address.get(address).map(|h| *h)
    }

    pub fn address_of(&self, handle: i32) -> Option<String> {
        self.by_handle.get(&handle).map(|a| a.clone())
    }

    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }

    pub fn clear(&self) {
        self.by_address.clear();
        self.by_handle.clear();
    }
}
