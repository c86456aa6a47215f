//! Peer link and discovery state machines.

use serde::Serialize;

use crate::platform::{ConnectionInfo, PeerConfig, PeerDevice};

/// Progress of the single P2P link this device manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerState {
    Disconnected,
    /// Connect issued, not yet acknowledged by the OS.
    Initiated,
    /// Connect acknowledged, group negotiation in progress.
    Connecting,
    Connected,
    Disconnecting,
}

impl PeerState {
    pub fn can_transition(self, to: PeerState) -> bool {
        use PeerState::*;
        matches!(
            (self, to),
            (_, Disconnected)
                | (Disconnected, Initiated)
                | (Initiated, Connecting)
                | (Initiated | Connecting, Connected)
                | (Initiated | Connecting | Connected, Disconnecting)
                | (Disconnecting | Disconnected, Connected)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal peer state transition {from:?} -> {to:?}")]
pub struct IllegalTransition {
    pub from: PeerState,
    pub to: PeerState,
}

/// What the periodic discovery machinery is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindState {
    Idle,
    /// DNS-SD service discovery running.
    Discovering,
    /// Peer discovery only (keeps advertisements visible).
    FindPeers,
}

impl FindState {
    /// Idle → FindPeers. Any other state is left alone.
    pub fn try_find_peers(&mut self) -> bool {
        if *self == FindState::Idle {
            *self = FindState::FindPeers;
            true
        } else {
            false
        }
    }

    /// Idle or FindPeers → Discovering. Returns the state it left.
    pub fn start_discovery(&mut self) -> FindState {
        std::mem::replace(self, FindState::Discovering)
    }

    pub fn stop(&mut self) {
        *self = FindState::Idle;
    }
}

/// Everything guarded by the coordinator's link lock.
#[derive(Debug, Clone)]
pub struct LinkState {
    peer: PeerState,
    /// Active connection attempt, if any. At most one exists.
    pub config: Option<PeerConfig>,
    /// Group the device currently belongs to. Present whenever `Connected`.
    association: Option<ConnectionInfo>,
    pub group_owner: Option<PeerDevice>,
    pub interface: Option<String>,
    /// This side started the current link.
    pub initiator: bool,
    /// A connect is queued behind the release of the current link.
    pub pending_connect: bool,
}

impl Default for LinkState {
    fn default() -> Self {
        Self {
            peer: PeerState::Disconnected,
            config: None,
            association: None,
            group_owner: None,
            interface: None,
            initiator: false,
            pending_connect: false,
        }
    }
}

impl LinkState {
    pub fn peer(&self) -> PeerState {
        self.peer
    }

    pub fn association(&self) -> Option<&ConnectionInfo> {
        self.association.as_ref()
    }

    /// Move to any state other than `Connected`, which needs
    /// [`enter_connected`](Self::enter_connected).
    pub fn transition(&mut self, to: PeerState) -> Result<(), IllegalTransition> {
        let from = self.peer;
        if to == PeerState::Connected || !from.can_transition(to) {
            return Err(IllegalTransition { from, to });
        }
        self.peer = to;
        if to == PeerState::Disconnected {
            self.association = None;
            self.group_owner = None;
            self.interface = None;
        }
        Ok(())
    }

    pub fn enter_connected(&mut self, info: ConnectionInfo) -> Result<(), IllegalTransition> {
        let from = self.peer;
        if !from.can_transition(PeerState::Connected) {
            return Err(IllegalTransition {
                from,
                to: PeerState::Connected,
            });
        }
        self.peer = PeerState::Connected;
        self.association = Some(info);
        Ok(())
    }

    pub fn config_address(&self) -> Option<&str> {
        self.config.as_ref().map(|c| c.device_address.as_str())
    }
}
