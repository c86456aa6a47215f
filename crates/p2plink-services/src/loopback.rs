//! In-process P2P platform.
//!
//! Acks every request and, when `auto_accept` is set, behaves like a peer
//! that accepts every connection: a connect forms a group immediately and a
//! cancel or group removal tears it down. Useful for running the daemon on
//! machines without Wi-Fi Direct and for end-to-end tests.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;

use p2plink_core::config::LoopbackConfig;
use p2plink_core::FailureReason;

use crate::iface::{self, NetworkInterface};
use crate::platform::{
    ConnectionInfo, DnsSdRequest, GroupInfo, LocalService, P2pPlatform, PeerConfig, PeerDevice,
    PendingRequest, PlatformEvent,
};

#[derive(Default)]
struct LoopbackState {
    /// Peer of the current group.
    group_peer: Option<String>,
    service_requests: HashSet<DnsSdRequest>,
    local_services: Vec<LocalService>,
    peers: Vec<PeerDevice>,
    unregistered: bool,
}

pub struct LoopbackPlatform {
    config: LoopbackConfig,
    events: mpsc::UnboundedSender<PlatformEvent>,
    state: Mutex<LoopbackState>,
}

impl LoopbackPlatform {
    /// Create the platform. The own-device notification is already queued
    /// on the returned receiver.
    pub fn new(config: LoopbackConfig) -> (Self, mpsc::UnboundedReceiver<PlatformEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let platform = Self {
            config,
            events,
            state: Mutex::new(LoopbackState::default()),
        };
        platform.emit(PlatformEvent::ThisDeviceChanged {
            device: PeerDevice::new(&platform.config.device_address),
        });
        (platform, rx)
    }

    fn state(&self) -> std::sync::MutexGuard<'_, LoopbackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: PlatformEvent) {
        if self.state().unregistered {
            return;
        }
        if self.events.send(event).is_err() {
            tracing::debug!("loopback event receiver dropped");
        }
    }

    /// Simulate Wi-Fi Direct being switched on or off.
    pub fn set_enabled(&self, enabled: bool) {
        if !enabled {
            self.state().group_peer = None;
        }
        self.emit(PlatformEvent::StateChanged { enabled });
    }

    /// Replace the peer list and notify the coordinator.
    pub fn set_peers(&self, peers: Vec<PeerDevice>) {
        self.state().peers = peers;
        self.emit(PlatformEvent::PeersChanged);
    }

    pub fn local_services(&self) -> Vec<LocalService> {
        self.state().local_services.clone()
    }

    pub fn service_request_count(&self) -> usize {
        self.state().service_requests.len()
    }

    pub fn group_peer(&self) -> Option<String> {
        self.state().group_peer.clone()
    }

    fn tear_down_group(&self) {
        let had_group = self.state().group_peer.take().is_some();
        if had_group {
            self.emit(PlatformEvent::ConnectionChanged);
        }
    }
}

impl P2pPlatform for LoopbackPlatform {
    fn discover_services(&self) -> PendingRequest {
        if self.state().service_requests.is_empty() {
            return PendingRequest::ready(Err(FailureReason::NoServiceRequests));
        }
        self.emit(PlatformEvent::DiscoveryChanged { started: true });
        PendingRequest::ok()
    }

    fn discover_peers(&self) -> PendingRequest {
        PendingRequest::ok()
    }

    fn add_service_request(&self, request: &DnsSdRequest) -> PendingRequest {
        self.state().service_requests.insert(request.clone());
        PendingRequest::ok()
    }

    fn remove_service_request(&self, request: &DnsSdRequest) -> PendingRequest {
        self.state().service_requests.remove(request);
        PendingRequest::ok()
    }

    fn clear_service_requests(&self) -> PendingRequest {
        self.state().service_requests.clear();
        PendingRequest::ok()
    }

    fn add_local_service(&self, service: &LocalService) -> PendingRequest {
        let mut state = self.state();
        if !state.local_services.contains(service) {
            state.local_services.push(service.clone());
        }
        PendingRequest::ok()
    }

    fn remove_local_service(&self, service: &LocalService) -> PendingRequest {
        self.state().local_services.retain(|s| s != service);
        PendingRequest::ok()
    }

    fn clear_local_services(&self) -> PendingRequest {
        self.state().local_services.clear();
        PendingRequest::ok()
    }

    fn connect(&self, config: &PeerConfig) -> PendingRequest {
        if !self.config.auto_accept {
            return PendingRequest::ok();
        }
        self.state().group_peer = Some(config.device_address.clone());
        self.emit(PlatformEvent::ConnectionChanged);
        PendingRequest::ok()
    }

    fn cancel_connect(&self) -> PendingRequest {
        self.tear_down_group();
        PendingRequest::ok()
    }

    fn remove_group(&self) -> PendingRequest {
        self.tear_down_group();
        PendingRequest::ok()
    }

    fn request_connection_info(&self) {
        let info = match self.state().group_peer {
            Some(_) => ConnectionInfo::formed(false, None),
            None => ConnectionInfo::not_formed(),
        };
        self.emit(PlatformEvent::ConnectionInfoAvailable { info });
    }

    fn request_group_info(&self) {
        let Some(peer) = self.group_peer() else {
            return;
        };
        self.emit(PlatformEvent::GroupInfoAvailable {
            group: GroupInfo {
                interface: self.config.interface.clone(),
                owner: Some(PeerDevice::new(&peer)),
            },
        });
    }

    fn request_peers(&self) {
        let peers = self.state().peers.clone();
        self.emit(PlatformEvent::PeersAvailable { peers });
    }

    fn unregister(&self) {
        self.state().unregistered = true;
    }

    /// System interfaces plus the configured group interface, which carries
    /// this device's P2P address.
    fn network_interfaces(&self) -> std::io::Result<Vec<NetworkInterface>> {
        let mut interfaces = iface::system_interfaces().unwrap_or_default();
        interfaces.retain(|i| i.name != self.config.interface);
        interfaces.push(NetworkInterface {
            name: self.config.interface.clone(),
            hardware_address: Some(self.config.device_address.to_lowercase()),
        });
        Ok(interfaces)
    }
}
