//! OS P2P framework contract.
//!
//! The coordinator never talks to hardware directly. Every request goes
//! through [`P2pPlatform`], which answers immediately with a
//! [`PendingRequest`] and completes it later from whatever thread the OS
//! uses. Unsolicited OS notifications (peer list changes, connection
//! changes, DNS-SD responses) come back as [`PlatformEvent`]s.

use std::collections::BTreeMap;
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use p2plink_core::FailureReason;

use crate::iface::{self, NetworkInterface};

/// DNS-SD service type used for bus names.
pub const SERVICE_TYPE: &str = "_alljoyn._tcp";

/// Suffix of a fully qualified bus-name service instance.
pub const SERVICE_SUFFIX: &str = "._alljoyn._tcp.local.";

/// TXT keys carried by advertised names.
pub const TXT_GUID: &str = "GUID";
pub const TXT_TIMER: &str = "TIMER";

/// Timer value of a live advertisement.
pub const ADVERTISE_TIMER: u32 = 255;

/// Highest group owner intent (absolute requirement to be group owner).
pub const MAX_GROUP_OWNER_INTENT: u8 = 15;

// ── Data types ────────────────────────────────────────────────────────────────

/// WPS provisioning method used during group negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WpsSetup {
    PushButton,
}

/// Parameters for a single outgoing connection attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub device_address: String,
    /// 0 (must be client) to 15 (must be group owner).
    pub group_owner_intent: u8,
    pub wps: WpsSetup,
}

impl PeerConfig {
    pub fn push_button(device_address: &str, group_owner_intent: u8) -> Self {
        Self {
            device_address: device_address.to_string(),
            group_owner_intent: group_owner_intent.min(MAX_GROUP_OWNER_INTENT),
            wps: WpsSetup::PushButton,
        }
    }
}

/// A Wi-Fi Direct device as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerDevice {
    pub device_address: String,
    #[serde(default)]
    pub device_name: String,
}

impl PeerDevice {
    pub fn new(device_address: &str) -> Self {
        Self {
            device_address: device_address.to_string(),
            device_name: String::new(),
        }
    }
}

/// Result of a connection-info query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub group_formed: bool,
    pub is_group_owner: bool,
    pub group_owner_address: Option<IpAddr>,
}

impl ConnectionInfo {
    pub fn formed(is_group_owner: bool, group_owner_address: Option<IpAddr>) -> Self {
        Self {
            group_formed: true,
            is_group_owner,
            group_owner_address,
        }
    }

    pub fn not_formed() -> Self {
        Self {
            group_formed: false,
            is_group_owner: false,
            group_owner_address: None,
        }
    }
}

/// Result of a group-info query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    /// Network interface created for the group, e.g. `p2p-wlan0-0`.
    pub interface: String,
    pub owner: Option<PeerDevice>,
}

/// A DNS-SD service discovery request. No instance name means "every
/// instance of the bus service type".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DnsSdRequest {
    pub instance_name: Option<String>,
    pub service_type: String,
}

impl DnsSdRequest {
    pub fn all() -> Self {
        Self {
            instance_name: None,
            service_type: SERVICE_TYPE.to_string(),
        }
    }

    pub fn instance(name: &str) -> Self {
        Self {
            instance_name: Some(name.to_string()),
            service_type: SERVICE_TYPE.to_string(),
        }
    }
}

/// A locally published DNS-SD service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalService {
    /// Encoded instance name.
    pub instance_name: String,
    pub service_type: String,
    pub txt: BTreeMap<String, String>,
}

impl LocalService {
    pub fn bus_name(encoded_name: &str, guid: &str, timer: u32) -> Self {
        let mut txt = BTreeMap::new();
        txt.insert(TXT_GUID.to_string(), guid.to_string());
        txt.insert(TXT_TIMER.to_string(), timer.to_string());
        Self {
            instance_name: encoded_name.to_string(),
            service_type: SERVICE_TYPE.to_string(),
            txt,
        }
    }
}

// ── Pending requests ──────────────────────────────────────────────────────────

/// Completion of an asynchronous OS request.
///
/// Resolves to `Err(FailureReason::Error)` if the platform drops the
/// [`Completer`] without answering.
#[derive(Debug)]
pub struct PendingRequest {
    rx: oneshot::Receiver<Result<(), FailureReason>>,
}

/// The platform's side of a [`PendingRequest`].
#[derive(Debug)]
pub struct Completer {
    tx: oneshot::Sender<Result<(), FailureReason>>,
}

impl PendingRequest {
    pub fn channel() -> (Completer, PendingRequest) {
        let (tx, rx) = oneshot::channel();
        (Completer { tx }, PendingRequest { rx })
    }

    /// An already-answered request.
    pub fn ready(result: Result<(), FailureReason>) -> Self {
        let (completer, pending) = Self::channel();
        completer.complete(result);
        pending
    }

    pub fn ok() -> Self {
        Self::ready(Ok(()))
    }
}

impl Future for PendingRequest {
    type Output = Result<(), FailureReason>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.unwrap_or(Err(FailureReason::Error)))
    }
}

impl Completer {
    pub fn complete(self, result: Result<(), FailureReason>) {
        // The coordinator may have stopped waiting; nothing to do then.
        let _ = self.tx.send(result);
    }

    pub fn fail(self, reason: FailureReason) {
        self.complete(Err(reason))
    }
}

// ── Notifications ─────────────────────────────────────────────────────────────

/// Notifications delivered by the OS framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// Wi-Fi Direct was switched on or off.
    StateChanged { enabled: bool },
    /// Group membership changed; connection info should be re-read.
    ConnectionChanged,
    /// This device's own P2P identity changed.
    ThisDeviceChanged { device: PeerDevice },
    /// Peer/service discovery started or stopped.
    DiscoveryChanged { started: bool },
    /// The peer list changed; it should be re-read.
    PeersChanged,
    /// Answer to a peer list query.
    PeersAvailable { peers: Vec<PeerDevice> },
    /// Answer to a connection-info query.
    ConnectionInfoAvailable { info: ConnectionInfo },
    /// Answer to a group-info query.
    GroupInfoAvailable { group: GroupInfo },
    /// A DNS-SD PTR response.
    DnsSdServiceAvailable {
        instance_name: String,
        registration_type: String,
        device: PeerDevice,
    },
    /// A DNS-SD TXT response.
    DnsSdTxtRecordAvailable {
        full_domain_name: String,
        txt: BTreeMap<String, String>,
        device: PeerDevice,
    },
}

// ── Platform ──────────────────────────────────────────────────────────────────

/// Asynchronous command surface of the OS P2P framework.
///
/// Request methods must not block. Query methods (`request_*`) answer
/// through a later [`PlatformEvent`].
pub trait P2pPlatform: Send + Sync + 'static {
    fn discover_services(&self) -> PendingRequest;

    fn discover_peers(&self) -> PendingRequest;

    fn add_service_request(&self, request: &DnsSdRequest) -> PendingRequest;

    fn remove_service_request(&self, request: &DnsSdRequest) -> PendingRequest;

    fn clear_service_requests(&self) -> PendingRequest;

    fn add_local_service(&self, service: &LocalService) -> PendingRequest;

    fn remove_local_service(&self, service: &LocalService) -> PendingRequest;

    fn clear_local_services(&self) -> PendingRequest;

    fn connect(&self, config: &PeerConfig) -> PendingRequest;

    fn cancel_connect(&self) -> PendingRequest;

    fn remove_group(&self) -> PendingRequest;

    /// Answered by [`PlatformEvent::ConnectionInfoAvailable`].
    fn request_connection_info(&self);

    /// Answered by [`PlatformEvent::GroupInfoAvailable`].
    fn request_group_info(&self);

    /// Answered by [`PlatformEvent::PeersAvailable`].
    fn request_peers(&self);

    /// Stop delivering notifications. Called once on shutdown.
    fn unregister(&self) {}

    /// Whether the application owning this link manager is in the foreground.
    fn is_foreground(&self) -> bool {
        true
    }

    fn network_interfaces(&self) -> std::io::Result<Vec<NetworkInterface>> {
        iface::system_interfaces()
    }
}
