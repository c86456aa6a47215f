use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
pub use std::time::Duration;

use tokio::sync::mpsc;

pub use p2plink_core::{FailureReason, Status};
pub use p2plink_services::{
    ConnectionInfo, CoordinatorSettings, DnsSdRequest, FindState, GroupInfo, LinkCoordinator,
    LinkEvent, LocalService, NetworkInterface, P2pPlatform, PeerConfig, PeerDevice, PeerState, PendingRequest,
    PlatformEvent,
};

// ── Constants ─────────────────────────────────────────────────────────────────

pub const PEER_A: &str = "aa:bb:cc:dd:ee:01";
pub const PEER_B: &str = "aa:bb:cc:dd:ee:02";
pub const THIS_DEVICE: &str = "02:00:00:00:00:99";
pub const GROUP_IFACE: &str = "p2p-wlan0-0";

// ── Mock platform ─────────────────────────────────────────────────────────────

/// Records every request; answers `Ok` unless a failure is scripted for
/// that request name.
#[derive(Default)]
pub struct MockPlatform {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<&'static str, FailureReason>>,
    background: Mutex<bool>,
}

impl MockPlatform {
    /// Make every later `request` fail with `reason`.
    pub fn fail(&self, request: &'static str, reason: FailureReason) {
        self.failures.lock().unwrap().insert(request, reason);
    }

    pub fn set_background(&self, background: bool) {
        *self.background.lock().unwrap() = background;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == call || c.starts_with(&format!("{call} ")))
            .count()
    }

    pub fn called(&self, call: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|c| c == call)
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, name: &'static str, detail: String) -> PendingRequest {
        let call = if detail.is_empty() {
            name.to_string()
        } else {
            format!("{name} {detail}")
        };
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().get(name) {
            Some(reason) => PendingRequest::ready(Err(*reason)),
            None => PendingRequest::ok(),
        }
    }
}

fn request_detail(request: &DnsSdRequest) -> String {
    request.instance_name.clone().unwrap_or_else(|| "*".to_string())
}

fn service_detail(service: &LocalService) -> String {
    let field = |key: &str| service.txt.get(key).map(String::as_str).unwrap_or("?");
    format!(
        "{} guid={} timer={}",
        service.instance_name,
        field("GUID"),
        field("TIMER")
    )
}

impl P2pPlatform for MockPlatform {
    fn discover_services(&self) -> PendingRequest {
        self.record("discover_services", String::new())
    }
    fn discover_peers(&self) -> PendingRequest {
        self.record("discover_peers", String::new())
    }
    fn add_service_request(&self, request: &DnsSdRequest) -> PendingRequest {
        self.record("add_service_request", request_detail(request))
    }
    fn remove_service_request(&self, request: &DnsSdRequest) -> PendingRequest {
        self.record("remove_service_request", request_detail(request))
    }
    fn clear_service_requests(&self) -> PendingRequest {
        self.record("clear_service_requests", String::new())
    }
    fn add_local_service(&self, service: &LocalService) -> PendingRequest {
        self.record("add_local_service", service_detail(service))
    }
    fn remove_local_service(&self, service: &LocalService) -> PendingRequest {
        self.record("remove_local_service", service_detail(service))
    }
    fn clear_local_services(&self) -> PendingRequest {
        self.record("clear_local_services", String::new())
    }
    fn connect(&self, config: &PeerConfig) -> PendingRequest {
        self.record("connect", config.device_address.clone())
    }
    fn cancel_connect(&self) -> PendingRequest {
        self.record("cancel_connect", String::new())
    }
    fn remove_group(&self) -> PendingRequest {
        self.record("remove_group", String::new())
    }
    fn request_connection_info(&self) {
        self.record("request_connection_info", String::new());
    }
    fn request_group_info(&self) {
        self.record("request_group_info", String::new());
    }
    fn request_peers(&self) {
        self.record("request_peers", String::new());
    }
    fn unregister(&self) {
        self.record("unregister", String::new());
    }
    fn is_foreground(&self) -> bool {
        !*self.background.lock().unwrap()
    }
    fn network_interfaces(&self) -> std::io::Result<Vec<NetworkInterface>> {
        Ok(vec![
            NetworkInterface {
                name: "eth0".to_string(),
                hardware_address: Some("52:54:00:12:34:56".to_string()),
            },
            NetworkInterface {
                name: GROUP_IFACE.to_string(),
                hardware_address: Some(THIS_DEVICE.to_string()),
            },
        ])
    }
}

// ── Harness ───────────────────────────────────────────────────────────────────

pub struct Harness {
    pub coord: LinkCoordinator,
    pub platform: Arc<MockPlatform>,
    pub events: mpsc::UnboundedReceiver<LinkEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(CoordinatorSettings::default())
    }

    pub fn with_settings(settings: CoordinatorSettings) -> Self {
        let platform = Arc::new(MockPlatform::default());
        let (coord, events) = LinkCoordinator::new(platform.clone(), settings);
        Self {
            coord,
            platform,
            events,
        }
    }

    /// Started coordinator that knows its own device address.
    pub async fn started() -> Self {
        let h = Self::new();
        h.coord
            .handle_event(PlatformEvent::ThisDeviceChanged {
                device: PeerDevice::new(THIS_DEVICE),
            })
            .await;
        h.coord.startup().await;
        settle().await;
        h
    }

    pub async fn inject(&self, event: PlatformEvent) {
        self.coord.handle_event(event).await;
        settle().await;
    }

    /// Every event emitted so far.
    pub fn drain(&mut self) -> Vec<LinkEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = self.events.try_recv() {
            out.push(ev);
        }
        out
    }

    /// Establish a link to `device` and walk it to Connected with an
    /// established group owned by `device`. Returns the handle.
    pub async fn connect(&mut self, device: &str) -> i32 {
        let handle = self.coord.establish_link(device, 7).await;
        assert!(handle > 0, "establish_link returned {handle}");
        settle().await;
        self.inject(connection_info(true)).await;
        self.inject(group_info(device)).await;
        assert_eq!(self.coord.peer_state().await, PeerState::Connected);
        handle
    }
}

/// Let spawned completions run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

// ── Event builders ────────────────────────────────────────────────────────────

pub fn connection_info(formed: bool) -> PlatformEvent {
    let info = if formed {
        ConnectionInfo::formed(false, None)
    } else {
        ConnectionInfo::not_formed()
    };
    PlatformEvent::ConnectionInfoAvailable { info }
}

pub fn group_info(owner: &str) -> PlatformEvent {
    PlatformEvent::GroupInfoAvailable {
        group: GroupInfo {
            interface: GROUP_IFACE.to_string(),
            owner: Some(PeerDevice::new(owner)),
        },
    }
}

pub fn service_available(instance: &str, device: &str) -> PlatformEvent {
    PlatformEvent::DnsSdServiceAvailable {
        instance_name: instance.to_string(),
        registration_type: "_alljoyn._tcp.local.".to_string(),
        device: PeerDevice::new(device),
    }
}

/// TXT record for `instance`. `timer: None` leaves the key out.
pub fn txt_record(instance: &str, guid: &str, timer: Option<&str>, device: &str) -> PlatformEvent {
    let mut txt = BTreeMap::new();
    txt.insert("GUID".to_string(), guid.to_string());
    if let Some(timer) = timer {
        txt.insert("TIMER".to_string(), timer.to_string());
    }
    PlatformEvent::DnsSdTxtRecordAvailable {
        full_domain_name: format!("{instance}._alljoyn._tcp.local."),
        txt,
        device: PeerDevice::new(device),
    }
}

pub fn peers(addresses: &[&str]) -> PlatformEvent {
    PlatformEvent::PeersAvailable {
        peers: addresses.iter().map(|a| PeerDevice::new(a)).collect(),
    }
}
