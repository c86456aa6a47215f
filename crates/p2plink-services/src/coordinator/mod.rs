//! Link coordinator: the single owner of P2P state.
//!
//! Commands from the bus daemon (find, advertise, establish, release) and
//! notifications from the OS platform both land here. Each piece of state
//! sits behind its own lock; when both are needed the link lock is taken
//! before the find lock.

mod discovery;
mod link;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, Mutex};

use p2plink_core::config::LinkConfig;
use p2plink_core::{decode_name, FailureReason};

use crate::advertise::AdvertisedNames;
use crate::directory::ServiceDirectory;
use crate::events::LinkEvent;
use crate::handle::HandleTable;
use crate::platform::{LocalService, P2pPlatform, PeerDevice, PendingRequest, PlatformEvent};
use crate::registry::DiscoveredServices;
use crate::state::{FindState, LinkState, PeerState};
use crate::timer::{DelayedTasks, TimerSlot};

/// Future returned by coordinator steps that can re-enter themselves
/// through a spawned completion.
pub(crate) type BoxFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub enabled: bool,
    pub standalone: bool,
    pub group_owner_intent: u8,
    pub connection_timeout: Duration,
    pub periodic_interval: Duration,
    pub advertise_grace: Duration,
}

impl CoordinatorSettings {
    pub fn from_config(config: &LinkConfig) -> Self {
        Self {
            enabled: config.enabled,
            standalone: config.standalone,
            group_owner_intent: config.group_owner_intent,
            connection_timeout: config.connection_timeout(),
            periodic_interval: config.periodic_interval(),
            advertise_grace: config.advertise_grace(),
        }
    }
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self::from_config(&LinkConfig::default())
    }
}

/// Snapshot of coordinator state for the control API.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorStatus {
    pub enabled: bool,
    pub started: bool,
    pub peer_state: PeerState,
    pub find_state: FindState,
    pub initiator: bool,
    pub pending_connect: bool,
    pub target_device: Option<String>,
    pub target_handle: Option<i32>,
    pub group_owner: Option<String>,
    pub interface: Option<String>,
    pub this_device: Option<String>,
    /// Decoded prefixes being searched for.
    pub requested_names: Vec<String>,
    pub service_requests: usize,
    pub advertised_names: Vec<String>,
    pub discovered_devices: usize,
    pub discovered_services: usize,
    pub known_peers: usize,
    pub pending_withdrawals: usize,
}

struct Inner {
    settings: CoordinatorSettings,
    platform: RwLock<Option<Arc<dyn P2pPlatform>>>,
    events: mpsc::UnboundedSender<LinkEvent>,

    enabled: AtomicBool,
    started: AtomicBool,
    shut_down: AtomicBool,

    this_device: Mutex<Option<PeerDevice>>,
    link: Mutex<LinkState>,
    find: Mutex<FindState>,
    /// Last peer list reported by the OS.
    peers: Mutex<Option<Vec<PeerDevice>>>,

    directory: ServiceDirectory,
    discovered: DiscoveredServices,
    advertised: AdvertisedNames,
    handles: HandleTable,

    periodic_discovery: TimerSlot,
    periodic_find: TimerSlot,
    connection_timeout: TimerSlot,
    /// Delayed removal of withdrawn advertisements, keyed by name and
    /// carrying the zero-timer record that was published.
    withdrawals: DelayedTasks<LocalService>,
}

/// Cloneable handle to the link manager.
#[derive(Clone)]
pub struct LinkCoordinator {
    inner: Arc<Inner>,
}

impl LinkCoordinator {
    /// Build a coordinator around `platform`. Daemon events arrive on the
    /// returned receiver.
    pub fn new(
        platform: Arc<dyn P2pPlatform>,
        settings: CoordinatorSettings,
    ) -> (Self, mpsc::UnboundedReceiver<LinkEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let inner = Inner {
            enabled: AtomicBool::new(settings.enabled),
            settings,
            platform: RwLock::new(Some(platform)),
            events,
            started: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
            this_device: Mutex::new(None),
            link: Mutex::new(LinkState::default()),
            find: Mutex::new(FindState::Idle),
            peers: Mutex::new(None),
            directory: ServiceDirectory::new(),
            discovered: DiscoveredServices::new(),
            advertised: AdvertisedNames::new(),
            handles: HandleTable::new(),
            periodic_discovery: TimerSlot::new("periodic_discovery"),
            periodic_find: TimerSlot::new("periodic_find"),
            connection_timeout: TimerSlot::new("connection_timeout"),
            withdrawals: DelayedTasks::new(),
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            rx,
        )
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.inner.settings
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    pub async fn peer_state(&self) -> PeerState {
        self.inner.link.lock().await.peer()
    }

    pub async fn find_state(&self) -> FindState {
        *self.inner.find.lock().await
    }

    pub fn handles(&self) -> &HandleTable {
        &self.inner.handles
    }

    pub fn discovered(&self) -> &DiscoveredServices {
        &self.inner.discovered
    }

    pub fn periodic_discovery_armed(&self) -> bool {
        self.inner.periodic_discovery.is_armed()
    }

    pub fn periodic_find_armed(&self) -> bool {
        self.inner.periodic_find.is_armed()
    }

    pub fn connection_timeout_armed(&self) -> bool {
        self.inner.connection_timeout.is_armed()
    }

    pub async fn status(&self) -> CoordinatorStatus {
        let (peer_state, initiator, pending_connect, target_device, group_owner, interface) = {
            let link = self.inner.link.lock().await;
            (
                link.peer(),
                link.initiator,
                link.pending_connect,
                link.config_address().map(str::to_string),
                link.group_owner.as_ref().map(|d| d.device_address.clone()),
                link.interface.clone(),
            )
        };
        let find_state = *self.inner.find.lock().await;
        let target_handle = target_device
            .as_deref()
            .and_then(|a| self.inner.handles.lookup(a));
        let this_device = self
            .inner
            .this_device
            .lock()
            .await
            .as_ref()
            .map(|d| d.device_address.clone());
        let requested_names = self
            .inner
            .directory
            .requested_names()
            .await
            .iter()
            .map(|n| decode_name(n))
            .collect();
        let (service_requests, _) = self.inner.directory.counts().await;
        let mut advertised_names: Vec<String> = self
            .inner
            .advertised
            .all()
            .await
            .into_iter()
            .map(|a| a.name)
            .collect();
        advertised_names.sort();
        let known_peers = self
            .inner
            .peers
            .lock()
            .await
            .as_ref()
            .map_or(0, |p| p.len());

        CoordinatorStatus {
            enabled: self.is_enabled(),
            started: self.inner.started.load(Ordering::SeqCst),
            peer_state,
            find_state,
            initiator,
            pending_connect,
            target_device,
            target_handle,
            group_owner,
            interface,
            this_device,
            requested_names,
            service_requests,
            advertised_names,
            discovered_devices: self.inner.discovered.device_count(),
            discovered_services: self.inner.discovered.service_count(),
            known_peers,
            pending_withdrawals: self.inner.withdrawals.pending(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Start advertising and, if names are already requested, searching.
    pub async fn startup(&self) {
        if self.is_shut_down() {
            tracing::warn!("startup after shutdown ignored");
            return;
        }
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(
            standalone = self.inner.settings.standalone,
            enabled = self.is_enabled(),
            "link coordinator starting"
        );
        if self.is_enabled() {
            self.start_service_search(true).await;
            self.start_advertisements().await;
        }
    }

    /// Wi-Fi Direct switched on or off.
    pub async fn set_enabled(&self, enabled: bool) {
        if self.is_shut_down() {
            return;
        }
        self.inner.enabled.store(enabled, Ordering::SeqCst);

        {
            let mut link = self.inner.link.lock().await;
            link.initiator = false;
            link.pending_connect = false;
            link.config = None;
            if !enabled {
                if let Err(e) = link.transition(PeerState::Disconnected) {
                    tracing::warn!(error = %e, "disable");
                }
            }
        }

        if enabled {
            tracing::info!("P2P enabled");
            self.start_service_search(true).await;
            self.start_advertisements().await;
        } else {
            tracing::info!("P2P disabled");
            self.inner.find.lock().await.stop();
            self.inner.connection_timeout.cancel();
            self.do_find_peers(false);
            self.do_discover_services(false).await;
        }
    }

    /// Stop all timers, withdraw local and remote service state and release
    /// the platform. Idempotent; safe without [`startup`](Self::startup).
    pub async fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("link coordinator shutting down");
        self.inner.enabled.store(false, Ordering::SeqCst);

        self.inner.periodic_discovery.cancel();
        self.inner.periodic_find.cancel();
        self.inner.connection_timeout.cancel();
        self.inner.withdrawals.cancel_all();

        let platform = self
            .inner
            .platform
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(platform) = platform {
            platform.unregister();
            self.log_completion("clear_local_services", platform.clear_local_services());
            self.log_completion("clear_service_requests", platform.clear_service_requests());
        }

        self.inner.directory.clear_all().await;
        self.inner.advertised.clear().await;
        self.inner.discovered.clear();
        self.inner.handles.clear();
        self.inner.find.lock().await.stop();
    }

    /// Process platform notifications until the channel closes or shutdown
    /// is signalled, then shut down.
    pub async fn run(
        &self,
        mut platform_events: mpsc::UnboundedReceiver<PlatformEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                event = platform_events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        tracing::debug!("platform event channel closed");
                        break;
                    }
                },
                _ = shutdown.recv() => break,
            }
        }
        self.shutdown().await;
    }

    pub async fn handle_event(&self, event: PlatformEvent) {
        if self.is_shut_down() {
            tracing::debug!(?event, "event after shutdown ignored");
            return;
        }
        match event {
            PlatformEvent::StateChanged { enabled } => self.set_enabled(enabled).await,
            PlatformEvent::ConnectionChanged => {
                if let Some(platform) = self.platform() {
                    platform.request_connection_info();
                }
            }
            PlatformEvent::ThisDeviceChanged { device } => {
                tracing::debug!(address = %device.device_address, "this device changed");
                *self.inner.this_device.lock().await = Some(device);
            }
            PlatformEvent::DiscoveryChanged { started } => self.discovery_changed(started).await,
            PlatformEvent::PeersChanged => {
                if let Some(platform) = self.platform() {
                    platform.request_peers();
                }
            }
            PlatformEvent::PeersAvailable { peers } => self.on_peers_available(peers).await,
            PlatformEvent::ConnectionInfoAvailable { info } => {
                self.on_connection_info_available(info).await
            }
            PlatformEvent::GroupInfoAvailable { group } => {
                self.on_group_info_available(group).await
            }
            PlatformEvent::DnsSdServiceAvailable {
                instance_name,
                registration_type,
                device,
            } => {
                self.on_dns_sd_service_available(&instance_name, &registration_type, &device)
                    .await
            }
            PlatformEvent::DnsSdTxtRecordAvailable {
                full_domain_name,
                txt,
                device,
            } => {
                self.on_dns_sd_txt_record_available(&full_domain_name, &txt, &device)
                    .await
            }
        }
    }

    // ── Shared helpers ────────────────────────────────────────────────────────

    fn platform(&self) -> Option<Arc<dyn P2pPlatform>> {
        self.inner
            .platform
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn downgrade(&self) -> Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn emit(&self, event: LinkEvent) {
        tracing::debug!(kind = event.kind(), ?event, "daemon event");
        if self.inner.events.send(event).is_err() {
            tracing::debug!("daemon event receiver dropped");
        }
    }

    /// A preinstalled daemon is always in the foreground; a standalone one
    /// asks the platform.
    fn is_foreground(&self) -> bool {
        if !self.inner.settings.standalone {
            return true;
        }
        self.platform().is_some_and(|p| p.is_foreground())
    }

    /// Await `pending` on a separate task, then run `then` with the result.
    fn on_complete<F, Fut>(&self, request: &'static str, pending: PendingRequest, then: F)
    where
        F: FnOnce(LinkCoordinator, Result<(), FailureReason>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let this = self.clone();
        tokio::spawn(async move {
            let result = pending.await;
            match &result {
                Ok(()) => tracing::debug!(request, "platform request succeeded"),
                Err(reason) => tracing::warn!(request, %reason, "platform request failed"),
            }
            then(this, result).await;
        });
    }

    /// Fire-and-forget: only the outcome is logged.
    fn log_completion(&self, request: &'static str, pending: PendingRequest) {
        tokio::spawn(async move {
            match pending.await {
                Ok(()) => tracing::debug!(request, "platform request succeeded"),
                Err(reason) => tracing::warn!(request, %reason, "platform request failed"),
            }
        });
    }
}
