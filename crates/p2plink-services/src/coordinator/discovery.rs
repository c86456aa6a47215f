//! Name discovery and advertisement.

use std::collections::BTreeMap;

use p2plink_core::status::OK;
use p2plink_core::{decode_name, encode_name, FailureReason, Status};

use super::{BoxFuture, LinkCoordinator};
use crate::advertise::AdvertisedName;
use crate::directory::strip_wildcard;
use crate::events::LinkEvent;
use crate::platform::{
    DnsSdRequest, PeerDevice, ADVERTISE_TIMER, SERVICE_SUFFIX, TXT_GUID, TXT_TIMER,
};
use crate::registry::DiscoveredService;
use crate::state::FindState;

impl LinkCoordinator {
    // ── Daemon commands ───────────────────────────────────────────────────────

    /// Start looking for names beginning with `name_prefix` (a trailing `*`
    /// is ignored).
    pub async fn find_advertised_name(&self, name_prefix: &str) -> i32 {
        tracing::debug!(prefix = name_prefix, "find advertised name");
        if !self.is_enabled() {
            tracing::warn!(prefix = name_prefix, "find advertised name: P2P is off");
            return Status::P2pDisabled.as_return();
        }

        let encoded = encode_name(strip_wildcard(name_prefix));

        if !self.inner.directory.request_name(&encoded).await {
            tracing::debug!(prefix = name_prefix, "prefix already requested");
            let discovering = *self.inner.find.lock().await == FindState::Discovering;
            if !discovering {
                self.do_discover_services(true).await;
            }
            return OK;
        }

        // Discovery already covers every bus service; the new prefix only
        // needs to be on the list.
        if *self.inner.find.lock().await == FindState::Discovering {
            return OK;
        }

        let Some(platform) = self.platform() else {
            self.inner.directory.forget_name(&encoded).await;
            return Status::P2pDisabled.as_return();
        };
        let pending = platform.add_service_request(&DnsSdRequest::all());
        self.on_complete("add_service_request", pending, move |this, result| async move {
            match result {
                Ok(()) => this.do_discover_services(true).await,
                Err(_) => {
                    this.inner.directory.forget_name(&encoded).await;
                }
            }
        });
        OK
    }

    pub async fn cancel_find_advertised_name(&self, name_prefix: &str) -> i32 {
        tracing::debug!(prefix = name_prefix, "cancel find advertised name");
        if !self.is_enabled() {
            tracing::warn!(prefix = name_prefix, "cancel find advertised name: P2P is off");
            return Status::P2pDisabled.as_return();
        }

        let encoded = encode_name(strip_wildcard(name_prefix));
        self.remove_service_request(&encoded).await;
        self.inner.directory.forget_name(&encoded).await;

        if !self.inner.directory.has_requested_names().await {
            tracing::debug!("no prefixes left, clearing service requests");
            self.inner.directory.clear_requests().await;
            if let Some(platform) = self.platform() {
                self.log_completion("clear_service_requests", platform.clear_service_requests());
            }
            self.do_discover_services(false).await;
        }
        OK
    }

    pub async fn advertise_name(&self, name: &str, guid: &str) -> i32 {
        tracing::debug!(name, guid, "advertise name");
        if !self.is_enabled() {
            tracing::warn!(name, "advertise name: P2P is off");
            return Status::P2pDisabled.as_return();
        }
        let Some(platform) = self.platform() else {
            return Status::P2pDisabled.as_return();
        };

        let advertised = AdvertisedName::new(name, guid);
        let service = advertised.local_service();
        self.inner.advertised.insert(advertised).await;

        // Re-advertised inside the grace window: drop the zero-timer record
        // now. It carries the guid it was withdrawn with.
        if let Some(withdrawal) = self.inner.withdrawals.cancel(name) {
            self.log_completion(
                "remove_local_service",
                platform.remove_local_service(&withdrawal),
            );
        }

        self.log_completion("add_local_service", platform.add_local_service(&service));
        OK
    }

    /// Withdraw an advertisement. Peers are told through a zero timer that
    /// stays published for the advertise grace period.
    pub async fn cancel_advertise_name(&self, name: &str, guid: &str) -> i32 {
        tracing::debug!(name, guid, "cancel advertise name");
        if !self.is_enabled() {
            tracing::warn!(name, "cancel advertise name: P2P is off");
            return Status::P2pDisabled.as_return();
        }

        let Some(advertised) = self.inner.advertised.remove(name).await else {
            return OK;
        };
        let Some(platform) = self.platform() else {
            return OK;
        };

        let withdrawal = advertised.withdrawal();
        self.log_completion(
            "remove_local_service",
            platform.remove_local_service(&advertised.local_service()),
        );
        self.log_completion("add_local_service", platform.add_local_service(&withdrawal));

        let weak = self.downgrade();
        let key = name.to_string();
        let grace = self.inner.settings.advertise_grace;
        let record = withdrawal.clone();
        self.inner.withdrawals.schedule(name, record, grace, async move {
            let Some(this) = Self::upgrade(&weak) else {
                return;
            };
            if !this.is_enabled() {
                return;
            }
            if this.inner.advertised.contains(&key).await {
                tracing::debug!(name = %key, "name advertised again, keeping record");
                return;
            }
            if let Some(platform) = this.platform() {
                tracing::debug!(name = %key, "withdrawal grace elapsed");
                this.log_completion(
                    "remove_local_service",
                    platform.remove_local_service(&withdrawal),
                );
            }
        });
        OK
    }

    // ── Search and advertisement loops ────────────────────────────────────────

    /// Drop fine-grained requests and, if any prefixes are wanted, reissue
    /// the broad bus service request.
    pub(crate) fn start_service_search(&self, start: bool) -> BoxFuture<'_> {
        Box::pin(async move {
            self.inner.directory.clear_requests().await;
            if !self.inner.directory.has_requested_names().await {
                return;
            }
            let Some(platform) = self.platform() else {
                return;
            };
            self.log_completion("clear_service_requests", platform.clear_service_requests());
            self.log_completion(
                "add_service_request",
                platform.add_service_request(&DnsSdRequest::all()),
            );
            if start {
                self.do_discover_services(true).await;
            }
        })
    }

    /// Resume peer finding and republish every advertised name.
    pub(crate) async fn start_advertisements(&self) {
        let idle = *self.inner.find.lock().await == FindState::Idle;
        if idle {
            self.do_find_peers(true);
        }

        let names = self.inner.advertised.all().await;
        if names.is_empty() {
            return;
        }
        let Some(platform) = self.platform() else {
            return;
        };
        for advertised in names {
            self.log_completion(
                "add_local_service",
                platform.add_local_service(&advertised.local_service()),
            );
        }
    }

    pub(crate) async fn do_discover_services(&self, start: bool) {
        self.inner.periodic_discovery.cancel();
        if !start {
            self.inner.find.lock().await.stop();
            return;
        }

        let previous = self.inner.find.lock().await.start_discovery();
        if previous == FindState::FindPeers {
            self.inner.periodic_find.cancel();
        }

        let weak = self.downgrade();
        let interval = self.inner.settings.periodic_interval;
        self.inner.periodic_discovery.start(async move {
            loop {
                match Self::upgrade(&weak) {
                    Some(this) if this.is_enabled() => this.discover_services_once(),
                    _ => break,
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    fn discover_services_once(&self) {
        let Some(platform) = self.platform() else {
            return;
        };
        self.on_complete(
            "discover_services",
            platform.discover_services(),
            |this, result| async move {
                match result {
                    Ok(()) => {
                        this.inner.find.lock().await.start_discovery();
                    }
                    Err(FailureReason::NoServiceRequests) => {
                        this.start_service_search(false).await
                    }
                    Err(_) => {}
                }
            },
        );
    }

    pub(crate) fn do_find_peers(&self, start: bool) {
        self.inner.periodic_find.cancel();
        if !start {
            return;
        }

        let weak = self.downgrade();
        let interval = self.inner.settings.periodic_interval;
        self.inner.periodic_find.start(async move {
            loop {
                {
                    let Some(this) = Self::upgrade(&weak) else {
                        break;
                    };
                    if !this.is_enabled() {
                        break;
                    }
                    this.inner.find.lock().await.try_find_peers();
                    if let Some(platform) = this.platform() {
                        this.log_completion("discover_peers", platform.discover_peers());
                    }
                }
                tokio::time::sleep(interval).await;
            }
        });
    }

    // ── Service requests ──────────────────────────────────────────────────────

    /// Ask the OS for TXT records of one instance. Rolled back on failure.
    async fn add_service_request(&self, instance_name: &str) {
        if !self.inner.directory.track_request(instance_name).await {
            return;
        }
        let Some(platform) = self.platform() else {
            self.inner.directory.untrack_request(instance_name).await;
            return;
        };
        tracing::debug!(instance = instance_name, "adding service request");

        let name = instance_name.to_string();
        let pending = platform.add_service_request(&DnsSdRequest::instance(instance_name));
        self.on_complete("add_service_request", pending, move |this, result| async move {
            if result.is_err() {
                this.inner.directory.untrack_request(&name).await;
            }
        });
    }

    /// Drop the first outstanding request starting with `prefix`.
    async fn remove_service_request(&self, prefix: &str) {
        let Some(name) = self.inner.directory.take_request_with_prefix(prefix).await else {
            return;
        };
        tracing::debug!(instance = %name, "removing service request");
        if let Some(platform) = self.platform() {
            self.log_completion(
                "remove_service_request",
                platform.remove_service_request(&DnsSdRequest::instance(&name)),
            );
        }
    }

    // ── Platform notifications ────────────────────────────────────────────────

    pub(crate) async fn discovery_changed(&self, started: bool) {
        let mut find = self.inner.find.lock().await;
        if !self.is_enabled() {
            find.stop();
            return;
        }
        if started {
            tracing::debug!("discovery started");
        } else {
            tracing::debug!("discovery stopped");
            find.stop();
        }
    }

    pub(crate) async fn on_dns_sd_service_available(
        &self,
        instance_name: &str,
        registration_type: &str,
        device: &PeerDevice,
    ) {
        tracing::debug!(
            instance = instance_name,
            registration_type,
            device = %device.device_address,
            "DNS-SD service available"
        );
        if !self.inner.directory.has_requested_names().await {
            tracing::debug!("no prefixes requested, ignoring service");
            return;
        }
        if self.inner.directory.wants_instance(instance_name).await {
            self.add_service_request(instance_name).await;
        }
    }

    pub(crate) async fn on_dns_sd_txt_record_available(
        &self,
        full_domain_name: &str,
        txt: &BTreeMap<String, String>,
        device: &PeerDevice,
    ) {
        tracing::debug!(
            domain = full_domain_name,
            device = %device.device_address,
            "DNS-SD TXT record available"
        );

        let guid = txt.get(TXT_GUID).cloned().unwrap_or_default();
        let timer = match txt.get(TXT_TIMER) {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(t) => t,
                Err(_) => {
                    tracing::warn!(domain = full_domain_name, timer = %raw, "bad TIMER value");
                    return;
                }
            },
            None => ADVERTISE_TIMER,
        };

        let name = match full_domain_name.rfind(SERVICE_SUFFIX) {
            Some(idx) if idx > 0 => &full_domain_name[..idx],
            _ => full_domain_name,
        };
        let decoded = decode_name(name);

        let Some(prefix) = self.inner.directory.prefix_for(full_domain_name).await else {
            tracing::debug!(name = %decoded, "no outstanding request for name, ignoring");
            return;
        };

        let address = device.device_address.clone();
        self.inner.discovered.update(
            &address,
            DiscoveredService {
                name: decoded.clone(),
                prefix: prefix.clone(),
                guid: guid.clone(),
            },
            timer,
        );

        if timer != 0 {
            self.emit(LinkEvent::FoundAdvertisedName {
                name: decoded,
                name_prefix: prefix,
                guid,
                device: address,
            });
        } else {
            self.remove_service_request(name).await;
            self.emit(LinkEvent::LostAdvertisedName {
                name: decoded,
                name_prefix: prefix,
                guid,
                device: address,
            });
        }
    }

    pub(crate) async fn on_peers_available(&self, peers: Vec<PeerDevice>) {
        tracing::debug!(count = peers.len(), "peers available");
        let lost: Vec<String> = {
            let mut known = self.inner.peers.lock().await;
            let lost = known
                .as_ref()
                .map(|old| {
                    old.iter()
                        .filter(|o| !peers.iter().any(|n| n.device_address == o.device_address))
                        .map(|o| o.device_address.clone())
                        .collect()
                })
                .unwrap_or_default();
            *known = Some(peers);
            lost
        };

        for address in lost {
            self.device_lost(&address);
        }
    }

    /// Report every name a vanished device offered as lost.
    pub(crate) fn device_lost(&self, address: &str) {
        let services = self.inner.discovered.remove_device(address);
        tracing::debug!(device = address, lost = services.len(), "device lost");
        for service in services {
            self.emit(LinkEvent::LostAdvertisedName {
                name: service.name,
                name_prefix: service.prefix,
                guid: service.guid,
                device: address.to_string(),
            });
        }
    }
}
