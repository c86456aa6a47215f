//! Link establishment and teardown.

use p2plink_core::handle::NO_HANDLE;
use p2plink_core::status::OK;
use p2plink_core::{FailureReason, Status};

use super::LinkCoordinator;
use crate::events::LinkEvent;
use crate::platform::{ConnectionInfo, GroupInfo, PeerConfig};
use crate::state::{FindState, LinkState, PeerState};

/// Negated status for an OS failure reason.
fn map_failure(reason: FailureReason) -> i32 {
    Status::from(reason).as_return()
}

impl LinkCoordinator {
    // ── Daemon commands ───────────────────────────────────────────────────────

    /// Connect to `device_address`. Returns the device's link handle, or a
    /// negated status. Completion is reported through [`LinkEvent`]s.
    pub async fn establish_link(&self, device_address: &str, group_owner_intent: u8) -> i32 {
        tracing::info!(device = device_address, group_owner_intent, "establish link");
        if !self.is_enabled() {
            tracing::warn!(device = device_address, "establish link: P2P is off");
            return Status::P2pDisabled.as_return();
        }
        if device_address.is_empty() {
            tracing::warn!("establish link: empty device address");
            return Status::InvalidAddress.as_return();
        }

        let mut link = self.inner.link.lock().await;
        if link.peer() != PeerState::Disconnected && link.initiator {
            tracing::warn!(state = ?link.peer(), "already connected or in progress");
            return Status::P2pBusy.as_return();
        }

        self.inner.connection_timeout.cancel();
        let previous_initiator = std::mem::replace(&mut link.initiator, true);
        let previous_config = link.config.replace(PeerConfig::push_button(
            device_address,
            group_owner_intent,
        ));
        let handle = self.inner.handles.handle_for(device_address);

        match link.peer() {
            PeerState::Connected => match link.group_owner.clone() {
                Some(owner) if owner.device_address == device_address => {
                    tracing::debug!(device = device_address, "link already exists");
                    if let Some(platform) = self.platform() {
                        platform.request_group_info();
                    }
                }
                Some(owner) => {
                    if self.is_foreground() {
                        tracing::info!(
                            current = %owner.device_address,
                            device = device_address,
                            "replacing existing link"
                        );
                        link.pending_connect = true;
                        self.release(&mut link).await;
                    } else {
                        tracing::warn!(
                            current = %owner.device_address,
                            "cannot override existing link from background"
                        );
                        link.config = None;
                        link.initiator = false;
                        return Status::P2p.as_return();
                    }
                }
                None => {
                    tracing::warn!("connected but group owner unknown");
                    link.config = previous_config;
                    link.initiator = previous_initiator;
                    return Status::P2pBusy.as_return();
                }
            },
            PeerState::Disconnecting => {
                tracing::debug!(device = device_address, "queueing connect behind release");
                link.pending_connect = true;
            }
            PeerState::Disconnected => self.initiate_connect(&mut link),
            PeerState::Initiated | PeerState::Connecting => {
                link.config = previous_config;
                link.initiator = previous_initiator;
                return Status::P2pBusy.as_return();
            }
        }

        tracing::debug!(handle, "establish link returning");
        handle
    }

    /// Tear down the current link. Always returns `0` unless P2P is off;
    /// the outcome arrives as [`LinkEvent::LinkLost`] or [`LinkEvent::LinkError`].
    pub async fn release_link(&self, handle: i32) -> i32 {
        tracing::info!(handle, "release link");
        if !self.is_enabled() {
            tracing::warn!(handle, "release link: P2P is off");
            return Status::P2pDisabled.as_return();
        }
        let mut link = self.inner.link.lock().await;
        self.release(&mut link).await;
        OK
    }

    /// Name of the network interface carrying P2P traffic.
    ///
    /// Handle `0` asks for the P2P interface regardless of link. A handle
    /// this coordinator never issued yields `None`.
    pub async fn get_interface_name_from_handle(&self, handle: i32) -> Option<String> {
        if handle != NO_HANDLE && self.inner.handles.address_of(handle).is_none() {
            tracing::debug!(handle, "unknown handle");
            return None;
        }
        let Some(this_device) = self.inner.this_device.lock().await.clone() else {
            tracing::debug!("own device address not known yet");
            return None;
        };
        let platform = self.platform()?;

        match platform.network_interfaces() {
            Ok(interfaces) => {
                let name = interfaces
                    .into_iter()
                    .find(|i| i.has_address(&this_device.device_address))
                    .map(|i| i.name);
                tracing::debug!(handle, interface = ?name, "interface for handle");
                name
            }
            Err(e) => {
                tracing::error!(error = %e, "could not enumerate network interfaces");
                None
            }
        }
    }

    // ── Connection steps ──────────────────────────────────────────────────────

    /// Issue the connect for the stored config. Must be Disconnected.
    pub(crate) fn initiate_connect(&self, link: &mut LinkState) {
        link.pending_connect = false;
        let Some(config) = link.config.clone() else {
            return;
        };
        let Some(platform) = self.platform() else {
            return;
        };
        if let Err(e) = link.transition(PeerState::Initiated) {
            tracing::warn!(error = %e, "cannot initiate connection");
            return;
        }
        tracing::info!(device = %config.device_address, "initiating connection");

        let handle = self.inner.handles.handle_for(&config.device_address);
        let pending = platform.connect(&config);
        self.on_complete("connect", pending, move |this, result| async move {
            match result {
                Ok(()) => this.on_connect_acknowledged().await,
                Err(reason) => this.on_connect_failed(handle, reason).await,
            }
        });
    }

    async fn on_connect_acknowledged(&self) {
        let mut link = self.inner.link.lock().await;
        if link.peer() == PeerState::Initiated {
            if let Err(e) = link.transition(PeerState::Connecting) {
                tracing::warn!(error = %e, "connect acknowledged");
            }
        }
        if link.peer() != PeerState::Connecting {
            tracing::debug!(state = ?link.peer(), "connect acknowledged after state change");
            return;
        }

        tracing::debug!("suspending discovery while connecting");
        self.inner.find.lock().await.stop();
        self.inner.periodic_find.cancel();
        self.inner.periodic_discovery.cancel();
        drop(link);
        self.arm_connection_timeout();
    }

    async fn on_connect_failed(&self, handle: i32, reason: FailureReason) {
        let mut link = self.inner.link.lock().await;
        if !matches!(link.peer(), PeerState::Initiated | PeerState::Connecting) {
            tracing::debug!(state = ?link.peer(), %reason, "connect failed after state change");
            return;
        }
        tracing::error!(handle, %reason, "connect failed");
        if let Err(e) = link.transition(PeerState::Disconnected) {
            tracing::warn!(error = %e, "connect failed");
        }
        link.initiator = false;
        link.config = None;
        drop(link);
        self.emit(LinkEvent::LinkError {
            handle,
            error: map_failure(reason),
        });
    }

    /// On expiry ask the OS where the connection stands; a group that never
    /// formed is then cancelled by the connection-info handler.
    fn arm_connection_timeout(&self) {
        let weak = self.downgrade();
        self.inner
            .connection_timeout
            .arm(self.inner.settings.connection_timeout, async move {
                let Some(this) = Self::upgrade(&weak) else {
                    return;
                };
                if !this.is_enabled() {
                    return;
                }
                tracing::info!("connection initiation timed out, requesting connection info");
                if let Some(platform) = this.platform() {
                    platform.request_connection_info();
                }
            });
    }

    /// Handle of the device the current config points at, if any.
    fn config_handle(&self, link: &LinkState) -> i32 {
        link.config_address()
            .map(|a| self.inner.handles.handle_for(a))
            .unwrap_or(NO_HANDLE)
    }

    async fn restart_search_if_idle(&self) {
        let idle = *self.inner.find.lock().await == FindState::Idle;
        if idle {
            self.start_service_search(true).await;
            self.start_advertisements().await;
        }
    }

    pub(crate) async fn release(&self, link: &mut LinkState) {
        let Some(platform) = self.platform() else {
            return;
        };
        match link.peer() {
            PeerState::Initiated | PeerState::Connecting => {
                self.inner.connection_timeout.cancel();
                self.restart_search_if_idle().await;

                if let Err(e) = link.transition(PeerState::Disconnecting) {
                    tracing::warn!(error = %e, "release");
                    return;
                }
                let pending = platform.cancel_connect();
                self.on_complete("cancel_connect", pending, |this, _result| async move {
                    let mut link = this.inner.link.lock().await;
                    if link.peer() != PeerState::Disconnecting {
                        return;
                    }
                    if let Err(e) = link.transition(PeerState::Disconnected) {
                        tracing::warn!(error = %e, "cancel connect");
                    }
                    if link.pending_connect {
                        this.initiate_connect(&mut link);
                    } else {
                        link.config = None;
                        link.initiator = false;
                    }
                });
            }
            PeerState::Connected => {
                // LinkLost follows from the connection-changed notification.
                if let Err(e) = link.transition(PeerState::Disconnecting) {
                    tracing::warn!(error = %e, "release");
                    return;
                }
                let pending = platform.remove_group();
                self.on_complete("remove_group", pending, |this, result| async move {
                    let Err(reason) = result else {
                        return;
                    };
                    let mut link = this.inner.link.lock().await;
                    if link.peer() != PeerState::Disconnecting {
                        return;
                    }
                    let handle = this.config_handle(&link);
                    if let Err(e) = link.transition(PeerState::Disconnected) {
                        tracing::warn!(error = %e, "remove group");
                    }
                    link.config = None;
                    link.initiator = false;
                    link.pending_connect = false;
                    drop(link);
                    if handle != NO_HANDLE {
                        this.emit(LinkEvent::LinkError {
                            handle,
                            error: map_failure(reason),
                        });
                    }
                });
            }
            PeerState::Disconnected | PeerState::Disconnecting => {
                tracing::warn!(state = ?link.peer(), "no link to release");
            }
        }
    }

    // ── Platform notifications ────────────────────────────────────────────────

    pub(crate) async fn on_connection_info_available(&self, info: ConnectionInfo) {
        tracing::debug!(
            group_formed = info.group_formed,
            is_group_owner = info.is_group_owner,
            group_owner_address = ?info.group_owner_address,
            "connection info available"
        );
        self.inner.connection_timeout.cancel();
        let formed = info.group_formed;

        let mut link = self.inner.link.lock().await;
        if !formed {
            link.group_owner = None;
        }
        tracing::debug!(state = ?link.peer(), "peer state");

        match link.peer() {
            PeerState::Initiated | PeerState::Connecting => {
                if formed {
                    if let Err(e) = link.enter_connected(info) {
                        tracing::warn!(error = %e, "group formed");
                    }
                    if let Some(platform) = self.platform() {
                        platform.request_group_info();
                    }
                } else {
                    let handle = self.config_handle(&link);
                    tracing::info!(handle, "no group formed, cancelling connection");
                    if let Some(platform) = self.platform() {
                        self.log_completion("cancel_connect", platform.cancel_connect());
                    }
                    if let Err(e) = link.transition(PeerState::Disconnected) {
                        tracing::warn!(error = %e, "connection timeout");
                    }
                    link.config = None;
                    link.initiator = false;
                    if handle != NO_HANDLE {
                        self.emit(LinkEvent::LinkError {
                            handle,
                            error: Status::P2pTimeout.as_return(),
                        });
                    }
                }
            }

            PeerState::Connected => {
                if !formed {
                    let handle = self.config_handle(&link);
                    if let Err(e) = link.transition(PeerState::Disconnected) {
                        tracing::warn!(error = %e, "group removed");
                    }
                    link.config = None;
                    link.initiator = false;
                    self.emit(LinkEvent::LinkLost { handle });
                }
            }

            PeerState::Disconnecting | PeerState::Disconnected => {
                if formed {
                    tracing::info!("incoming connection");
                    if let Err(e) = link.enter_connected(info) {
                        tracing::warn!(error = %e, "incoming connection");
                    }
                    if let Some(platform) = self.platform() {
                        platform.request_group_info();
                    }
                    link.initiator = false;

                    if !link.pending_connect {
                        self.restart_search_if_idle().await;
                    } else if link.config.is_some() {
                        // Another device connected while our queued connect
                        // waited for the release.
                        tracing::warn!("queued connect superseded by incoming connection");
                        link.config = None;
                    }
                    link.pending_connect = false;
                } else {
                    let mut handle = NO_HANDLE;
                    if !link.pending_connect {
                        handle = self.config_handle(&link);
                        link.config = None;
                    }
                    if let Err(e) = link.transition(PeerState::Disconnected) {
                        tracing::warn!(error = %e, "link down");
                    }
                    if handle != NO_HANDLE {
                        self.emit(LinkEvent::LinkLost { handle });
                    }
                    if link.pending_connect {
                        self.initiate_connect(&mut link);
                    }
                }
            }
        }
        drop(link);

        if !formed {
            tracing::debug!("no group: restarting suspended discovery and advertisement");
            self.restart_search_if_idle().await;
        }
    }

    pub(crate) async fn on_group_info_available(&self, group: GroupInfo) {
        let mut link = self.inner.link.lock().await;
        if link.peer() != PeerState::Connected {
            tracing::debug!(state = ?link.peer(), "group info ignored");
            return;
        }
        if let Some(owner) = &group.owner {
            tracing::debug!(owner = %owner.device_address, "group owner");
        }
        link.group_owner = group.owner;
        link.interface = Some(group.interface.clone());
        let handle = self.config_handle(&link);
        drop(link);

        tracing::info!(handle, interface = %group.interface, "link established");
        self.emit(LinkEvent::LinkEstablished {
            handle,
            interface_name: group.interface,
        });
    }
}
