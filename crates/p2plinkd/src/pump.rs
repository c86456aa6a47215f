//! Forwards coordinator events to the log and the API's event history.

use tokio::sync::mpsc;

use p2plink_services::{EventLog, LinkEvent};

pub async fn event_pump(mut events: mpsc::UnboundedReceiver<LinkEvent>, log: EventLog) {
    while let Some(event) = events.recv().await {
        match &event {
            LinkEvent::FoundAdvertisedName {
                name,
                name_prefix,
                guid,
                device,
            } => tracing::info!(name, prefix = name_prefix, guid, device, "found advertised name"),
            LinkEvent::LostAdvertisedName { name, device, .. } => {
                tracing::info!(name, device, "lost advertised name")
            }
            LinkEvent::LinkEstablished {
                handle,
                interface_name,
            } => tracing::info!(handle, interface = interface_name, "link established"),
            LinkEvent::LinkError { handle, error } => {
                tracing::warn!(handle, error = format!("{:#x}", error.unsigned_abs()), "link error")
            }
            LinkEvent::LinkLost { handle } => tracing::info!(handle, "link lost"),
        }
        log.push(event).await;
    }
    tracing::debug!("coordinator event channel closed");
}
