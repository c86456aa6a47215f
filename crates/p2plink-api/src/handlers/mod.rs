//! HTTP API handlers. They drive the link coordinator and expose its state as JSON.

pub mod links;
pub mod names;
pub mod status;

use axum::http::StatusCode;
use serde::Serialize;

use p2plink_core::Status;
use p2plink_services::{EventLog, LinkCoordinator};

#[derive(Clone)]
pub struct ApiState {
    pub coordinator: LinkCoordinator,
    /// Recent daemon events, fed by the daemon's event pump.
    pub events: EventLog,
    /// Signals graceful daemon shutdown.
    pub shutdown_tx: tokio::sync::broadcast::Sender<()>,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Raw result of a coordinator command.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// 0 on success, otherwise a negated status code.
    pub status: i32,
    /// Symbolic name of a failure status, e.g. `ER_P2P_BUSY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

impl CommandResponse {
    pub fn from_code(status: i32) -> Self {
        let error = if status < 0 {
            Status::from_code(status).map(Status::name)
        } else {
            None
        };
        Self { status, error }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), (StatusCode, String)> {
    if value.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, format!("{} must not be empty", field)));
    }
    Ok(())
}

// Re-export handler functions for use in router setup.
pub use links::{handle_establish_link, handle_interface, handle_release_link};
pub use names::{handle_advertise, handle_cancel_advertise, handle_cancel_find, handle_find};
pub use status::{handle_events, handle_shutdown, handle_status};
