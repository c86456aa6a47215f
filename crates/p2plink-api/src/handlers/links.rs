//! /links handlers: link establishment and teardown.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{require_non_empty, ApiState, CommandResponse};

// ── /links (POST) ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct EstablishLinkRequest {
    /// P2P device address of the peer, e.g. `aa:bb:cc:dd:ee:ff`.
    pub device: String,
    /// 0–15; the configured default when absent.
    pub group_owner_intent: Option<u8>,
}

#[derive(Serialize)]
pub struct EstablishLinkResponse {
    /// Positive handle on success, otherwise absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<i32>,
    #[serde(flatten)]
    pub result: CommandResponse,
}

pub async fn handle_establish_link(
    State(state): State<ApiState>,
    Json(req): Json<EstablishLinkRequest>,
) -> Result<Json<EstablishLinkResponse>, (StatusCode, String)> {
    require_non_empty("device", &req.device)?;
    let intent = req
        .group_owner_intent
        .unwrap_or(state.coordinator.settings().group_owner_intent);
    if intent > 15 {
        return Err((
            StatusCode::BAD_REQUEST,
            "group_owner_intent must be 0-15".to_string(),
        ));
    }

    let code = state.coordinator.establish_link(&req.device, intent).await;
    let response = if code > 0 {
        EstablishLinkResponse {
            handle: Some(code),
            result: CommandResponse::from_code(0),
        }
    } else {
        EstablishLinkResponse {
            handle: None,
            result: CommandResponse::from_code(code),
        }
    };
    Ok(Json(response))
}

// ── /links/{handle} (DELETE) ──────────────────────────────────────────────────

pub async fn handle_release_link(
    State(state): State<ApiState>,
    Path(handle): Path<i32>,
) -> Json<CommandResponse> {
    let status = state.coordinator.release_link(handle).await;
    Json(CommandResponse::from_code(status))
}

// ── /links/{handle}/interface (GET) ───────────────────────────────────────────

#[derive(Serialize)]
pub struct InterfaceResponse {
    pub handle: i32,
    pub interface: Option<String>,
}

pub async fn handle_interface(
    State(state): State<ApiState>,
    Path(handle): Path<i32>,
) -> Json<InterfaceResponse> {
    let interface = state
        .coordinator
        .get_interface_name_from_handle(handle)
        .await;
    Json(InterfaceResponse { handle, interface })
}
