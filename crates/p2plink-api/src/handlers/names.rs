//! /names handlers: name discovery and advertisement.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::{require_non_empty, ApiState, CommandResponse};

// ── /names/find, /names/find/cancel (POST) ────────────────────────────────────

#[derive(Deserialize)]
pub struct FindRequest {
    /// Well-known name prefix, optionally ending in `*`.
    pub prefix: String,
}

pub async fn handle_find(
    State(state): State<ApiState>,
    Json(req): Json<FindRequest>,
) -> Result<Json<CommandResponse>, (StatusCode, String)> {
    require_non_empty("prefix", &req.prefix)?;
    let status = state.coordinator.find_advertised_name(&req.prefix).await;
    Ok(Json(CommandResponse::from_code(status)))
}

pub async fn handle_cancel_find(
    State(state): State<ApiState>,
    Json(req): Json<FindRequest>,
) -> Result<Json<CommandResponse>, (StatusCode, String)> {
    require_non_empty("prefix", &req.prefix)?;
    let status = state
        .coordinator
        .cancel_find_advertised_name(&req.prefix)
        .await;
    Ok(Json(CommandResponse::from_code(status)))
}

// ── /names/advertise, /names/advertise/cancel (POST) ──────────────────────────

#[derive(Deserialize)]
pub struct AdvertiseRequest {
    pub name: String,
    /// GUID of the bus daemon owning the name.
    #[serde(default)]
    pub guid: String,
}

pub async fn handle_advertise(
    State(state): State<ApiState>,
    Json(req): Json<AdvertiseRequest>,
) -> Result<Json<CommandResponse>, (StatusCode, String)> {
    require_non_empty("name", &req.name)?;
    let status = state.coordinator.advertise_name(&req.name, &req.guid).await;
    if status == 0 {
        tracing::info!(name = %req.name, "advertising via API");
    }
    Ok(Json(CommandResponse::from_code(status)))
}

pub async fn handle_cancel_advertise(
    State(state): State<ApiState>,
    Json(req): Json<AdvertiseRequest>,
) -> Result<Json<CommandResponse>, (StatusCode, String)> {
    require_non_empty("name", &req.name)?;
    let status = state
        .coordinator
        .cancel_advertise_name(&req.name, &req.guid)
        .await;
    Ok(Json(CommandResponse::from_code(status)))
}
