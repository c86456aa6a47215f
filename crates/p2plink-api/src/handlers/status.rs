//! /status, /events, /daemon/shutdown handlers.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use p2plink_services::{CoordinatorStatus, LoggedEvent};

use super::ApiState;

// ── /status ──────────────────────────────────────────────────────────────────

pub async fn handle_status(State(state): State<ApiState>) -> Json<CoordinatorStatus> {
    Json(state.coordinator.status().await)
}

// ── /events ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct EventsQuery {
    /// Only events with this sequence number or later.
    #[serde(default)]
    pub since: u64,
}

#[derive(Serialize)]
pub struct EventsResponse {
    pub events: Vec<LoggedEvent>,
    /// Pass as `since` to poll for newer events.
    pub next: u64,
}

pub async fn handle_events(
    State(state): State<ApiState>,
    Query(query): Query<EventsQuery>,
) -> Json<EventsResponse> {
    let events = state.events.since(query.since).await;
    let next = events.last().map_or(query.since, |e| e.seq + 1);
    Json(EventsResponse { events, next })
}

// ── /daemon/shutdown ──────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ShutdownResponse {
    pub message: String,
}

pub async fn handle_shutdown(State(state): State<ApiState>) -> Json<ShutdownResponse> {
    tracing::info!("shutdown requested via API");

    if state.shutdown_tx.send(()).is_err() {
        tracing::warn!("no shutdown listeners");
    }

    Json(ShutdownResponse {
        message: "Shutdown initiated".to_string(),
    })
}
