//! Host session endpoints
//!
//! Thin relays to the store server: window focus hand-off, machine shutdown
//! and software updates.

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;

use crate::error::ApiResult;
use crate::store::UpdateStatus;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Ack {
    pub status: &'static str,
}

const OK: Ack = Ack { status: "ok" };

/// POST /api/system/focus-in
pub async fn focus_in(State(state): State<AppState>) -> ApiResult<Json<Ack>> {
    state.controller.store().focus_in().await?;
    Ok(Json(OK))
}

/// POST /api/system/focus-out
pub async fn focus_out(State(state): State<AppState>) -> ApiResult<Json<Ack>> {
    state.controller.store().focus_out().await?;
    Ok(Json(OK))
}

/// POST /api/system/shutdown
pub async fn shutdown(State(state): State<AppState>) -> ApiResult<Json<Ack>> {
    info!("Machine shutdown requested");
    state.controller.store().shutdown().await?;
    Ok(Json(OK))
}

/// GET /api/system/updates
pub async fn check_updates(State(state): State<AppState>) -> ApiResult<Json<UpdateStatus>> {
    let status = state.controller.store().check_updates().await?;
    Ok(Json(status))
}

/// POST /api/system/updates/pull
pub async fn pull_updates(State(state): State<AppState>) -> ApiResult<Json<UpdateStatus>> {
    info!("Pulling software updates");
    let status = state.controller.store().pull_updates().await?;
    Ok(Json(status))
}
