//! Configuration editing endpoints
//!
//! Each mutation returns the recomputed view so the front end re-renders
//! from one response.

use axum::{
    extract::{Path, State},
    Json,
};
use kiosk_common::models::{PipeError, PipeId};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::view::KioskView;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PipeCountRequest {
    pub count: u32,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    #[serde(default)]
    pub ingredient: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub selected: bool,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct RemarkRequest {
    #[serde(default)]
    pub remark: String,
}

fn parse_pipe(raw: &str) -> ApiResult<PipeId> {
    raw.parse().map_err(|e: PipeError| ApiError::BadRequest(e.to_string()))
}

/// GET /api/view
pub async fn get_view(State(state): State<AppState>) -> Json<KioskView> {
    Json(state.controller.view().await)
}

/// POST /api/config/load
///
/// Discards unsaved edits.
pub async fn load_configuration(State(state): State<AppState>) -> ApiResult<Json<KioskView>> {
    state.controller.load_configuration().await?;
    Ok(Json(state.controller.view().await))
}

/// POST /api/config/save
pub async fn save_configuration(State(state): State<AppState>) -> ApiResult<Json<KioskView>> {
    state.controller.save_configuration().await?;
    Ok(Json(state.controller.view().await))
}

/// PUT /api/pipes/count
pub async fn set_pipe_count(
    State(state): State<AppState>,
    Json(request): Json<PipeCountRequest>,
) -> ApiResult<Json<KioskView>> {
    state.controller.set_pipe_count(request.count).await?;
    Ok(Json(state.controller.view().await))
}

/// PUT /api/pipes/:pipe
pub async fn assign_pipe(
    State(state): State<AppState>,
    Path(pipe): Path<String>,
    Json(request): Json<AssignRequest>,
) -> ApiResult<Json<KioskView>> {
    let pipe = parse_pipe(&pipe)?;
    state.controller.assign_pipe(pipe, &request.ingredient).await?;
    Ok(Json(state.controller.view().await))
}

/// DELETE /api/pipes/:pipe
pub async fn clear_pipe(
    State(state): State<AppState>,
    Path(pipe): Path<String>,
) -> ApiResult<Json<KioskView>> {
    let pipe = parse_pipe(&pipe)?;
    state.controller.clear_pipe(pipe).await?;
    Ok(Json(state.controller.view().await))
}

/// PUT /api/selection/:name
pub async fn set_selected(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<SelectionRequest>,
) -> ApiResult<Json<KioskView>> {
    state.controller.set_selected(&name, request.selected).await?;
    Ok(Json(state.controller.view().await))
}

/// PUT /api/pipes/:pipe/note
pub async fn set_pipe_note(
    State(state): State<AppState>,
    Path(pipe): Path<String>,
    Json(request): Json<NoteRequest>,
) -> ApiResult<Json<KioskView>> {
    let pipe = parse_pipe(&pipe)?;
    state.controller.set_pipe_note(pipe, &request.note).await?;
    Ok(Json(state.controller.view().await))
}

/// PUT /api/remarks/:name
pub async fn set_configuration_remark(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<RemarkRequest>,
) -> Json<KioskView> {
    state
        .controller
        .set_configuration_remark(&name, &request.remark)
        .await;
    Json(state.controller.view().await)
}
