//! Catalog endpoints
//!
//! Reads come from the controller cache; writes are validated, sent to the
//! store and then reflected in the cache.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use kiosk_common::models::{Cocktail, Ingredient};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::view::KioskView;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RemarkRequest {
    #[serde(default)]
    pub remark: String,
}

/// GET /api/catalog/ingredients
pub async fn list_ingredients(State(state): State<AppState>) -> Json<Vec<Ingredient>> {
    Json(state.controller.ingredients().await)
}

/// POST /api/catalog/ingredients
pub async fn add_ingredient(
    State(state): State<AppState>,
    Json(ingredient): Json<Ingredient>,
) -> ApiResult<(StatusCode, Json<Ingredient>)> {
    let created = state.controller.add_ingredient(ingredient).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/catalog/ingredients/:name/remark
pub async fn update_ingredient_remark(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<RemarkRequest>,
) -> ApiResult<Json<Ingredient>> {
    let updated = state
        .controller
        .update_ingredient_remark(&name, &request.remark)
        .await?;
    Ok(Json(updated))
}

/// POST /api/catalog/remarks
///
/// Copies the edited configuration's remarks onto the catalog records.
pub async fn publish_remarks(State(state): State<AppState>) -> ApiResult<Json<Vec<Ingredient>>> {
    Ok(Json(state.controller.publish_remarks().await?))
}

/// GET /api/catalog/cocktails
pub async fn list_cocktails(State(state): State<AppState>) -> Json<Vec<Cocktail>> {
    Json(state.controller.cocktails().await)
}

/// POST /api/catalog/cocktails
pub async fn add_cocktail(
    State(state): State<AppState>,
    Json(cocktail): Json<Cocktail>,
) -> ApiResult<(StatusCode, Json<Cocktail>)> {
    let created = state.controller.add_cocktail(cocktail).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /api/catalog/refresh
pub async fn refresh_catalog(State(state): State<AppState>) -> ApiResult<Json<KioskView>> {
    state.controller.refresh_catalog().await?;
    Ok(Json(state.controller.view().await))
}

/// GET /api/cocktails/available
///
/// Home-screen list, derived from the last saved configuration.
pub async fn available_cocktails(State(state): State<AppState>) -> Json<Vec<Cocktail>> {
    Json(state.controller.available_cocktails().await)
}
