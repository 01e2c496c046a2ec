//! Dispense endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::controller::{DispenseCommand, DispenseState};
use crate::error::ApiResult;
use crate::AppState;

/// Brew action from the cocktail detail screen
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispenseBody {
    /// Cocktail id as shown in the catalog (number or text)
    pub cocktail_id: serde_json::Value,
    #[serde(default)]
    pub drink_type: String,
    #[serde(default)]
    pub is_alcoholic: bool,
}

impl DispenseBody {
    fn into_command(self) -> DispenseCommand {
        let cocktail_id = match self.cocktail_id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        DispenseCommand {
            cocktail_id,
            drink_type: self.drink_type,
            is_alcoholic: self.is_alcoholic,
        }
    }
}

/// POST /api/dispense
///
/// Returns 202 once the request is queued; progress follows on /events.
pub async fn start_dispense(
    State(state): State<AppState>,
    Json(body): Json<DispenseBody>,
) -> ApiResult<(StatusCode, Json<DispenseState>)> {
    let started = state.controller.start_dispense(body.into_command()).await?;
    Ok((StatusCode::ACCEPTED, Json(started)))
}

/// GET /api/dispense
pub async fn get_dispense(State(state): State<AppState>) -> Json<DispenseState> {
    Json(state.controller.dispense_state().await)
}

/// POST /api/dispense/cancel
pub async fn cancel_dispense(State(state): State<AppState>) -> ApiResult<Json<DispenseState>> {
    Ok(Json(state.controller.cancel_dispense().await?))
}

/// POST /api/dispense/dismiss
pub async fn dismiss_dispense(State(state): State<AppState>) -> ApiResult<Json<DispenseState>> {
    Ok(Json(state.controller.dismiss_dispense().await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_and_text_cocktail_ids() {
        let body: DispenseBody = serde_json::from_str(r#"{"cocktailId": 7}"#).unwrap();
        assert_eq!(body.into_command().cocktail_id, "7");

        let body: DispenseBody =
            serde_json::from_str(r#"{"cocktailId": "a1b2", "drinkType": "long", "isAlcoholic": true}"#).unwrap();
        let command = body.into_command();
        assert_eq!(command.cocktail_id, "a1b2");
        assert_eq!(command.drink_type, "long");
        assert!(command.is_alcoholic);
    }
}
