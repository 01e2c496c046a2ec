//! HTTP error type for kiosk-ui handlers
//!
//! Every error is user-visible: the front end shows `error.message` in its
//! blocking modal. Validation errors carry structured `details` where the
//! front end needs them (e.g. the unassigned pipe numbers).

use crate::controller::ControllerError;
use crate::persistence::SaveError;
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Validation failure with machine-readable details (422)
    #[error("{message}")]
    Validation { message: String, details: Value },

    /// Conflict (409) - operation already in flight or wrong state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Store server or hardware failure (502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Dispense could not be prepared (422)
    #[error("{0}")]
    Unprocessable(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String, Option<Value>) {
        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None),
            ApiError::Validation { message, details } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_FAILED",
                message.clone(),
                Some(details.clone()),
            ),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone(), None),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg.clone(), None),
            ApiError::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE", msg.clone(), None)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = self.parts();

        let mut error = json!({
            "code": error_code,
            "message": message,
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

impl From<ControllerError> for ApiError {
    fn from(err: ControllerError) -> Self {
        use crate::catalog::CatalogError;

        match err {
            ControllerError::Pipe(e) => ApiError::BadRequest(e.to_string()),
            ControllerError::Catalog(CatalogError::IngredientNotFound(name)) => {
                ApiError::NotFound(format!("Ingredient {}", name))
            }
            ControllerError::Catalog(CatalogError::UnknownIngredients(names)) => {
                let message = CatalogError::UnknownIngredients(names.clone()).to_string();
                ApiError::Validation {
                    message,
                    details: json!({ "unknown_ingredients": names }),
                }
            }
            ControllerError::Catalog(e) => ApiError::BadRequest(e.to_string()),
            ControllerError::Save(SaveError::IncompleteAssignment(missing)) => {
                let message = SaveError::IncompleteAssignment(missing.clone()).to_string();
                ApiError::Validation {
                    message,
                    details: json!({ "missing_pipes": missing }),
                }
            }
            ControllerError::Save(SaveError::Store(e)) | ControllerError::Store(e) => {
                ApiError::Upstream(e.user_message())
            }
            ControllerError::Dispense(e) => ApiError::Unprocessable(e.to_string()),
            ControllerError::CocktailNotFound(id) => ApiError::NotFound(format!("Cocktail {}", id)),
            ControllerError::Busy(msg) | ControllerError::InvalidState(msg) => ApiError::Conflict(msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Upstream(err.user_message())
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
