//! Store server client
//!
//! The store server owns the JSON files behind the kiosk (ingredients,
//! cocktails, configuration) and relays drink requests to the hardware
//! process. Every call is a single JSON-over-HTTP request; nothing is
//! retried here.

use kiosk_common::models::{Cocktail, Configuration, DispenseRequest, Ingredient, StatusResponse};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = concat!("kiosk-ui/", env!("CARGO_PKG_VERSION"));

/// Store server routes
pub mod routes {
    pub const INGREDIENTS: &str = "/db.json";
    pub const COCKTAILS: &str = "/products.json";
    pub const CONFIG: &str = "/config.json";
    pub const ADD_INGREDIENT: &str = "/addIngredient";
    pub const UPDATE_INGREDIENTS: &str = "/updateIngredients";
    pub const ADD_COCKTAIL: &str = "/addCocktail";
    pub const SAVE_CONFIG: &str = "/save-config";
    pub const SEND_PIPES: &str = "/send-pipes";
    pub const CHECK_COMPLETION: &str = "/check-completion";
    pub const RESET_COMPLETION: &str = "/delete_processing_flag";
    pub const CANCEL: &str = "/cancel-drink";
    pub const FOCUS_IN: &str = "/focus-in";
    pub const FOCUS_OUT: &str = "/focus-out";
    pub const SHUTDOWN: &str = "/shutdown";
    pub const CHECK_UPDATES: &str = "/check-updates";
    pub const PULL_UPDATES: &str = "/pull-updates";
}

/// Store client errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Connection refused, timeout, DNS failure...
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response; message is the server-provided text when available
    #[error("Server error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),
}

impl StoreError {
    /// Text suitable for the user-facing error modal
    pub fn user_message(&self) -> String {
        match self {
            StoreError::Api { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Software update status from check/pull calls
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatus {
    /// Set by the check call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_updates: Option<bool>,
    /// Set by the pull call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: String,
}

/// Store server client
pub struct StoreClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl StoreClient {
    /// Create a client for the store at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    pub async fn ingredients(&self) -> Result<Vec<Ingredient>, StoreError> {
        self.get_json(routes::INGREDIENTS).await
    }

    pub async fn cocktails(&self) -> Result<Vec<Cocktail>, StoreError> {
        self.get_json(routes::COCKTAILS).await
    }

    pub async fn add_ingredient(&self, ingredient: &Ingredient) -> Result<(), StoreError> {
        self.send(Method::POST, routes::ADD_INGREDIENT, Some(ingredient)).await?;
        Ok(())
    }

    /// Bulk replace of the ingredient array
    pub async fn replace_ingredients(&self, ingredients: &[Ingredient]) -> Result<(), StoreError> {
        self.send(Method::POST, routes::UPDATE_INGREDIENTS, Some(ingredients)).await?;
        Ok(())
    }

    pub async fn add_cocktail(&self, cocktail: &Cocktail) -> Result<(), StoreError> {
        self.send(Method::POST, routes::ADD_COCKTAIL, Some(cocktail)).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    pub async fn configuration(&self) -> Result<Configuration, StoreError> {
        self.get_json(routes::CONFIG).await
    }

    /// Write the whole configuration document
    ///
    /// The store merges top-level keys into its file; every key is sent, so
    /// the result is a full replace of the fields the kiosk owns.
    pub async fn write_configuration(&self, config: &Configuration) -> Result<(), StoreError> {
        self.send(Method::POST, routes::SAVE_CONFIG, Some(config)).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Hardware
    // ------------------------------------------------------------------

    /// Submit a drink; a plain-text reply is read as the status word
    pub async fn send_pipes(&self, request: &DispenseRequest) -> Result<StatusResponse, StoreError> {
        let response = self.send(Method::POST, routes::SEND_PIPES, Some(request)).await?;
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        Ok(parse_status(&body))
    }

    pub async fn check_completion(&self) -> Result<StatusResponse, StoreError> {
        self.get_json(routes::CHECK_COMPLETION).await
    }

    pub async fn reset_completion(&self) -> Result<(), StoreError> {
        self.post_empty(routes::RESET_COMPLETION).await
    }

    pub async fn cancel(&self) -> Result<(), StoreError> {
        self.post_empty(routes::CANCEL).await
    }

    // ------------------------------------------------------------------
    // Host session
    // ------------------------------------------------------------------

    pub async fn focus_in(&self) -> Result<(), StoreError> {
        self.post_empty(routes::FOCUS_IN).await
    }

    pub async fn focus_out(&self) -> Result<(), StoreError> {
        self.post_empty(routes::FOCUS_OUT).await
    }

    pub async fn shutdown(&self) -> Result<(), StoreError> {
        self.post_empty(routes::SHUTDOWN).await
    }

    pub async fn check_updates(&self) -> Result<UpdateStatus, StoreError> {
        self.get_json(routes::CHECK_UPDATES).await
    }

    pub async fn pull_updates(&self) -> Result<UpdateStatus, StoreError> {
        let response = self.send::<()>(Method::POST, routes::PULL_UPDATES, None).await?;
        parse_json(response).await
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    async fn get_json<T: DeserializeOwned>(&self, route: &str) -> Result<T, StoreError> {
        let response = self.send::<()>(Method::GET, route, None).await?;
        parse_json(response).await
    }

    async fn post_empty(&self, route: &str) -> Result<(), StoreError> {
        self.send::<()>(Method::POST, route, None).await?;
        Ok(())
    }

    /// Issue one request; non-2xx statuses become `StoreError::Api`
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        route: &str,
        body: Option<&B>,
    ) -> Result<Response, StoreError> {
        let url = format!("{}{}", self.base_url, route);
        debug!(method = %method, url = %url, "Store request");

        let mut request = self.http_client.request(method.clone(), &url);
        match body {
            Some(body) => request = request.json(body),
            // The store reads Content-Length on every POST
            None if method == Method::POST => request = request.body(Vec::<u8>::new()),
            None => {}
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        Ok(response)
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    response
        .json()
        .await
        .map_err(|e| StoreError::Parse(e.to_string()))
}

fn parse_status(body: &str) -> StatusResponse {
    serde_json::from_str(body).unwrap_or_else(|_| StatusResponse {
        status: body.trim().to_string(),
    })
}

/// Pull a human-readable message out of an error body
///
/// Accepts `{"message": ..}`, `{"error": ..}`, `{"error": {"message": ..}}`
/// or plain text.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let candidates = [
            value.get("message"),
            value.get("error").and_then(|e| e.get("message")),
            value.get("error"),
        ];
        if let Some(text) = candidates.into_iter().flatten().find_map(|v| v.as_str()) {
            return text.to_string();
        }
    }
    body.trim().to_string()
}
