//! Dispense request dispatcher
//!
//! Sends one drink to the hardware process and follows it to completion:
//! 1. Submit the request once ("send pipes").
//! 2. `COMPLETED` in the reply ends the dispense immediately.
//! 3. Any other accepted reply starts polling the completion status at a
//!    fixed interval, one request at a time, until it reports `completed`.
//!    The completion flag is then cleared with a single call.
//!
//! Failures are reported and never retried. Cancellation is cooperative: the
//! token is checked before each poll is scheduled, a poll already in flight
//! runs to its end but its result is discarded. A cancelled dispense never
//! clears the completion flag, which may already belong to the next drink.
//! Polling gives up after `max_wait`.

use crate::store::{StoreClient, StoreError};
use kiosk_common::config::DispenseConfig;
use kiosk_common::models::{
    Cocktail, DispenseIngredient, DispenseRequest, Ingredient, IngredientLine, PipeId,
    DEFAULT_INGREDIENT_ML,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Dispense errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispenseError {
    /// The cocktail record has no id to send as product id
    #[error("Cocktail {0} has no id")]
    MissingProductId(String),

    /// No pipe holds any ingredient of the cocktail
    #[error("No pipe holds an ingredient of {0}")]
    NoPipes(String),

    /// The send-pipes call failed or was refused
    #[error("Machine refused the drink: {}", .0.user_message())]
    Submit(StoreError),

    /// A completion check failed
    #[error("Lost contact with the machine while brewing: {}", .0.user_message())]
    Poll(StoreError),

    /// Completion not reported within the configured wait
    #[error("Drink not completed within {} seconds", .0.as_secs())]
    Timeout(Duration),
}

/// Result of the submit step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Finished synchronously, nothing to poll
    Completed,
    /// Accepted; completion must be polled
    Accepted,
}

/// How a dispense ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispenseOutcome {
    /// `polls` completion checks were needed (0 for immediate completion)
    Completed { polls: u32 },
    Cancelled,
}

/// Build the "send pipes" payload
///
/// `pipes` is the cocktail's pipe mapping. The amount for each pipe is the
/// recipe line's text as written; DEFAULT_INGREDIENT_ML when the recipe has no
/// line (or a blank one) for it. Firmware keys come from the cocktail's PNID
/// and each ingredient's ING_NID (catalog record first, then the recipe line),
/// and are sent empty when unknown.
pub fn build_request(
    cocktail: &Cocktail,
    catalog: &[Ingredient],
    pipes: &[(PipeId, String)],
    drink_type: &str,
    is_alcoholic: bool,
) -> Result<DispenseRequest, DispenseError> {
    let product_id = cocktail
        .id
        .clone()
        .ok_or_else(|| DispenseError::MissingProductId(cocktail.name.clone()))?;

    if pipes.is_empty() {
        return Err(DispenseError::NoPipes(cocktail.name.clone()));
    }

    let product_nid = cocktail
        .nid
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    let ingredients = pipes
        .iter()
        .map(|(pipe, name)| {
            let line = cocktail.line_for(name);
            let ing_nid = catalog
                .iter()
                .find(|i| &i.name == name)
                .and_then(Ingredient::nid)
                .or_else(|| line.and_then(IngredientLine::nid))
                .unwrap_or_default();
            if ing_nid.is_empty() {
                debug!(ingredient = %name, "No firmware key for ingredient");
            }
            DispenseIngredient {
                name: name.clone(),
                pipe: *pipe,
                ing_nid,
                ing_ml: line
                    .and_then(IngredientLine::amount)
                    .unwrap_or(DEFAULT_INGREDIENT_ML)
                    .to_string(),
            }
        })
        .collect();

    Ok(DispenseRequest {
        product_id,
        product_nid,
        ingredients,
        drink_type: drink_type.to_string(),
        is_alcoholic,
    })
}

/// Drives one dispense at a time against the store's hardware routes
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<StoreClient>,
    poll_interval: Duration,
    max_wait: Duration,
}

impl Dispatcher {
    pub fn new(store: Arc<StoreClient>, config: &DispenseConfig) -> Self {
        Self {
            store,
            poll_interval: config.poll_interval(),
            max_wait: config.max_wait(),
        }
    }

    /// Full flow: submit, then poll until completion, cancellation or timeout
    pub async fn dispatch(
        &self,
        request: &DispenseRequest,
        cancel: &CancellationToken,
    ) -> Result<DispenseOutcome, DispenseError> {
        match self.submit(request).await? {
            Submission::Completed => Ok(DispenseOutcome::Completed { polls: 0 }),
            Submission::Accepted => self.wait_for_completion(cancel).await,
        }
    }

    /// Send the request once
    pub async fn submit(&self, request: &DispenseRequest) -> Result<Submission, DispenseError> {
        info!(
            product_id = %request.product_id,
            pipes = request.ingredients.len(),
            "Sending drink to machine"
        );
        let reply = self
            .store
            .send_pipes(request)
            .await
            .map_err(DispenseError::Submit)?;

        if reply.is_completed() {
            info!(product_id = %request.product_id, "Drink completed immediately");
            Ok(Submission::Completed)
        } else {
            debug!(status = %reply.status, "Drink accepted, polling for completion");
            Ok(Submission::Accepted)
        }
    }

    /// Poll the completion status until done
    pub async fn wait_for_completion(
        &self,
        cancel: &CancellationToken,
    ) -> Result<DispenseOutcome, DispenseError> {
        let started = Instant::now();
        let mut polls = 0u32;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(polls, "Dispense polling cancelled");
                    return Ok(DispenseOutcome::Cancelled);
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            let status = self
                .store
                .check_completion()
                .await
                .map_err(DispenseError::Poll)?;
            polls += 1;

            if cancel.is_cancelled() {
                info!(polls, "Dispense cancelled during a completion check");
                return Ok(DispenseOutcome::Cancelled);
            }

            if status.is_completed() {
                if let Err(e) = self.store.reset_completion().await {
                    warn!("Failed to clear completion flag: {}", e);
                }
                info!(polls, "Drink completed");
                return Ok(DispenseOutcome::Completed { polls });
            }

            if started.elapsed() >= self.max_wait {
                warn!(polls, "Drink not completed within {:?}", self.max_wait);
                return Err(DispenseError::Timeout(self.max_wait));
            }

            debug!(polls, status = %status.status, "Drink still brewing");
        }
    }
}
