//! Configuration persistence
//!
//! The configuration document is read and written wholesale. A save is only
//! sent when every pipe has an ingredient.

use crate::store::{StoreClient, StoreError};
use kiosk_common::models::Configuration;
use thiserror::Error;
use tracing::info;

/// Configuration save errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SaveError {
    /// Pipes left without an ingredient (ascending)
    #[error("Assign an ingredient to every pipe before saving (missing: {})", format_pipes(.0))]
    IncompleteAssignment(Vec<u32>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn format_pipes(pipes: &[u32]) -> String {
    pipes
        .iter()
        .map(|n| format!("Pipe {}", n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Reject configurations with unassigned pipes
pub fn check_complete(config: &Configuration) -> Result<(), SaveError> {
    let missing = config.missing_pipes();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SaveError::IncompleteAssignment(missing))
    }
}

/// Read the configuration document
pub async fn load(store: &StoreClient) -> Result<Configuration, StoreError> {
    let config = store.configuration().await?;
    info!(
        pipes = config.pipes.count(),
        selected = config.selected_ingredients.len(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Validate then replace the configuration document
pub async fn save(store: &StoreClient, config: &Configuration) -> Result<(), SaveError> {
    check_complete(config)?;
    store.write_configuration(config).await?;
    info!(pipes = config.pipes.count(), "Configuration saved");
    Ok(())
}
