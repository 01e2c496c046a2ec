//! # Kiosk Common Library
//!
//! Shared code for the cocktail kiosk services including:
//! - Catalog, configuration and dispense wire models
//! - Pipe assignment rules (one pipe per ingredient)
//! - Event types (KioskEvent enum) and the EventBus
//! - Bootstrap configuration loading

pub mod config;
pub mod error;
pub mod events;
pub mod models;

pub use error::{Error, Result};
