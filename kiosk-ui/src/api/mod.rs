//! HTTP API handlers for kiosk-ui

pub mod catalog;
pub mod configuration;
pub mod dispense;
pub mod health;
pub mod sse;
pub mod system;

pub use health::health_routes;
pub use sse::event_stream;
