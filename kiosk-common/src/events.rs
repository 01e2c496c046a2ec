//! Event types for the kiosk event system
//!
//! Events are broadcast via EventBus and serialized for SSE transmission to
//! the front end, which re-renders on receipt.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Kiosk event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum KioskEvent {
    /// Configuration (re)loaded from the store, editing state replaced
    ConfigurationLoaded {
        number_of_pipes: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Configuration persisted
    ConfigurationSaved {
        number_of_pipes: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Home-screen cocktail list recomputed
    AvailabilityChanged {
        available: usize,
        total: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Ingredient/cocktail cache reloaded
    CatalogRefreshed {
        ingredients: usize,
        cocktails: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Dispense request accepted for submission
    DispenseStarted {
        dispense_id: Uuid,
        cocktail: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Hardware accepted the request; waiting for completion
    DispensePolling {
        dispense_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    DispenseCompleted {
        dispense_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    DispenseFailed {
        dispense_id: Uuid,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    DispenseCancelled {
        dispense_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl KioskEvent {
    /// SSE `event:` field value
    pub fn event_type(&self) -> &'static str {
        match self {
            KioskEvent::ConfigurationLoaded { .. } => "ConfigurationLoaded",
            KioskEvent::ConfigurationSaved { .. } => "ConfigurationSaved",
            KioskEvent::AvailabilityChanged { .. } => "AvailabilityChanged",
            KioskEvent::CatalogRefreshed { .. } => "CatalogRefreshed",
            KioskEvent::DispenseStarted { .. } => "DispenseStarted",
            KioskEvent::DispensePolling { .. } => "DispensePolling",
            KioskEvent::DispenseCompleted { .. } => "DispenseCompleted",
            KioskEvent::DispenseFailed { .. } => "DispenseFailed",
            KioskEvent::DispenseCancelled { .. } => "DispenseCancelled",
        }
    }
}

/// Central event distribution bus
///
/// Wraps a tokio broadcast channel:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use kiosk_common::events::{EventBus, KioskEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(KioskEvent::ConfigurationSaved {
///     number_of_pipes: 4,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(matches!(rx.try_recv(), Ok(KioskEvent::ConfigurationSaved { .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<KioskEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<KioskEvent> {
        self.tx.subscribe()
    }

    /// Emit an event
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: KioskEvent) -> Result<usize, broadcast::error::SendError<KioskEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: KioskEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
