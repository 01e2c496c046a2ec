//! Kiosk controller
//!
//! Owns all session state: catalog cache, the configuration being edited,
//! the last saved configuration, the home-screen cocktail list and the
//! dispense in progress. HTTP handlers call into it and render the view it
//! returns; business rules stay in `availability`, `catalog`, `persistence`
//! and `dispenser`.
//!
//! The home-screen list is derived from the *saved* configuration only, so it
//! changes on a successful save or load, never on an edit.

use crate::availability::{compute_available, ingredient_types};
use crate::catalog::{self, CatalogError};
use crate::dispenser::{build_request, DispenseError, DispenseOutcome, Dispatcher, Submission};
use crate::persistence::{self, SaveError};
use crate::store::{StoreClient, StoreError};
use crate::view::{self, KioskView};
use kiosk_common::config::{AvailabilityMode, DispenseConfig, IntegrityPolicy};
use kiosk_common::events::{EventBus, KioskEvent};
use kiosk_common::models::{Cocktail, Configuration, DispenseRequest, Ingredient, PipeError, PipeId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Controller errors
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Pipe(#[from] PipeError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Dispense(#[from] DispenseError),

    #[error("Cocktail not found: {0}")]
    CocktailNotFound(String),

    /// Operation of the same kind still in flight
    #[error("{0}")]
    Busy(String),

    /// Operation not valid in the current dispense state
    #[error("{0}")]
    InvalidState(String),
}

pub type ControllerResult<T> = Result<T, ControllerError>;

/// Controller behaviour settings
#[derive(Debug, Clone, Default)]
pub struct ControllerSettings {
    pub availability_mode: AvailabilityMode,
    pub integrity_policy: IntegrityPolicy,
    pub dispense: DispenseConfig,
}

/// Session state guarded by one lock
#[derive(Debug, Clone, Default)]
pub struct KioskState {
    pub ingredients: Vec<Ingredient>,
    pub cocktails: Vec<Cocktail>,
    /// Configuration being edited
    pub editing: Configuration,
    /// Last loaded or successfully saved configuration
    pub saved: Configuration,
    /// Cocktails preparable with `saved`
    pub available: Vec<Cocktail>,
}

/// Dispense progress shown by the UI
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DispenseState {
    #[default]
    Idle,
    Submitting { dispense_id: Uuid, cocktail: String },
    Polling { dispense_id: Uuid, cocktail: String },
    Completed { dispense_id: Uuid, cocktail: String },
    Failed { dispense_id: Uuid, cocktail: String, message: String },
}

impl DispenseState {
    /// Submitting or polling
    pub fn is_active(&self) -> bool {
        matches!(self, DispenseState::Submitting { .. } | DispenseState::Polling { .. })
    }

    fn dispense_id(&self) -> Option<Uuid> {
        match self {
            DispenseState::Idle => None,
            DispenseState::Submitting { dispense_id, .. }
            | DispenseState::Polling { dispense_id, .. }
            | DispenseState::Completed { dispense_id, .. }
            | DispenseState::Failed { dispense_id, .. } => Some(*dispense_id),
        }
    }
}

/// Parameters of a brew action
#[derive(Debug, Clone)]
pub struct DispenseCommand {
    pub cocktail_id: String,
    pub drink_type: String,
    pub is_alcoholic: bool,
}

#[derive(Default)]
struct DispenseSlot {
    state: DispenseState,
    cancel: Option<CancellationToken>,
}

/// Clears a busy flag when dropped
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Application controller
pub struct KioskController {
    store: Arc<StoreClient>,
    dispatcher: Dispatcher,
    settings: ControllerSettings,
    events: EventBus,
    state: RwLock<KioskState>,
    dispense: Mutex<DispenseSlot>,
    saving: AtomicBool,
}

impl KioskController {
    pub fn new(store: Arc<StoreClient>, settings: ControllerSettings, events: EventBus) -> Self {
        let dispatcher = Dispatcher::new(store.clone(), &settings.dispense);
        Self {
            store,
            dispatcher,
            settings,
            events,
            state: RwLock::new(KioskState::default()),
            dispense: Mutex::new(DispenseSlot::default()),
            saving: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &StoreClient {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Startup load of catalog and configuration
    ///
    /// Either part may fail (store not up yet); the kiosk then starts empty
    /// and the operator can reload.
    pub async fn initialize(&self) {
        if let Err(e) = self.refresh_catalog().await {
            warn!("Initial catalog load failed: {}", e);
        }
        if let Err(e) = self.load_configuration().await {
            warn!("Initial configuration load failed: {}", e);
        }
    }

    // ------------------------------------------------------------------
    // View
    // ------------------------------------------------------------------

    pub async fn view(&self) -> KioskView {
        let dispense = self.dispense_state().await;
        let state = self.state.read().await;
        view::build(&state, &dispense)
    }

    pub async fn available_cocktails(&self) -> Vec<Cocktail> {
        self.state.read().await.available.clone()
    }

    pub async fn ingredients(&self) -> Vec<Ingredient> {
        self.state.read().await.ingredients.clone()
    }

    pub async fn cocktails(&self) -> Vec<Cocktail> {
        self.state.read().await.cocktails.clone()
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    /// Re-read ingredients and cocktails from the store
    pub async fn refresh_catalog(&self) -> ControllerResult<()> {
        let ingredients = self.store.ingredients().await?;
        let cocktails = self.store.cocktails().await?;

        let mut state = self.state.write().await;
        state.ingredients = ingredients;
        state.cocktails = cocktails;
        self.events.emit_lossy(KioskEvent::CatalogRefreshed {
            ingredients: state.ingredients.len(),
            cocktails: state.cocktails.len(),
            timestamp: chrono::Utc::now(),
        });
        self.recompute_available(&mut state);
        Ok(())
    }

    pub async fn add_ingredient(&self, ingredient: Ingredient) -> ControllerResult<Ingredient> {
        let existing = self.ingredients().await;
        let ingredient = catalog::prepare_ingredient(ingredient, &existing)?;

        self.store.add_ingredient(&ingredient).await?;
        info!(name = %ingredient.name, kind = %ingredient.kind, "Ingredient added");

        let mut state = self.state.write().await;
        state.ingredients.push(ingredient.clone());
        self.recompute_available(&mut state);
        Ok(ingredient)
    }

    /// Edit one ingredient's catalog remark (bulk replace on the store)
    ///
    /// The edited configuration's remark for the ingredient follows, so the
    /// next save stores the same text.
    pub async fn update_ingredient_remark(&self, name: &str, remark: &str) -> ControllerResult<Ingredient> {
        let existing = self.ingredients().await;
        let updated = catalog::with_remark(&existing, name, remark)?;

        self.store.replace_ingredients(&updated).await?;
        info!(name = %name, "Ingredient remark updated");

        let mut state = self.state.write().await;
        state.ingredients = updated;
        mirror_remark(&mut state.editing.ingredient_remarks, name, remark);
        state
            .ingredients
            .iter()
            .find(|i| i.name == name)
            .cloned()
            .ok_or_else(|| CatalogError::IngredientNotFound(name.to_string()).into())
    }

    pub async fn add_cocktail(&self, cocktail: Cocktail) -> ControllerResult<Cocktail> {
        let ingredients = self.ingredients().await;
        let cocktails = self.cocktails().await;
        let cocktail = catalog::prepare_cocktail(
            cocktail,
            &ingredients,
            &cocktails,
            self.settings.integrity_policy,
        )?;

        self.store.add_cocktail(&cocktail).await?;
        info!(name = %cocktail.name, lines = cocktail.ingredient_lines.len(), "Cocktail added");

        let mut state = self.state.write().await;
        state.cocktails.push(cocktail.clone());
        self.recompute_available(&mut state);
        Ok(cocktail)
    }

    // ------------------------------------------------------------------
    // Configuration editing
    // ------------------------------------------------------------------

    pub async fn set_pipe_count(&self, count: u32) -> ControllerResult<()> {
        let mut state = self.state.write().await;
        let dropped = state.editing.pipes.resize(count)?;
        for (pipe, name) in dropped {
            info!(pipe = %pipe, ingredient = %name, "Assignment dropped by resize");
        }
        state.editing.prune_pipe_notes();
        Ok(())
    }

    /// Put an ingredient into a pipe; an empty name clears it
    pub async fn assign_pipe(&self, pipe: PipeId, ingredient: &str) -> ControllerResult<()> {
        let mut state = self.state.write().await;
        let name = ingredient.trim();
        if !name.is_empty() && !state.ingredients.iter().any(|i| i.name == name) {
            return Err(CatalogError::IngredientNotFound(name.to_string()).into());
        }
        state.editing.pipes.assign(pipe, name)?;
        Ok(())
    }

    pub async fn clear_pipe(&self, pipe: PipeId) -> ControllerResult<()> {
        let mut state = self.state.write().await;
        state.editing.pipes.clear(pipe)?;
        Ok(())
    }

    /// Mark an ingredient as loaded/unloaded in the edited configuration
    pub async fn set_selected(&self, name: &str, selected: bool) -> ControllerResult<()> {
        let mut state = self.state.write().await;
        if selected && !state.ingredients.iter().any(|i| i.name == name) {
            return Err(CatalogError::IngredientNotFound(name.to_string()).into());
        }
        state.editing.selected_ingredients.set(name, selected);
        Ok(())
    }

    /// Operator note for one pipe; empty text removes it
    pub async fn set_pipe_note(&self, pipe: PipeId, note: &str) -> ControllerResult<()> {
        let mut state = self.state.write().await;
        if pipe.number() > state.editing.pipes.count() {
            return Err(PipeError::OutOfRange {
                pipe,
                count: state.editing.pipes.count(),
            }
            .into());
        }
        state.editing.set_pipe_note(pipe, note);
        Ok(())
    }

    /// Configuration-level remark; empty text removes it
    ///
    /// Stays in the edited configuration until [`Self::publish_remarks`]
    /// copies it onto the catalog.
    pub async fn set_configuration_remark(&self, name: &str, remark: &str) {
        let mut state = self.state.write().await;
        mirror_remark(&mut state.editing.ingredient_remarks, name, remark);
    }

    /// Write the edited configuration's remarks onto every catalog record
    ///
    /// Ingredients without a configuration remark get an empty one.
    pub async fn publish_remarks(&self) -> ControllerResult<Vec<Ingredient>> {
        let (existing, remarks) = {
            let state = self.state.read().await;
            (state.ingredients.clone(), state.editing.ingredient_remarks.clone())
        };
        if existing.is_empty() {
            return Err(ControllerError::InvalidState(
                "The ingredient catalog is not loaded".to_string(),
            ));
        }
        let updated = catalog::with_remarks(&existing, &remarks);

        self.store.replace_ingredients(&updated).await?;
        info!(remarks = remarks.len(), "Configuration remarks written to catalog");

        let mut state = self.state.write().await;
        state.ingredients = updated.clone();
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // Configuration persistence
    // ------------------------------------------------------------------

    /// Replace editing and saved state with the stored document
    pub async fn load_configuration(&self) -> ControllerResult<Configuration> {
        let config = persistence::load(&self.store).await?;

        let mut state = self.state.write().await;
        state.editing = config.clone();
        state.saved = config.clone();
        self.events.emit_lossy(KioskEvent::ConfigurationLoaded {
            number_of_pipes: config.pipes.count(),
            timestamp: chrono::Utc::now(),
        });
        self.recompute_available(&mut state);
        Ok(config)
    }

    /// Persist the edited configuration
    ///
    /// Refused while another save is in flight. On success the saved snapshot
    /// and the home-screen list are updated and the ingredient catalog is
    /// reloaded in the background.
    pub async fn save_configuration(self: &Arc<Self>) -> ControllerResult<Configuration> {
        let _guard = BusyGuard::acquire(&self.saving)
            .ok_or_else(|| ControllerError::Busy("A save is already in progress".to_string()))?;

        let config = self.state.read().await.editing.clone();
        persistence::save(&self.store, &config).await?;

        {
            let mut state = self.state.write().await;
            state.saved = config.clone();
            self.events.emit_lossy(KioskEvent::ConfigurationSaved {
                number_of_pipes: config.pipes.count(),
                timestamp: chrono::Utc::now(),
            });
            self.recompute_available(&mut state);
        }

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller.reload_ingredients().await;
        });

        Ok(config)
    }

    /// Background remark reload; failures are logged only
    async fn reload_ingredients(&self) {
        match self.store.ingredients().await {
            Ok(ingredients) => {
                let mut state = self.state.write().await;
                state.ingredients = ingredients;
                self.recompute_available(&mut state);
            }
            Err(e) => warn!("Background ingredient reload failed: {}", e),
        }
    }

    fn recompute_available(&self, state: &mut KioskState) {
        let types = ingredient_types(&state.ingredients);
        let available: Vec<Cocktail> = compute_available(
            &state.cocktails,
            &types,
            &state.saved.selected_ingredients,
            self.settings.availability_mode,
        )
        .into_iter()
        .cloned()
        .collect();

        let changed = available != state.available;
        state.available = available;
        if changed {
            self.events.emit_lossy(KioskEvent::AvailabilityChanged {
                available: state.available.len(),
                total: state.cocktails.len(),
                timestamp: chrono::Utc::now(),
            });
        }
    }

    // ------------------------------------------------------------------
    // Dispense
    // ------------------------------------------------------------------

    pub async fn dispense_state(&self) -> DispenseState {
        self.dispense.lock().await.state.clone()
    }

    /// Start brewing a cocktail with the saved pipe assignment
    ///
    /// Returns once the dispense is queued; progress is reported through the
    /// dispense state and events.
    pub async fn start_dispense(self: &Arc<Self>, command: DispenseCommand) -> ControllerResult<DispenseState> {
        let mut slot = self.dispense.lock().await;
        if slot.state.is_active() {
            return Err(ControllerError::Busy("A drink is already being prepared".to_string()));
        }

        let (cocktail, request) = {
            let state = self.state.read().await;
            let cocktail = state
                .cocktails
                .iter()
                .find(|c| c.has_id(&command.cocktail_id))
                .cloned()
                .ok_or_else(|| ControllerError::CocktailNotFound(command.cocktail_id.clone()))?;
            let pipes = state.saved.pipes.subset(|name| cocktail.line_for(name).is_some());
            let request = build_request(
                &cocktail,
                &state.ingredients,
                &pipes,
                &command.drink_type,
                command.is_alcoholic,
            )?;
            (cocktail, request)
        };

        let dispense_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        slot.state = DispenseState::Submitting {
            dispense_id,
            cocktail: cocktail.name.clone(),
        };
        slot.cancel = Some(cancel.clone());
        let started = slot.state.clone();
        drop(slot);

        self.events.emit_lossy(KioskEvent::DispenseStarted {
            dispense_id,
            cocktail: cocktail.name.clone(),
            timestamp: chrono::Utc::now(),
        });

        let controller = Arc::clone(self);
        tokio::spawn(async move {
            controller
                .run_dispense(dispense_id, cocktail.name, request, cancel)
                .await;
        });

        Ok(started)
    }

    async fn run_dispense(
        &self,
        dispense_id: Uuid,
        cocktail: String,
        request: DispenseRequest,
        cancel: CancellationToken,
    ) {
        let result = match self.dispatcher.submit(&request).await {
            Ok(Submission::Completed) => Ok(DispenseOutcome::Completed { polls: 0 }),
            Ok(Submission::Accepted) => {
                let still_ours = self
                    .transition(dispense_id, DispenseState::Polling {
                        dispense_id,
                        cocktail: cocktail.clone(),
                    })
                    .await;
                if still_ours {
                    self.events.emit_lossy(KioskEvent::DispensePolling {
                        dispense_id,
                        timestamp: chrono::Utc::now(),
                    });
                }
                self.dispatcher.wait_for_completion(&cancel).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(DispenseOutcome::Completed { .. }) => {
                if self
                    .transition(dispense_id, DispenseState::Completed {
                        dispense_id,
                        cocktail,
                    })
                    .await
                {
                    self.events.emit_lossy(KioskEvent::DispenseCompleted {
                        dispense_id,
                        timestamp: chrono::Utc::now(),
                    });
                }
            }
            Ok(DispenseOutcome::Cancelled) => {
                info!(%dispense_id, "Dispense task stopped after cancel");
            }
            Err(e) => {
                error!(%dispense_id, "Dispense failed: {}", e);
                let message = e.to_string();
                if self
                    .transition(dispense_id, DispenseState::Failed {
                        dispense_id,
                        cocktail,
                        message: message.clone(),
                    })
                    .await
                {
                    self.events.emit_lossy(KioskEvent::DispenseFailed {
                        dispense_id,
                        message,
                        timestamp: chrono::Utc::now(),
                    });
                }
            }
        }
    }

    /// Move an active dispense to `next` if it is still the current one
    ///
    /// Returns false when the dispense was cancelled or replaced meanwhile.
    async fn transition(&self, dispense_id: Uuid, next: DispenseState) -> bool {
        let mut slot = self.dispense.lock().await;
        if !slot.state.is_active() || slot.state.dispense_id() != Some(dispense_id) {
            return false;
        }
        if !next.is_active() {
            slot.cancel = None;
        }
        slot.state = next;
        true
    }

    /// Ask the machine to abort the current drink
    ///
    /// Only after the machine acknowledges is polling stopped and the state
    /// returned to idle. A failed cancel leaves the dispense running.
    pub async fn cancel_dispense(&self) -> ControllerResult<DispenseState> {
        let dispense_id = {
            let slot = self.dispense.lock().await;
            if !slot.state.is_active() {
                return Err(ControllerError::InvalidState("No drink is being prepared".to_string()));
            }
            slot.state.dispense_id()
        };

        self.store.cancel().await?;

        let mut slot = self.dispense.lock().await;
        if slot.state.is_active() && slot.state.dispense_id() == dispense_id {
            if let Some(token) = slot.cancel.take() {
                token.cancel();
            }
            slot.state = DispenseState::Idle;
            if let Some(dispense_id) = dispense_id {
                info!(%dispense_id, "Dispense cancelled");
                self.events.emit_lossy(KioskEvent::DispenseCancelled {
                    dispense_id,
                    timestamp: chrono::Utc::now(),
                });
            }
        }
        Ok(slot.state.clone())
    }

    /// Acknowledge a finished or failed dispense
    pub async fn dismiss_dispense(&self) -> ControllerResult<DispenseState> {
        let mut slot = self.dispense.lock().await;
        if slot.state.is_active() {
            return Err(ControllerError::InvalidState(
                "Cannot dismiss while a drink is being prepared".to_string(),
            ));
        }
        slot.state = DispenseState::Idle;
        Ok(DispenseState::Idle)
    }
}

/// Set or remove (blank text) one entry of a remark map
fn mirror_remark(remarks: &mut BTreeMap<String, String>, name: &str, remark: &str) {
    let remark = remark.trim();
    if remark.is_empty() {
        remarks.remove(name);
    } else {
        remarks.insert(name.to_string(), remark.to_string());
    }
}
