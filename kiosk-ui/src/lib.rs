//! kiosk-ui library - cocktail kiosk controller
//!
//! Serves the kiosk front end: catalog browsing, pipe configuration and
//! drink dispensing, backed by the store server's REST API.

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod availability;
pub mod catalog;
pub mod controller;
pub mod dispenser;
pub mod error;
pub mod persistence;
pub mod store;
pub mod view;

use controller::KioskController;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<KioskController>,
}

impl AppState {
    pub fn new(controller: Arc<KioskController>) -> Self {
        Self { controller }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post, put};

    let catalog = Router::new()
        .route(
            "/api/catalog/ingredients",
            get(api::catalog::list_ingredients).post(api::catalog::add_ingredient),
        )
        .route(
            "/api/catalog/ingredients/:name/remark",
            put(api::catalog::update_ingredient_remark),
        )
        .route("/api/catalog/remarks", post(api::catalog::publish_remarks))
        .route(
            "/api/catalog/cocktails",
            get(api::catalog::list_cocktails).post(api::catalog::add_cocktail),
        )
        .route("/api/catalog/refresh", post(api::catalog::refresh_catalog))
        .route("/api/cocktails/available", get(api::catalog::available_cocktails));

    let configuration = Router::new()
        .route("/api/view", get(api::configuration::get_view))
        .route("/api/config/load", post(api::configuration::load_configuration))
        .route("/api/config/save", post(api::configuration::save_configuration))
        .route("/api/pipes/count", put(api::configuration::set_pipe_count))
        .route(
            "/api/pipes/:pipe",
            put(api::configuration::assign_pipe).delete(api::configuration::clear_pipe),
        )
        .route("/api/selection/:name", put(api::configuration::set_selected))
        .route("/api/pipes/:pipe/note", put(api::configuration::set_pipe_note))
        .route("/api/remarks/:name", put(api::configuration::set_configuration_remark));

    let dispense = Router::new()
        .route(
            "/api/dispense",
            get(api::dispense::get_dispense).post(api::dispense::start_dispense),
        )
        .route("/api/dispense/cancel", post(api::dispense::cancel_dispense))
        .route("/api/dispense/dismiss", post(api::dispense::dismiss_dispense));

    let system = Router::new()
        .route("/api/system/focus-in", post(api::system::focus_in))
        .route("/api/system/focus-out", post(api::system::focus_out))
        .route("/api/system/shutdown", post(api::system::shutdown))
        .route("/api/system/updates", get(api::system::check_updates))
        .route("/api/system/updates/pull", post(api::system::pull_updates));

    Router::new()
        .merge(catalog)
        .merge(configuration)
        .merge(dispense)
        .merge(system)
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
