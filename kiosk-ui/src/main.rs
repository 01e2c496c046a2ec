//! Cocktail kiosk controller (kiosk-ui) - Main entry point
//!
//! Loads the TOML configuration, connects to the store server, primes the
//! catalog and configuration caches and serves the kiosk HTTP API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use kiosk_common::config::TomlConfig;
use kiosk_common::events::EventBus;
use kiosk_ui::controller::{ControllerSettings, KioskController};
use kiosk_ui::store::StoreClient;
use kiosk_ui::{build_router, AppState};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Event channel capacity; slow SSE clients lag past this
const EVENT_CAPACITY: usize = 256;

/// Command-line arguments for kiosk-ui
#[derive(Parser, Debug)]
#[command(name = "kiosk-ui")]
#[command(about = "Cocktail kiosk controller")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "KIOSK_PORT")]
    port: Option<u16>,

    /// Store server base URL (overrides the config file)
    #[arg(long, env = "KIOSK_STORE_URL")]
    store_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, config_path) =
        TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(store_url) = args.store_url {
        config.store_url = store_url;
    }
    config.validate().context("Invalid configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("kiosk_ui={0},kiosk_common={0},tower_http=info", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting kiosk-ui v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: compiled defaults"),
    }
    info!("Store server: {}", config.store_url);

    let store = Arc::new(
        StoreClient::new(&config.store_url, config.request_timeout())
            .context("Failed to create store client")?,
    );
    let settings = ControllerSettings {
        availability_mode: config.catalog.availability_mode,
        integrity_policy: config.catalog.integrity_policy,
        dispense: config.dispense.clone(),
    };
    let controller = Arc::new(KioskController::new(
        store,
        settings,
        EventBus::new(EVENT_CAPACITY),
    ));
    controller.initialize().await;

    let app = build_router(AppState::new(controller));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("kiosk-ui listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
