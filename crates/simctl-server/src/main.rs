//! Service binary for simctl.
//!
//! Wires the record store, lifecycle controller, asset loader and API
//! server together and runs until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `simctl-config.yaml` (or defaults)
//! 2. Initialize structured logging (tracing)
//! 3. Open the record store
//! 4. Create the notifier, asset loader and lifecycle controller
//! 5. Start the asset completion listener
//! 6. Start the API server
//! 7. Wait for `Ctrl-C`, then stop background tasks

mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use simctl_api::startup::spawn_api;
use simctl_api::{AppState, ServerConfig};
use simctl_core::assets::{AssetLoader, FsAssetLoader, asset_channel};
use simctl_core::config::{LoggingConfig, SimctlConfig, StoreBackend};
use simctl_core::{LifecycleController, Notifier, spawn_asset_listener};
use simctl_db::{PostgresConfig, Store};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::ServiceError;

/// Path of the configuration file, relative to the working directory.
const CONFIG_PATH: &str = "simctl-config.yaml";

/// Capacity of the asset completion channel.
const ASSET_EVENT_CAPACITY: usize = 64;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        store = ?config.infrastructure.store,
        port = config.server.port,
        deinit_delay_ms = config.lifecycle.deinit_delay_ms,
        validate_vehicles_on_transition = config.lifecycle.validate_vehicles_on_transition,
        "simctl-server starting"
    );

    // 3. Open the record store.
    let store = Arc::new(open_store(&config).await?);
    info!(backend = store.backend(), "Record store ready");

    // 4. Notifier, asset loader, controller.
    let notifier = Notifier::new(config.lifecycle.notification_capacity);
    let (asset_tx, asset_rx) = asset_channel(ASSET_EVENT_CAPACITY);
    let assets = AssetLoader::Filesystem(FsAssetLoader::new(
        config.assets.root_dir.as_ref().map(PathBuf::from),
        asset_tx,
    ));
    let controller = LifecycleController::new(
        Arc::clone(&store),
        notifier,
        assets,
        config.lifecycle.clone(),
    );

    // 5. Asset completion listener.
    let listener = spawn_asset_listener(controller.clone(), asset_rx);

    // 6. API server.
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let app_state = Arc::new(AppState::new(controller));
    let api = spawn_api(server_config, app_state).map_err(ServiceError::from)?;

    // 7. Run until interrupted.
    tokio::signal::ctrl_c().await.map_err(ServiceError::from)?;
    info!("Shutdown signal received");

    api.abort();
    listener.abort();
    if let Store::Postgres(pg) = store.as_ref() {
        pg.pool().close().await;
    }

    info!("simctl-server shutdown complete");
    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

/// Load configuration from `simctl-config.yaml`.
///
/// Falls back to defaults (with environment overrides) when the file is
/// absent.
fn load_config() -> Result<SimctlConfig, ServiceError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok(SimctlConfig::from_file(config_path)?)
    } else {
        let mut config = SimctlConfig::default();
        config.apply_env_overrides()?;
        Ok(config)
    }
}

/// Open the configured store backend.
async fn open_store(config: &SimctlConfig) -> Result<Store, ServiceError> {
    match config.infrastructure.store {
        StoreBackend::Memory => Ok(Store::memory()),
        StoreBackend::Postgres => {
            let pg = PostgresConfig::new(&config.infrastructure.postgres_url)
                .with_max_connections(config.infrastructure.max_connections);
            Ok(Store::postgres(&pg).await?)
        }
    }
}
