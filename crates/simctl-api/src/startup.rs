//! API server startup helper for embedding in the service binary.
//!
//! Provides [`spawn_api`] which launches the HTTP + `WebSocket` server on
//! a background Tokio task.
//!
//! # Usage
//!
//! ```rust,ignore
//! use simctl_api::startup::spawn_api;
//! use simctl_api::{AppState, ServerConfig};
//! use std::sync::Arc;
//!
//! let state = Arc::new(AppState::new(controller));
//! let handle = spawn_api(ServerConfig::default(), state)?;
//! ```

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError, start_server};
use crate::state::AppState;

/// Errors that can occur when spawning the API server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Spawn the API server on a background Tokio task.
///
/// Returns a [`JoinHandle`] the caller holds and aborts on shutdown.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the configured address cannot be
/// parsed. Bind failures happen on the background task and are logged.
pub fn spawn_api(
    config: ServerConfig,
    state: Arc<AppState>,
) -> Result<JoinHandle<()>, StartupError> {
    let addr = config.addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = start_server(&config, state).await {
            tracing::error!(error = %e, "API server exited with error");
        }
    });

    tracing::info!(%addr, "API server spawned on background task");

    Ok(handle)
}
