//! Shared application state for the API server.
//!
//! [`AppState`] bundles the lifecycle controller with the store and
//! notifier it was built over, so handlers reach all three through one
//! `State` extractor.

use std::sync::Arc;

use simctl_core::{LifecycleController, Notifier};
use simctl_db::Store;
use simctl_types::ClientMessage;
use tokio::sync::broadcast;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Record store for simulations, maps and vehicles.
    pub store: Arc<Store>,
    /// Lifecycle controller driving start and stop.
    pub controller: LifecycleController,
    /// Broadcast handle for `WebSocket` clients.
    pub notifier: Notifier,
}

impl AppState {
    /// Build state around a controller, sharing its store and notifier.
    pub fn new(controller: LifecycleController) -> Self {
        Self {
            store: Arc::clone(controller.store()),
            notifier: controller.notifier().clone(),
            controller,
        }
    }

    /// Subscribe to simulation updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientMessage> {
        self.notifier.subscribe()
    }
}
