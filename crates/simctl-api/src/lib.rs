//! HTTP + `WebSocket` API for the simctl lifecycle service.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **REST endpoints** for simulation, map and vehicle records
//! - **Transition endpoints** to start and stop simulations and to report
//!   asset load completion
//! - **`WebSocket` endpoint** (`/ws`) streaming every simulation status
//!   change via [`tokio::sync::broadcast`]
//!
//! Handlers share one [`AppState`] holding the store and the
//! [`LifecycleController`](simctl_core::LifecycleController).

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod transitions;
pub mod ws;

pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
