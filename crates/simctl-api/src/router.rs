//! Axum router construction for the simctl API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS and request tracing enabled.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, transitions, ws};

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /health` -- liveness
/// - `GET /ws` -- `WebSocket` stream of simulation updates
/// - `/simulations` -- CRUD plus `start`, `stop` and `loaded` transitions
/// - `/maps`, `/vehicles` -- asset records
///
/// CORS allows any origin.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        // WebSocket
        .route("/ws", get(ws::ws_updates))
        // Simulations
        .route(
            "/simulations",
            get(handlers::list_simulations).post(handlers::create_simulation),
        )
        .route(
            "/simulations/{id}",
            get(handlers::get_simulation)
                .put(handlers::update_simulation)
                .delete(handlers::delete_simulation),
        )
        .route("/simulations/{id}/start", post(transitions::start))
        .route("/simulations/{id}/stop", post(transitions::stop))
        .route("/simulations/{id}/loaded", post(transitions::loaded))
        // Assets
        .route("/maps", get(handlers::list_maps).post(handlers::create_map))
        .route(
            "/maps/{id}",
            get(handlers::get_map).delete(handlers::delete_map),
        )
        .route(
            "/vehicles",
            get(handlers::list_vehicles).post(handlers::create_vehicle),
        )
        .route(
            "/vehicles/{id}",
            get(handlers::get_vehicle).delete(handlers::delete_vehicle),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
