//! Lifecycle transition endpoints.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/simulations/{id}/start` | Start a simulation |
//! | `POST` | `/simulations/{id}/stop` | Stop a simulation |
//! | `POST` | `/simulations/{id}/loaded` | Report that its assets finished loading |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use simctl_core::projection::to_response;
use simctl_types::{SimulationId, SimulationResponse};

use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::state::AppState;

/// Response body for `POST /simulations/{id}/stop`.
#[derive(Debug, serde::Serialize)]
struct StopResponse {
    /// Always `true`; failures use the error body instead.
    ok: bool,
}

/// Start a simulation and return it in the `Initializing` status.
pub async fn start(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<SimulationResponse>, ApiError> {
    let id: SimulationId = parse_id(&id_str)?;
    let sim = state
        .controller
        .start(id)
        .await
        .map_err(|e| ApiError::lifecycle("start", id, &e))?;
    Ok(Json(to_response(&sim)))
}

/// Stop a simulation. A running simulation finishes tearing down in the
/// background.
pub async fn stop(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: SimulationId = parse_id(&id_str)?;
    state
        .controller
        .stop(id)
        .await
        .map_err(|e| ApiError::lifecycle("stop", id, &e))?;
    Ok(Json(StopResponse { ok: true }))
}

/// Mark an initializing simulation as running.
pub async fn loaded(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<SimulationResponse>, ApiError> {
    let id: SimulationId = parse_id(&id_str)?;
    let sim = state
        .controller
        .complete_initialization(id)
        .await
        .map_err(|e| ApiError::lifecycle("complete loading of", id, &e))?;
    Ok(Json(to_response(&sim)))
}
