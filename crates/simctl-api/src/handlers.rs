//! REST handlers for simulation, map and vehicle records.
//!
//! Lifecycle transitions live in [`transitions`](crate::transitions);
//! everything here is plain record management against the shared
//! [`Store`](simctl_db::Store).
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness and store reachability |
//! | `GET` | `/simulations` | List simulations |
//! | `POST` | `/simulations` | Create a simulation |
//! | `GET` | `/simulations/{id}` | Get one simulation |
//! | `PUT` | `/simulations/{id}` | Replace a simulation's editable fields |
//! | `DELETE` | `/simulations/{id}` | Delete a simulation |
//! | `GET` | `/maps` | List maps |
//! | `POST` | `/maps` | Register a map |
//! | `GET` | `/maps/{id}` | Get one map |
//! | `DELETE` | `/maps/{id}` | Delete a map |
//! | `GET` | `/vehicles` | List vehicles |
//! | `POST` | `/vehicles` | Register a vehicle |
//! | `GET` | `/vehicles/{id}` | Get one vehicle |
//! | `DELETE` | `/vehicles/{id}` | Delete a vehicle |

use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use simctl_core::LifecycleError;
use simctl_core::projection::{to_model, to_response};
use simctl_core::validation::RuleSet;
use simctl_types::{AssetRequest, MapId, SimulationRequest, SimulationResponse, VehicleId};
use tracing::info;
use validator::Validate;

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Report liveness, the store backend, and the active simulation.
pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    state.store.ping().await?;
    let active = state.controller.active_simulation().await;

    Ok(Json(serde_json::json!({
        "status": "ok",
        "backend": state.store.backend(),
        "active_simulation": active,
    })))
}

// ---------------------------------------------------------------------------
// Simulations
// ---------------------------------------------------------------------------

/// List every simulation, projected.
pub async fn list_simulations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SimulationResponse>>, ApiError> {
    let simulations = state.store.list_simulations().await?;
    Ok(Json(simulations.iter().map(to_response).collect()))
}

/// Return one simulation, projected.
pub async fn get_simulation(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Json<SimulationResponse>, ApiError> {
    let id = parse_id(&id_str)?;
    let sim = state.store.get_simulation(id).await?;
    Ok(Json(to_response(&sim)))
}

/// Create a simulation in the `Idle` status.
///
/// The request must carry a non-empty name and reference an existing map.
pub async fn create_simulation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SimulationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let draft = to_model(&req);
    RuleSet::for_create()
        .validate(&state.store, &draft)
        .await
        .map_err(|e| ApiError::validation("create", e))?;

    let created = state.store.insert_simulation(&draft).await?;
    info!(simulation_id = %created.id, name = %created.name, "Simulation created");
    Ok((StatusCode::CREATED, Json(to_response(&created))))
}

/// Replace the editable fields of a simulation. Id and status are kept.
///
/// Runs through the lifecycle controller so it serializes with transitions.
pub async fn update_simulation(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    Json(req): Json<SimulationRequest>,
) -> Result<Json<SimulationResponse>, ApiError> {
    let id = parse_id(&id_str)?;
    req.validate()?;

    let edited = state
        .controller
        .edit(id, &req)
        .await
        .map_err(|e| match e {
            LifecycleError::ValidationFailed(message) => {
                ApiError::BadRequest(format!("Failed to update simulation: {message}"))
            }
            other => ApiError::lifecycle("update", id, &other),
        })?;
    Ok(Json(to_response(&edited)))
}

/// Delete a simulation.
pub async fn delete_simulation(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id_str)?;
    if !state.store.delete_simulation(id).await? {
        return Err(ApiError::NotFound(format!("simulation {id} not found")));
    }
    info!(simulation_id = %id, "Simulation deleted");
    Ok(Json(serde_json::json!({ "ok": true })))
}

// ---------------------------------------------------------------------------
// Maps
// ---------------------------------------------------------------------------

/// List every map.
pub async fn list_maps(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.list_maps().await?))
}

/// Return one map.
pub async fn get_map(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: MapId = parse_id(&id_str)?;
    let map = state
        .store
        .find_map(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("map {id} not found")))?;
    Ok(Json(map))
}

/// Register a map.
pub async fn create_map(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AssetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let map = state.store.insert_map(&req.name, &req.url).await?;
    info!(map_id = %map.id, name = %map.name, "Map registered");
    Ok((StatusCode::CREATED, Json(map)))
}

/// Delete a map.
pub async fn delete_map(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: MapId = parse_id(&id_str)?;
    if !state.store.delete_map(id).await? {
        return Err(ApiError::NotFound(format!("map {id} not found")));
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}

// ---------------------------------------------------------------------------
// Vehicles
// ---------------------------------------------------------------------------

/// List every vehicle.
pub async fn list_vehicles(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.list_vehicles().await?))
}

/// Return one vehicle.
pub async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: VehicleId = parse_id(&id_str)?;
    let vehicle = state
        .store
        .find_vehicle(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("vehicle {id} not found")))?;
    Ok(Json(vehicle))
}

/// Register a vehicle.
pub async fn create_vehicle(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AssetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let vehicle = state.store.insert_vehicle(&req.name, &req.url).await?;
    info!(vehicle_id = %vehicle.id, name = %vehicle.name, "Vehicle registered");
    Ok((StatusCode::CREATED, Json(vehicle)))
}

/// Delete a vehicle.
pub async fn delete_vehicle(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: VehicleId = parse_id(&id_str)?;
    if !state.store.delete_vehicle(id).await? {
        return Err(ApiError::NotFound(format!("vehicle {id} not found")));
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a numeric id from a path segment, returning an [`ApiError`] on
/// failure.
pub(crate) fn parse_id<T>(s: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = std::num::ParseIntError>,
{
    s.parse::<T>()
        .map_err(|e| ApiError::BadRequest(format!("invalid id {s:?}: {e}")))
}
