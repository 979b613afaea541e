//! Shared type definitions for the simulation lifecycle service.
//!
//! This crate is the single source of truth for all types used across the
//! simctl workspace. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for web clients.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe integer wrappers for all entity identifiers
//! - [`enums`] -- Lifecycle status enumeration
//! - [`structs`] -- Persisted entities, request/response shapes, notifications

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{SimulationStatus, UnknownStatus};
pub use ids::{ClusterId, MapId, SimulationId, VehicleId};
pub use structs::{
    AssetRequest, ClientMessage, Map, Simulation, SimulationRequest, SimulationResponse, Vehicle,
    Weather,
};
