//! Data layer for the simulation lifecycle service.
//!
//! Two interchangeable backends sit behind the [`Store`] enum: a volatile
//! [`MemoryStore`] and a durable `PostgreSQL` [`PgStore`]. Both expose the
//! same single-entity CRUD surface for simulations, maps and vehicles.
//!
//! # Modules
//!
//! - [`store`] -- Backend-dispatching [`Store`]
//! - [`memory`] -- In-process tables
//! - [`pg_store`] -- `PostgreSQL` queries and row types
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`error`] -- Shared error types

pub mod error;
pub mod memory;
pub mod pg_store;
pub mod postgres;
pub mod store;

// Re-export primary types for convenience.
pub use error::DbError;
pub use memory::MemoryStore;
pub use pg_store::{AssetRow, PgStore, SimulationRow};
pub use postgres::{PostgresConfig, PostgresPool};
pub use store::Store;
