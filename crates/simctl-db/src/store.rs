//! Backend-agnostic record store.
//!
//! [`Store`] is the single persistence collaborator of the lifecycle
//! controller and the HTTP handlers. It uses enum dispatch instead of a
//! trait object because async methods are not dyn-compatible.

use simctl_types::{Map, MapId, Simulation, SimulationId, Vehicle, VehicleId};

use crate::error::DbError;
use crate::memory::MemoryStore;
use crate::pg_store::PgStore;
use crate::postgres::{PostgresConfig, PostgresPool};

/// Record store for simulations, maps and vehicles.
#[derive(Debug)]
pub enum Store {
    /// Volatile in-process tables.
    Memory(MemoryStore),
    /// Durable `PostgreSQL` tables.
    Postgres(PgStore),
}

impl Store {
    /// Create an empty in-memory store.
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    /// Connect to `PostgreSQL` and wrap the pool in a store.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if connecting or migrating fails.
    pub async fn postgres(config: &PostgresConfig) -> Result<Self, DbError> {
        let pool = PostgresPool::connect(config).await?;
        Ok(Self::Postgres(PgStore::new(pool)))
    }

    /// Human-readable backend name for logging.
    pub const fn backend(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Confirm the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the database does not answer.
    pub async fn ping(&self) -> Result<(), DbError> {
        match self {
            Self::Memory(_) => Ok(()),
            Self::Postgres(pg) => pg.pool().ping().await,
        }
    }

    // -----------------------------------------------------------------------
    // Simulations
    // -----------------------------------------------------------------------

    /// Load a simulation that must exist.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no simulation has this id.
    pub async fn get_simulation(&self, id: SimulationId) -> Result<Simulation, DbError> {
        self.find_simulation(id).await?.ok_or(DbError::NotFound {
            entity: "simulation",
            id: id.into_inner(),
        })
    }

    /// Load a simulation, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn find_simulation(&self, id: SimulationId) -> Result<Option<Simulation>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.find_simulation(id).await),
            Self::Postgres(pg) => pg.find_simulation(id).await,
        }
    }

    /// List all simulations ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn list_simulations(&self) -> Result<Vec<Simulation>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.list_simulations().await),
            Self::Postgres(pg) => pg.list_simulations().await,
        }
    }

    /// Insert a simulation and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn insert_simulation(&self, sim: &Simulation) -> Result<Simulation, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.insert_simulation(sim).await),
            Self::Postgres(pg) => pg.insert_simulation(sim).await,
        }
    }

    /// Persist every field of an existing simulation.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the simulation no longer exists.
    pub async fn update_simulation(&self, sim: &Simulation) -> Result<(), DbError> {
        match self {
            Self::Memory(mem) => mem.update_simulation(sim).await,
            Self::Postgres(pg) => pg.update_simulation(sim).await,
        }
    }

    /// Delete a simulation. Returns whether a record was removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn delete_simulation(&self, id: SimulationId) -> Result<bool, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.delete_simulation(id).await),
            Self::Postgres(pg) => pg.delete_simulation(id).await,
        }
    }

    // -----------------------------------------------------------------------
    // Maps
    // -----------------------------------------------------------------------

    /// Load a map, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn find_map(&self, id: MapId) -> Result<Option<Map>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.find_map(id).await),
            Self::Postgres(pg) => pg.find_map(id).await,
        }
    }

    /// List all maps ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn list_maps(&self) -> Result<Vec<Map>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.list_maps().await),
            Self::Postgres(pg) => pg.list_maps().await,
        }
    }

    /// Insert a map record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn insert_map(&self, name: &str, url: &str) -> Result<Map, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.insert_map(name, url).await),
            Self::Postgres(pg) => pg.insert_map(name, url).await,
        }
    }

    /// Delete a map. Returns whether a record was removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn delete_map(&self, id: MapId) -> Result<bool, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.delete_map(id).await),
            Self::Postgres(pg) => pg.delete_map(id).await,
        }
    }

    // -----------------------------------------------------------------------
    // Vehicles
    // -----------------------------------------------------------------------

    /// Load a vehicle, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn find_vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.find_vehicle(id).await),
            Self::Postgres(pg) => pg.find_vehicle(id).await,
        }
    }

    /// List all vehicles ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn list_vehicles(&self) -> Result<Vec<Vehicle>, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.list_vehicles().await),
            Self::Postgres(pg) => pg.list_vehicles().await,
        }
    }

    /// Insert a vehicle record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn insert_vehicle(&self, name: &str, url: &str) -> Result<Vehicle, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.insert_vehicle(name, url).await),
            Self::Postgres(pg) => pg.insert_vehicle(name, url).await,
        }
    }

    /// Delete a vehicle. Returns whether a record was removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend fails.
    pub async fn delete_vehicle(&self, id: VehicleId) -> Result<bool, DbError> {
        match self {
            Self::Memory(mem) => Ok(mem.delete_vehicle(id).await),
            Self::Postgres(pg) => pg.delete_vehicle(id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_simulation_maps_absence_to_not_found() {
        let store = Store::memory();
        let err = store.get_simulation(SimulationId::new(7)).await;
        assert!(matches!(
            err,
            Err(DbError::NotFound {
                entity: "simulation",
                id: 7
            })
        ));
    }

    #[tokio::test]
    async fn memory_backend_pings() {
        let store = Store::memory();
        assert_eq!(store.backend(), "memory");
        assert!(store.ping().await.is_ok());
    }
}
