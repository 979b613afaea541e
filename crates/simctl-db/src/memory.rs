//! In-memory record store.
//!
//! Backs the service when no database is configured and every unit and
//! router test. Ids are assigned from per-table counters starting at 1.
//! All tables sit behind a single [`RwLock`] so each call is atomic.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use simctl_types::{Map, MapId, Simulation, SimulationId, Vehicle, VehicleId};
use tokio::sync::RwLock;

use crate::error::DbError;

#[derive(Debug, Default)]
struct Tables {
    simulations: BTreeMap<SimulationId, Simulation>,
    maps: BTreeMap<MapId, Map>,
    vehicles: BTreeMap<VehicleId, Vehicle>,
    next_simulation: i64,
    next_map: i64,
    next_vehicle: i64,
}

/// Returns the next id from a counter, starting at 1.
fn next_id(counter: &mut i64) -> i64 {
    *counter = counter.saturating_add(1);
    *counter
}

/// Volatile store with the same semantics as [`PgStore`](crate::PgStore).
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    simulation_updates: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful [`update_simulation`](Self::update_simulation)
    /// calls since the store was created.
    pub fn simulation_update_count(&self) -> u64 {
        self.simulation_updates.load(Ordering::Acquire)
    }

    /// Load a simulation by id, `None` if absent.
    pub async fn find_simulation(&self, id: SimulationId) -> Option<Simulation> {
        self.tables.read().await.simulations.get(&id).cloned()
    }

    /// List all simulations ordered by id.
    pub async fn list_simulations(&self) -> Vec<Simulation> {
        self.tables
            .read()
            .await
            .simulations
            .values()
            .cloned()
            .collect()
    }

    /// Insert a simulation and return it with its assigned id.
    pub async fn insert_simulation(&self, sim: &Simulation) -> Simulation {
        let mut tables = self.tables.write().await;
        let id = SimulationId::new(next_id(&mut tables.next_simulation));
        let mut created = sim.clone();
        created.id = id;
        tables.simulations.insert(id, created.clone());
        created
    }

    /// Store a simulation under its own id, replacing any existing record.
    ///
    /// Later inserts are assigned ids above the highest one seeded. Does
    /// not count as an update.
    pub async fn seed_simulation(&self, sim: &Simulation) {
        let mut tables = self.tables.write().await;
        tables.next_simulation = tables.next_simulation.max(sim.id.into_inner());
        tables.simulations.insert(sim.id, sim.clone());
    }

    /// Overwrite an existing simulation.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the id is unknown.
    pub async fn update_simulation(&self, sim: &Simulation) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .simulations
            .get_mut(&sim.id)
            .ok_or(DbError::NotFound {
                entity: "simulation",
                id: sim.id.into_inner(),
            })?;
        *slot = sim.clone();
        self.simulation_updates.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Delete a simulation. Returns whether a record was removed.
    pub async fn delete_simulation(&self, id: SimulationId) -> bool {
        self.tables.write().await.simulations.remove(&id).is_some()
    }

    /// Load a map by id, `None` if absent.
    pub async fn find_map(&self, id: MapId) -> Option<Map> {
        self.tables.read().await.maps.get(&id).cloned()
    }

    /// List all maps ordered by id.
    pub async fn list_maps(&self) -> Vec<Map> {
        self.tables.read().await.maps.values().cloned().collect()
    }

    /// Insert a map record.
    pub async fn insert_map(&self, name: &str, url: &str) -> Map {
        let mut tables = self.tables.write().await;
        let id = MapId::new(next_id(&mut tables.next_map));
        let map = Map {
            id,
            name: name.to_owned(),
            url: url.to_owned(),
        };
        tables.maps.insert(id, map.clone());
        map
    }

    /// Delete a map. Returns whether a record was removed.
    pub async fn delete_map(&self, id: MapId) -> bool {
        self.tables.write().await.maps.remove(&id).is_some()
    }

    /// Load a vehicle by id, `None` if absent.
    pub async fn find_vehicle(&self, id: VehicleId) -> Option<Vehicle> {
        self.tables.read().await.vehicles.get(&id).cloned()
    }

    /// List all vehicles ordered by id.
    pub async fn list_vehicles(&self) -> Vec<Vehicle> {
        self.tables.read().await.vehicles.values().cloned().collect()
    }

    /// Insert a vehicle record.
    pub async fn insert_vehicle(&self, name: &str, url: &str) -> Vehicle {
        let mut tables = self.tables.write().await;
        let id = VehicleId::new(next_id(&mut tables.next_vehicle));
        let vehicle = Vehicle {
            id,
            name: name.to_owned(),
            url: url.to_owned(),
        };
        tables.vehicles.insert(id, vehicle.clone());
        vehicle
    }

    /// Delete a vehicle. Returns whether a record was removed.
    pub async fn delete_vehicle(&self, id: VehicleId) -> bool {
        self.tables.write().await.vehicles.remove(&id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use simctl_types::SimulationStatus;

    use super::*;

    fn draft(name: &str) -> Simulation {
        Simulation {
            name: name.to_owned(),
            ..Simulation::default()
        }
    }

    #[tokio::test]
    async fn ids_are_assigned_sequentially_per_table() {
        let store = MemoryStore::new();
        let a = store.insert_simulation(&draft("a")).await;
        let b = store.insert_simulation(&draft("b")).await;
        let map = store.insert_map("Shalun", "file:///maps/shalun").await;

        assert_eq!(a.id, SimulationId::new(1));
        assert_eq!(b.id, SimulationId::new(2));
        assert_eq!(map.id, MapId::new(1));
    }

    #[tokio::test]
    async fn update_overwrites_and_counts() {
        let store = MemoryStore::new();
        let mut sim = store.insert_simulation(&draft("a")).await;
        sim.status = SimulationStatus::Running;

        assert!(store.update_simulation(&sim).await.is_ok());
        assert_eq!(store.simulation_update_count(), 1);
        let loaded = store.find_simulation(sim.id).await;
        assert_eq!(loaded.map(|s| s.status), Some(SimulationStatus::Running));
    }

    #[tokio::test]
    async fn update_of_missing_record_is_not_found() {
        let store = MemoryStore::new();
        let mut sim = draft("ghost");
        sim.id = SimulationId::new(99);

        let err = store.update_simulation(&sim).await;
        assert!(err.as_ref().is_err_and(DbError::is_not_found));
        assert_eq!(store.simulation_update_count(), 0);
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() {
        let store = MemoryStore::new();
        let vehicle = store.insert_vehicle("Jaguar", "file:///vehicles/jaguar").await;

        assert!(store.delete_vehicle(vehicle.id).await);
        assert!(!store.delete_vehicle(vehicle.id).await);
        assert!(store.find_vehicle(vehicle.id).await.is_none());
    }

    #[tokio::test]
    async fn seeded_ids_push_the_counter_forward() {
        let store = MemoryStore::new();
        let mut seeded = draft("seeded");
        seeded.id = SimulationId::new(42);
        store.seed_simulation(&seeded).await;

        let next = store.insert_simulation(&draft("next")).await;
        assert_eq!(next.id, SimulationId::new(43));
        assert_eq!(store.simulation_update_count(), 0);
        assert!(store.find_simulation(SimulationId::new(42)).await.is_some());
    }
}
