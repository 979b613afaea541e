//! `PostgreSQL`-backed record store.
//!
//! Uses runtime query construction (not compile-time checked) so the crate
//! builds without a live database. All queries are parameterized.

use chrono::{DateTime, Utc};
use simctl_types::{
    ClusterId, Map, MapId, Simulation, SimulationId, SimulationStatus, Vehicle, VehicleId,
};

use crate::error::DbError;
use crate::postgres::PostgresPool;

/// Column list shared by every `simulations` SELECT.
const SIMULATION_COLUMNS: &str = "id, name, status, map_id, vehicles, api_only, interactive, \
     off_screen, cluster_id, time_of_day, rain, fog, wetness, cloudiness";

/// Operations on the `simulations`, `maps` and `vehicles` tables.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PostgresPool,
}

impl PgStore {
    /// Create a store over an already connected pool.
    pub const fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool handle.
    pub const fn pool(&self) -> &PostgresPool {
        &self.pool
    }

    // -----------------------------------------------------------------------
    // Simulations
    // -----------------------------------------------------------------------

    /// Load a simulation by id, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails or
    /// [`DbError::InvalidRow`] if the stored status is unknown.
    pub async fn find_simulation(&self, id: SimulationId) -> Result<Option<Simulation>, DbError> {
        let row = sqlx::query_as::<_, SimulationRow>(&format!(
            "SELECT {SIMULATION_COLUMNS} FROM simulations WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(self.pool.pool())
        .await?;

        row.map(Simulation::try_from).transpose()
    }

    /// List all simulations ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list_simulations(&self) -> Result<Vec<Simulation>, DbError> {
        let rows = sqlx::query_as::<_, SimulationRow>(&format!(
            "SELECT {SIMULATION_COLUMNS} FROM simulations ORDER BY id"
        ))
        .fetch_all(self.pool.pool())
        .await?;

        rows.into_iter().map(Simulation::try_from).collect()
    }

    /// Insert a simulation and return it with its assigned id.
    ///
    /// The `id` field of the argument is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert_simulation(&self, sim: &Simulation) -> Result<Simulation, DbError> {
        let row: (i64,) = sqlx::query_as(
            r"INSERT INTO simulations
                (name, status, map_id, vehicles, api_only, interactive, off_screen,
                 cluster_id, time_of_day, rain, fog, wetness, cloudiness)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
              RETURNING id",
        )
        .bind(&sim.name)
        .bind(sim.status.as_str())
        .bind(sim.map.map(MapId::into_inner))
        .bind(sim.vehicles.as_deref())
        .bind(sim.api_only)
        .bind(sim.interactive)
        .bind(sim.off_screen)
        .bind(sim.cluster.map(ClusterId::into_inner))
        .bind(sim.time_of_day)
        .bind(sim.rain)
        .bind(sim.fog)
        .bind(sim.wetness)
        .bind(sim.cloudiness)
        .fetch_one(self.pool.pool())
        .await?;

        tracing::debug!(simulation_id = row.0, name = %sim.name, "Inserted simulation");

        let mut created = sim.clone();
        created.id = SimulationId::new(row.0);
        Ok(created)
    }

    /// Overwrite every column of an existing simulation.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no row has the simulation's id, or
    /// [`DbError::Postgres`] if the update fails.
    pub async fn update_simulation(&self, sim: &Simulation) -> Result<(), DbError> {
        let result = sqlx::query(
            r"UPDATE simulations
              SET name = $2, status = $3, map_id = $4, vehicles = $5, api_only = $6,
                  interactive = $7, off_screen = $8, cluster_id = $9, time_of_day = $10,
                  rain = $11, fog = $12, wetness = $13, cloudiness = $14
              WHERE id = $1",
        )
        .bind(sim.id.into_inner())
        .bind(&sim.name)
        .bind(sim.status.as_str())
        .bind(sim.map.map(MapId::into_inner))
        .bind(sim.vehicles.as_deref())
        .bind(sim.api_only)
        .bind(sim.interactive)
        .bind(sim.off_screen)
        .bind(sim.cluster.map(ClusterId::into_inner))
        .bind(sim.time_of_day)
        .bind(sim.rain)
        .bind(sim.fog)
        .bind(sim.wetness)
        .bind(sim.cloudiness)
        .execute(self.pool.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound {
                entity: "simulation",
                id: sim.id.into_inner(),
            });
        }
        Ok(())
    }

    /// Delete a simulation. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete_simulation(&self, id: SimulationId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM simulations WHERE id = $1")
            .bind(id.into_inner())
            .execute(self.pool.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Maps
    // -----------------------------------------------------------------------

    /// Load a map by id, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn find_map(&self, id: MapId) -> Result<Option<Map>, DbError> {
        let row = sqlx::query_as::<_, AssetRow>("SELECT id, name, url FROM maps WHERE id = $1")
            .bind(id.into_inner())
            .fetch_optional(self.pool.pool())
            .await?;
        Ok(row.map(AssetRow::into_map))
    }

    /// List all maps ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list_maps(&self) -> Result<Vec<Map>, DbError> {
        let rows = sqlx::query_as::<_, AssetRow>("SELECT id, name, url FROM maps ORDER BY id")
            .fetch_all(self.pool.pool())
            .await?;
        Ok(rows.into_iter().map(AssetRow::into_map).collect())
    }

    /// Insert a map record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert_map(&self, name: &str, url: &str) -> Result<Map, DbError> {
        let row = sqlx::query_as::<_, AssetRow>(
            "INSERT INTO maps (name, url) VALUES ($1, $2) RETURNING id, name, url",
        )
        .bind(name)
        .bind(url)
        .fetch_one(self.pool.pool())
        .await?;
        Ok(row.into_map())
    }

    /// Delete a map. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete_map(&self, id: MapId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM maps WHERE id = $1")
            .bind(id.into_inner())
            .execute(self.pool.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Vehicles
    // -----------------------------------------------------------------------

    /// Load a vehicle by id, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn find_vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>, DbError> {
        let row =
            sqlx::query_as::<_, AssetRow>("SELECT id, name, url FROM vehicles WHERE id = $1")
                .bind(id.into_inner())
                .fetch_optional(self.pool.pool())
                .await?;
        Ok(row.map(AssetRow::into_vehicle))
    }

    /// List all vehicles ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list_vehicles(&self) -> Result<Vec<Vehicle>, DbError> {
        let rows =
            sqlx::query_as::<_, AssetRow>("SELECT id, name, url FROM vehicles ORDER BY id")
                .fetch_all(self.pool.pool())
                .await?;
        Ok(rows.into_iter().map(AssetRow::into_vehicle).collect())
    }

    /// Insert a vehicle record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert_vehicle(&self, name: &str, url: &str) -> Result<Vehicle, DbError> {
        let row = sqlx::query_as::<_, AssetRow>(
            "INSERT INTO vehicles (name, url) VALUES ($1, $2) RETURNING id, name, url",
        )
        .bind(name)
        .bind(url)
        .fetch_one(self.pool.pool())
        .await?;
        Ok(row.into_vehicle())
    }

    /// Delete a vehicle. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete_vehicle(&self, id: VehicleId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM vehicles WHERE id = $1")
            .bind(id.into_inner())
            .execute(self.pool.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// A row from the `simulations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SimulationRow {
    /// Simulation id.
    pub id: i64,
    /// Display label.
    pub name: String,
    /// Status name, see [`SimulationStatus::as_str`].
    pub status: String,
    /// Referenced map id.
    pub map_id: Option<i64>,
    /// Comma-delimited vehicle ids.
    pub vehicles: Option<String>,
    /// API-only flag.
    pub api_only: Option<bool>,
    /// Interactive flag.
    pub interactive: Option<bool>,
    /// Off-screen flag.
    pub off_screen: Option<bool>,
    /// Cluster id.
    pub cluster_id: Option<i64>,
    /// Time of day seed.
    pub time_of_day: Option<DateTime<Utc>>,
    /// Rain intensity.
    pub rain: Option<f32>,
    /// Fog density.
    pub fog: Option<f32>,
    /// Road wetness.
    pub wetness: Option<f32>,
    /// Cloud coverage.
    pub cloudiness: Option<f32>,
}

impl TryFrom<SimulationRow> for Simulation {
    type Error = DbError;

    fn try_from(row: SimulationRow) -> Result<Self, Self::Error> {
        let status: SimulationStatus = row.status.parse().map_err(|e| DbError::InvalidRow {
            entity: "simulation",
            id: row.id,
            reason: format!("{e}"),
        })?;

        Ok(Self {
            id: SimulationId::new(row.id),
            name: row.name,
            status,
            map: row.map_id.map(MapId::new),
            vehicles: row.vehicles,
            api_only: row.api_only,
            interactive: row.interactive,
            off_screen: row.off_screen,
            cluster: row.cluster_id.map(ClusterId::new),
            time_of_day: row.time_of_day,
            rain: row.rain,
            fog: row.fog,
            wetness: row.wetness,
            cloudiness: row.cloudiness,
        })
    }
}

/// A row from the `maps` or `vehicles` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AssetRow {
    /// Record id.
    pub id: i64,
    /// Display label.
    pub name: String,
    /// Location reference.
    pub url: String,
}

impl AssetRow {
    fn into_map(self) -> Map {
        Map {
            id: MapId::new(self.id),
            name: self.name,
            url: self.url,
        }
    }

    fn into_vehicle(self) -> Vehicle {
        Vehicle {
            id: VehicleId::new(self.id),
            name: self.name,
            url: self.url,
        }
    }
}
