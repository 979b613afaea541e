//! The simulation lifecycle controller.
//!
//! [`LifecycleController`] owns every status transition:
//!
//! ```text
//! Idle ──start──> Initializing ──loaded──> Running ──stop──> Deinitializing ──delay──> Idle
//!                      │
//!                      └──load failed / validation failed──> Invalid
//! ```
//!
//! Each transition for a given id runs under that id's transition lock, so
//! two requests for the same simulation never interleave. A single active
//! slot records which simulation is mid-lifecycle; starting a second one
//! while the first is still active is a conflict.
//!
//! Record edits also run under the transition lock so they never write
//! back a status that a concurrent transition has already replaced.
//!
//! Stopping a running simulation marks it `Deinitializing` immediately and
//! schedules the move to `Idle` on a background task after
//! `lifecycle.deinit_delay_ms`. Starting the same simulation again before
//! the delay elapses cancels the pending task.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError};

use simctl_db::Store;
use simctl_types::{Simulation, SimulationId, SimulationRequest, SimulationStatus};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::assets::{
    AssetEventReceiver, AssetLoadEvent, AssetLoadOutcome, AssetLoader, storage_location,
};
use crate::config::LifecycleConfig;
use crate::error::LifecycleError;
use crate::notifier::Notifier;
use crate::projection::apply_request;
use crate::validation::{INVALID_MAP_MESSAGE, Rule, RuleSet, ValidationError};

/// A scheduled move from `Deinitializing` to `Idle`.
struct PendingDeinit {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Per-id transition locks.
///
/// An entry exists only while some task holds or waits on it.
#[derive(Default)]
struct LockTable {
    entries: std::sync::Mutex<BTreeMap<SimulationId, Arc<Mutex<()>>>>,
}

impl LockTable {
    fn entries(&self) -> MutexGuard<'_, BTreeMap<SimulationId, Arc<Mutex<()>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries().len()
    }
}

/// Holds the transition lock for one id and prunes its table entry on drop.
struct TransitionGuard {
    id: SimulationId,
    table: Arc<LockTable>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TransitionGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut entries = self.table.entries();
        if entries
            .get(&self.id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            entries.remove(&self.id);
        }
    }
}

struct Inner {
    store: Arc<Store>,
    notifier: Notifier,
    assets: AssetLoader,
    config: LifecycleConfig,
    locks: Arc<LockTable>,
    active: Mutex<Option<SimulationId>>,
    pending: Mutex<BTreeMap<SimulationId, PendingDeinit>>,
    next_generation: AtomicU64,
}

/// Drives simulations through their lifecycle.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct LifecycleController {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("backend", &self.inner.store.backend())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl LifecycleController {
    /// Create a controller over the given collaborators.
    pub fn new(
        store: Arc<Store>,
        notifier: Notifier,
        assets: AssetLoader,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                notifier,
                assets,
                config,
                locks: Arc::new(LockTable::default()),
                active: Mutex::new(None),
                pending: Mutex::new(BTreeMap::new()),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    /// The store this controller persists to.
    pub fn store(&self) -> &Arc<Store> {
        &self.inner.store
    }

    /// The notifier this controller publishes to.
    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    /// The simulation currently holding the active slot, if any.
    pub async fn active_simulation(&self) -> Option<SimulationId> {
        *self.inner.active.lock().await
    }

    /// Whether a move to `Idle` is scheduled for `id`.
    pub async fn has_pending_deinit(&self, id: SimulationId) -> bool {
        self.inner.pending.lock().await.contains_key(&id)
    }

    // -----------------------------------------------------------------------
    // Start
    // -----------------------------------------------------------------------

    /// Start a simulation.
    ///
    /// Validates the simulation, claims the active slot, marks it
    /// `Initializing` and hands its map to the asset loader. Returns the
    /// persisted simulation.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::NotFound`] if `id` is unknown.
    /// - [`LifecycleError::ValidationFailed`] if a rule fails; the
    ///   simulation is persisted as `Invalid` first.
    /// - [`LifecycleError::Conflict`] if another simulation is active.
    /// - [`LifecycleError::Internal`] on store failures.
    pub async fn start(&self, id: SimulationId) -> Result<Simulation, LifecycleError> {
        let _guard = self.lock(id).await;
        let mut sim = self.inner.store.get_simulation(id).await?;

        self.cancel_deinit(id).await;

        let rules = RuleSet::for_transition(self.inner.config.validate_vehicles_on_transition);
        if let Err(e) = rules.validate(&self.inner.store, &sim).await {
            return Err(self.reject_start(sim, e).await);
        }

        let map = match sim.map {
            Some(map_id) => self.inner.store.find_map(map_id).await?,
            None => None,
        };
        let Some(map) = map else {
            let rejection = ValidationError::Rejected {
                rule: Rule::ValidMap,
                message: INVALID_MAP_MESSAGE.to_owned(),
            };
            return Err(self.reject_start(sim, rejection).await);
        };

        self.claim_active(id).await?;

        sim.status = SimulationStatus::Initializing;
        self.inner.store.update_simulation(&sim).await?;
        self.inner.notifier.notify_update(&sim);
        info!(simulation_id = %id, map_id = %map.id, "Simulation initializing");

        let location = storage_location(&map.url);
        self.inner.assets.load(id, &location);

        Ok(sim)
    }

    /// Persist `Invalid` after a failed start validation and build the error.
    async fn reject_start(&self, mut sim: Simulation, err: ValidationError) -> LifecycleError {
        let message = match err {
            ValidationError::Rejected { message, .. } => message,
            ValidationError::Store(db) => return LifecycleError::from(db),
        };
        warn!(
            simulation_id = %sim.id,
            reason = %message,
            "Simulation failed validation on start"
        );

        sim.status = SimulationStatus::Invalid;
        if let Err(e) = self.inner.store.update_simulation(&sim).await {
            return LifecycleError::from(e);
        }
        self.inner.notifier.notify_update(&sim);
        self.release_active(sim.id).await;

        LifecycleError::ValidationFailed(message)
    }

    /// Take the active slot for `id`.
    async fn claim_active(&self, id: SimulationId) -> Result<(), LifecycleError> {
        let mut active = self.inner.active.lock().await;
        if let Some(holder) = active.filter(|holder| *holder != id) {
            let holder_status = self
                .inner
                .store
                .find_simulation(holder)
                .await?
                .map(|s| s.status);
            if holder_status.is_some_and(SimulationStatus::is_active) {
                warn!(
                    simulation_id = %id,
                    active_id = %holder,
                    "Start rejected, another simulation is active"
                );
                return Err(LifecycleError::Conflict(format!(
                    "Simulation {holder} is already active"
                )));
            }
            debug!(simulation_id = %id, stale_id = %holder, "Replacing stale active slot");
        }
        *active = Some(id);
        Ok(())
    }

    /// Clear the active slot if it names `id`.
    async fn release_active(&self, id: SimulationId) {
        let mut active = self.inner.active.lock().await;
        if *active == Some(id) {
            *active = None;
            debug!(simulation_id = %id, "Released active slot");
        }
    }

    // -----------------------------------------------------------------------
    // Edit
    // -----------------------------------------------------------------------

    /// Replace the editable fields of a simulation.
    ///
    /// The record is read and written under the transition lock, so the
    /// status written back is always the current one.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::NotFound`] if `id` is unknown.
    /// - [`LifecycleError::ValidationFailed`] if the edited record fails the
    ///   map rule; nothing is written.
    /// - [`LifecycleError::Internal`] on store failures.
    pub async fn edit(
        &self,
        id: SimulationId,
        req: &SimulationRequest,
    ) -> Result<Simulation, LifecycleError> {
        let _guard = self.lock(id).await;
        let existing = self.inner.store.get_simulation(id).await?;
        let edited = apply_request(&existing, req);

        RuleSet::for_create()
            .validate(&self.inner.store, &edited)
            .await
            .map_err(|e| match e {
                ValidationError::Rejected { message, .. } => {
                    debug!(simulation_id = %id, reason = %message, "Edit rejected");
                    LifecycleError::ValidationFailed(message)
                }
                ValidationError::Store(db) => LifecycleError::from(db),
            })?;

        self.inner.store.update_simulation(&edited).await?;
        info!(simulation_id = %id, status = %edited.status, "Simulation updated");
        Ok(edited)
    }

    // -----------------------------------------------------------------------
    // Initialization completion
    // -----------------------------------------------------------------------

    /// Mark an `Initializing` simulation as `Running`.
    ///
    /// Any other status is left alone and logged. Returns the simulation as
    /// it is after the call.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] if `id` is unknown, or
    /// [`LifecycleError::Internal`] on store failures.
    pub async fn complete_initialization(
        &self,
        id: SimulationId,
    ) -> Result<Simulation, LifecycleError> {
        let _guard = self.lock(id).await;
        let mut sim = self.inner.store.get_simulation(id).await?;

        if sim.status != SimulationStatus::Initializing {
            warn!(
                simulation_id = %id,
                status = %sim.status,
                "Ignoring load completion, simulation is not initializing"
            );
            return Ok(sim);
        }

        sim.status = SimulationStatus::Running;
        self.inner.store.update_simulation(&sim).await?;
        self.inner.notifier.notify_update(&sim);
        info!(simulation_id = %id, "Simulation running");
        Ok(sim)
    }

    /// Mark an `Initializing` simulation as `Invalid` and free the active
    /// slot.
    ///
    /// Any other status is left alone and logged.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] if `id` is unknown, or
    /// [`LifecycleError::Internal`] on store failures.
    pub async fn fail_initialization(
        &self,
        id: SimulationId,
        reason: &str,
    ) -> Result<Simulation, LifecycleError> {
        let _guard = self.lock(id).await;
        let mut sim = self.inner.store.get_simulation(id).await?;

        if sim.status != SimulationStatus::Initializing {
            warn!(
                simulation_id = %id,
                status = %sim.status,
                reason,
                "Ignoring load failure, simulation is not initializing"
            );
            return Ok(sim);
        }

        sim.status = SimulationStatus::Invalid;
        self.inner.store.update_simulation(&sim).await?;
        self.inner.notifier.notify_update(&sim);
        self.release_active(id).await;
        error!(simulation_id = %id, reason, "Simulation failed to initialize");
        Ok(sim)
    }

    /// Apply one asset load report.
    pub async fn handle_asset_event(&self, event: AssetLoadEvent) {
        let id = event.simulation_id;
        let result = match event.outcome {
            AssetLoadOutcome::Loaded => self.complete_initialization(id).await,
            AssetLoadOutcome::Failed(reason) => self.fail_initialization(id, &reason).await,
        };
        if let Err(e) = result {
            warn!(
                simulation_id = %id,
                location = %event.location,
                error = %e,
                "Failed to apply asset load result"
            );
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Stop a simulation.
    ///
    /// A `Running` simulation moves to `Deinitializing` before this returns
    /// and to `Idle` after the configured delay. Any other status is
    /// acknowledged without effect.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::NotFound`] if `id` is unknown.
    /// - [`LifecycleError::ValidationFailed`] if a rule fails; nothing is
    ///   torn down.
    /// - [`LifecycleError::Internal`] on store failures.
    pub async fn stop(&self, id: SimulationId) -> Result<(), LifecycleError> {
        let _guard = self.lock(id).await;
        let sim = self.inner.store.get_simulation(id).await?;

        let rules = RuleSet::for_transition(self.inner.config.validate_vehicles_on_transition);
        rules.validate(&self.inner.store, &sim).await.map_err(|e| match e {
            ValidationError::Rejected { message, .. } => {
                warn!(
                    simulation_id = %id,
                    reason = %message,
                    "Simulation failed validation on stop"
                );
                LifecycleError::ValidationFailed(message)
            }
            ValidationError::Store(db) => LifecycleError::from(db),
        })?;

        if sim.status != SimulationStatus::Running {
            debug!(simulation_id = %id, status = %sim.status, "Stop without teardown");
            return Ok(());
        }

        self.begin_deinit(id).await?;
        self.schedule_deinit(id).await;
        Ok(())
    }

    /// First deinit step: reload and mark `Deinitializing`.
    async fn begin_deinit(&self, id: SimulationId) -> Result<(), LifecycleError> {
        let Some(mut sim) = self.inner.store.find_simulation(id).await? else {
            warn!(simulation_id = %id, "Simulation vanished before deinit");
            return Ok(());
        };
        sim.status = SimulationStatus::Deinitializing;
        self.inner.store.update_simulation(&sim).await?;
        self.inner.notifier.notify_update(&sim);
        info!(simulation_id = %id, "Simulation deinitializing");
        Ok(())
    }

    /// Schedule the second deinit step, replacing any earlier schedule.
    async fn schedule_deinit(&self, id: SimulationId) {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::AcqRel);
        let delay = self.inner.config.deinit_delay();
        let controller = self.clone();

        let mut pending = self.inner.pending.lock().await;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            controller.finish_deinit(id, generation).await;
        });
        if let Some(previous) = pending.insert(id, PendingDeinit { generation, handle }) {
            previous.handle.abort();
        }
        debug!(
            simulation_id = %id,
            generation,
            delay_ms = self.inner.config.deinit_delay_ms,
            "Scheduled deinit"
        );
    }

    /// Abort a scheduled second step for `id`, if one is pending.
    async fn cancel_deinit(&self, id: SimulationId) {
        let previous = self.inner.pending.lock().await.remove(&id);
        if let Some(previous) = previous {
            previous.handle.abort();
            info!(
                simulation_id = %id,
                generation = previous.generation,
                "Cancelled pending deinit"
            );
        }
    }

    /// Second deinit step: reload and mark `Idle`.
    async fn finish_deinit(&self, id: SimulationId, generation: u64) {
        let _guard = self.lock(id).await;

        {
            let mut pending = self.inner.pending.lock().await;
            match pending.get(&id) {
                Some(entry) if entry.generation == generation => {
                    pending.remove(&id);
                }
                _ => {
                    debug!(simulation_id = %id, generation, "Deinit superseded");
                    return;
                }
            }
        }

        let mut sim = match self.inner.store.find_simulation(id).await {
            Ok(Some(sim)) => sim,
            Ok(None) => {
                warn!(simulation_id = %id, "Simulation vanished before deinit completed");
                self.release_active(id).await;
                return;
            }
            Err(e) => {
                error!(
                    simulation_id = %id,
                    error = %e,
                    "Failed to reload simulation for deinit"
                );
                return;
            }
        };

        sim.status = SimulationStatus::Idle;
        if let Err(e) = self.inner.store.update_simulation(&sim).await {
            error!(simulation_id = %id, error = %e, "Failed to persist idle simulation");
            return;
        }
        self.inner.notifier.notify_update(&sim);
        self.release_active(id).await;
        info!(simulation_id = %id, "Simulation idle");
    }

    // -----------------------------------------------------------------------
    // Locks
    // -----------------------------------------------------------------------

    /// Acquire the transition lock for `id`.
    async fn lock(&self, id: SimulationId) -> TransitionGuard {
        let lock = Arc::clone(self.inner.locks.entries().entry(id).or_default());
        TransitionGuard {
            id,
            table: Arc::clone(&self.inner.locks),
            guard: Some(lock.lock_owned().await),
        }
    }
}

/// Feed asset load reports to the controller until the channel closes.
pub fn spawn_asset_listener(
    controller: LifecycleController,
    mut events: AssetEventReceiver,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            controller.handle_asset_event(event).await;
        }
        debug!("Asset event channel closed, listener exiting");
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use simctl_types::{ClientMessage, MapId};
    use tokio::sync::broadcast;

    use super::*;
    use crate::assets::{StubAssetLoader, asset_channel};
    use crate::error::ErrorKind;

    struct Harness {
        store: Arc<Store>,
        controller: LifecycleController,
        updates: broadcast::Receiver<ClientMessage>,
        loader: StubAssetLoader,
        map: MapId,
    }

    async fn harness() -> Harness {
        harness_with(LifecycleConfig::default()).await
    }

    async fn harness_with(config: LifecycleConfig) -> Harness {
        let store = Arc::new(Store::memory());
        let map = store
            .insert_map("Borregas Ave", "file:///maps/borregas")
            .await
            .map(|m| m.id)
            .unwrap_or_default();
        let notifier = Notifier::new(64);
        let updates = notifier.subscribe();
        let loader = StubAssetLoader::new();
        let controller = LifecycleController::new(
            Arc::clone(&store),
            notifier,
            AssetLoader::Stub(loader.clone()),
            config,
        );
        Harness {
            store,
            controller,
            updates,
            loader,
            map,
        }
    }

    impl Harness {
        async fn seed(&self, id: i64, status: SimulationStatus, map: Option<MapId>) -> SimulationId {
            let sim = Simulation {
                id: SimulationId::new(id),
                name: format!("sim-{id}"),
                status,
                map,
                ..Simulation::default()
            };
            if let Store::Memory(mem) = self.store.as_ref() {
                mem.seed_simulation(&sim).await;
            }
            sim.id
        }

        async fn status(&self, id: SimulationId) -> Option<SimulationStatus> {
            self.store
                .find_simulation(id)
                .await
                .ok()
                .flatten()
                .map(|s| s.status)
        }

        fn update_count(&self) -> u64 {
            match self.store.as_ref() {
                Store::Memory(mem) => mem.simulation_update_count(),
                Store::Postgres(_) => 0,
            }
        }

        fn drain_statuses(&mut self) -> Vec<(SimulationId, SimulationStatus)> {
            let mut seen = Vec::new();
            while let Ok(ClientMessage::SimulationUpdate(resp)) = self.updates.try_recv() {
                seen.push((resp.id, resp.status));
            }
            seen
        }
    }

    #[tokio::test]
    async fn start_of_unknown_simulation_is_not_found() {
        let h = harness().await;
        let err = h.controller.start(SimulationId::new(404)).await;
        assert_eq!(err.err().map(|e| e.kind()), Some(ErrorKind::NotFound));
        assert_eq!(h.update_count(), 0);
    }

    #[tokio::test]
    async fn stop_of_unknown_simulation_is_not_found() {
        let h = harness().await;
        let err = h.controller.stop(SimulationId::new(404)).await;
        assert_eq!(err.err().map(|e| e.kind()), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn start_with_missing_map_persists_invalid() {
        let mut h = harness().await;
        let id = h.seed(7, SimulationStatus::Idle, Some(MapId::new(999))).await;

        let result = h.controller.start(id).await;
        assert!(matches!(
            result,
            Err(LifecycleError::ValidationFailed(ref msg)) if msg == INVALID_MAP_MESSAGE
        ));
        assert_eq!(h.status(id).await, Some(SimulationStatus::Invalid));
        assert_eq!(h.drain_statuses(), vec![(id, SimulationStatus::Invalid)]);
        assert_eq!(h.controller.active_simulation().await, None);
        assert!(h.loader.requests().is_empty());
    }

    #[tokio::test]
    async fn valid_start_persists_once_and_claims_slot() {
        let mut h = harness().await;
        let id = h.seed(42, SimulationStatus::Idle, Some(h.map)).await;

        let started = h.controller.start(id).await;
        assert_eq!(
            started.ok().map(|s| s.status),
            Some(SimulationStatus::Initializing)
        );
        assert_eq!(h.update_count(), 1);
        assert_eq!(h.drain_statuses(), vec![(id, SimulationStatus::Initializing)]);
        assert_eq!(h.controller.active_simulation().await, Some(id));
        assert_eq!(h.loader.requests(), vec![(id, String::from("/maps/borregas"))]);
    }

    #[tokio::test]
    async fn second_active_simulation_conflicts() {
        let h = harness().await;
        let first = h.seed(1, SimulationStatus::Idle, Some(h.map)).await;
        let second = h.seed(2, SimulationStatus::Idle, Some(h.map)).await;

        assert!(h.controller.start(first).await.is_ok());
        let err = h.controller.start(second).await;
        assert_eq!(err.err().map(|e| e.kind()), Some(ErrorKind::Conflict));
        assert_eq!(h.status(second).await, Some(SimulationStatus::Idle));
        assert_eq!(h.controller.active_simulation().await, Some(first));
    }

    #[tokio::test]
    async fn stale_slot_is_taken_over() {
        let h = harness().await;
        let first = h.seed(1, SimulationStatus::Idle, Some(h.map)).await;
        let second = h.seed(2, SimulationStatus::Idle, Some(h.map)).await;

        assert!(h.controller.start(first).await.is_ok());
        assert!(h.controller.fail_initialization(first, "disk gone").await.is_ok());
        assert_eq!(h.controller.active_simulation().await, None);

        assert!(h.controller.start(second).await.is_ok());
        assert_eq!(h.controller.active_simulation().await, Some(second));
    }

    #[tokio::test]
    async fn completion_moves_initializing_to_running() {
        let mut h = harness().await;
        let id = h.seed(3, SimulationStatus::Idle, Some(h.map)).await;
        assert!(h.controller.start(id).await.is_ok());

        h.controller
            .handle_asset_event(AssetLoadEvent {
                simulation_id: id,
                location: String::from("/maps/borregas"),
                outcome: AssetLoadOutcome::Loaded,
            })
            .await;

        assert_eq!(h.status(id).await, Some(SimulationStatus::Running));
        assert_eq!(
            h.drain_statuses(),
            vec![
                (id, SimulationStatus::Initializing),
                (id, SimulationStatus::Running)
            ]
        );
    }

    #[tokio::test]
    async fn completion_is_ignored_outside_initializing() {
        let h = harness().await;
        let id = h.seed(3, SimulationStatus::Idle, Some(h.map)).await;

        let sim = h.controller.complete_initialization(id).await;
        assert_eq!(sim.ok().map(|s| s.status), Some(SimulationStatus::Idle));
        assert_eq!(h.update_count(), 0);
    }

    #[tokio::test]
    async fn stop_of_idle_simulation_launches_nothing() {
        let mut h = harness().await;
        let id = h.seed(5, SimulationStatus::Idle, Some(h.map)).await;

        assert!(h.controller.stop(id).await.is_ok());
        assert!(h.controller.stop(id).await.is_ok());
        assert!(!h.controller.has_pending_deinit(id).await);
        assert_eq!(h.update_count(), 0);
        assert!(h.drain_statuses().is_empty());
    }

    #[tokio::test]
    async fn stop_validates_before_teardown() {
        let h = harness().await;
        let id = h.seed(6, SimulationStatus::Running, Some(MapId::new(999))).await;

        let err = h.controller.stop(id).await;
        assert_eq!(err.err().map(|e| e.kind()), Some(ErrorKind::ValidationFailed));
        assert_eq!(h.status(id).await, Some(SimulationStatus::Running));
        assert!(!h.controller.has_pending_deinit(id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn start_then_stop_runs_full_deinit_sequence() {
        let mut h = harness().await;
        let id = h.seed(42, SimulationStatus::Idle, Some(h.map)).await;

        assert!(h.controller.start(id).await.is_ok());
        assert!(h.controller.complete_initialization(id).await.is_ok());
        assert!(h.controller.stop(id).await.is_ok());

        assert_eq!(h.status(id).await, Some(SimulationStatus::Deinitializing));
        assert!(h.controller.has_pending_deinit(id).await);

        assert_eq!(
            h.drain_statuses(),
            vec![
                (id, SimulationStatus::Initializing),
                (id, SimulationStatus::Running),
                (id, SimulationStatus::Deinitializing),
            ]
        );

        tokio::time::sleep(Duration::from_millis(1999)).await;
        tokio::task::yield_now().await;
        assert_eq!(h.status(id).await, Some(SimulationStatus::Deinitializing));
        assert!(h.drain_statuses().is_empty());

        tokio::time::sleep(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(h.status(id).await, Some(SimulationStatus::Idle));
        assert!(!h.controller.has_pending_deinit(id).await);
        assert_eq!(h.controller.active_simulation().await, None);
        assert_eq!(h.drain_statuses(), vec![(id, SimulationStatus::Idle)]);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_during_deinit_cancels_pending_idle() {
        let h = harness().await;
        let id = h.seed(8, SimulationStatus::Running, Some(h.map)).await;
        {
            let mut active = h.controller.inner.active.lock().await;
            *active = Some(id);
        }

        assert!(h.controller.stop(id).await.is_ok());
        assert!(h.controller.start(id).await.is_ok());
        assert!(!h.controller.has_pending_deinit(id).await);

        tokio::time::sleep(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert_eq!(h.status(id).await, Some(SimulationStatus::Initializing));
        assert_eq!(h.controller.active_simulation().await, Some(id));
    }

    #[tokio::test(start_paused = true)]
    async fn deinit_of_deleted_simulation_is_a_no_op() {
        let h = harness().await;
        let id = h.seed(9, SimulationStatus::Running, Some(h.map)).await;

        assert!(h.controller.stop(id).await.is_ok());
        assert!(h.store.delete_simulation(id).await.unwrap_or(false));

        tokio::time::sleep(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;
        assert_eq!(h.status(id).await, None);
        assert!(!h.controller.has_pending_deinit(id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn configured_delay_is_honored() {
        let config = LifecycleConfig {
            deinit_delay_ms: 50,
            ..LifecycleConfig::default()
        };
        let h = harness_with(config).await;
        let id = h.seed(10, SimulationStatus::Running, Some(h.map)).await;

        assert!(h.controller.stop(id).await.is_ok());
        tokio::time::sleep(Duration::from_millis(60)).await;
        tokio::task::yield_now().await;
        assert_eq!(h.status(id).await, Some(SimulationStatus::Idle));
    }

    #[tokio::test]
    async fn vehicle_rule_applies_when_enabled() {
        let config = LifecycleConfig {
            validate_vehicles_on_transition: true,
            ..LifecycleConfig::default()
        };
        let h = harness_with(config).await;
        let sim = Simulation {
            id: SimulationId::new(11),
            map: Some(h.map),
            vehicles: Some(String::from("31")),
            ..Simulation::default()
        };
        if let Store::Memory(mem) = h.store.as_ref() {
            mem.seed_simulation(&sim).await;
        }

        let result = h.controller.start(sim.id).await;
        assert!(matches!(
            result,
            Err(LifecycleError::ValidationFailed(ref msg)) if msg == "There is no vehicle with id 31"
        ));
    }

    fn edit_request(name: &str, map: MapId) -> SimulationRequest {
        SimulationRequest {
            name: name.to_owned(),
            map: Some(map),
            ..SimulationRequest::default()
        }
    }

    #[tokio::test]
    async fn edit_keeps_status_and_rejects_bad_map() {
        let h = harness().await;
        let id = h.seed(12, SimulationStatus::Running, Some(h.map)).await;

        let edited = h.controller.edit(id, &edit_request("renamed", h.map)).await;
        let edited = edited.ok();
        assert_eq!(edited.as_ref().map(|s| s.name.as_str()), Some("renamed"));
        assert_eq!(edited.map(|s| s.status), Some(SimulationStatus::Running));

        let err = h
            .controller
            .edit(id, &edit_request("lost", MapId::new(999)))
            .await;
        assert!(matches!(
            err,
            Err(LifecycleError::ValidationFailed(ref msg)) if msg == INVALID_MAP_MESSAGE
        ));

        let err = h
            .controller
            .edit(SimulationId::new(404), &edit_request("ghost", h.map))
            .await;
        assert_eq!(err.err().map(|e| e.kind()), Some(ErrorKind::NotFound));
    }

    #[tokio::test(start_paused = true)]
    async fn edit_racing_deinit_never_restores_old_status() {
        let h = harness().await;
        let id = h.seed(13, SimulationStatus::Running, Some(h.map)).await;
        assert!(h.controller.stop(id).await.is_ok());

        // Hold the lock so the edit queues behind the second deinit step.
        let held = h.controller.lock(id).await;
        let editor = {
            let controller = h.controller.clone();
            let req = edit_request("edited", h.map);
            tokio::spawn(async move { controller.edit(id, &req).await })
        };
        tokio::time::sleep(Duration::from_millis(2100)).await;
        drop(held);

        let edited = editor.await.ok().and_then(Result::ok);
        tokio::time::sleep(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;

        assert_eq!(h.status(id).await, Some(SimulationStatus::Idle));
        assert!(!h.controller.has_pending_deinit(id).await);
        let sim = h.store.find_simulation(id).await.ok().flatten();
        assert_eq!(sim.map(|s| s.name), Some(String::from("edited")));
        assert!(edited.is_some());
    }

    #[tokio::test]
    async fn lock_table_does_not_grow_with_unknown_ids() {
        let h = harness().await;
        for raw in 1000..1500 {
            let id = SimulationId::new(raw);
            assert!(h.controller.start(id).await.is_err());
            assert!(h.controller.stop(id).await.is_err());
        }
        assert_eq!(h.controller.inner.locks.len(), 0);

        let id = h.seed(14, SimulationStatus::Idle, Some(h.map)).await;
        let held = h.controller.lock(id).await;
        assert_eq!(h.controller.inner.locks.len(), 1);
        drop(held);
        assert_eq!(h.controller.inner.locks.len(), 0);
    }

    #[tokio::test]
    async fn listener_applies_loader_reports() {
        let (tx, rx) = asset_channel(8);
        let store = Arc::new(Store::memory());
        let map = store
            .insert_map("Shalun", "/maps/shalun")
            .await
            .map(|m| m.id)
            .unwrap_or_default();
        let controller = LifecycleController::new(
            Arc::clone(&store),
            Notifier::new(8),
            AssetLoader::Stub(StubAssetLoader::completing(tx)),
            LifecycleConfig::default(),
        );
        let sim = store
            .insert_simulation(&Simulation {
                map: Some(map),
                ..Simulation::default()
            })
            .await
            .map(|s| s.id)
            .unwrap_or_default();
        let listener = spawn_asset_listener(controller.clone(), rx);

        assert!(controller.start(sim).await.is_ok());
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        let status = store.find_simulation(sim).await.ok().flatten().map(|s| s.status);
        assert_eq!(status, Some(SimulationStatus::Running));

        listener.abort();
    }
}
