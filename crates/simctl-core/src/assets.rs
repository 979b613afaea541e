//! Asset loading for simulations entering `Initializing`.
//!
//! The controller hands the map's storage location to an [`AssetLoader`]
//! and returns immediately. The loader reports back with an
//! [`AssetLoadEvent`] on an `mpsc` channel; a listener task feeds those
//! events to the controller, which moves the simulation on to `Running`
//! or `Invalid`.
//!
//! Two loaders exist:
//!
//! - [`FsAssetLoader`] checks that the location exists on disk.
//! - [`StubAssetLoader`] records every request and optionally reports an
//!   immediate success. Used by tests and by deployments where an
//!   external process reports completion over HTTP.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use simctl_types::SimulationId;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// URL scheme stripped from map URLs to obtain a storage location.
const FILE_SCHEME: &str = "file://";

/// Derive the storage location of an asset from its URL.
///
/// `file://` URLs become plain paths; anything else is used verbatim.
pub fn storage_location(url: &str) -> String {
    url.strip_prefix(FILE_SCHEME).unwrap_or(url).to_owned()
}

/// How an asset load ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLoadOutcome {
    /// The assets are in place.
    Loaded,
    /// The assets could not be loaded.
    Failed(String),
}

/// Completion report for one load request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLoadEvent {
    /// The simulation the assets were loaded for.
    pub simulation_id: SimulationId,
    /// The storage location that was requested.
    pub location: String,
    /// Result of the load.
    pub outcome: AssetLoadOutcome,
}

/// Sender half used by loaders to report completion.
pub type AssetEventSender = mpsc::Sender<AssetLoadEvent>;

/// Receiver half drained by the controller's listener task.
pub type AssetEventReceiver = mpsc::Receiver<AssetLoadEvent>;

/// Create the completion channel shared by a loader and the listener.
pub fn asset_channel(capacity: usize) -> (AssetEventSender, AssetEventReceiver) {
    mpsc::channel(capacity.max(1))
}

/// The configured loader backend.
#[derive(Debug, Clone)]
pub enum AssetLoader {
    /// Filesystem-backed loader.
    Filesystem(FsAssetLoader),
    /// Recording loader.
    Stub(StubAssetLoader),
}

impl AssetLoader {
    /// Begin loading assets for a simulation. Never blocks; completion is
    /// reported on the loader's channel.
    pub fn load(&self, simulation_id: SimulationId, location: &str) {
        match self {
            Self::Filesystem(fs) => fs.load(simulation_id, location),
            Self::Stub(stub) => stub.load(simulation_id, location),
        }
    }
}

/// Checks asset locations on the local filesystem.
///
/// Relative locations are resolved against `root`, when one is set. Each
/// request is checked on its own tokio task.
#[derive(Debug, Clone)]
pub struct FsAssetLoader {
    root: Option<PathBuf>,
    events: AssetEventSender,
}

impl FsAssetLoader {
    /// Create a loader reporting on `events`.
    pub const fn new(root: Option<PathBuf>, events: AssetEventSender) -> Self {
        Self { root, events }
    }

    /// Resolve a storage location to a filesystem path.
    pub fn resolve(&self, location: &str) -> PathBuf {
        let path = Path::new(location);
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn load(&self, simulation_id: SimulationId, location: &str) {
        let path = self.resolve(location);
        let location = location.to_owned();
        let events = self.events.clone();

        tokio::spawn(async move {
            let outcome = match tokio::fs::metadata(&path).await {
                Ok(_) => {
                    info!(
                        simulation_id = %simulation_id,
                        path = %path.display(),
                        "Simulation assets available"
                    );
                    AssetLoadOutcome::Loaded
                }
                Err(e) => {
                    warn!(
                        simulation_id = %simulation_id,
                        path = %path.display(),
                        error = %e,
                        "Simulation assets unavailable"
                    );
                    AssetLoadOutcome::Failed(format!("Cannot load assets from {location}: {e}"))
                }
            };

            let event = AssetLoadEvent {
                simulation_id,
                location,
                outcome,
            };
            if events.send(event).await.is_err() {
                warn!(simulation_id = %simulation_id, "Asset listener gone, dropping load result");
            }
        });
    }
}

/// Records load requests; optionally reports each as loaded right away.
///
/// Clones share the same request log.
#[derive(Debug, Clone, Default)]
pub struct StubAssetLoader {
    requests: Arc<Mutex<Vec<(SimulationId, String)>>>,
    events: Option<AssetEventSender>,
}

impl StubAssetLoader {
    /// A loader that only records requests.
    pub fn new() -> Self {
        Self::default()
    }

    /// A loader that records requests and reports each as loaded.
    pub fn completing(events: AssetEventSender) -> Self {
        Self {
            requests: Arc::default(),
            events: Some(events),
        }
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<(SimulationId, String)> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn load(&self, simulation_id: SimulationId, location: &str) {
        debug!(simulation_id = %simulation_id, location, "Recording asset load");
        if let Ok(mut guard) = self.requests.lock() {
            guard.push((simulation_id, location.to_owned()));
        }

        if let Some(events) = &self.events {
            let event = AssetLoadEvent {
                simulation_id,
                location: location.to_owned(),
                outcome: AssetLoadOutcome::Loaded,
            };
            if let Err(e) = events.try_send(event) {
                warn!(simulation_id = %simulation_id, error = %e, "Could not report asset load");
            }
        }
    }
}
