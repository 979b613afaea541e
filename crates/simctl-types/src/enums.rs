//! Enumeration types for the simulation lifecycle.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Lifecycle status of a simulation.
///
/// Transitions follow a strict path:
///
/// ```text
/// Idle --start--> Initializing --assets loaded--> Running
///   ^                  |                              |
///   |            load failed                        stop
///   |                  v                              v
///   +----- Idle <-- (delay) <-- Deinitializing <------+
///
/// any state --start with failing validation--> Invalid
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum SimulationStatus {
    /// Not running; ready to be started.
    #[default]
    Idle,
    /// Start accepted, assets are being loaded.
    Initializing,
    /// Assets loaded and the simulation is live.
    Running,
    /// Teardown in progress; becomes `Idle` after the deinit delay.
    Deinitializing,
    /// The last start attempt failed validation.
    Invalid,
}

impl SimulationStatus {
    /// Canonical string form, as stored at rest and sent to clients.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Initializing => "Initializing",
            Self::Running => "Running",
            Self::Deinitializing => "Deinitializing",
            Self::Invalid => "Invalid",
        }
    }

    /// Whether the simulation occupies the active slot in this status.
    ///
    /// An `Initializing`, `Running` or `Deinitializing` simulation holds
    /// the single system-wide slot; `Idle` and `Invalid` ones do not.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Initializing | Self::Running | Self::Deinitializing)
    }
}

impl fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status string is not one of the known variants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown simulation status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for SimulationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Idle" => Ok(Self::Idle),
            "Initializing" => Ok(Self::Initializing),
            "Running" => Ok(Self::Running),
            "Deinitializing" => Ok(Self::Deinitializing),
            "Invalid" => Ok(Self::Invalid),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}
