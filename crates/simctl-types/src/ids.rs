//! Type-safe identifier wrappers around `i64`.
//!
//! Every persisted entity has a strongly-typed ID to prevent accidental
//! mixing of identifiers at compile time. IDs are assigned by the store
//! (`BIGSERIAL` in `PostgreSQL`, a counter in the in-memory store) and are
//! immutable once issued.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Generates a newtype wrapper around `i64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
        )]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw identifier value.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Return the inner `i64` value.
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = core::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a simulation.
    SimulationId
}

define_id! {
    /// Unique identifier for a map asset record.
    MapId
}

define_id! {
    /// Unique identifier for a vehicle asset record.
    VehicleId
}

define_id! {
    /// Grouping identifier for simulations that run on the same cluster.
    ClusterId
}
