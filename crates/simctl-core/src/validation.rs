//! Validation rules checked before a simulation is created, edited,
//! started or stopped.
//!
//! Rules run against the store at transition time, so a map deleted after
//! the simulation was created fails the next start. Each rule returns
//! `Ok(())` or a [`ValidationError`]; store failures are reported
//! separately from rule failures so the caller can tell "invalid" from
//! "could not check".

use simctl_db::{DbError, Store};
use simctl_types::Simulation;
use tracing::debug;

use crate::projection::decode_vehicle_ids;

/// Message reported when the map rule fails.
pub const INVALID_MAP_MESSAGE: &str = "You must specify a valid map id";

/// A single validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// The simulation must reference an existing map.
    ValidMap,
    /// Every attached vehicle must exist.
    ValidVehicles,
}

/// Why validation did not pass.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// A rule rejected the simulation.
    #[error("{message}")]
    Rejected {
        /// The rule that failed.
        rule: Rule,
        /// Human-readable reason.
        message: String,
    },

    /// The store could not be queried.
    #[error("validation lookup failed: {0}")]
    Store(#[from] DbError),
}

/// An ordered set of rules applied together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Rules applied on create and edit.
    pub fn for_create() -> Self {
        Self {
            rules: vec![Rule::ValidMap],
        }
    }

    /// Rules applied on start and stop. The vehicle rule is opt-in.
    pub fn for_transition(check_vehicles: bool) -> Self {
        let mut rules = vec![Rule::ValidMap];
        if check_vehicles {
            rules.push(Rule::ValidVehicles);
        }
        Self { rules }
    }

    /// The rules in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Check every rule in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Rejected`] naming the first failing
    /// rule, or [`ValidationError::Store`] if a lookup fails.
    pub async fn validate(&self, store: &Store, sim: &Simulation) -> Result<(), ValidationError> {
        for rule in &self.rules {
            match rule {
                Rule::ValidMap => validate_map(store, sim).await?,
                Rule::ValidVehicles => validate_vehicles(store, sim).await?,
            }
        }
        Ok(())
    }
}

/// The simulation must reference a map that exists right now.
///
/// # Errors
///
/// Returns [`ValidationError::Rejected`] with [`INVALID_MAP_MESSAGE`] if
/// the map is unset or missing.
pub async fn validate_map(store: &Store, sim: &Simulation) -> Result<(), ValidationError> {
    let Some(map_id) = sim.map else {
        debug!(simulation_id = %sim.id, "Failed map validation: no map id set");
        return Err(rejected(Rule::ValidMap, INVALID_MAP_MESSAGE.to_owned()));
    };

    if store.find_map(map_id).await?.is_none() {
        debug!(
            simulation_id = %sim.id,
            map_id = %map_id,
            "Failed map validation: there is no map with this id"
        );
        return Err(rejected(Rule::ValidMap, INVALID_MAP_MESSAGE.to_owned()));
    }
    Ok(())
}

/// Every id in the simulation's vehicle encoding must resolve to a vehicle.
///
/// A simulation without vehicles passes.
///
/// # Errors
///
/// Returns [`ValidationError::Rejected`] naming the first missing or
/// malformed vehicle id.
pub async fn validate_vehicles(store: &Store, sim: &Simulation) -> Result<(), ValidationError> {
    let encoded = sim.vehicles.as_deref().unwrap_or_default();
    let ids = decode_vehicle_ids(encoded).map_err(|e| {
        debug!(simulation_id = %sim.id, error = %e, "Failed vehicle validation");
        rejected(
            Rule::ValidVehicles,
            format!("There is no vehicle with id {}", e.token),
        )
    })?;

    for vehicle_id in ids {
        if store.find_vehicle(vehicle_id).await?.is_none() {
            debug!(
                simulation_id = %sim.id,
                vehicle_id = %vehicle_id,
                "Failed vehicle validation: there is no vehicle with this id"
            );
            return Err(rejected(
                Rule::ValidVehicles,
                format!("There is no vehicle with id {vehicle_id}"),
            ));
        }
    }
    Ok(())
}

const fn rejected(rule: Rule, message: String) -> ValidationError {
    ValidationError::Rejected { rule, message }
}

#[cfg(test)]
mod tests {
    use simctl_types::MapId;

    use super::*;

    async fn store_with_map() -> (Store, MapId) {
        let store = Store::memory();
        let map = store.insert_map("Borregas Ave", "file:///maps/borregas").await;
        let id = map.map(|m| m.id).unwrap_or_default();
        (store, id)
    }

    fn rejected_rule(result: &Result<(), ValidationError>) -> Option<(Rule, String)> {
        match result {
            Err(ValidationError::Rejected { rule, message }) => Some((*rule, message.clone())),
            _ => None,
        }
    }

    #[tokio::test]
    async fn existing_map_passes() {
        let (store, map_id) = store_with_map().await;
        let sim = Simulation {
            map: Some(map_id),
            ..Simulation::default()
        };
        assert!(RuleSet::for_create().validate(&store, &sim).await.is_ok());
    }

    #[tokio::test]
    async fn missing_or_unset_map_fails() {
        let (store, _) = store_with_map().await;
        for map in [None, Some(MapId::new(404))] {
            let sim = Simulation {
                map,
                ..Simulation::default()
            };
            let result = validate_map(&store, &sim).await;
            assert_eq!(
                rejected_rule(&result),
                Some((Rule::ValidMap, INVALID_MAP_MESSAGE.to_owned()))
            );
        }
    }

    #[tokio::test]
    async fn vehicle_rule_names_first_missing_vehicle() {
        let (store, map_id) = store_with_map().await;
        let vehicle = store.insert_vehicle("Jaguar", "/vehicles/jaguar").await;
        let known = vehicle.map(|v| v.id).unwrap_or_default();

        let sim = Simulation {
            map: Some(map_id),
            vehicles: Some(format!("{known},77,78")),
            ..Simulation::default()
        };
        let result = validate_vehicles(&store, &sim).await;
        assert_eq!(
            rejected_rule(&result),
            Some((
                Rule::ValidVehicles,
                String::from("There is no vehicle with id 77")
            ))
        );
    }

    #[tokio::test]
    async fn malformed_vehicle_encoding_fails() {
        let (store, _) = store_with_map().await;
        let sim = Simulation {
            vehicles: Some(String::from("abc")),
            ..Simulation::default()
        };
        let result = validate_vehicles(&store, &sim).await;
        assert_eq!(
            rejected_rule(&result).map(|(rule, _)| rule),
            Some(Rule::ValidVehicles)
        );
    }

    #[tokio::test]
    async fn no_vehicles_passes_vehicle_rule() {
        let (store, _) = store_with_map().await;
        let sim = Simulation::default();
        assert!(validate_vehicles(&store, &sim).await.is_ok());
    }

    #[test]
    fn transition_rules_include_vehicles_only_when_enabled() {
        assert_eq!(RuleSet::for_transition(false).rules(), &[Rule::ValidMap]);
        assert_eq!(
            RuleSet::for_transition(true).rules(),
            &[Rule::ValidMap, Rule::ValidVehicles]
        );
    }

    #[tokio::test]
    async fn map_rule_runs_before_vehicle_rule() {
        let (store, _) = store_with_map().await;
        let sim = Simulation {
            map: None,
            vehicles: Some(String::from("99")),
            ..Simulation::default()
        };
        let result = RuleSet::for_transition(true).validate(&store, &sim).await;
        assert_eq!(
            rejected_rule(&result).map(|(rule, _)| rule),
            Some(Rule::ValidMap)
        );
    }
}
