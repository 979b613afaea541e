//! Mapping between persisted simulations and their external shapes.
//!
//! [`to_response`] is the one projection used for every response body and
//! every notification, whichever transition produced the entity.
//! [`to_model`] and [`apply_request`] go the other way for the create and
//! edit paths.

use simctl_types::{
    Simulation, SimulationRequest, SimulationResponse, SimulationStatus, VehicleId, Weather,
};
use tracing::warn;

/// Separator of the at-rest vehicle encoding.
const VEHICLE_SEPARATOR: char = ',';

/// A token in a vehicle encoding that is not an integer id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed vehicle id {token:?}")]
pub struct MalformedVehicleId {
    /// The offending token, trimmed.
    pub token: String,
}

/// Encode vehicle ids for storage. An empty list encodes to `None`.
pub fn encode_vehicle_ids(ids: &[VehicleId]) -> Option<String> {
    if ids.is_empty() {
        return None;
    }
    let encoded = ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    Some(encoded)
}

/// Decode the at-rest vehicle encoding, preserving order.
///
/// An empty string decodes to an empty list.
///
/// # Errors
///
/// Returns [`MalformedVehicleId`] for the first token that is not an
/// integer.
pub fn decode_vehicle_ids(encoded: &str) -> Result<Vec<VehicleId>, MalformedVehicleId> {
    if encoded.trim().is_empty() {
        return Ok(Vec::new());
    }
    encoded
        .split(VEHICLE_SEPARATOR)
        .map(|token| {
            token.parse::<VehicleId>().map_err(|_parse| MalformedVehicleId {
                token: token.trim().to_owned(),
            })
        })
        .collect()
}

/// Project a stored simulation into its external representation.
///
/// Vehicles are decoded only when the stored encoding is non-empty;
/// malformed tokens are skipped and logged. The weather composite is
/// always present.
pub fn to_response(sim: &Simulation) -> SimulationResponse {
    let vehicles = sim
        .vehicles
        .as_deref()
        .filter(|encoded| !encoded.is_empty())
        .map(|encoded| {
            encoded
                .split(VEHICLE_SEPARATOR)
                .filter_map(|token| match token.parse::<VehicleId>() {
                    Ok(id) => Some(id),
                    Err(_) => {
                        warn!(
                            simulation_id = %sim.id,
                            token,
                            "Skipping malformed vehicle id in stored simulation"
                        );
                        None
                    }
                })
                .collect()
        });

    SimulationResponse {
        id: sim.id,
        name: sim.name.clone(),
        status: sim.status,
        map: sim.map,
        vehicles,
        api_only: sim.api_only,
        interactive: sim.interactive,
        off_screen: sim.off_screen,
        cluster: sim.cluster,
        time_of_day: sim.time_of_day,
        weather: Weather {
            rain: sim.rain,
            fog: sim.fog,
            wetness: sim.wetness,
            cloudiness: sim.cloudiness,
        },
    }
}

/// Build a new simulation record from a create request.
///
/// The record starts `Idle` with a placeholder id; the store assigns the
/// real one on insert.
pub fn to_model(req: &SimulationRequest) -> Simulation {
    let weather = req.weather.unwrap_or_default();
    Simulation {
        id: simctl_types::SimulationId::default(),
        name: req.name.clone(),
        status: SimulationStatus::Idle,
        map: req.map,
        vehicles: encode_vehicle_ids(&req.vehicles),
        api_only: req.api_only,
        interactive: req.interactive,
        off_screen: req.off_screen,
        cluster: req.cluster,
        time_of_day: req.time_of_day,
        rain: weather.rain,
        fog: weather.fog,
        wetness: weather.wetness,
        cloudiness: weather.cloudiness,
    }
}

/// Replace the editable fields of `existing` with those of `req`.
///
/// The id and lifecycle status are kept; status only changes through the
/// lifecycle controller. Weather is replaced only when the request
/// carries it.
pub fn apply_request(existing: &Simulation, req: &SimulationRequest) -> Simulation {
    let mut edited = Simulation {
        id: existing.id,
        status: existing.status,
        ..to_model(req)
    };
    if req.weather.is_none() {
        edited.rain = existing.rain;
        edited.fog = existing.fog;
        edited.wetness = existing.wetness;
        edited.cloudiness = existing.cloudiness;
    }
    edited
}

#[cfg(test)]
mod tests {
    use simctl_types::{MapId, SimulationId};

    use super::*;

    fn ids(raw: &[i64]) -> Vec<VehicleId> {
        raw.iter().copied().map(VehicleId::new).collect()
    }

    #[test]
    fn vehicle_order_survives_create_and_projection() {
        let req = SimulationRequest {
            name: String::from("convoy"),
            map: Some(MapId::new(5)),
            vehicles: ids(&[3, 7, 12]),
            ..SimulationRequest::default()
        };

        let model = to_model(&req);
        assert_eq!(model.vehicles.as_deref(), Some("3,7,12"));

        let response = to_response(&model);
        assert_eq!(response.vehicles, Some(ids(&[3, 7, 12])));
    }

    #[test]
    fn empty_vehicle_list_is_not_stored() {
        assert_eq!(encode_vehicle_ids(&[]), None);

        let model = to_model(&SimulationRequest {
            name: String::from("solo"),
            ..SimulationRequest::default()
        });
        assert_eq!(to_response(&model).vehicles, None);
    }

    #[test]
    fn empty_encoding_projects_to_no_vehicles() {
        let sim = Simulation {
            vehicles: Some(String::new()),
            ..Simulation::default()
        };
        assert_eq!(to_response(&sim).vehicles, None);
    }

    #[test]
    fn decode_reports_first_malformed_token() {
        assert_eq!(decode_vehicle_ids(" 4, 5 "), Ok(ids(&[4, 5])));
        assert_eq!(decode_vehicle_ids(""), Ok(Vec::new()));
        assert_eq!(
            decode_vehicle_ids("4,x,y"),
            Err(MalformedVehicleId {
                token: String::from("x")
            })
        );
    }

    #[test]
    fn projection_skips_malformed_tokens() {
        let sim = Simulation {
            vehicles: Some(String::from("1,oops,2")),
            ..Simulation::default()
        };
        assert_eq!(to_response(&sim).vehicles, Some(ids(&[1, 2])));
    }

    #[test]
    fn weather_is_always_projected() {
        let sim = Simulation {
            rain: Some(0.5),
            ..Simulation::default()
        };
        let weather = to_response(&sim).weather;
        assert_eq!(weather.rain, Some(0.5));
        assert_eq!(weather.fog, None);
        assert_eq!(weather.cloudiness, None);
    }

    #[test]
    fn weather_values_are_stored_unclamped() {
        let req = SimulationRequest {
            name: String::from("storm"),
            weather: Some(Weather {
                rain: Some(1.5),
                fog: None,
                wetness: Some(-0.25),
                cloudiness: None,
            }),
            ..SimulationRequest::default()
        };
        let model = to_model(&req);
        assert_eq!(model.rain, Some(1.5));
        assert_eq!(model.wetness, Some(-0.25));
    }

    #[test]
    fn edit_keeps_identity_and_status() {
        let existing = Simulation {
            id: SimulationId::new(9),
            status: SimulationStatus::Running,
            name: String::from("old"),
            vehicles: Some(String::from("1")),
            ..Simulation::default()
        };
        let req = SimulationRequest {
            name: String::from("new"),
            map: Some(MapId::new(2)),
            ..SimulationRequest::default()
        };

        let edited = apply_request(&existing, &req);
        assert_eq!(edited.id, SimulationId::new(9));
        assert_eq!(edited.status, SimulationStatus::Running);
        assert_eq!(edited.name, "new");
        assert_eq!(edited.map, Some(MapId::new(2)));
        assert_eq!(edited.vehicles, None);
    }

    #[test]
    fn edit_without_weather_keeps_stored_weather() {
        let existing = Simulation {
            id: SimulationId::new(4),
            fog: Some(0.75),
            ..Simulation::default()
        };
        let req = SimulationRequest {
            name: String::from("foggy"),
            ..SimulationRequest::default()
        };
        assert_eq!(apply_request(&existing, &req).fog, Some(0.75));

        let clear = SimulationRequest {
            weather: Some(Weather::default()),
            ..req
        };
        assert_eq!(apply_request(&existing, &clear).fog, None);
    }
}
