//! Core entity structs for the simulation lifecycle service.
//!
//! Covers the persisted [`Simulation`] record, the asset records it
//! references ([`Map`], [`Vehicle`]), and the externally visible request,
//! response and notification shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use validator::Validate;

use crate::enums::SimulationStatus;
use crate::ids::{ClusterId, MapId, SimulationId, VehicleId};

// ---------------------------------------------------------------------------
// Persisted entities
// ---------------------------------------------------------------------------

/// A simulation as stored at rest.
///
/// Vehicle references are kept in their delimited at-rest encoding
/// (`"3,7,12"`) and weather is stored as four flat scalars. The
/// projection layer decodes both into the external representation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Simulation {
    /// Store-assigned identifier, immutable after creation.
    pub id: SimulationId,
    /// Display label.
    pub name: String,
    /// Current lifecycle status.
    pub status: SimulationStatus,
    /// Map the simulation runs on.
    pub map: Option<MapId>,
    /// Comma-delimited vehicle ids, `None` when no vehicles are attached.
    pub vehicles: Option<String>,
    /// Run without rendering clients, API control only.
    pub api_only: Option<bool>,
    /// Accept interactive control.
    pub interactive: Option<bool>,
    /// Render off screen.
    pub off_screen: Option<bool>,
    /// Cluster the simulation is scheduled on.
    pub cluster: Option<ClusterId>,
    /// Seed for the environmental time of day.
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

/// A map asset record. Only identity and location are modelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Map {
    /// Store-assigned identifier.
    pub id: MapId,
    /// Display label.
    pub name: String,
    /// Location reference of the asset bundle (`file://` URL or plain path).
    pub url: String,
}

/// A vehicle asset record. Only identity and location are modelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Vehicle {
    /// Store-assigned identifier.
    pub id: VehicleId,
    /// Display label.
    pub name: String,
    /// Location reference of the asset bundle.
    pub url: String,
}

// ---------------------------------------------------------------------------
// External representation
// ---------------------------------------------------------------------------

/// Weather composite exposed to clients. Every field is independently
/// optional.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Weather {
    /// Rain intensity.
    pub rain: Option<f32>,
    /// Fog density.
    pub fog: Option<f32>,
    /// Road wetness.
    pub wetness: Option<f32>,
    /// Cloud coverage.
    pub cloudiness: Option<f32>,
}

/// Payload accepted by the create and edit endpoints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Validate, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SimulationRequest {
    /// Display label.
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    /// Map id; checked against the store before the record is written.
    #[serde(default)]
    pub map: Option<MapId>,
    /// Ordered vehicle ids.
    #[serde(default)]
    pub vehicles: Vec<VehicleId>,
    /// Run without rendering clients.
    #[serde(default)]
    pub api_only: Option<bool>,
    /// Accept interactive control.
    #[serde(default)]
    pub interactive: Option<bool>,
    /// Render off screen.
    #[serde(default)]
    pub off_screen: Option<bool>,
    /// Cluster to schedule on.
    #[serde(default)]
    pub cluster: Option<ClusterId>,
    /// Environmental time of day.
    #[serde(default)]
    pub time_of_day: Option<DateTime<Utc>>,
    /// Weather settings; left untouched when absent.
    #[serde(default)]
    pub weather: Option<Weather>,
}

/// Externally visible representation of a [`Simulation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SimulationResponse {
    /// Simulation identifier.
    pub id: SimulationId,
    /// Display label.
    pub name: String,
    /// Lifecycle status.
    pub status: SimulationStatus,
    /// Map id.
    pub map: Option<MapId>,
    /// Decoded vehicle ids; `None` when the simulation has no vehicles.
    pub vehicles: Option<Vec<VehicleId>>,
    /// Run without rendering clients.
    pub api_only: Option<bool>,
    /// Accept interactive control.
    pub interactive: Option<bool>,
    /// Render off screen.
    pub off_screen: Option<bool>,
    /// Cluster id.
    pub cluster: Option<ClusterId>,
    /// Environmental time of day.
    pub time_of_day: Option<DateTime<Utc>>,
    /// Weather composite, always present.
    pub weather: Weather,
}

/// Payload for creating a map or vehicle record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AssetRequest {
    /// Display label.
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    /// Location reference of the asset bundle.
    #[validate(length(min = 1, message = "url must not be empty"))]
    pub url: String,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Typed event broadcast to every connected observer.
///
/// Serialized as `{"type": "SimulationUpdate", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload")]
#[ts(export, export_to = "bindings/")]
pub enum ClientMessage {
    /// A simulation changed status.
    SimulationUpdate(SimulationResponse),
}

impl ClientMessage {
    /// The event type name as it appears on the wire.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SimulationUpdate(_) => "SimulationUpdate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> SimulationResponse {
        SimulationResponse {
            id: SimulationId::new(42),
            name: String::from("Highway merge"),
            status: SimulationStatus::Initializing,
            map: Some(MapId::new(5)),
            vehicles: Some(vec![VehicleId::new(3), VehicleId::new(7)]),
            api_only: Some(false),
            interactive: None,
            off_screen: None,
            cluster: None,
            time_of_day: None,
            weather: Weather::default(),
        }
    }

    #[test]
    fn client_message_wire_shape() {
        let msg = ClientMessage::SimulationUpdate(sample_response());
        let json = serde_json::to_value(&msg).unwrap_or_default();
        assert_eq!(json["type"], "SimulationUpdate");
        assert_eq!(json["payload"]["id"], 42);
        assert_eq!(json["payload"]["status"], "Initializing");
        assert_eq!(json["payload"]["apiOnly"], false);
        assert_eq!(json["payload"]["vehicles"][1], 7);
        assert!(json["payload"]["weather"]["rain"].is_null());
        assert_eq!(msg.kind(), "SimulationUpdate");
    }

    #[test]
    fn request_accepts_minimal_payload() {
        let req: SimulationRequest =
            serde_json::from_str(r#"{"name": "Minimal"}"#).unwrap_or_default();
        assert_eq!(req.name, "Minimal");
        assert!(req.vehicles.is_empty());
        assert!(req.weather.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn request_with_empty_name_fails_validation() {
        let req = SimulationRequest::default();
        assert!(req.validate().is_err());
    }

    #[test]
    fn asset_request_requires_url() {
        let req = AssetRequest {
            name: String::from("Borregas Ave"),
            url: String::new(),
        };
        assert!(req.validate().is_err());
    }
}
