use log::warn;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Dispatch status as reported by the backend. Wire values are matched
/// case-insensitively; anything unrecognized maps to `Unknown` instead of
/// failing the whole snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    Idle,
    MovingToPickup,
    Loading,
    InTransit,
    Unloading,
    Maintenance,
    Refused,
    Unknown,
}

impl VehicleStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "IDLE" => VehicleStatus::Idle,
            "MOVING_TO_PICKUP" => VehicleStatus::MovingToPickup,
            "LOADING" => VehicleStatus::Loading,
            "IN_TRANSIT" => VehicleStatus::InTransit,
            "UNLOADING" => VehicleStatus::Unloading,
            "MAINTENANCE" => VehicleStatus::Maintenance,
            "REFUSED" => VehicleStatus::Refused,
            _ => VehicleStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Idle => "IDLE",
            VehicleStatus::MovingToPickup => "MOVING_TO_PICKUP",
            VehicleStatus::Loading => "LOADING",
            VehicleStatus::InTransit => "IN_TRANSIT",
            VehicleStatus::Unloading => "UNLOADING",
            VehicleStatus::Maintenance => "MAINTENANCE",
            VehicleStatus::Refused => "REFUSED",
            VehicleStatus::Unknown => "UNKNOWN",
        }
    }
}

impl Default for VehicleStatus {
    fn default() -> Self {
        VehicleStatus::Unknown
    }
}

impl<'de> Deserialize<'de> for VehicleStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(raw) => Ok(VehicleStatus::parse(&raw)),
            _ => Ok(VehicleStatus::Unknown),
        }
    }
}

/// One vehicle's telemetry as pushed by the fleet topic. Superseded wholesale
/// by the next snapshot carrying the same identity.
///
/// The backend is sloppy about numeric types (positions arrive as strings,
/// numbers or null depending on the vehicle's lifecycle), so every numeric
/// field goes through a lenient deserializer. Positions fall back to NaN
/// (there is no meaningful zero coordinate), trip metrics to 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VehicleSnapshot {
    pub id: Option<i64>,
    pub plate_number: Option<String>,
    pub status: VehicleStatus,
    #[serde(deserialize_with = "de_lenient_f64")]
    pub current_lng: f64,
    #[serde(deserialize_with = "de_lenient_f64")]
    pub current_lat: f64,
    pub traveled_polyline: Option<String>,
    #[serde(deserialize_with = "de_lenient_metric")]
    pub route_distance: f64,
    #[serde(deserialize_with = "de_lenient_metric")]
    pub route_duration: f64,
    #[serde(deserialize_with = "de_lenient_metric")]
    pub waiting_duration: f64,
    #[serde(deserialize_with = "de_lenient_metric")]
    pub load_distance: f64,
    #[serde(deserialize_with = "de_lenient_metric")]
    pub load_duration: f64,
    #[serde(deserialize_with = "de_lenient_metric")]
    pub no_load_distance: f64,
    #[serde(deserialize_with = "de_lenient_metric")]
    pub no_load_duration: f64,
    #[serde(deserialize_with = "de_lenient_metric")]
    pub max_load_weight: f64,
    #[serde(deserialize_with = "de_lenient_metric")]
    pub current_load: f64,
    #[serde(deserialize_with = "de_lenient_metric")]
    pub wasted_load: f64,
    #[serde(deserialize_with = "de_lenient_metric")]
    pub total_shipping_volume: f64,
    #[serde(deserialize_with = "de_lenient_metric")]
    pub total_shipping_weight: f64,
    pub origin_name: Option<String>,
    pub destination_name: Option<String>,
}

impl Default for VehicleSnapshot {
    fn default() -> Self {
        Self {
            id: None,
            plate_number: None,
            status: VehicleStatus::Unknown,
            current_lng: f64::NAN,
            current_lat: f64::NAN,
            traveled_polyline: None,
            route_distance: 0.0,
            route_duration: 0.0,
            waiting_duration: 0.0,
            load_distance: 0.0,
            load_duration: 0.0,
            no_load_distance: 0.0,
            no_load_duration: 0.0,
            max_load_weight: 0.0,
            current_load: 0.0,
            wasted_load: 0.0,
            total_shipping_volume: 0.0,
            total_shipping_weight: 0.0,
            origin_name: None,
            destination_name: None,
        }
    }
}

impl VehicleSnapshot {
    /// Stable identity for the session: plate number when present, otherwise
    /// the numeric backend id.
    pub fn identity(&self) -> Option<String> {
        match &self.plate_number {
            Some(plate) if !plate.is_empty() => Some(plate.clone()),
            _ => self.id.map(|id| id.to_string()),
        }
    }
}

/// The entire fleet at one instant. Vehicles keep wire order; for map-shaped
/// payloads that is the (sorted) key order of the JSON object.
#[derive(Debug, Clone, Default)]
pub struct FleetSnapshot {
    pub vehicles: Vec<VehicleSnapshot>,
}

/// Converts one fleet topic message body into a snapshot.
///
/// The backend pushes either a JSON array (`List<VehicleDto>`) or a JSON
/// object keyed by vehicle id; object values are collected. Entries that fail
/// to deserialize or carry no identity are skipped with a warning, they never
/// fail the message.
pub fn parse_fleet_message(body: &str) -> Result<FleetSnapshot, serde_json::Error> {
    let value: Value = serde_json::from_str(body)?;
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(map) => map.into_iter().map(|(_, entry)| entry).collect(),
        other => {
            return Err(serde_json::Error::custom(format!(
                "expected fleet object or array, got {}",
                json_kind(&other)
            )))
        }
    };
    let mut vehicles = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<VehicleSnapshot>(entry) {
            Ok(vehicle) => {
                if vehicle.identity().is_some() {
                    vehicles.push(vehicle);
                } else {
                    warn!("skipping fleet entry without id or plate number");
                }
            }
            Err(e) => warn!("skipping malformed fleet entry: {}", e),
        }
    }
    Ok(FleetSnapshot { vehicles })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn de_lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    })
}

fn de_lenient_metric<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_array_shaped_payload() {
        let body = r#"[
            {"plateNumber": "A-100", "status": "IN_TRANSIT", "currentLng": "117.706775", "currentLat": "34.108575", "traveledPolyline": "1,2;3,4"},
            {"plateNumber": "B-200", "status": "idle", "currentLng": 116.1, "currentLat": 34.0}
        ]"#;
        let snapshot = parse_fleet_message(body).unwrap();
        assert_eq!(snapshot.vehicles.len(), 2);
        assert_eq!(snapshot.vehicles[0].status, VehicleStatus::InTransit);
        assert_eq!(snapshot.vehicles[0].current_lng, 117.706775);
        assert_eq!(snapshot.vehicles[1].status, VehicleStatus::Idle);
    }

    #[test]
    fn collects_values_of_map_shaped_payload() {
        let body = r#"{
            "B-200": {"plateNumber": "B-200", "status": "LOADING"},
            "A-100": {"plateNumber": "A-100", "status": "UNLOADING"}
        }"#;
        let snapshot = parse_fleet_message(body).unwrap();
        let ids: Vec<_> = snapshot
            .vehicles
            .iter()
            .map(|v| v.identity().unwrap())
            .collect();
        assert_eq!(ids, vec!["A-100", "B-200"]);
    }

    #[test]
    fn unknown_status_maps_to_unknown() {
        let body = r#"[{"plateNumber": "A", "status": "WARP_DRIVE"}]"#;
        let snapshot = parse_fleet_message(body).unwrap();
        assert_eq!(snapshot.vehicles[0].status, VehicleStatus::Unknown);
    }

    #[test]
    fn numeric_id_is_identity_fallback() {
        let body = r#"[{"id": 12, "status": "IDLE"}]"#;
        let snapshot = parse_fleet_message(body).unwrap();
        assert_eq!(snapshot.vehicles[0].identity().unwrap(), "12");
    }

    #[test]
    fn malformed_entries_are_skipped_not_fatal() {
        let body = r#"[{"plateNumber": "A-100"}, 42, {"status": "IDLE"}]"#;
        let snapshot = parse_fleet_message(body).unwrap();
        assert_eq!(snapshot.vehicles.len(), 1);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_fleet_message("{not json").is_err());
        assert!(parse_fleet_message("\"just a string\"").is_err());
    }

    #[test]
    fn null_position_is_nan_but_null_metrics_are_zero() {
        let body = r#"[{"plateNumber": "A", "currentLng": null, "routeDistance": null, "currentLoad": "garbage"}]"#;
        let snapshot = parse_fleet_message(body).unwrap();
        assert!(snapshot.vehicles[0].current_lng.is_nan());
        assert_eq!(snapshot.vehicles[0].route_distance, 0.0);
        assert_eq!(snapshot.vehicles[0].current_load, 0.0);
    }
}
