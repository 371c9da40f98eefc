use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::IngestError;
use crate::geometry::{Coordinate, Waypoint};
use crate::mission::state::{MissionState, MissionStatus};
use crate::store::Details;

/// Periodic mission status broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMessage {
    pub status: MissionStatus,
    pub latlng: Option<[f64; 2]>,
    pub waypoints: Vec<[f64; 2]>,
}

impl From<&MissionState> for TelemetryMessage {
    fn from(state: &MissionState) -> Self {
        Self {
            status: state.status,
            latlng: state.current_position.map(|p| p.as_pair()),
            waypoints: state.waypoints.iter().map(Waypoint::as_pair).collect(),
        }
    }
}

/// Reading taken at one scan point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyDataMessage {
    pub plot_id: String,
    pub scan_point: Coordinate,
    #[serde(default)]
    pub details: Details,
}

/// Averaged survey values sent to the crop advisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryRequest {
    pub avg_values: BTreeMap<String, f64>,
}

/// Ranked crop suggestions returned by the crop advisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropAdvice {
    pub crops: Vec<String>,
    #[serde(default)]
    pub avg_values: BTreeMap<String, Value>,
    #[serde(default)]
    pub cropsdetailed: BTreeMap<String, String>,
}

/// Parse a plan payload: a JSON array of more than two `[lat, lon]` pairs.
pub fn parse_plan(topic: &str, payload: &[u8]) -> Result<Vec<Coordinate>, IngestError> {
    let value: Value =
        serde_json::from_slice(payload).map_err(|e| IngestError::malformed(topic, e))?;

    let Value::Array(points) = value else {
        return Err(IngestError::malformed(
            topic,
            "expected a list of [lat, lon] pairs",
        ));
    };
    if points.len() <= 2 {
        return Err(IngestError::malformed(
            topic,
            format!("expected more than 2 points, got {}", points.len()),
        ));
    }

    points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let pair = point.as_array().filter(|p| p.len() >= 2);
            let lat = pair.and_then(|p| p[0].as_f64());
            let lon = pair.and_then(|p| p[1].as_f64());
            match (lat, lon) {
                (Some(lat), Some(lon)) => Ok(Coordinate::new(lat, lon)),
                _ => Err(IngestError::malformed(
                    topic,
                    format!("point {} is not a [lat, lon] pair", i),
                )),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_plan_accepts_pairs() {
        let payload = br#"[[12.523,76.894],[12.523,76.896],[12.525,76.896],[12.525,76.894],[12.523,76.894]]"#;
        let ring = parse_plan("ground/255/plan", payload).unwrap();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[1], Coordinate::new(12.523, 76.896));
    }

    #[test]
    fn test_parse_plan_rejects_short_or_non_array() {
        assert!(parse_plan("t", br#"{"points": []}"#).is_err());
        assert!(parse_plan("t", br#"[[1,2],[3,4]]"#).is_err());
        assert!(parse_plan("t", b"not json").is_err());
        assert!(parse_plan("t", br#"[[1,2],[3,4],["a",5]]"#).is_err());
    }

    #[test]
    fn test_telemetry_shape() {
        let state = MissionState {
            status: MissionStatus::Executing,
            current_position: Some(Coordinate::new(1.0, 2.0)),
            waypoints: vec![Coordinate::new(1.0, 2.0), Coordinate::new(3.0, 4.0)].into(),
        };
        let value = serde_json::to_value(TelemetryMessage::from(&state)).unwrap();
        assert_eq!(
            value,
            json!({
                "status": "executing",
                "latlng": [1.0, 2.0],
                "waypoints": [[1.0, 2.0], [3.0, 4.0]],
            })
        );
    }

    #[test]
    fn test_telemetry_without_position() {
        let value = serde_json::to_value(TelemetryMessage::from(&MissionState::default())).unwrap();
        assert_eq!(value["latlng"], Value::Null);
        assert_eq!(value["status"], "idle");
    }

    #[test]
    fn test_crop_advice_defaults() {
        let advice: CropAdvice = serde_json::from_str(r#"{"crops": ["Rice", "Maize"]}"#).unwrap();
        assert_eq!(advice.crops, vec!["Rice", "Maize"]);
        assert!(advice.cropsdetailed.is_empty());
    }
}
