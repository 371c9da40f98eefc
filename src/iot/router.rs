//! Typed dispatch of inbound bus messages.
//!
//! Routing is a pure function of topic and payload; the receive loops act on
//! the returned [`Inbound`] value.

use crate::error::IngestError;
use crate::geometry::Coordinate;

use super::messages::{parse_plan, CropAdvice, SurveyDataMessage, TelemetryMessage};
use super::topics::{self, topic_matches};

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Plan {
        device_id: String,
        ring: Vec<Coordinate>,
    },
    SurveyData {
        device_id: String,
        message: SurveyDataMessage,
    },
    Telemetry {
        device_id: String,
        message: TelemetryMessage,
    },
    CropAdvice {
        device_id: String,
        advice: CropAdvice,
    },
}

type Handler = fn(&str, String, &[u8]) -> Result<Inbound, IngestError>;

const ROUTES: &[(&str, Handler)] = &[
    (topics::PLAN_PATTERN, handle_plan),
    (topics::DATA_PATTERN, handle_data),
    (topics::TELEMETRY_PATTERN, handle_telemetry),
    (topics::ADVICE_PATTERN, handle_advice),
];

pub fn route(topic: &str, payload: &[u8]) -> Result<Inbound, IngestError> {
    let (_, handler) = ROUTES
        .iter()
        .find(|(pattern, _)| topic_matches(pattern, topic))
        .ok_or_else(|| IngestError::UnroutedTopic(topic.to_string()))?;
    let device_id = topics::device_id(topic)
        .ok_or_else(|| IngestError::malformed(topic, "topic carries no device id"))?
        .to_string();
    handler(topic, device_id, payload)
}

fn handle_plan(topic: &str, device_id: String, payload: &[u8]) -> Result<Inbound, IngestError> {
    Ok(Inbound::Plan {
        device_id,
        ring: parse_plan(topic, payload)?,
    })
}

fn handle_data(topic: &str, device_id: String, payload: &[u8]) -> Result<Inbound, IngestError> {
    let message = serde_json::from_slice(payload).map_err(|e| IngestError::malformed(topic, e))?;
    Ok(Inbound::SurveyData { device_id, message })
}

fn handle_telemetry(
    topic: &str,
    device_id: String,
    payload: &[u8],
) -> Result<Inbound, IngestError> {
    let message = serde_json::from_slice(payload).map_err(|e| IngestError::malformed(topic, e))?;
    Ok(Inbound::Telemetry { device_id, message })
}

fn handle_advice(topic: &str, device_id: String, payload: &[u8]) -> Result<Inbound, IngestError> {
    let advice = serde_json::from_slice(payload).map_err(|e| IngestError::malformed(topic, e))?;
    Ok(Inbound::CropAdvice { device_id, advice })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::state::MissionStatus;

    #[test]
    fn test_route_plan() {
        let inbound = route("ground/255/plan", b"[[0,0],[0,1],[1,1]]").unwrap();
        match inbound {
            Inbound::Plan { device_id, ring } => {
                assert_eq!(device_id, "255");
                assert_eq!(ring.len(), 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_route_survey_data() {
        let payload = br#"{"plot_id":"PLOT_1_2","scan_point":{"latitude":1.0,"longitude":2.0},"details":{"soil_pH":6.8}}"#;
        let Inbound::SurveyData { device_id, message } = route("ground/7/data", payload).unwrap()
        else {
            panic!("expected survey data");
        };
        assert_eq!(device_id, "7");
        assert_eq!(message.plot_id, "PLOT_1_2");
        assert_eq!(message.details["soil_pH"], 6.8);
    }

    #[test]
    fn test_route_telemetry() {
        let payload = br#"{"status":"completed","latlng":null,"waypoints":[]}"#;
        let Inbound::Telemetry { message, .. } = route("ground/7/telemetry", payload).unwrap()
        else {
            panic!("expected telemetry");
        };
        assert_eq!(message.status, MissionStatus::Completed);
    }

    #[test]
    fn test_unknown_topic_is_unrouted() {
        let err = route("fleet/health", b"{}").unwrap_err();
        assert!(matches!(err, IngestError::UnroutedTopic(_)));
    }

    #[test]
    fn test_malformed_plan_is_rejected() {
        let err = route("ground/1/plan", br#"[[0,0],[1,1]]"#).unwrap_err();
        assert!(matches!(err, IngestError::MalformedPayload { .. }));
    }
}
