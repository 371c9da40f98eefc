//! Error types shared across the survey pipeline.
//!
//! Geometry and planning errors are fatal for a mission and move it to the
//! `error` state. Navigation errors are recovered per waypoint. Ingest
//! errors drop the offending message.

use thiserror::Error;

use crate::mission::state::MissionStatus;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("polygon needs at least 3 unique coordinates, got {found}")]
    InsufficientPoints { found: usize },
    #[error("polygon is invalid and could not be repaired")]
    UnrepairablePolygon,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningError {
    #[error("no chunks generated, check the polygon or the chunk size")]
    NoChunksGenerated,
    #[error("no scan points generated, check the grid size or the chunks")]
    NoWaypointsGenerated,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("vehicle rejected command: {0}")]
    Command(String),
    #[error("vehicle link error: {0}")]
    Link(String),
    #[error("vehicle has not reported a position yet")]
    NoPosition,
    #[error("vehicle connection is closed")]
    Disconnected,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("malformed payload on {topic}: {reason}")]
    MalformedPayload { topic: String, reason: String },
    #[error("no handler for topic {0}")]
    UnroutedTopic(String),
}

impl IngestError {
    pub fn malformed(topic: &str, reason: impl ToString) -> Self {
        Self::MalformedPayload {
            topic: topic.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stored record list for {key} is not valid JSON: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode record list: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum MissionError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Planning(#[from] PlanningError),
    #[error("vehicle setup failed: {0}")]
    Vehicle(#[from] NavigationError),
    #[error("illegal mission transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: MissionStatus,
        to: MissionStatus,
    },
    #[error("mission state lock poisoned")]
    State,
    #[error("mission cancelled")]
    Cancelled,
}
