use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::MissionError;
use crate::geometry::{Coordinate, Waypoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    #[default]
    Idle,
    AwaitingPlan,
    Planning,
    Executing,
    Completed,
    Error,
}

impl MissionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, MissionStatus::Completed | MissionStatus::Error)
    }

    /// Whether the mission may move from `self` to `to`.
    pub fn can_transition_to(self, to: MissionStatus) -> bool {
        use MissionStatus::*;
        match (self, to) {
            (Idle, AwaitingPlan)
            | (AwaitingPlan, Planning)
            | (Planning, Executing)
            | (Executing, Completed) => true,
            (from, Error) => !from.is_terminal(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MissionState {
    pub status: MissionStatus,
    pub current_position: Option<Coordinate>,
    pub waypoints: Arc<Vec<Waypoint>>,
}

/// Shared handle to the mission state.
///
/// The coordinator is the only writer; telemetry reads snapshots.
#[derive(Debug, Clone, Default)]
pub struct MissionStateHandle {
    state: Arc<RwLock<MissionState>>,
}

impl MissionStateHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Result<MissionState, MissionError> {
        let state = self.state.read().map_err(|_| MissionError::State)?;
        Ok(state.clone())
    }

    pub fn status(&self) -> Result<MissionStatus, MissionError> {
        Ok(self.state.read().map_err(|_| MissionError::State)?.status)
    }

    pub fn transition(&self, to: MissionStatus) -> Result<(), MissionError> {
        let mut state = self.state.write().map_err(|_| MissionError::State)?;
        let from = state.status;
        if !from.can_transition_to(to) {
            return Err(MissionError::InvalidTransition { from, to });
        }
        info!("Mission status {:?} -> {:?}", from, to);
        state.status = to;
        Ok(())
    }

    /// Back to `Idle` with no position and no waypoints.
    pub fn reset(&self) -> Result<(), MissionError> {
        let mut state = self.state.write().map_err(|_| MissionError::State)?;
        *state = MissionState::default();
        Ok(())
    }

    pub(crate) fn set_waypoints(&self, waypoints: Vec<Waypoint>) -> Result<(), MissionError> {
        let mut state = self.state.write().map_err(|_| MissionError::State)?;
        state.waypoints = Arc::new(waypoints);
        Ok(())
    }

    pub(crate) fn set_position(&self, position: Coordinate) -> Result<(), MissionError> {
        let mut state = self.state.write().map_err(|_| MissionError::State)?;
        state.current_position = Some(position);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let state = MissionStateHandle::new();
        for to in [
            MissionStatus::AwaitingPlan,
            MissionStatus::Planning,
            MissionStatus::Executing,
            MissionStatus::Completed,
        ] {
            state.transition(to).unwrap();
        }
        assert_eq!(state.status().unwrap(), MissionStatus::Completed);
    }

    #[test]
    fn test_illegal_transitions_are_rejected() {
        let state = MissionStateHandle::new();
        let err = state.transition(MissionStatus::Executing).unwrap_err();
        assert!(matches!(
            err,
            MissionError::InvalidTransition {
                from: MissionStatus::Idle,
                to: MissionStatus::Executing
            }
        ));

        state.transition(MissionStatus::AwaitingPlan).unwrap();
        state.transition(MissionStatus::Error).unwrap();
        // terminal
        assert!(state.transition(MissionStatus::Error).is_err());
        assert!(state.transition(MissionStatus::Planning).is_err());
    }

    #[test]
    fn test_reset_clears_everything() {
        let state = MissionStateHandle::new();
        state.transition(MissionStatus::AwaitingPlan).unwrap();
        state.set_position(Coordinate::new(1.0, 1.0)).unwrap();
        state.set_waypoints(vec![Coordinate::new(1.0, 1.0)]).unwrap();
        state.reset().unwrap();
        assert_eq!(state.snapshot().unwrap(), MissionState::default());
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&MissionStatus::AwaitingPlan).unwrap(),
            "\"awaiting_plan\""
        );
        assert_eq!(serde_json::to_string(&MissionStatus::Error).unwrap(), "\"error\"");
    }
}
