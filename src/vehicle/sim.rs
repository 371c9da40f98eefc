use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, info};

use super::VehicleDriver;
use crate::error::NavigationError;
use crate::geometry::Coordinate;

/// Commands received by a [`SimulatedVehicle`], in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SimCommand {
    Arm { mode: String },
    Goto { target: Coordinate, altitude: f32 },
    Hold,
    Close,
}

#[derive(Debug)]
struct SimState {
    position: Coordinate,
    target: Option<Coordinate>,
    armed: bool,
    closed: bool,
    commands: Vec<SimCommand>,
}

/// In-memory vehicle for dry runs and tests.
///
/// Without a step the vehicle jumps straight to each target. With a step
/// it covers at most that many meters per position read.
#[derive(Debug, Clone)]
pub struct SimulatedVehicle {
    state: Arc<RwLock<SimState>>,
    step_m: Option<f64>,
    fail_at: Vec<Coordinate>,
    position_reads: Arc<AtomicUsize>,
}

impl SimulatedVehicle {
    pub fn new(start: Coordinate) -> Self {
        Self {
            state: Arc::new(RwLock::new(SimState {
                position: start,
                target: None,
                armed: false,
                closed: false,
                commands: Vec::new(),
            })),
            step_m: None,
            fail_at: Vec::new(),
            position_reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_step_m(mut self, step_m: f64) -> Self {
        self.step_m = Some(step_m);
        self
    }

    /// Reject any `goto` for this target.
    pub fn failing_at(mut self, target: Coordinate) -> Self {
        self.fail_at.push(target);
        self
    }

    pub fn commands(&self) -> Vec<SimCommand> {
        self.state
            .read()
            .map(|s| s.commands.clone())
            .unwrap_or_default()
    }

    pub fn is_armed(&self) -> bool {
        self.state.read().map(|s| s.armed).unwrap_or(false)
    }

    pub fn is_closed(&self) -> bool {
        self.state.read().map(|s| s.closed).unwrap_or(false)
    }

    pub fn position_reads(&self) -> usize {
        self.position_reads.load(Ordering::SeqCst)
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, SimState>, NavigationError> {
        self.state
            .write()
            .map_err(|e| NavigationError::Link(format!("Lock error: {}", e)))
    }
}

fn step_towards(from: Coordinate, to: Coordinate, step_m: Option<f64>) -> Coordinate {
    let remaining = from.distance_to(&to);
    match step_m {
        Some(step) if remaining > step => {
            let f = step / remaining;
            Coordinate::new(
                from.latitude + (to.latitude - from.latitude) * f,
                from.longitude + (to.longitude - from.longitude) * f,
            )
        }
        _ => to,
    }
}

#[async_trait]
impl VehicleDriver for SimulatedVehicle {
    async fn arm_and_set_mode(&self, mode: &str) -> Result<(), NavigationError> {
        let mut state = self.write()?;
        if state.closed {
            return Err(NavigationError::Disconnected);
        }
        state.armed = true;
        state.commands.push(SimCommand::Arm {
            mode: mode.to_string(),
        });
        info!("Simulated vehicle armed in {}", mode);
        Ok(())
    }

    async fn goto(&self, target: Coordinate, altitude: f32) -> Result<(), NavigationError> {
        let mut state = self.write()?;
        if state.closed {
            return Err(NavigationError::Disconnected);
        }
        state.commands.push(SimCommand::Goto { target, altitude });
        if self.fail_at.contains(&target) {
            return Err(NavigationError::Command(format!(
                "target {}, {} rejected",
                target.latitude, target.longitude
            )));
        }
        state.target = Some(target);
        Ok(())
    }

    async fn position(&self) -> Result<Option<Coordinate>, NavigationError> {
        self.position_reads.fetch_add(1, Ordering::SeqCst);
        let mut state = self.write()?;
        if state.closed {
            return Err(NavigationError::Disconnected);
        }
        if let Some(target) = state.target {
            state.position = step_towards(state.position, target, self.step_m);
            debug!("Simulated position: {:?}", state.position);
        }
        Ok(Some(state.position))
    }

    async fn hold(&self) -> Result<(), NavigationError> {
        let mut state = self.write()?;
        state.target = None;
        state.commands.push(SimCommand::Hold);
        Ok(())
    }

    async fn close(&self) -> Result<(), NavigationError> {
        let mut state = self.write()?;
        state.closed = true;
        state.commands.push(SimCommand::Close);
        Ok(())
    }
}
