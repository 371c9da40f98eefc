use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use super::gate::PlanGate;
use super::plan::{plot_id, MissionPlan};
use super::state::{MissionStateHandle, MissionStatus};
use crate::error::MissionError;
use crate::geometry::Waypoint;
use crate::iot::messages::SurveyDataMessage;
use crate::iot::{topics, Publisher};
use crate::sensor::SensorSource;
use crate::vehicle::{Navigator, VehicleDriver};

#[derive(Debug, Clone)]
pub struct MissionSettings {
    /// Edge of a decomposition cell, in degrees.
    pub chunk_size: f64,
    /// Spacing of scan points, in degrees.
    pub grid_size: f64,
    pub altitude: f32,
    /// Vehicle mode used while executing.
    pub mode: String,
}

impl Default for MissionSettings {
    fn default() -> Self {
        Self {
            chunk_size: 0.001,
            grid_size: 0.0002,
            altitude: 10.0,
            mode: "GUIDED".to_string(),
        }
    }
}

/// Collaborators of a mission, owned by its coordinator.
pub struct MissionContext {
    pub device_id: String,
    pub vehicle: Arc<dyn VehicleDriver>,
    pub publisher: Arc<dyn Publisher>,
    pub sensor: Arc<dyn SensorSource>,
    pub navigator: Navigator,
}

/// Sequences one survey mission: wait for a plan, build the waypoints,
/// then visit them in order.
///
/// A coordinator runs a single mission; its plan gate is one-shot.
pub struct MissionCoordinator {
    ctx: MissionContext,
    settings: MissionSettings,
    state: MissionStateHandle,
    gate: Arc<PlanGate>,
}

impl MissionCoordinator {
    pub fn new(ctx: MissionContext, settings: MissionSettings) -> Self {
        Self {
            ctx,
            settings,
            state: MissionStateHandle::new(),
            gate: Arc::new(PlanGate::new()),
        }
    }

    pub fn state(&self) -> MissionStateHandle {
        self.state.clone()
    }

    pub fn gate(&self) -> Arc<PlanGate> {
        self.gate.clone()
    }

    /// Run the mission to completion.
    ///
    /// Planning failures and a vehicle that cannot be armed are fatal: the
    /// state moves to `Error` and the error is returned. Failures at a
    /// single waypoint are logged and the mission moves on.
    pub async fn run(&self) -> Result<MissionStatus, MissionError> {
        self.state.reset()?;
        self.state.transition(MissionStatus::AwaitingPlan)?;

        info!("Waiting for polygon coordinates to be received...");
        let ring = self.gate.wait().await;
        info!("Polygon coordinates received, starting survey");
        self.state.transition(MissionStatus::Planning)?;

        let MissionSettings {
            chunk_size,
            grid_size,
            ..
        } = self.settings;
        let plan = match MissionPlan::build(&ring, chunk_size, grid_size) {
            Ok(plan) => plan,
            Err(e) => return self.abort(e),
        };
        self.state.set_waypoints(plan.waypoints.clone())?;
        self.state.transition(MissionStatus::Executing)?;

        if let Err(e) = self.ctx.vehicle.arm_and_set_mode(&self.settings.mode).await {
            return self.abort(e.into());
        }

        self.execute(&plan.waypoints).await;

        self.state.transition(MissionStatus::Completed)?;
        info!("Survey completed");
        Ok(MissionStatus::Completed)
    }

    fn abort(&self, e: MissionError) -> Result<MissionStatus, MissionError> {
        error!("Mission aborted: {}", e);
        self.state.transition(MissionStatus::Error)?;
        Err(e)
    }

    async fn execute(&self, waypoints: &[Waypoint]) {
        let total = waypoints.len();
        for (index, waypoint) in waypoints.iter().enumerate() {
            let plot_id = plot_id(waypoint);
            info!(
                "Moving to scan point {}/{}: [{}, {}] with plot_id: {}",
                index + 1,
                total,
                waypoint.latitude,
                waypoint.longitude,
                plot_id
            );
            if let Err(e) = self.visit(waypoint, &plot_id).await {
                error!(
                    "Error during scanning at point [{}, {}]: {:#}",
                    waypoint.latitude, waypoint.longitude, e
                );
            }
        }
    }

    async fn visit(&self, waypoint: &Waypoint, plot_id: &str) -> Result<()> {
        let arrived = self
            .ctx
            .navigator
            .navigate(self.ctx.vehicle.as_ref(), *waypoint, self.settings.altitude)
            .await?;
        self.state.set_position(*waypoint)?;

        let details = self.ctx.sensor.read(plot_id, arrived).await?;
        let message = SurveyDataMessage {
            plot_id: plot_id.to_string(),
            scan_point: *waypoint,
            details,
        };
        let payload = serde_json::to_string(&message)?;
        self.ctx
            .publisher
            .publish(&topics::data(&self.ctx.device_id), payload)
            .await?;
        info!("Published scan data for {}", plot_id);
        Ok(())
    }

    /// Run until the mission ends or `cancel` resolves. A cancelled mission
    /// is marked as failed and reports [`MissionError::Cancelled`].
    pub async fn run_until<F>(&self, cancel: F) -> Result<MissionStatus, MissionError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.run() => result,
            _ = cancel => {
                self.interrupt();
                Err(MissionError::Cancelled)
            }
        }
    }

    /// Mark an unfinished mission as failed after an external interrupt.
    pub fn interrupt(&self) {
        match self.state.status() {
            Ok(status) if !status.is_terminal() => {
                warn!("Mission interrupted while {:?}", status);
                if let Err(e) = self.state.transition(MissionStatus::Error) {
                    error!("Failed to record interruption: {}", e);
                }
            }
            Ok(_) => {}
            Err(e) => error!("Failed to read mission state: {}", e),
        }
    }

    /// Hand control back: hold position and close the vehicle link.
    pub async fn release_vehicle(&self) {
        if let Err(e) = self.ctx.vehicle.hold().await {
            error!("Failed to hold vehicle: {}", e);
        }
        if let Err(e) = self.ctx.vehicle.close().await {
            error!("Failed to close vehicle connection: {}", e);
        }
    }
}
