pub mod mav;
pub mod sim;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::NavigationError;
use crate::geometry::Coordinate;

pub use self::mav::MavlinkVehicle;
pub use self::sim::SimulatedVehicle;

/// Low-level motion control of the survey vehicle.
///
/// `goto` only issues the command. Waiting for arrival is done by
/// [`Navigator`] polling `position`.
#[async_trait]
pub trait VehicleDriver: Send + Sync {
    async fn arm_and_set_mode(&self, mode: &str) -> Result<(), NavigationError>;

    async fn goto(&self, target: Coordinate, altitude: f32) -> Result<(), NavigationError>;

    async fn position(&self) -> Result<Option<Coordinate>, NavigationError>;

    /// Stop and hold the current position.
    async fn hold(&self) -> Result<(), NavigationError>;

    async fn close(&self) -> Result<(), NavigationError>;
}

/// Drives a vehicle to a target and waits for convergence.
#[derive(Debug, Clone)]
pub struct Navigator {
    pub arrival_radius_m: f64,
    pub poll_interval: Duration,
}

impl Default for Navigator {
    fn default() -> Self {
        Self {
            arrival_radius_m: 1.0,
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl Navigator {
    pub fn new(arrival_radius_m: f64, poll_interval: Duration) -> Self {
        Self {
            arrival_radius_m,
            poll_interval,
        }
    }

    pub fn has_arrived(&self, position: &Coordinate, target: &Coordinate) -> bool {
        position.distance_to(target) < self.arrival_radius_m
    }

    /// Command `target` and resolve once the vehicle reports a position
    /// within the arrival radius. There is no deadline; drop the future to
    /// cancel.
    pub async fn navigate(
        &self,
        driver: &dyn VehicleDriver,
        target: Coordinate,
        altitude: f32,
    ) -> Result<Coordinate, NavigationError> {
        info!("Navigating to: {}, {}", target.latitude, target.longitude);
        driver.goto(target, altitude).await?;

        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            interval.tick().await;
            let Some(position) = driver.position().await? else {
                debug!("No position fix yet");
                continue;
            };
            debug!("Distance to target: {:.2}m", position.distance_to(&target));
            if self.has_arrived(&position, &target) {
                info!("Target reached");
                return Ok(position);
            }
        }
    }
}
