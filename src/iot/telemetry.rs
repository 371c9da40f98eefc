use std::sync::Arc;

use anyhow::Result;
use tokio::time::Duration;
use tracing::{debug, error, info};

use super::messages::TelemetryMessage;
use super::topics;
use super::Publisher;
use crate::mission::state::MissionStateHandle;

/// Broadcasts the mission state on a fixed cadence, best effort.
pub struct TelemetryPublisher {
    publisher: Arc<dyn Publisher>,
    state: MissionStateHandle,
    topic: String,
    interval: Duration,
    shutdown: tokio::sync::broadcast::Sender<()>,
}

impl TelemetryPublisher {
    pub fn new(
        publisher: Arc<dyn Publisher>,
        state: MissionStateHandle,
        device_id: &str,
        interval: Duration,
    ) -> Self {
        info!("Creating telemetry publisher for {}", device_id);
        let (shutdown, _) = tokio::sync::broadcast::channel(1);
        Self {
            publisher,
            state,
            topic: topics::telemetry(device_id),
            interval,
            shutdown,
        }
    }

    pub async fn publish_telemetry(&self) -> Result<()> {
        let snapshot = self.state.snapshot()?;
        let payload = serde_json::to_string(&TelemetryMessage::from(&snapshot))?;
        debug!("Publishing telemetry: {}", payload);
        self.publisher.publish(&self.topic, payload).await
    }

    pub async fn run(&self) {
        let mut rx = self.shutdown.subscribe();
        let mut interval = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = rx.recv() => {
                    info!("Shutting down telemetry publisher");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.publish_telemetry().await {
                        error!("Failed to publish telemetry: {}", e);
                    }
                }
            }
        }
    }

    pub fn stop(&self) {
        let _ = self.shutdown.send(());
    }
}
