//! Onboard receive loop: turns plan messages into gate offers.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::IngestError;
use crate::geometry;
use crate::iot::router::{route, Inbound};
use crate::iot::InboundMessage;
use crate::mission::PlanGate;

pub struct PlanListener {
    device_id: String,
    gate: Arc<PlanGate>,
}

impl PlanListener {
    pub fn new(device_id: &str, gate: Arc<PlanGate>) -> Self {
        Self {
            device_id: device_id.to_string(),
            gate,
        }
    }

    /// Handle one inbound message. Returns whether a ring was offered to
    /// the coordinator.
    pub fn handle(&self, message: &InboundMessage) -> Result<bool, IngestError> {
        let ring = match route(&message.topic, &message.payload)? {
            Inbound::Plan { device_id, ring } if device_id == self.device_id => ring,
            other => {
                debug!("Ignoring message on {}: {:?}", message.topic, other);
                return Ok(false);
            }
        };
        info!("Received {} polygon coordinates", ring.len());

        if let Err(e) = geometry::repair(&ring) {
            warn!("Invalid polygon received, waiting for valid coordinates: {}", e);
            return Ok(false);
        }
        Ok(self.gate.offer(ring))
    }

    pub async fn run(&self, mut inbound: mpsc::Receiver<InboundMessage>) {
        while let Some(message) = inbound.recv().await {
            if let Err(e) = self.handle(&message) {
                error!("Dropping message: {}", e);
            }
        }
        info!("Inbound channel closed, plan listener stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(topic: &str, payload: &str) -> InboundMessage {
        InboundMessage {
            topic: topic.to_string(),
            payload: payload.as_bytes().to_vec(),
        }
    }

    const SQUARE: &str = "[[12.523,76.894],[12.523,76.896],[12.525,76.896],[12.525,76.894],[12.523,76.894]]";

    #[test]
    fn test_valid_plan_is_offered() {
        let gate = Arc::new(PlanGate::new());
        let listener = PlanListener::new("255", gate.clone());
        assert!(listener.handle(&message("ground/255/plan", SQUARE)).unwrap());
    }

    #[test]
    fn test_plan_for_other_device_is_ignored() {
        let listener = PlanListener::new("255", Arc::new(PlanGate::new()));
        assert!(!listener.handle(&message("ground/7/plan", SQUARE)).unwrap());
    }

    #[test]
    fn test_malformed_plan_is_an_error() {
        let listener = PlanListener::new("255", Arc::new(PlanGate::new()));
        let err = listener
            .handle(&message("ground/255/plan", "[[1, 2]]"))
            .unwrap_err();
        assert!(matches!(err, IngestError::MalformedPayload { .. }));
    }

    #[test]
    fn test_unrepairable_ring_is_not_offered() {
        let listener = PlanListener::new("255", Arc::new(PlanGate::new()));
        // three points, but only two distinct
        let payload = "[[1.0,1.0],[1.0,1.0],[2.0,2.0]]";
        assert!(!listener.handle(&message("ground/255/plan", payload)).unwrap());
    }

    #[tokio::test]
    async fn test_run_drains_channel() -> anyhow::Result<()> {
        let gate = Arc::new(PlanGate::new());
        let listener = PlanListener::new("255", gate.clone());
        let (tx, rx) = mpsc::channel(4);
        tx.send(message("ground/255/plan", "not json")).await?;
        tx.send(message("ground/255/plan", SQUARE)).await?;
        drop(tx);

        listener.run(rx).await;
        assert_eq!(gate.wait().await.len(), 5);
        Ok(())
    }
}
