use std::sync::Mutex;

use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::geometry::Coordinate;

#[derive(Debug, Default)]
struct GateSlot {
    pending: Option<Vec<Coordinate>>,
    consumed: bool,
}

/// One-shot hand-off of the survey ring from the receive loop to the
/// coordinator.
///
/// Offers before release overwrite each other, so the coordinator gets the
/// ring held at the moment it wakes. Once consumed, the gate stays closed.
#[derive(Debug, Default)]
pub struct PlanGate {
    slot: Mutex<GateSlot>,
    released: Notify,
}

impl PlanGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand a ring to the coordinator. Returns `false` if the gate has
    /// already been consumed and the ring was discarded.
    pub fn offer(&self, ring: Vec<Coordinate>) -> bool {
        let Ok(mut slot) = self.slot.lock() else {
            warn!("Plan gate lock poisoned, dropping plan");
            return false;
        };
        if slot.consumed {
            debug!("Mission already planned, ignoring plan");
            return false;
        }
        if slot.pending.replace(ring).is_some() {
            debug!("Replacing pending plan before release");
        }
        self.released.notify_one();
        true
    }

    /// Wait for the first offer and take the ring held at release time.
    pub async fn wait(&self) -> Vec<Coordinate> {
        loop {
            self.released.notified().await;
            if let Ok(mut slot) = self.slot.lock() {
                if let Some(ring) = slot.pending.take() {
                    slot.consumed = true;
                    return ring;
                }
            }
        }
    }

    pub fn is_consumed(&self) -> bool {
        self.slot.lock().map(|s| s.consumed).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn ring(tag: f64) -> Vec<Coordinate> {
        vec![
            Coordinate::new(tag, 0.0),
            Coordinate::new(tag, 1.0),
            Coordinate::new(tag + 1.0, 1.0),
        ]
    }

    #[tokio::test]
    async fn test_offer_before_wait_is_kept() {
        let gate = PlanGate::new();
        assert!(gate.offer(ring(1.0)));
        assert_eq!(gate.wait().await, ring(1.0));
        assert!(gate.is_consumed());
    }

    #[tokio::test]
    async fn test_latest_offer_wins_before_release() {
        let gate = PlanGate::new();
        gate.offer(ring(1.0));
        gate.offer(ring(2.0));
        assert_eq!(gate.wait().await, ring(2.0));
    }

    #[tokio::test]
    async fn test_offers_after_release_are_discarded() {
        let gate = Arc::new(PlanGate::new());
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(gate.offer(ring(1.0)));
        assert_eq!(waiter.await.unwrap(), ring(1.0));
        assert!(!gate.offer(ring(2.0)));
    }

    #[tokio::test]
    async fn test_wait_blocks_without_offer() {
        let gate = PlanGate::new();
        let result = tokio::time::timeout(Duration::from_millis(20), gate.wait()).await;
        assert!(result.is_err());
    }
}
