pub mod client;
pub mod messages;
pub mod router;
pub mod telemetry;
pub mod topics;

use anyhow::Result;
use async_trait::async_trait;

pub use client::{InboundMessage, MqttClient};
pub use telemetry::TelemetryPublisher;

/// Outbound side of the message bus.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: String) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Publisher that keeps everything it was asked to send.
    #[derive(Default)]
    pub struct RecordingPublisher {
        pub sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingPublisher {
        pub fn on_topic(&self, topic: &str) -> Vec<serde_json::Value> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(t, _)| t == topic)
                .map(|(_, p)| serde_json::from_str(p).unwrap())
                .collect()
        }
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(&self, topic: &str, payload: String) -> Result<()> {
            self.sent.lock().unwrap().push((topic.to_string(), payload));
            Ok(())
        }
    }
}
