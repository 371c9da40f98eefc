use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use super::Publisher;

/// A publish received from the broker.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// MQTT connection shared by the publishers and the receive loop.
///
/// Inbound publishes are forwarded to the channel handed out by
/// [`MqttClient::connect`]. Subscriptions are replayed on every reconnect.
#[derive(Clone)]
pub struct MqttClient {
    name: String,
    host: String,
    port: u16,
    keep_alive: Duration,
    client: Option<AsyncClient>,
    subscriptions: Arc<Mutex<Vec<String>>>,
}

impl MqttClient {
    pub fn new(name: String, host: String, port: u16, keep_alive: Duration) -> Self {
        Self {
            name,
            host,
            port,
            keep_alive,
            client: None,
            subscriptions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn connect(&mut self) -> Result<(mpsc::Receiver<InboundMessage>, JoinHandle<()>)> {
        let client_id = format!("{}-{}", self.name, uuid::Uuid::new_v4().simple());
        let mut mqtt_options = MqttOptions::new(client_id, self.host.clone(), self.port);
        mqtt_options
            .set_keep_alive(self.keep_alive)
            .set_clean_session(true);

        info!("Connecting to MQTT broker at {}:{}", self.host, self.port);
        let (client, mut eventloop) = AsyncClient::new(mqtt_options, 64);
        self.client = Some(client.clone());

        let (tx, rx) = mpsc::channel(64);
        let subscriptions = self.subscriptions.clone();
        let name = self.name.clone();

        let connection_handle = tokio::spawn(async move {
            info!("Starting broker connection event loop for {}", name);
            let mut connection_established = false;

            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        connection_established = true;
                        info!("Connected to broker: {:?}", ack);
                        Self::resubscribe(&client, &subscriptions);
                    }
                    Ok(Event::Incoming(Packet::SubAck(ack))) => {
                        debug!("Subscription confirmed: {:?}", ack);
                    }
                    Ok(Event::Incoming(Packet::Publish(p))) => {
                        debug!(
                            "Received message - Topic: {}, Payload: {} bytes",
                            p.topic,
                            p.payload.len()
                        );
                        let message = InboundMessage {
                            topic: p.topic,
                            payload: p.payload.to_vec(),
                        };
                        if tx.send(message).await.is_err() {
                            info!("Inbound receiver dropped, stopping event loop for {}", name);
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("Broker connection error: {:?}", e);
                        if connection_established {
                            error!("Connection lost, attempting to reconnect...");
                            connection_established = false;
                        }
                        sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Ok((rx, connection_handle))
    }

    fn resubscribe(client: &AsyncClient, subscriptions: &Mutex<Vec<String>>) {
        let Ok(topics) = subscriptions.lock().map(|s| s.clone()) else {
            return;
        };
        for topic in topics {
            match client.try_subscribe(topic.as_str(), QoS::AtLeastOnce) {
                Ok(_) => info!("Subscribed to topic: {}", topic),
                Err(e) => error!("Failed to subscribe to {}: {:?}", topic, e),
            }
        }
    }

    /// Subscribe now and after every reconnect.
    pub async fn subscribe(&self, topic: &str) -> Result<()> {
        if let Ok(mut subscriptions) = self.subscriptions.lock() {
            if !subscriptions.iter().any(|t| t == topic) {
                subscriptions.push(topic.to_string());
            }
        }
        let client = self.client.as_ref().context("MQTT client not connected")?;
        client
            .subscribe(topic, QoS::AtLeastOnce)
            .await
            .with_context(|| format!("Failed to subscribe to {}", topic))?;
        Ok(())
    }

    pub async fn disconnect(&self) {
        if let Some(client) = &self.client {
            if let Err(e) = client
                .disconnect()
                .await
                .context("Failed to disconnect from broker")
            {
                error!("{:#}", e);
            } else {
                info!("MQTT connection closed");
            }
        }
    }
}

#[async_trait]
impl Publisher for MqttClient {
    async fn publish(&self, topic: &str, payload: String) -> Result<()> {
        let client = self.client.as_ref().context("MQTT client not connected")?;
        client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .with_context(|| format!("Failed to publish to {}", topic))?;
        Ok(())
    }
}
