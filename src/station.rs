//! Ground-station side: collect survey data and request crop advice once a
//! rover finishes.

use std::sync::Arc;

use anyhow::{Context, Result};
use dashmap::{DashMap, DashSet};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::advisor::{average_details, CropAdvisor};
use crate::iot::messages::{CropAdvice, TelemetryMessage};
use crate::iot::router::{route, Inbound};
use crate::iot::InboundMessage;
use crate::mission::MissionStatus;
use crate::store::{KeyValueStore, SurveyStore};

pub struct SurveyStation<S: KeyValueStore> {
    store: SurveyStore<S>,
    advisor: Arc<dyn CropAdvisor>,
    advise_on_completion: bool,
    completed: DashSet<String>,
    advice: DashMap<String, CropAdvice>,
}

impl<S: KeyValueStore> SurveyStation<S> {
    pub fn new(
        store: SurveyStore<S>,
        advisor: Arc<dyn CropAdvisor>,
        advise_on_completion: bool,
    ) -> Self {
        Self {
            store,
            advisor,
            advise_on_completion,
            completed: DashSet::new(),
            advice: DashMap::new(),
        }
    }

    pub fn store(&self) -> &SurveyStore<S> {
        &self.store
    }

    pub fn latest_advice(&self, device_id: &str) -> Option<CropAdvice> {
        self.advice.get(device_id).map(|a| a.value().clone())
    }

    pub async fn handle(&self, message: &InboundMessage) -> Result<()> {
        match route(&message.topic, &message.payload)? {
            Inbound::SurveyData { device_id, message } => {
                debug!("Survey data from {} for {}", device_id, message.plot_id);
                self.store
                    .merge(&device_id, &message.plot_id, message.details)
                    .with_context(|| format!("Failed to store survey data from {}", device_id))?;
            }
            Inbound::Telemetry { device_id, message } => {
                self.on_telemetry(&device_id, &message).await?;
            }
            Inbound::CropAdvice { device_id, advice } => {
                info!("Crop advice for {}: {:?}", device_id, advice.crops);
                self.advice.insert(device_id, advice);
            }
            Inbound::Plan { device_id, .. } => {
                debug!("Ignoring plan addressed to {}", device_id);
            }
        }
        Ok(())
    }

    async fn on_telemetry(&self, device_id: &str, message: &TelemetryMessage) -> Result<()> {
        if message.status != MissionStatus::Completed {
            // a new mission re-arms the advisory trigger
            self.completed.remove(device_id);
            return Ok(());
        }
        if !self.completed.insert(device_id.to_string()) {
            return Ok(());
        }
        info!("Rover {} completed its survey", device_id);
        if !self.advise_on_completion {
            return Ok(());
        }

        let records = self.store.read(device_id)?.unwrap_or_default();
        if records.is_empty() {
            warn!("No survey data stored for {}, skipping crop advice", device_id);
            return Ok(());
        }
        let averages = average_details(&records);
        self.advisor
            .request(device_id, averages)
            .await
            .with_context(|| format!("Failed to request crop advice for {}", device_id))
    }

    pub async fn run(&self, mut inbound: mpsc::Receiver<InboundMessage>) {
        while let Some(message) = inbound.recv().await {
            if let Err(e) = self.handle(&message).await {
                error!("Dropping message on {}: {:#}", message.topic, e);
            }
        }
        info!("Inbound channel closed, station stopped");
    }
}
