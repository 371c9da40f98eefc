use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::iot::messages::AdvisoryRequest;
use crate::iot::topics;
use crate::iot::Publisher;
use crate::store::SurveyRecord;

/// Crop-suitability service. Answers arrive asynchronously on
/// `ai/crops/<id>/response`.
#[async_trait]
pub trait CropAdvisor: Send + Sync {
    async fn request(&self, device_id: &str, averages: BTreeMap<String, f64>) -> Result<()>;
}

/// Sends advisory requests over the message bus.
pub struct MqttCropAdvisor {
    publisher: Arc<dyn Publisher>,
}

impl MqttCropAdvisor {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl CropAdvisor for MqttCropAdvisor {
    async fn request(&self, device_id: &str, averages: BTreeMap<String, f64>) -> Result<()> {
        let topic = topics::advice_request(device_id);
        let payload = serde_json::to_string(&AdvisoryRequest {
            avg_values: averages,
        })?;
        info!("Requesting crop advice on {}", topic);
        self.publisher.publish(&topic, payload).await
    }
}

/// Mean of every numeric detail field across `records`. Fields that are
/// not numbers are skipped; a field present in only some records is
/// averaged over those records.
pub fn average_details(records: &[SurveyRecord]) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for record in records {
        for (field, value) in &record.details {
            if let Some(v) = value.as_f64() {
                let entry = sums.entry(field.clone()).or_insert((0.0, 0));
                entry.0 += v;
                entry.1 += 1;
            }
        }
    }
    sums.into_iter()
        .map(|(field, (sum, count))| (field, sum / count as f64))
        .collect()
}
