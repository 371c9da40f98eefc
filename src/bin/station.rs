use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tracing::{error, info};

use fieldscan::advisor::MqttCropAdvisor;
use fieldscan::config::CONFIG;
use fieldscan::iot::{topics, MqttClient};
use fieldscan::station::SurveyStation;
use fieldscan::store::{MemoryStore, SurveyStore};
use fieldscan::util::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging(&CONFIG.general.log_level);
    info!("Ground station starting...");

    let mut mqtt = MqttClient::new(
        "station".to_string(),
        CONFIG.broker.host.clone(),
        CONFIG.broker.port,
        Duration::from_secs(CONFIG.broker.keep_alive_secs),
    );
    let (inbound, connection_handle) = mqtt.connect().await?;
    for topic in [
        topics::DATA_PATTERN,
        topics::TELEMETRY_PATTERN,
        topics::ADVICE_PATTERN,
    ] {
        mqtt.subscribe(topic).await?;
    }
    let mqtt = Arc::new(mqtt);

    let station = SurveyStation::new(
        SurveyStore::new(MemoryStore::new()),
        Arc::new(MqttCropAdvisor::new(mqtt.clone())),
        CONFIG.station.advise_on_completion,
    );

    tokio::select! {
        _ = station.run(inbound) => {}
        result = signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Shutdown signal received, stopping station..."),
                Err(err) => error!("Failed to listen for shutdown signal: {}", err),
            }
        }
    }

    mqtt.disconnect().await;
    connection_handle.abort();
    info!("Ground station stopped");
    Ok(())
}
