use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info};

use fieldscan::config::{VehicleDriverKind, CONFIG};
use fieldscan::error::MissionError;
use fieldscan::geometry::Coordinate;
use fieldscan::iot::{topics, InboundMessage, MqttClient, TelemetryPublisher};
use fieldscan::mission::{MissionContext, MissionCoordinator};
use fieldscan::rover::PlanListener;
use fieldscan::sensor::LocationSensor;
use fieldscan::util::{get_vehicle_id, setup_logging};
use fieldscan::vehicle::{MavlinkVehicle, SimulatedVehicle, VehicleDriver};

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging(&CONFIG.general.log_level);
    info!("Rover starting...");

    let device_id = get_vehicle_id(&CONFIG.general.vehicle_id);
    info!("Vehicle id: {}", device_id);

    let (shutdown_tx, _) = broadcast::channel(1);

    let mut mqtt = MqttClient::new(
        format!("rover-{}", device_id),
        CONFIG.broker.host.clone(),
        CONFIG.broker.port,
        Duration::from_secs(CONFIG.broker.keep_alive_secs),
    );
    let (inbound, connection_handle) = mqtt.connect().await?;
    mqtt.subscribe(&topics::plan(&device_id)).await?;
    let mqtt = Arc::new(mqtt);

    let vehicle = connect_vehicle()?;
    let ctx = MissionContext {
        device_id: device_id.clone(),
        vehicle,
        publisher: mqtt.clone(),
        sensor: Arc::new(LocationSensor),
        navigator: CONFIG.navigator(),
    };
    let coordinator = Arc::new(MissionCoordinator::new(ctx, CONFIG.mission_settings()));

    let telemetry = TelemetryPublisher::new(
        mqtt.clone(),
        coordinator.state(),
        &device_id,
        Duration::from_millis(CONFIG.telemetry.interval_ms),
    );
    let listener = PlanListener::new(&device_id, coordinator.gate());

    let telemetry_handle = spawn_telemetry(telemetry, shutdown_tx.subscribe());
    let listener_handle = spawn_plan_listener(listener, inbound, shutdown_tx.subscribe());
    let mission_handle = spawn_mission(coordinator.clone(), shutdown_tx.subscribe());

    let shutdown_signal = async {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received, stopping services...");
                // the mission task may already be done
                let _ = shutdown_tx.send(());
            }
            Err(err) => {
                error!("Failed to listen for shutdown signal: {}", err);
            }
        }
    };

    let results = tokio::join!(
        mission_handle,
        telemetry_handle,
        listener_handle,
        shutdown_signal
    );
    for (result, name) in [results.0, results.1, results.2]
        .into_iter()
        .zip(["Mission", "Telemetry publisher", "Plan listener"])
    {
        if let Err(e) = result {
            error!("{} join error: {}", name, e);
        }
    }

    coordinator.release_vehicle().await;
    mqtt.disconnect().await;
    connection_handle.abort();

    info!("All services stopped, shutting down");
    Ok(())
}

fn connect_vehicle() -> Result<Arc<dyn VehicleDriver>> {
    let vehicle: Arc<dyn VehicleDriver> = match CONFIG.vehicle.driver {
        VehicleDriverKind::Mavlink => Arc::new(MavlinkVehicle::connect(
            &CONFIG.vehicle.connection_string,
            Duration::from_millis(CONFIG.survey.poll_interval_ms),
        )?),
        VehicleDriverKind::Simulated => {
            info!("Using simulated vehicle");
            Arc::new(SimulatedVehicle::new(Coordinate::new(0.0, 0.0)))
        }
    };
    Ok(vehicle)
}

fn spawn_mission(
    coordinator: Arc<MissionCoordinator>,
    mut shutdown: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let cancel = async move {
            let _ = shutdown.recv().await;
        };
        match coordinator.run_until(cancel).await {
            Ok(status) => info!("Mission finished: {:?}", status),
            Err(MissionError::Cancelled) => info!("Mission interrupted"),
            Err(e) => error!("Mission failed: {}", e),
        }
    })
}

fn spawn_telemetry(
    telemetry: TelemetryPublisher,
    mut shutdown: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = telemetry.run() => {}
            _ = shutdown.recv() => {
                info!("Shutting down telemetry publisher...");
                telemetry.stop();
            }
        }
    })
}

fn spawn_plan_listener(
    listener: PlanListener,
    inbound: mpsc::Receiver<InboundMessage>,
    mut shutdown: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = listener.run(inbound) => {}
            _ = shutdown.recv() => {
                info!("Shutting down plan listener...");
            }
        }
    })
}
