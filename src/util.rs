use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// `VEHICLE_ID` from the environment, else the configured id.
pub fn get_vehicle_id(configured: &str) -> String {
    std::env::var("VEHICLE_ID")
        .ok()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| configured.to_string())
}

pub fn setup_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .pretty(),
        )
        .with(
            EnvFilter::from_default_env()
                .add_directive(
                    log_level
                        .parse()
                        .unwrap_or_else(|_| tracing::Level::INFO.into()),
                )
                .add_directive("rumqttc=info".parse().expect("valid directive")),
        )
        .try_init()
        .expect("Failed to initialize logging");
}
