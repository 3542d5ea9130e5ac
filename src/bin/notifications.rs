//! Notifications service binary.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use otel_demo::config::{load_config, ServiceDefaults};
use otel_demo::lifecycle::{spawn_signal_listener, Shutdown};
use otel_demo::notifications::{self, NotificationStore, NotificationsState};
use otel_demo::observability::{init_telemetry, HttpMetrics, ServiceMeta};

#[derive(Parser)]
#[command(
    name = "notifications",
    version,
    about = "Notification API with distributed tracing"
)]
struct Args {
    /// Path to a configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address override, e.g. 127.0.0.1:8082.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref(), &ServiceDefaults::notifications())?;
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }

    let meta = ServiceMeta::from_config(&config);
    let _telemetry = init_telemetry(&config, meta)?;

    tracing::info!(
        service = %config.service.name,
        bind = %config.server.bind_address,
        failure_rate = config.simulation.failure_rate,
        "starting notifications service"
    );

    let state = NotificationsState {
        store: NotificationStore::default(),
        simulation: config.simulation.clone(),
        metrics: HttpMetrics::new(),
    };
    let app = notifications::router(&config, state);

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.notified())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}
