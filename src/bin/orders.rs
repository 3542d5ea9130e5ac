//! Orders service binary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use otel_demo::config::{load_config, ServiceDefaults};
use otel_demo::http::TracedClient;
use otel_demo::lifecycle::{spawn_signal_listener, Shutdown};
use otel_demo::observability::{init_telemetry, HttpMetrics, ServiceMeta};
use otel_demo::orders::{self, OrderStore, OrdersState};

#[derive(Parser)]
#[command(name = "orders", version, about = "Order API with distributed tracing")]
struct Args {
    /// Path to a configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address override, e.g. 127.0.0.1:8081.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref(), &ServiceDefaults::orders())?;
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }

    let meta = ServiceMeta::from_config(&config);
    let _telemetry = init_telemetry(&config, meta)?;

    tracing::info!(
        service = %config.service.name,
        bind = %config.server.bind_address,
        notifications_url = %config.downstream.notifications_url,
        "starting orders service"
    );

    let store = OrderStore::from_config(&config.database).await?;
    let metrics = HttpMetrics::new();
    let client = TracedClient::new(
        metrics.clone(),
        Duration::from_secs(config.timeouts.client_secs),
    )?;
    let state = OrdersState {
        store: Arc::new(store),
        client,
        notifications_url: config.downstream.notifications_url.clone(),
        simulation: config.simulation.clone(),
        metrics,
    };
    let app = orders::router(&config, state);

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.notified())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}
