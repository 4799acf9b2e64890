//! Draw box HTTP server.

use draw_box::{
    Config, DrawBoxService, LoggingLedger,
    metrics::register_business_metrics,
    server::{AppState, build_router},
};
use draw_box_core::environment::SystemClock;
use draw_box_postgres::PostgresBoxStore;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting draw box server");
    info!(
        default_distribution = %config.draw.default_distribution,
        max_positions = config.draw.max_positions_per_draw,
        "Configuration loaded"
    );

    // Metrics exporter
    let metrics_addr: SocketAddr =
        format!("{}:{}", config.server.metrics_host, config.server.metrics_port).parse()?;
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
        )?
        .with_http_listener(metrics_addr)
        .install()?;
    register_business_metrics();
    info!(address = %metrics_addr, "Metrics exporter listening");

    // Box store
    info!("Connecting to database...");
    let store = PostgresBoxStore::connect(&config.database.store_config()).await?;
    if config.database.run_migrations {
        store.migrate().await?;
        info!("Migrations applied");
    }

    let service = DrawBoxService::new(
        Arc::new(store),
        Arc::new(LoggingLedger),
        Arc::new(SystemClock),
        &config.draw,
    );
    let app = build_router(AppState::new(service));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();
    tokio::select! {
        result = server => result?,
        () = drain_deadline(shutdown_timeout) => {
            warn!(timeout_secs = shutdown_timeout.as_secs(), "Graceful shutdown timed out");
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Completes `timeout` after a shutdown signal, bounding connection draining.
async fn drain_deadline(timeout: Duration) {
    shutdown_signal().await;
    tokio::time::sleep(timeout).await;
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            warn!(error = %error, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                warn!(error = %error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
