use anyhow::{Context, Result};
use schools_service::api::start_api_server;
use schools_service::{
    AppState, Config, MemorySchoolStore, Pages, PgSchoolStore, SchoolService, SchoolStore,
    StorageResolver,
};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.service.log_level);

    info!(
        service = %config.service.name,
        "Starting Schools Service"
    );

    // Initialize metrics
    init_metrics(config.service.metrics_port)?;

    let store: Arc<dyn SchoolStore> = match &config.database.url {
        Some(url) => {
            let store = PgSchoolStore::new(url, &config.database)
                .await
                .context("Failed to initialize school store")?;

            if config.database.run_migrations {
                store
                    .run_migrations()
                    .await
                    .context("Failed to run database migrations")?;
            }

            Arc::new(store)
        }
        None => {
            warn!("No database URL configured, records are kept in memory only");
            Arc::new(MemorySchoolStore::new())
        }
    };

    let images = StorageResolver::from_config(&config)
        .await
        .context("Failed to initialize image storage")?;

    info!(strategies = ?images.strategy_names(), "Image storage ready");

    let pages = Pages::new(&config.local_storage.public_prefix)
        .context("Failed to load page templates")?;

    let state = AppState {
        service: SchoolService::new(store, images),
        pages: Arc::new(pages),
    };

    start_api_server(state, &config.api, &config.local_storage, shutdown_signal()).await?;

    info!("Schools service stopped");

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();
}

/// Initialize Prometheus metrics exporter
fn init_metrics(port: u16) -> Result<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus metrics exporter")?;

    info!(port = port, "Prometheus metrics exporter started");

    Ok(())
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }

    info!("Shutting down schools service");
}
