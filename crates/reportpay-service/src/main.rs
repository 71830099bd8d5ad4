//! reportpay service - HTTP API for report purchases.
//!
//! This is the main entry point for the reportpay service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reportpay_service::{create_router, AppState, ServiceConfig, StorageBackend};
use reportpay_store::{
    Ledger, MemoryLedger, MemoryReportStore, MongoReportStore, PgLedger, ReportStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,reportpay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting reportpay service");

    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        storage_backend = ?config.storage_backend,
        report_price_cents = config.report_price_cents,
        store_timeout_seconds = config.store_timeout_seconds,
        mock_routes = config.enable_mock_routes,
        "Service configuration loaded"
    );

    let (ledger, reports) = open_stores(&config).await?;

    let state = AppState::new(ledger, reports, config.clone());

    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Connect both stores for the configured backend.
async fn open_stores(
    config: &ServiceConfig,
) -> Result<(Arc<dyn Ledger>, Arc<dyn ReportStore>), Box<dyn std::error::Error>> {
    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory stores - all data is lost on restart");
            Ok((
                Arc::new(MemoryLedger::new()),
                Arc::new(MemoryReportStore::new()),
            ))
        }
        StorageBackend::External => {
            let ledger = PgLedger::connect(
                &config.database_url,
                config.database_max_connections,
                config.store_timeout(),
            )
            .await?;
            ledger.migrate().await?;

            let reports = MongoReportStore::connect(
                &config.mongo_uri,
                &config.mongo_database,
                config.store_timeout(),
            )
            .await?;

            Ok((Arc::new(ledger), Arc::new(reports)))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
