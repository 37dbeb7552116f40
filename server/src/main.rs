use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ehr_server::auth::TokenRegistry;
use ehr_server::config::AppConfig;
use ehr_server::db::{migrations, ReportRepository};
use ehr_server::jobs::{JobQueue, LabReportProcessor, LAB_REPORTS_QUEUE};
use ehr_server::reports::ReportService;
use ehr_server::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    if config.run_migrations {
        let applied = migrations::run_migrations(&pool).await?;
        tracing::info!(applied, "Migrations complete");
    }

    let tokens = TokenRegistry::new(&config.api_tokens);
    if tokens.is_empty() {
        tracing::warn!("EHR_API_TOKENS is empty; every protected route will return 401");
    }

    let processor = Arc::new(LabReportProcessor::new(config.lab_report_delay));
    let (queue, worker) = JobQueue::with_retention(
        LAB_REPORTS_QUEUE,
        config.lab_report_attempts,
        config.lab_report_retained_jobs,
        processor,
    );
    let worker = tokio::spawn(worker.run());

    let reports = ReportService::new(Arc::new(ReportRepository::new(pool)));
    let app = app(AppState::new(reports, queue, tokens));

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "EHR report server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router held the last queue handle, so the worker drains and exits.
    if let Err(e) = worker.await {
        tracing::error!(error = %e, "Lab report worker panicked");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
