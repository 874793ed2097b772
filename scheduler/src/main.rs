// Scheduler binary entry point
// Runs the due-schedule processor on a fixed interval, for deployments
// without an external cron calling the API trigger.

use common::bootstrap::{init_database_pool, init_processor, load_settings};
use common::scheduler::{Scheduler, SchedulerEngine};
use common::telemetry::{init_logging, init_metrics, shutdown_tracer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = load_settings()?;

    init_logging(
        &settings.observability.log_level,
        settings.observability.tracing_endpoint.as_deref(),
    )?;
    init_metrics(settings.observability.metrics_port)?;

    info!(
        poll_interval_seconds = settings.scheduler.poll_interval_seconds,
        timezone = %settings.scheduler.timezone,
        "Starting WhatGov scheduler"
    );

    let db_pool = init_database_pool(&settings).await?;
    let processor = init_processor(&settings, db_pool.clone()).await?;

    let scheduler = Arc::new(SchedulerEngine::new(
        processor,
        Duration::from_secs(settings.scheduler.poll_interval_seconds),
    ));

    let scheduler_for_shutdown = scheduler.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        info!("Received Ctrl+C signal, initiating graceful shutdown");
        if let Err(e) = scheduler_for_shutdown.stop().await {
            error!(error = %e, "Error during scheduler shutdown");
        }
    });

    if let Err(e) = scheduler.start().await {
        error!(error = %e, "Scheduler error");
        return Err(e.into());
    }

    db_pool.close().await;
    shutdown_tracer();
    info!("Scheduler stopped");
    Ok(())
}
