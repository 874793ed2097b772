// Bootstrap utilities shared by the api and scheduler binaries

use crate::config::Settings;
use crate::db::DbPool;
use crate::scheduler::{build_processor, ScheduleProcessor};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// Load layered settings and reject invalid ones
pub fn load_settings() -> Result<Settings> {
    let settings = Settings::load().context("Failed to load configuration")?;
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    Ok(settings)
}

/// Initialize the database pool, applying migrations when configured
#[tracing::instrument(skip(settings))]
pub async fn init_database_pool(settings: &Settings) -> Result<DbPool> {
    info!("Initializing database pool");

    let db_pool = DbPool::new(&settings.database)
        .await
        .context("Failed to initialize database pool")?;

    if settings.database.run_migrations {
        db_pool
            .run_migrations()
            .await
            .context("Failed to run database migrations")?;
    }

    info!("Database pool initialized");
    Ok(db_pool)
}

/// Build the production schedule processor
#[tracing::instrument(skip(settings, db_pool))]
pub async fn init_processor(settings: &Settings, db_pool: DbPool) -> Result<Arc<ScheduleProcessor>> {
    let processor = build_processor(settings, db_pool)
        .await
        .context("Failed to build schedule processor")?;

    info!(
        timezone = %processor.timezone(),
        max_schedules_per_run = settings.scheduler.max_schedules_per_run,
        "Schedule processor initialized"
    );
    Ok(Arc::new(processor))
}
