use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use common::config::Settings;
use common::db::DbPool;
use common::scheduler::ScheduleProcessor;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub processor: Arc<ScheduleProcessor>,
    pub config: Arc<Settings>,
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// Create a new AppState instance
    pub fn new(
        db_pool: DbPool,
        processor: Arc<ScheduleProcessor>,
        config: Settings,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            db_pool,
            processor,
            config: Arc::new(config),
            metrics,
        }
    }
}
