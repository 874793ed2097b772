// Due-schedule processor
//
// Selects due schedules, runs each saved search, stores the result and moves
// the schedule to its next weekly slot. Every failure after selection is
// confined to the schedule that raised it.

use crate::clients::{HansardClient, OpenAiAssistantClient};
use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::db::repositories::{
    ResultStore, ScheduleRepository, ScheduleStore, SearchResultRepository,
    WeeklyAssistantRepository,
};
use crate::db::{DbPool, RedisPool};
use crate::errors::{ProcessError, ScheduleError};
use crate::executor::{AiSearchExecutor, HansardSearchExecutor, PollPolicy, SearchExecutor};
use crate::lock::{DistributedLock, LocalLock, RedLock};
use crate::models::{SavedSearchResult, ScheduleRecord, SearchType};
use crate::schedule::ScheduleTrigger;
use crate::telemetry;
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Tunables for one processing pass
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// TTL of the per-schedule lock
    pub lock_ttl: Duration,
    /// Upper bound on schedules handled per invocation
    pub max_schedules_per_run: usize,
    /// Zone in which the 07:00 run time is evaluated
    pub timezone: Tz,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::from_secs(600),
            max_schedules_per_run: 100,
            timezone: chrono_tz::Europe::London,
        }
    }
}

/// Counts reported back to the trigger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

enum ScheduleOutcome {
    Processed,
    Skipped,
}

pub struct ScheduleProcessor {
    config: ProcessorConfig,
    schedules: Arc<dyn ScheduleStore>,
    results: Arc<dyn ResultStore>,
    executors: HashMap<SearchType, Arc<dyn SearchExecutor>>,
    lock: Arc<dyn DistributedLock>,
    clock: Arc<dyn Clock>,
}

impl ScheduleProcessor {
    /// Create a processor with no executors registered
    pub fn new(
        config: ProcessorConfig,
        schedules: Arc<dyn ScheduleStore>,
        results: Arc<dyn ResultStore>,
        lock: Arc<dyn DistributedLock>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            schedules,
            results,
            executors: HashMap::new(),
            lock,
            clock,
        }
    }

    /// Register the executor for a search type
    pub fn with_executor(mut self, search_type: SearchType, executor: Arc<dyn SearchExecutor>) -> Self {
        self.executors.insert(search_type, executor);
        self
    }

    pub fn timezone(&self) -> Tz {
        self.config.timezone
    }

    /// Process every due schedule, optionally only those of one search type.
    ///
    /// Only a failed selection query aborts the pass.
    #[instrument(skip(self, filter), fields(filter = filter.as_ref().map(SearchType::as_str)))]
    pub async fn process_due_schedules(
        &self,
        filter: Option<SearchType>,
    ) -> Result<ProcessSummary, ProcessError> {
        let now = self.clock.now();
        let due = self
            .schedules
            .find_due(now, filter)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to select due schedules");
                ProcessError::Selection(e.to_string())
            })?;

        if due.len() > self.config.max_schedules_per_run {
            warn!(
                due = due.len(),
                limit = self.config.max_schedules_per_run,
                "More schedules due than the per-run limit, remainder left for the next run"
            );
        }

        let mut summary = ProcessSummary::default();

        for schedule in due.iter().take(self.config.max_schedules_per_run) {
            summary.selected += 1;
            let search_type = schedule.saved_search.search_type.as_str();
            let started = Instant::now();

            match self.process_schedule(schedule).await {
                Ok(ScheduleOutcome::Processed) => {
                    summary.succeeded += 1;
                    telemetry::record_schedule_processed(search_type);
                }
                Ok(ScheduleOutcome::Skipped) => {
                    summary.skipped += 1;
                    telemetry::record_schedule_skipped();
                }
                Err(e) => {
                    summary.failed += 1;
                    telemetry::record_schedule_failure(search_type, e.reason());
                    error!(
                        schedule_id = %schedule.id,
                        search_type = search_type,
                        reason = e.reason(),
                        error = %e,
                        "Failed to process schedule"
                    );
                    // Continue with the remaining schedules
                }
            }

            telemetry::record_schedule_duration(search_type, started.elapsed().as_secs_f64());
        }

        info!(
            selected = summary.selected,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            "Processed due schedules"
        );
        Ok(summary)
    }

    /// Run one schedule under its lock
    #[instrument(
        skip(self, schedule),
        fields(schedule_id = %schedule.id, search_type = %schedule.saved_search.search_type)
    )]
    async fn process_schedule(&self, schedule: &ScheduleRecord) -> Result<ScheduleOutcome, ProcessError> {
        let resource = format!("schedule:{}", schedule.id);

        let token = match self.lock.try_acquire(&resource, self.config.lock_ttl).await {
            Ok(Some(token)) => Some(token),
            Ok(None) => {
                debug!("Schedule locked by another invocation, skipping");
                return Ok(ScheduleOutcome::Skipped);
            }
            Err(e) => {
                // The conditional reschedule still guards against double runs
                warn!(error = %e, "Lock backend unavailable, continuing without lock");
                None
            }
        };

        let result = self.run_schedule(schedule).await;

        if let Some(token) = token {
            if let Err(e) = self.lock.release(token).await {
                warn!(error = %e, "Failed to release schedule lock");
            }
        }

        result.map(|_| ScheduleOutcome::Processed)
    }

    async fn run_schedule(&self, schedule: &ScheduleRecord) -> Result<(), ProcessError> {
        let now = self.clock.now();
        let search_type = &schedule.saved_search.search_type;

        let executor = self
            .executors
            .get(search_type)
            .ok_or_else(|| ProcessError::UnsupportedSearchType(search_type.to_string()))?;

        // Resolved before the search runs so a bad rule costs no upstream calls
        let rule = schedule.repeat_rule.as_ref().ok_or_else(|| {
            ScheduleError::InvalidRule("repeat rule is missing or unreadable".to_string())
        })?;
        let next_run_at = rule.next_run_at(now, self.config.timezone)?;

        let outcome = executor.execute(schedule, now).await?;

        let result = SavedSearchResult {
            id: Uuid::new_v4(),
            user_id: schedule.user_id,
            query: schedule.saved_search.query.clone(),
            response: outcome.response,
            citations: outcome.citations,
            query_state: schedule.saved_search.query_state.clone(),
            search_type: search_type.clone(),
            has_changed: outcome.has_changed,
            created_at: now,
        };
        self.results.insert(&result).await?;

        self.schedules
            .mark_ran(schedule.id, schedule.last_run_at, now, next_run_at)
            .await?;

        info!(
            result_id = %result.id,
            has_changed = result.has_changed,
            next_run_at = %next_run_at,
            "Schedule processed"
        );
        Ok(())
    }
}

/// Wire the production processor: PostgreSQL stores, HTTP backends, and a
/// Redis lock when a Redis URL is configured (in-process lock otherwise)
pub async fn build_processor(settings: &Settings, db_pool: DbPool) -> anyhow::Result<ScheduleProcessor> {
    let timezone = settings.scheduler.timezone()?;

    let lock: Arc<dyn DistributedLock> = match &settings.redis.url {
        Some(url) => {
            let pool = RedisPool::new(url).await?;
            info!("Using Redis schedule lock");
            Arc::new(RedLock::new(pool))
        }
        None => {
            info!("No Redis configured, using in-process schedule lock");
            Arc::new(LocalLock::new())
        }
    };

    let schedules = Arc::new(ScheduleRepository::new(db_pool.clone()));
    let results: Arc<dyn ResultStore> = Arc::new(SearchResultRepository::new(db_pool.clone()));
    let weekly_assistants = Arc::new(WeeklyAssistantRepository::new(db_pool));

    let assistant = Arc::new(OpenAiAssistantClient::new(&settings.assistant)?);
    let hansard = Arc::new(HansardClient::new(&settings.hansard)?);

    let ai_executor = AiSearchExecutor::new(
        assistant,
        weekly_assistants,
        settings.assistant.default_assistant_id.clone(),
        PollPolicy::from_config(&settings.assistant),
        timezone,
    );
    let hansard_executor = HansardSearchExecutor::new(hansard, results.clone(), timezone);

    let config = ProcessorConfig {
        lock_ttl: Duration::from_secs(settings.scheduler.lock_ttl_seconds),
        max_schedules_per_run: settings.scheduler.max_schedules_per_run,
        timezone,
    };

    Ok(
        ScheduleProcessor::new(config, schedules, results, lock, Arc::new(SystemClock))
            .with_executor(SearchType::Ai, Arc::new(ai_executor))
            .with_executor(SearchType::Hansard, Arc::new(hansard_executor)),
    )
}
