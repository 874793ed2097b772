// Schedule repository implementation

use super::queries::schedule_queries;
use super::ScheduleStore;
use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::{QueryState, RepeatRule, SavedSearchSpec, ScheduleRecord, SearchType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Repository for search_schedules joined with their saved searches
pub struct ScheduleRepository {
    pool: DbPool,
}

impl ScheduleRepository {
    /// Create a new ScheduleRepository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Map a joined row. A repeat rule or query state that does not parse is
    /// kept as `None` so one malformed schedule cannot block the others.
    fn map_row(row: &PgRow) -> Result<ScheduleRecord, DatabaseError> {
        let id: Uuid = row.try_get("id")?;

        let repeat_rule_json: Option<serde_json::Value> = row.try_get("repeat_rule")?;
        let repeat_rule = repeat_rule_json.and_then(|value| {
            serde_json::from_value::<RepeatRule>(value)
                .map_err(|e| warn!(schedule_id = %id, error = %e, "Unparsable repeat rule"))
                .ok()
        });

        let query_state_json: Option<serde_json::Value> = row.try_get("query_state")?;
        let query_state = query_state_json
            .filter(|value| !value.is_null())
            .and_then(|value| {
                serde_json::from_value::<QueryState>(value)
                    .map_err(|e| warn!(schedule_id = %id, error = %e, "Unparsable query state"))
                    .ok()
            });

        let search_type: String = row.try_get("search_type")?;

        Ok(ScheduleRecord {
            id,
            user_id: row.try_get("user_id")?,
            is_active: row.try_get("is_active")?,
            last_run_at: row.try_get("last_run_at")?,
            next_run_at: row.try_get("next_run_at")?,
            repeat_rule,
            saved_search: SavedSearchSpec {
                id: row.try_get("saved_search_id")?,
                query: row.try_get("query")?,
                query_state,
                search_type: SearchType::from(search_type),
            },
        })
    }

    /// Find a single schedule by id
    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ScheduleRecord>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM search_schedules s
            JOIN saved_searches ss ON ss.id = s.saved_search_id
            WHERE s.id = $1
            "#,
            schedule_queries::SELECT_JOINED_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;

        row.as_ref().map(Self::map_row).transpose()
    }
}

#[async_trait]
impl ScheduleStore for ScheduleRepository {
    #[instrument(skip(self))]
    async fn find_due(
        &self,
        now: DateTime<Utc>,
        search_type: Option<SearchType>,
    ) -> Result<Vec<ScheduleRecord>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM search_schedules s
            JOIN saved_searches ss ON ss.id = s.saved_search_id
            WHERE s.is_active = true
              AND (s.next_run_at IS NULL OR s.next_run_at <= $1)
              AND ($2::text IS NULL OR ss.search_type = $2)
            ORDER BY s.next_run_at ASC NULLS FIRST, s.id ASC
            "#,
            schedule_queries::SELECT_JOINED_COLUMNS
        );

        let rows = sqlx::query(&sql)
            .bind(now)
            .bind(search_type.as_ref().map(SearchType::as_str))
            .fetch_all(self.pool.pool())
            .await?;

        let mut schedules = Vec::with_capacity(rows.len());
        for row in &rows {
            match Self::map_row(row) {
                Ok(schedule) => schedules.push(schedule),
                Err(e) => warn!(error = %e, "Skipping schedule row that could not be read"),
            }
        }

        tracing::debug!(count = schedules.len(), "Found due schedules");
        Ok(schedules)
    }

    #[instrument(skip(self))]
    async fn mark_ran(
        &self,
        schedule_id: Uuid,
        expected_last_run_at: Option<DateTime<Utc>>,
        ran_at: DateTime<Utc>,
        next_run_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        // Optimistic guard: a concurrent run would already have moved last_run_at
        let result = sqlx::query(
            r#"
            UPDATE search_schedules
            SET last_run_at = $2, next_run_at = $3, updated_at = NOW()
            WHERE id = $1 AND last_run_at IS NOT DISTINCT FROM $4
            "#,
        )
        .bind(schedule_id)
        .bind(ran_at)
        .bind(next_run_at)
        .bind(expected_last_run_at)
        .execute(self.pool.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::Conflict(format!(
                "schedule {} was updated by another run",
                schedule_id
            )));
        }

        tracing::info!(schedule_id = %schedule_id, next_run_at = %next_run_at, "Schedule rescheduled");
        Ok(())
    }
}
