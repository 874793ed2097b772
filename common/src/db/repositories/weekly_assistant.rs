// Weekly assistant repository implementation

use super::WeeklyAssistantLookup;
use crate::db::DbPool;
use crate::errors::{DatabaseError, LookupError};
use async_trait::async_trait;
use sqlx::Row;
use tracing::instrument;

/// Repository for the per-week assistant table
pub struct WeeklyAssistantRepository {
    pool: DbPool,
}

impl WeeklyAssistantRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Register (or replace) the assistant for a week
    #[instrument(skip(self))]
    pub async fn upsert(&self, week_key: &str, assistant_id: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO weekly_assistants (week_key, assistant_id)
            VALUES ($1, $2)
            ON CONFLICT (week_key) DO UPDATE SET assistant_id = EXCLUDED.assistant_id
            "#,
        )
        .bind(week_key)
        .bind(assistant_id)
        .execute(self.pool.pool())
        .await?;

        tracing::info!(week_key, assistant_id, "Weekly assistant registered");
        Ok(())
    }
}

#[async_trait]
impl WeeklyAssistantLookup for WeeklyAssistantRepository {
    #[instrument(skip(self))]
    async fn assistant_for_week(&self, week_key: &str) -> Result<Option<String>, LookupError> {
        let row = sqlx::query("SELECT assistant_id FROM weekly_assistants WHERE week_key = $1")
            .bind(week_key)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(DatabaseError::from)?;

        match row {
            Some(row) => Ok(Some(
                row.try_get("assistant_id").map_err(DatabaseError::from)?,
            )),
            None => Ok(None),
        }
    }
}
