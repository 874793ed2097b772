// Saved search result repository implementation

use super::queries::result_queries;
use super::ResultStore;
use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::{SavedSearchResult, SearchResponse, SearchType};
use async_trait::async_trait;
use sqlx::Row;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Repository for the append-only saved_search_results table
pub struct SearchResultRepository {
    pool: DbPool,
}

impl SearchResultRepository {
    /// Create a new SearchResultRepository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Results for a user, newest first
    #[instrument(skip(self))]
    pub async fn find_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<SavedSearchResult>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM saved_search_results
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
            result_queries::SELECT_ALL_COLUMNS
        );

        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(self.pool.pool())
            .await?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let response_json: serde_json::Value = row.try_get("response")?;
            let response: SearchResponse = serde_json::from_value(response_json).map_err(|e| {
                DatabaseError::QueryFailed(format!("Failed to parse response: {}", e))
            })?;
            let query_state_json: Option<serde_json::Value> = row.try_get("query_state")?;
            let search_type: String = row.try_get("search_type")?;

            results.push(SavedSearchResult {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                query: row.try_get("query")?,
                response,
                citations: row.try_get("citations")?,
                query_state: query_state_json.and_then(|value| serde_json::from_value(value).ok()),
                search_type: SearchType::from(search_type),
                has_changed: row.try_get("has_changed")?,
                created_at: row.try_get("created_at")?,
            });
        }

        Ok(results)
    }
}

#[async_trait]
impl ResultStore for SearchResultRepository {
    #[instrument(skip(self))]
    async fn latest_response(
        &self,
        user_id: Uuid,
        query: &str,
    ) -> Result<Option<SearchResponse>, DatabaseError> {
        let row = sqlx::query(
            r#"
            SELECT response
            FROM saved_search_results
            WHERE user_id = $1 AND query = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(query)
        .fetch_optional(self.pool.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let response_json: serde_json::Value = row.try_get("response")?;
        match serde_json::from_value::<SearchResponse>(response_json) {
            Ok(response) => Ok(Some(response)),
            Err(e) => {
                // An unreadable prior result is treated as no prior result
                warn!(user_id = %user_id, error = %e, "Ignoring unparsable prior response");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, result), fields(result_id = %result.id, user_id = %result.user_id))]
    async fn insert(&self, result: &SavedSearchResult) -> Result<(), DatabaseError> {
        let response_json = serde_json::to_value(&result.response).map_err(|e| {
            DatabaseError::QueryFailed(format!("Failed to serialize response: {}", e))
        })?;
        let query_state_json = result
            .query_state
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| {
                DatabaseError::QueryFailed(format!("Failed to serialize query_state: {}", e))
            })?;

        sqlx::query(
            r#"
            INSERT INTO saved_search_results (
                id, user_id, query, response, citations,
                query_state, search_type, has_changed, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(result.id)
        .bind(result.user_id)
        .bind(&result.query)
        .bind(response_json)
        .bind(&result.citations)
        .bind(query_state_json)
        .bind(result.search_type.as_str())
        .bind(result.has_changed)
        .bind(result.created_at)
        .execute(self.pool.pool())
        .await?;

        tracing::info!(
            search_type = %result.search_type,
            has_changed = result.has_changed,
            "Search result stored"
        );
        Ok(())
    }
}
