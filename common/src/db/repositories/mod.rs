// Repository layer for database operations
//
// The processor depends on the store traits below; the PostgreSQL
// repositories are the production implementations.

pub mod queries;
pub mod result;
pub mod schedule;
pub mod weekly_assistant;

pub use result::SearchResultRepository;
pub use schedule::ScheduleRepository;
pub use weekly_assistant::WeeklyAssistantRepository;

use crate::errors::{DatabaseError, LookupError};
use crate::models::{SavedSearchResult, ScheduleRecord, SearchResponse, SearchType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Read/update access to schedules
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Active schedules whose `next_run_at` is unset or `<= now`, optionally
    /// restricted to one search type
    async fn find_due(
        &self,
        now: DateTime<Utc>,
        search_type: Option<SearchType>,
    ) -> Result<Vec<ScheduleRecord>, DatabaseError>;

    /// Record a completed run. Fails with `DatabaseError::Conflict` when
    /// `last_run_at` no longer matches `expected_last_run_at`.
    async fn mark_ran(
        &self,
        schedule_id: Uuid,
        expected_last_run_at: Option<DateTime<Utc>>,
        ran_at: DateTime<Utc>,
        next_run_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;
}

/// Append/read access to search results
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Response of the most recent result for this user and query
    async fn latest_response(
        &self,
        user_id: Uuid,
        query: &str,
    ) -> Result<Option<SearchResponse>, DatabaseError>;

    /// Append a new result row
    async fn insert(&self, result: &SavedSearchResult) -> Result<(), DatabaseError>;
}

/// Lookup of the assistant prepared for a given week
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WeeklyAssistantLookup: Send + Sync {
    /// Assistant id for the week keyed by its Monday (`YYYY-MM-DD`)
    async fn assistant_for_week(&self, week_key: &str) -> Result<Option<String>, LookupError>;
}
