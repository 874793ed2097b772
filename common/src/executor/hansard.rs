// Hansard search executor: priority first result plus change detection

use super::{SearchExecutor, SearchOutcome};
use crate::clients::HansardBackend;
use crate::db::repositories::ResultStore;
use crate::errors::ProcessError;
use crate::models::{FirstResult, HansardSummary, ScheduleRecord, SearchResponse};
use crate::schedule::local_date;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Runs Hansard saved searches and compares them with the previous result
pub struct HansardSearchExecutor {
    backend: Arc<dyn HansardBackend>,
    results: Arc<dyn ResultStore>,
    timezone: Tz,
}

impl HansardSearchExecutor {
    pub fn new(backend: Arc<dyn HansardBackend>, results: Arc<dyn ResultStore>, timezone: Tz) -> Self {
        Self {
            backend,
            results,
            timezone,
        }
    }
}

/// A change is any difference between the stored first result and the new
/// one, including one side being absent
pub fn has_changed(previous: Option<&FirstResult>, current: Option<&FirstResult>) -> bool {
    previous.map(|first| &first.item) != current.map(|first| &first.item)
}

#[async_trait]
impl SearchExecutor for HansardSearchExecutor {
    #[instrument(skip(self, schedule), fields(schedule_id = %schedule.id, search_type = "hansard"))]
    async fn execute(
        &self,
        schedule: &ScheduleRecord,
        now: DateTime<Utc>,
    ) -> Result<SearchOutcome, ProcessError> {
        let search = &schedule.saved_search;
        let house = search
            .query_state
            .as_ref()
            .and_then(|state| state.house.as_deref())
            .filter(|house| !house.is_empty());

        let response = self.backend.search(&search.query, house).await?;
        let first_result = response.first_result();

        let previous = self
            .results
            .latest_response(schedule.user_id, &search.query)
            .await?;
        let changed = has_changed(
            previous.as_ref().and_then(SearchResponse::hansard_first_result),
            first_result.as_ref(),
        );

        let citations: Vec<String> = first_result
            .as_ref()
            .and_then(|first| first.item.identifier())
            .into_iter()
            .collect();

        debug!(
            has_result = first_result.is_some(),
            has_changed = changed,
            "Hansard search completed"
        );

        Ok(SearchOutcome {
            response: SearchResponse::Hansard(HansardSummary {
                total_contributions: response.total_contributions,
                total_written_statements: response.total_written_statements,
                total_written_answers: response.total_written_answers,
                total_corrections: response.total_corrections,
                total_debates: response.total_debates,
                search_terms: response.search_terms,
                first_result,
                date: local_date(now, self.timezone),
            }),
            citations,
            has_changed: changed,
        })
    }
}
