// Search executors
// One implementation per executable search type; the processor picks one by
// the saved search's type.

pub mod ai;
pub mod hansard;
pub mod run_poller;

pub use ai::AiSearchExecutor;
pub use hansard::HansardSearchExecutor;
pub use run_poller::{wait_for_run, PollPolicy};

use crate::errors::ProcessError;
use crate::models::{ScheduleRecord, SearchResponse};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// What a search run produced, ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub response: SearchResponse,
    pub citations: Vec<String>,
    pub has_changed: bool,
}

/// SearchExecutor runs the saved search behind a schedule
#[async_trait]
pub trait SearchExecutor: Send + Sync {
    async fn execute(
        &self,
        schedule: &ScheduleRecord,
        now: DateTime<Utc>,
    ) -> Result<SearchOutcome, ProcessError>;
}
