// AI search executor: weekly assistant, date-steered prompt, bounded run poll

use super::run_poller::{wait_for_run, PollPolicy};
use super::{SearchExecutor, SearchOutcome};
use crate::clients::AssistantBackend;
use crate::db::repositories::WeeklyAssistantLookup;
use crate::errors::ProcessError;
use crate::models::{AiAnswer, ScheduleRecord, SearchResponse};
use crate::schedule::{local_date, recent_days, week_key, RECENT_DAYS};
use crate::telemetry;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Runs AI saved searches against the assistant backend
pub struct AiSearchExecutor {
    backend: Arc<dyn AssistantBackend>,
    weekly_assistants: Arc<dyn WeeklyAssistantLookup>,
    default_assistant_id: String,
    poll_policy: PollPolicy,
    timezone: Tz,
}

impl AiSearchExecutor {
    pub fn new(
        backend: Arc<dyn AssistantBackend>,
        weekly_assistants: Arc<dyn WeeklyAssistantLookup>,
        default_assistant_id: impl Into<String>,
        poll_policy: PollPolicy,
        timezone: Tz,
    ) -> Self {
        Self {
            backend,
            weekly_assistants,
            default_assistant_id: default_assistant_id.into(),
            poll_policy,
            timezone,
        }
    }

    /// Assistant for the week containing `today`, or the default one when the
    /// week has none or the lookup fails
    async fn resolve_assistant(&self, today: NaiveDate) -> String {
        let key = week_key(today);
        match self.weekly_assistants.assistant_for_week(&key).await {
            Ok(Some(assistant_id)) => assistant_id,
            Ok(None) => {
                debug!(week_key = %key, "No weekly assistant, using default");
                telemetry::record_weekly_assistant_fallback("missing");
                self.default_assistant_id.clone()
            }
            Err(e) => {
                warn!(week_key = %key, error = %e, "Weekly assistant lookup failed, using default");
                telemetry::record_weekly_assistant_fallback("error");
                self.default_assistant_id.clone()
            }
        }
    }
}

/// Query text steered towards the most recent days
pub fn augment_query(query: &str, today: NaiveDate) -> String {
    let days = recent_days(today, RECENT_DAYS)
        .iter()
        .map(|day| day.format("%Y-%m-%d").to_string())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "{}\n\nToday's date is {}. Only use content from these dates: {}.",
        query,
        today.format("%Y-%m-%d"),
        days
    )
}

#[async_trait]
impl SearchExecutor for AiSearchExecutor {
    #[instrument(skip(self, schedule), fields(schedule_id = %schedule.id, search_type = "ai"))]
    async fn execute(
        &self,
        schedule: &ScheduleRecord,
        now: DateTime<Utc>,
    ) -> Result<SearchOutcome, ProcessError> {
        let today = local_date(now, self.timezone);
        let assistant_id = self.resolve_assistant(today).await;
        let prompt = augment_query(&schedule.saved_search.query, today);

        let thread_id = self.backend.create_thread().await?;
        self.backend.post_message(&thread_id, &prompt).await?;
        let run_id = self.backend.start_run(&thread_id, &assistant_id).await?;

        let polls = wait_for_run(self.backend.as_ref(), &thread_id, &run_id, self.poll_policy).await?;
        telemetry::record_assistant_polls(polls);

        let messages = self.backend.list_messages(&thread_id).await?;
        let reply = messages
            .iter()
            .find(|message| message.role == "assistant")
            .ok_or_else(|| {
                ProcessError::InvalidPayload(format!("run {} produced no assistant reply", run_id))
            })?;

        let mut citations = Vec::new();
        for file_id in reply.cited_file_ids() {
            citations.push(self.backend.file_name(&file_id).await?);
        }

        debug!(
            assistant_id = %assistant_id,
            citations = citations.len(),
            "AI search completed"
        );

        Ok(SearchOutcome {
            response: SearchResponse::Ai(AiAnswer {
                answer: reply.text(),
                citations: citations.clone(),
            }),
            citations,
            // Free-form answers are not compared between runs
            has_changed: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{AssistantMessage, RunStatus};
    use crate::db::repositories::MockWeeklyAssistantLookup;
    use crate::errors::LookupError;
    use crate::models::{SavedSearchSpec, SearchType};
    use chrono::TimeZone;
    use mockall::predicate::eq;
    use std::sync::Mutex;
    use std::time::Duration;
    use uuid::Uuid;

    /// Assistant that completes immediately and records what it was sent
    #[derive(Default)]
    struct RecordingAssistant {
        prompts: Mutex<Vec<String>>,
        assistants: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AssistantBackend for RecordingAssistant {
        async fn create_thread(&self) -> Result<String, ProcessError> {
            Ok("thread_1".to_string())
        }
        async fn post_message(&self, _: &str, content: &str) -> Result<(), ProcessError> {
            self.prompts.lock().unwrap().push(content.to_string());
            Ok(())
        }
        async fn start_run(&self, _: &str, assistant_id: &str) -> Result<String, ProcessError> {
            self.assistants.lock().unwrap().push(assistant_id.to_string());
            Ok("run_1".to_string())
        }
        async fn run_status(&self, _: &str, _: &str) -> Result<RunStatus, ProcessError> {
            Ok(RunStatus::Completed)
        }
        async fn list_messages(&self, _: &str) -> Result<Vec<AssistantMessage>, ProcessError> {
            Ok(vec![serde_json::from_value(serde_json::json!({
                "id": "msg_2",
                "role": "assistant",
                "content": [{
                    "type": "text",
                    "text": {
                        "value": "Ministers answered questions on housing.",
                        "annotations": [
                            {"type": "file_citation", "text": "[1]", "file_citation": {"file_id": "file-1"}}
                        ]
                    }
                }]
            }))
            .unwrap()])
        }
        async fn file_name(&self, file_id: &str) -> Result<String, ProcessError> {
            Ok(format!("{}.pdf", file_id))
        }
    }

    fn schedule() -> ScheduleRecord {
        ScheduleRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            is_active: true,
            last_run_at: None,
            next_run_at: None,
            repeat_rule: None,
            saved_search: SavedSearchSpec {
                id: Uuid::new_v4(),
                query: "housing".to_string(),
                query_state: None,
                search_type: SearchType::Ai,
            },
        }
    }

    fn executor(
        backend: Arc<RecordingAssistant>,
        lookup: MockWeeklyAssistantLookup,
    ) -> AiSearchExecutor {
        AiSearchExecutor::new(
            backend,
            Arc::new(lookup),
            "asst_default",
            PollPolicy::new(Duration::from_millis(1), Duration::from_secs(1)),
            chrono_tz::Europe::London,
        )
    }

    #[test]
    fn test_augment_query_lists_recent_days_newest_first() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let prompt = augment_query("housing", today);
        assert!(prompt.starts_with("housing\n\n"));
        assert!(prompt.contains("Today's date is 2024-03-02."));
        assert!(prompt.contains(
            "2024-03-02, 2024-03-01, 2024-02-29, 2024-02-28, 2024-02-27, 2024-02-26, 2024-02-25."
        ));
    }

    #[tokio::test]
    async fn test_uses_weekly_assistant_for_current_week() {
        let mut lookup = MockWeeklyAssistantLookup::new();
        lookup
            .expect_assistant_for_week()
            .with(eq("2024-03-11"))
            .times(1)
            .returning(|_| Ok(Some("asst_week_11".to_string())));

        let backend = Arc::new(RecordingAssistant::default());
        let now = Utc.with_ymd_and_hms(2024, 3, 13, 9, 0, 0).unwrap();
        let outcome = executor(backend.clone(), lookup)
            .execute(&schedule(), now)
            .await
            .unwrap();

        assert_eq!(*backend.assistants.lock().unwrap(), vec!["asst_week_11"]);
        assert!(backend.prompts.lock().unwrap()[0].contains("2024-03-13"));
        assert!(!outcome.has_changed);
        assert_eq!(outcome.citations, vec!["file-1.pdf"]);
        assert_eq!(
            outcome.response,
            SearchResponse::Ai(AiAnswer {
                answer: "Ministers answered questions on housing.".to_string(),
                citations: vec!["file-1.pdf".to_string()],
            })
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_default_when_week_missing() {
        let mut lookup = MockWeeklyAssistantLookup::new();
        lookup
            .expect_assistant_for_week()
            .returning(|_| Ok(None));

        let backend = Arc::new(RecordingAssistant::default());
        let now = Utc.with_ymd_and_hms(2024, 3, 13, 9, 0, 0).unwrap();
        executor(backend.clone(), lookup)
            .execute(&schedule(), now)
            .await
            .unwrap();

        assert_eq!(*backend.assistants.lock().unwrap(), vec!["asst_default"]);
    }

    #[tokio::test]
    async fn test_falls_back_to_default_when_lookup_fails() {
        let mut lookup = MockWeeklyAssistantLookup::new();
        lookup
            .expect_assistant_for_week()
            .returning(|_| Err(LookupError::Backend("connection reset".to_string())));

        let backend = Arc::new(RecordingAssistant::default());
        let now = Utc.with_ymd_and_hms(2024, 3, 13, 9, 0, 0).unwrap();
        let outcome = executor(backend.clone(), lookup)
            .execute(&schedule(), now)
            .await;

        assert!(outcome.is_ok());
        assert_eq!(*backend.assistants.lock().unwrap(), vec!["asst_default"]);
    }
}
