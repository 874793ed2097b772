// Conversational assistant backend (OpenAI Assistants v2 REST API)

use super::send_json;
use crate::config::AssistantConfig;
use crate::errors::ProcessError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::instrument;

/// Lifecycle state of an assistant run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    InProgress,
    Cancelling,
    RequiresAction,
    Completed,
    Failed,
    Cancelled,
    Expired,
    Incomplete,
    Unknown(String),
}

impl RunStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "queued" => RunStatus::Queued,
            "in_progress" => RunStatus::InProgress,
            "cancelling" => RunStatus::Cancelling,
            "requires_action" => RunStatus::RequiresAction,
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed,
            "cancelled" => RunStatus::Cancelled,
            "expired" => RunStatus::Expired,
            "incomplete" => RunStatus::Incomplete,
            other => RunStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::Cancelling => "cancelling",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Expired => "expired",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Unknown(value) => value,
        }
    }

    /// Whether polling should keep going
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling
        )
    }
}

/// A message in an assistant thread
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssistantMessage {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

impl AssistantMessage {
    /// Concatenated text of all text parts
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                MessageContent::Text { text } => Some(text.value.as_str()),
                MessageContent::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// File ids cited by the message, in annotation order, without duplicates
    pub fn cited_file_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for part in &self.content {
            if let MessageContent::Text { text } = part {
                for annotation in &text.annotations {
                    if let Annotation::FileCitation { file_citation, .. } = annotation {
                        if !ids.contains(&file_citation.file_id) {
                            ids.push(file_citation.file_id.clone());
                        }
                    }
                }
            }
        }
        ids
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: MessageText },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageText {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
    FileCitation {
        #[serde(default)]
        text: String,
        file_citation: FileCitation,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileCitation {
    pub file_id: String,
}

/// Operations the AI search needs from the assistant service
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Create an empty conversation thread, returning its id
    async fn create_thread(&self) -> Result<String, ProcessError>;

    /// Append a user message to a thread
    async fn post_message(&self, thread_id: &str, content: &str) -> Result<(), ProcessError>;

    /// Start a run of `assistant_id` on a thread, returning the run id
    async fn start_run(&self, thread_id: &str, assistant_id: &str) -> Result<String, ProcessError>;

    /// Current status of a run
    async fn run_status(&self, thread_id: &str, run_id: &str) -> Result<RunStatus, ProcessError>;

    /// Messages of a thread, newest first
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<AssistantMessage>, ProcessError>;

    /// Human-readable name of an uploaded file
    async fn file_name(&self, file_id: &str) -> Result<String, ProcessError>;
}

#[derive(Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Deserialize)]
struct RunResponse {
    status: String,
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<AssistantMessage>,
}

#[derive(Deserialize)]
struct FileResponse {
    filename: String,
}

/// reqwest client for the OpenAI Assistants v2 API
pub struct OpenAiAssistantClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiAssistantClient {
    /// Create a new client from configuration
    pub fn new(config: &AssistantConfig) -> Result<Self, ProcessError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| {
                ProcessError::UpstreamHttp(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }
}

#[async_trait]
impl AssistantBackend for OpenAiAssistantClient {
    #[instrument(skip(self))]
    async fn create_thread(&self) -> Result<String, ProcessError> {
        let thread: IdResponse = send_json(self.post("/threads").json(&json!({})), "create thread").await?;
        tracing::debug!(thread_id = %thread.id, "Thread created");
        Ok(thread.id)
    }

    #[instrument(skip(self, content), fields(content_len = content.len()))]
    async fn post_message(&self, thread_id: &str, content: &str) -> Result<(), ProcessError> {
        let _: IdResponse = send_json(
            self.post(&format!("/threads/{}/messages", thread_id))
                .json(&json!({ "role": "user", "content": content })),
            "post message",
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn start_run(&self, thread_id: &str, assistant_id: &str) -> Result<String, ProcessError> {
        let run: IdResponse = send_json(
            self.post(&format!("/threads/{}/runs", thread_id))
                .json(&json!({ "assistant_id": assistant_id })),
            "start run",
        )
        .await?;
        tracing::debug!(run_id = %run.id, "Run started");
        Ok(run.id)
    }

    #[instrument(skip(self))]
    async fn run_status(&self, thread_id: &str, run_id: &str) -> Result<RunStatus, ProcessError> {
        let run: RunResponse = send_json(
            self.get(&format!("/threads/{}/runs/{}", thread_id, run_id)),
            "retrieve run",
        )
        .await?;
        Ok(RunStatus::parse(&run.status))
    }

    #[instrument(skip(self))]
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<AssistantMessage>, ProcessError> {
        let list: MessageList = send_json(
            self.get(&format!("/threads/{}/messages", thread_id))
                .query(&[("order", "desc")]),
            "list messages",
        )
        .await?;
        Ok(list.data)
    }

    #[instrument(skip(self))]
    async fn file_name(&self, file_id: &str) -> Result<String, ProcessError> {
        let file: FileResponse =
            send_json(self.get(&format!("/files/{}", file_id)), "retrieve file").await?;
        Ok(file.filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_parsing() {
        assert_eq!(RunStatus::parse("completed"), RunStatus::Completed);
        assert_eq!(RunStatus::parse("in_progress"), RunStatus::InProgress);
        assert!(RunStatus::parse("queued").is_pending());
        assert!(!RunStatus::parse("failed").is_pending());
        assert!(!RunStatus::parse("requires_action").is_pending());

        let unknown = RunStatus::parse("paused");
        assert_eq!(unknown, RunStatus::Unknown("paused".to_string()));
        assert_eq!(unknown.as_str(), "paused");
        assert!(!unknown.is_pending());
    }

    #[test]
    fn test_message_text_and_citations() {
        let message: AssistantMessage = serde_json::from_value(json!({
            "id": "msg_1",
            "role": "assistant",
            "content": [
                {
                    "type": "text",
                    "text": {
                        "value": "Debate on housing [1][2]",
                        "annotations": [
                            {"type": "file_citation", "text": "[1]", "file_citation": {"file_id": "file-a"}},
                            {"type": "file_path", "text": "[x]", "file_path": {"file_id": "file-z"}},
                            {"type": "file_citation", "text": "[2]", "file_citation": {"file_id": "file-b"}},
                            {"type": "file_citation", "text": "[3]", "file_citation": {"file_id": "file-a"}}
                        ]
                    }
                },
                {"type": "image_file", "image_file": {"file_id": "img"}}
            ]
        }))
        .unwrap();

        assert_eq!(message.text(), "Debate on housing [1][2]");
        assert_eq!(message.cited_file_ids(), vec!["file-a", "file-b"]);
    }
}
