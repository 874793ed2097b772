// Upstream search backends
// Thin reqwest clients behind traits so the executors can be tested with stubs

pub mod assistant;
pub mod hansard;

pub use assistant::{
    Annotation, AssistantBackend, AssistantMessage, MessageContent, OpenAiAssistantClient,
    RunStatus,
};
pub use hansard::{HansardBackend, HansardClient, HansardSearchResponse};

use crate::errors::ProcessError;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;

/// Send a request and decode a JSON body, mapping non-2xx statuses to
/// `UpstreamHttp` and undecodable bodies to `InvalidPayload`
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    operation: &str,
) -> Result<T, ProcessError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProcessError::UpstreamHttp(format!("{} request failed: {}", operation, e)))?;

    let status = response.status();
    let body = response.text().await.map_err(|e| {
        ProcessError::UpstreamHttp(format!("{}: failed to read response body: {}", operation, e))
    })?;

    if !status.is_success() {
        return Err(ProcessError::UpstreamHttp(format!(
            "{} failed with status {}: {}",
            operation,
            status.as_u16(),
            body
        )));
    }

    serde_json::from_str(&body)
        .map_err(|e| ProcessError::InvalidPayload(format!("{}: {}", operation, e)))
}
