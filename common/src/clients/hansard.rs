// Hansard structured search backend

use super::send_json;
use crate::config::HansardConfig;
use crate::errors::ProcessError;
use crate::models::{FirstResult, HansardItem, ResultCategory};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

/// Body of `GET /search.json`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HansardSearchResponse {
    pub total_contributions: i64,
    pub total_written_statements: i64,
    pub total_written_answers: i64,
    pub total_corrections: i64,
    pub total_debates: i64,
    pub search_terms: Vec<String>,
    pub contributions: Vec<HansardItem>,
    pub written_statements: Vec<HansardItem>,
    pub written_answers: Vec<HansardItem>,
    pub corrections: Vec<HansardItem>,
}

impl HansardSearchResponse {
    pub fn items(&self, category: ResultCategory) -> &[HansardItem] {
        match category {
            ResultCategory::Contributions => &self.contributions,
            ResultCategory::WrittenStatements => &self.written_statements,
            ResultCategory::WrittenAnswers => &self.written_answers,
            ResultCategory::Corrections => &self.corrections,
        }
    }

    /// First item of the first non-empty category in priority order
    pub fn first_result(&self) -> Option<FirstResult> {
        ResultCategory::PRIORITY.iter().find_map(|category| {
            self.items(*category).first().map(|item| FirstResult {
                category: *category,
                item: item.clone(),
            })
        })
    }
}

#[async_trait]
pub trait HansardBackend: Send + Sync {
    /// Search Hansard for `term`, optionally restricted to one house
    async fn search(
        &self,
        term: &str,
        house: Option<&str>,
    ) -> Result<HansardSearchResponse, ProcessError>;
}

/// reqwest client for the public Hansard API
pub struct HansardClient {
    client: Client,
    base_url: String,
}

impl HansardClient {
    /// Create a new client from configuration
    pub fn new(config: &HansardConfig) -> Result<Self, ProcessError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| {
                ProcessError::UpstreamHttp(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl HansardBackend for HansardClient {
    #[instrument(skip(self))]
    async fn search(
        &self,
        term: &str,
        house: Option<&str>,
    ) -> Result<HansardSearchResponse, ProcessError> {
        let mut params = vec![("queryParameters.searchTerm", term)];
        if let Some(house) = house {
            params.push(("queryParameters.house", house));
        }

        let request = self
            .client
            .get(format!("{}/search.json", self.base_url))
            .query(&params);

        let response: HansardSearchResponse = send_json(request, "hansard search").await?;
        tracing::debug!(
            contributions = response.total_contributions,
            written_statements = response.total_written_statements,
            "Hansard search completed"
        );
        Ok(response)
    }
}
