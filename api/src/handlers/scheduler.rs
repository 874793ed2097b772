use axum::{
    extract::{Query, State},
    Json,
};
use common::models::SearchType;
use common::scheduler::ProcessSummary;
use serde::{Deserialize, Serialize};

use super::ErrorResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProcessParams {
    #[serde(rename = "searchType")]
    pub search_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: ProcessSummary,
}

/// Parse the optional `searchType` filter; only executable types are accepted
pub fn parse_filter(value: Option<&str>) -> Result<Option<SearchType>, ErrorResponse> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => {
            let search_type = SearchType::from(raw);
            if search_type.is_executable() {
                Ok(Some(search_type))
            } else {
                Err(ErrorResponse::new(
                    "validation_error",
                    format!("Unknown searchType '{}': expected 'ai' or 'hansard'", raw),
                ))
            }
        }
    }
}

/// Process every due schedule (trigger endpoint for the external cron)
#[tracing::instrument(skip(state))]
pub async fn process_schedules(
    State(state): State<AppState>,
    Query(params): Query<ProcessParams>,
) -> Result<Json<ProcessResponse>, ErrorResponse> {
    let filter = parse_filter(params.search_type.as_deref())?;

    let summary = state
        .processor
        .process_due_schedules(filter)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Scheduled search processing aborted");
            ErrorResponse::from(e)
        })?;

    Ok(Json(ProcessResponse {
        success: true,
        summary,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        assert_eq!(parse_filter(None).unwrap(), None);
        assert_eq!(parse_filter(Some("")).unwrap(), None);
        assert_eq!(parse_filter(Some("ai")).unwrap(), Some(SearchType::Ai));
        assert_eq!(
            parse_filter(Some("hansard")).unwrap(),
            Some(SearchType::Hansard)
        );
        assert_eq!(
            parse_filter(Some("calendar")).unwrap_err().error,
            "validation_error"
        );
        assert!(parse_filter(Some("bills")).is_err());
    }

    #[test]
    fn test_response_shape() {
        let response = ProcessResponse {
            success: true,
            summary: ProcessSummary {
                selected: 3,
                succeeded: 2,
                failed: 1,
                skipped: 0,
            },
        };
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            serde_json::json!({
                "success": true,
                "selected": 3,
                "succeeded": 2,
                "failed": 1,
                "skipped": 0
            })
        );
    }
}
