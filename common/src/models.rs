use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Schedule Models
// ============================================================================

/// Search backend a saved search is executed against.
///
/// Stored as free text; values this processor cannot execute are kept
/// verbatim so they can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SearchType {
    Ai,
    Hansard,
    Calendar,
    Other(String),
}

impl SearchType {
    pub fn as_str(&self) -> &str {
        match self {
            SearchType::Ai => "ai",
            SearchType::Hansard => "hansard",
            SearchType::Calendar => "calendar",
            SearchType::Other(value) => value,
        }
    }

    /// Whether the processor can run this search type
    pub fn is_executable(&self) -> bool {
        matches!(self, SearchType::Ai | SearchType::Hansard)
    }
}

impl From<&str> for SearchType {
    fn from(value: &str) -> Self {
        match value {
            "ai" => SearchType::Ai,
            "hansard" => SearchType::Hansard,
            "calendar" => SearchType::Calendar,
            other => SearchType::Other(other.to_string()),
        }
    }
}

impl From<String> for SearchType {
    fn from(value: String) -> Self {
        SearchType::from(value.as_str())
    }
}

impl From<SearchType> for String {
    fn from(value: SearchType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recurrence frequency. Weekly is the only pattern in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
}

/// Repeat rule stored on a schedule, e.g. `{"frequency":"weekly","dayOfWeek":5}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatRule {
    pub frequency: Frequency,
    /// ISO weekday, 1 = Monday .. 7 = Sunday
    pub day_of_week: i32,
}

impl RepeatRule {
    pub fn weekly(day_of_week: i32) -> Self {
        Self {
            frequency: Frequency::Weekly,
            day_of_week,
        }
    }
}

/// Structured filter saved alongside a query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Definition of what to search, joined read-only onto a schedule
#[derive(Debug, Clone, PartialEq)]
pub struct SavedSearchSpec {
    pub id: Uuid,
    pub query: String,
    pub query_state: Option<QueryState>,
    pub search_type: SearchType,
}

/// A recurring obligation to re-run a saved search
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub is_active: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    /// `None` when the stored rule could not be parsed
    pub repeat_rule: Option<RepeatRule>,
    pub saved_search: SavedSearchSpec,
}

impl ScheduleRecord {
    /// Due when active and `next_run_at` is unset or not in the future
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.next_run_at.map_or(true, |next| next <= now)
    }
}

// ============================================================================
// Hansard Models
// ============================================================================

/// Result bucket returned by the Hansard search API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCategory {
    Contributions,
    WrittenStatements,
    WrittenAnswers,
    Corrections,
}

impl ResultCategory {
    /// Order in which buckets are consulted when picking the first result
    pub const PRIORITY: [ResultCategory; 4] = [
        ResultCategory::Contributions,
        ResultCategory::WrittenStatements,
        ResultCategory::WrittenAnswers,
        ResultCategory::Corrections,
    ];
}

/// A single Hansard search hit. Well-known fields are typed; everything else
/// the API returns is kept in `extra` so equality stays structural.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HansardItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contribution_ext_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debate_section_ext_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sitting_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HansardItem {
    /// Identifier used as the item's citation
    pub fn identifier(&self) -> Option<String> {
        self.contribution_ext_id
            .clone()
            .or_else(|| self.debate_section_ext_id.clone())
            .or_else(|| match self.extra.get("Id") {
                Some(Value::String(id)) => Some(id.clone()),
                Some(Value::Number(id)) => Some(id.to_string()),
                _ => None,
            })
    }
}

/// The result chosen to represent a Hansard search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirstResult {
    pub category: ResultCategory,
    pub item: HansardItem,
}

/// Normalised summary persisted for a Hansard search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HansardSummary {
    pub total_contributions: i64,
    pub total_written_statements: i64,
    pub total_written_answers: i64,
    pub total_corrections: i64,
    pub total_debates: i64,
    pub search_terms: Vec<String>,
    pub first_result: Option<FirstResult>,
    /// Day the search ran, serialised as `YYYY-MM-DD`
    pub date: NaiveDate,
}

// ============================================================================
// Result Models
// ============================================================================

/// Answer produced by the assistant backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAnswer {
    pub answer: String,
    /// Filenames of the files the answer cites, in annotation order
    pub citations: Vec<String>,
}

/// Payload stored in a result row, keyed by search type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchResponse {
    Ai(AiAnswer),
    Hansard(HansardSummary),
}

impl SearchResponse {
    /// First Hansard result, if this is a Hansard response that had one
    pub fn hansard_first_result(&self) -> Option<&FirstResult> {
        match self {
            SearchResponse::Hansard(summary) => summary.first_result.as_ref(),
            SearchResponse::Ai(_) => None,
        }
    }
}

/// Immutable record of one execution of a saved search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSearchResult {
    pub id: Uuid,
    pub user_id: Uuid,
    pub query: String,
    pub response: SearchResponse,
    pub citations: Vec<String>,
    pub query_state: Option<QueryState>,
    pub search_type: SearchType,
    pub has_changed: bool,
    pub created_at: DateTime<Utc>,
}
