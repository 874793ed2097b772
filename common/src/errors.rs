// Error handling framework for the scheduled search processor

use thiserror::Error;

/// Recurrence calculation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Schedule has no usable repeat rule: {0}")]
    InvalidRule(String),

    #[error("Invalid day of week {0}: expected 1 (Monday) to 7 (Sunday)")]
    InvalidDayOfWeek(i32),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Schedule calculation failed: {0}")]
    CalculationFailed(String),
}

/// Database-specific errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Database health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Concurrent update detected: {0}")]
    Conflict(String),

    #[error("Duplicate key violation: {0}")]
    DuplicateKey(String),

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Storage errors for non-relational backends (distributed lock)
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Redis error: {0}")]
    RedisError(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}

/// Weekly assistant lookup errors
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Weekly assistant lookup failed: {0}")]
    Backend(String),
}

/// Errors raised while processing due schedules.
///
/// `Authorization` and `Selection` abort the whole batch. Every other variant
/// is confined to the schedule that raised it.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Unauthorized: {0}")]
    Authorization(String),

    #[error("Failed to select due schedules: {0}")]
    Selection(String),

    #[error("Unsupported search type: {0}")]
    UnsupportedSearchType(String),

    #[error("Assistant run {run_id} ended with status '{status}'")]
    UpstreamRunFailure { run_id: String, status: String },

    #[error("Upstream request failed: {0}")]
    UpstreamHttp(String),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] DatabaseError),

    #[error("Assistant run {run_id} did not finish within {waited_seconds} seconds")]
    Timeout { run_id: String, waited_seconds: u64 },

    #[error("Failed to compute next run: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Invalid upstream payload: {0}")]
    InvalidPayload(String),
}

impl ProcessError {
    /// Whether the error is confined to a single schedule
    pub fn is_isolated(&self) -> bool {
        !matches!(
            self,
            ProcessError::Authorization(_) | ProcessError::Selection(_)
        )
    }

    /// Short label used for metrics and structured logs
    pub fn reason(&self) -> &'static str {
        match self {
            ProcessError::Authorization(_) => "authorization",
            ProcessError::Selection(_) => "selection",
            ProcessError::UnsupportedSearchType(_) => "unsupported_search_type",
            ProcessError::UpstreamRunFailure { .. } => "upstream_run_failure",
            ProcessError::UpstreamHttp(_) => "upstream_http",
            ProcessError::Persistence(_) => "persistence",
            ProcessError::Timeout { .. } => "timeout",
            ProcessError::Schedule(_) => "schedule",
            ProcessError::InvalidPayload(_) => "invalid_payload",
        }
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        "23505" => DatabaseError::DuplicateKey(db_err.message().to_string()),
                        "23503" => DatabaseError::ForeignKeyViolation(db_err.message().to_string()),
                        _ => DatabaseError::QueryFailed(db_err.message().to_string()),
                    }
                } else {
                    DatabaseError::QueryFailed(db_err.message().to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrationFailed(err.to_string())
    }
}

impl From<DatabaseError> for LookupError {
    fn from(err: DatabaseError) -> Self {
        LookupError::Backend(err.to_string())
    }
}

impl From<redis::RedisError> for StorageError {
    fn from(err: redis::RedisError) -> Self {
        StorageError::RedisError(err.to_string())
    }
}

impl From<reqwest::Error> for ProcessError {
    fn from(err: reqwest::Error) -> Self {
        ProcessError::UpstreamHttp(err.to_string())
    }
}
