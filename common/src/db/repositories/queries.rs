// SQL query constants for repositories
// Centralizes repeated column lists so row mapping stays in one place

/// SQL query fragments for search_schedules joined with saved_searches
pub mod schedule_queries {
    /// Columns read for a schedule and its joined saved search
    pub const SELECT_JOINED_COLUMNS: &str = r#"s.id, s.user_id, s.is_active,
        s.last_run_at, s.next_run_at, s.repeat_rule,
        ss.id AS saved_search_id, ss.query, ss.query_state, ss.search_type"#;
}

/// SQL query fragments for saved_search_results
pub mod result_queries {
    /// All columns for saved_search_results
    pub const SELECT_ALL_COLUMNS: &str = r#"id, user_id, query, response, citations,
        query_state, search_type, has_changed, created_at"#;
}
