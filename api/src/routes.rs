use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::cron_auth_middleware;
use crate::state::AppState;

/// Create the application router with all routes and middleware
#[tracing::instrument(skip(state))]
pub fn create_router(state: AppState) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::metrics_handler));

    // Trigger routes, guarded by the cron secret
    let protected_routes = Router::new()
        .route(
            "/api/scheduler/process",
            get(handlers::scheduler::process_schedules)
                .post(handlers::scheduler::process_schedules),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            cron_auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{DateTime, TimeZone, Utc};
    use common::clock::FixedClock;
    use common::config::Settings;
    use common::db::repositories::{ResultStore, ScheduleStore};
    use common::db::DbPool;
    use common::errors::DatabaseError;
    use common::lock::LocalLock;
    use common::models::{SavedSearchResult, ScheduleRecord, SearchResponse, SearchType};
    use common::scheduler::{ProcessorConfig, ScheduleProcessor};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "test-cron-secret";

    /// Schedule store that records the filter it was asked for
    struct RecordingStore {
        fail: bool,
        filters: Mutex<Vec<Option<SearchType>>>,
    }

    #[async_trait]
    impl ScheduleStore for RecordingStore {
        async fn find_due(
            &self,
            _now: DateTime<Utc>,
            search_type: Option<SearchType>,
        ) -> Result<Vec<ScheduleRecord>, DatabaseError> {
            self.filters.lock().unwrap().push(search_type);
            if self.fail {
                return Err(DatabaseError::ConnectionFailed(
                    "refused by db-primary.internal:5432".to_string(),
                ));
            }
            Ok(vec![])
        }

        async fn mark_ran(
            &self,
            _schedule_id: Uuid,
            _expected_last_run_at: Option<DateTime<Utc>>,
            _ran_at: DateTime<Utc>,
            _next_run_at: DateTime<Utc>,
        ) -> Result<(), DatabaseError> {
            Ok(())
        }
    }

    struct NoResults;

    #[async_trait]
    impl ResultStore for NoResults {
        async fn latest_response(
            &self,
            _user_id: Uuid,
            _query: &str,
        ) -> Result<Option<SearchResponse>, DatabaseError> {
            Ok(None)
        }

        async fn insert(&self, _result: &SavedSearchResult) -> Result<(), DatabaseError> {
            Ok(())
        }
    }

    fn app(fail_selection: bool) -> (Router, Arc<RecordingStore>) {
        let store = Arc::new(RecordingStore {
            fail: fail_selection,
            filters: Mutex::new(Vec::new()),
        });
        let processor = ScheduleProcessor::new(
            ProcessorConfig::default(),
            store.clone(),
            Arc::new(NoResults),
            Arc::new(LocalLock::new()),
            Arc::new(FixedClock::new(
                Utc.with_ymd_and_hms(2024, 3, 11, 10, 0, 0).unwrap(),
            )),
        );

        let mut settings = Settings::default();
        settings.auth.cron_secret = SECRET.to_string();

        // Never connects unless a handler touches the database
        let pool = PgPoolOptions::new()
            .connect_lazy(&settings.database.url)
            .unwrap();

        let state = AppState::new(
            DbPool::from_pool(pool),
            Arc::new(processor),
            settings,
            PrometheusBuilder::new().build_recorder().handle(),
        );
        (create_router(state), store)
    }

    fn trigger(method: &str, uri: &str, secret: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(secret) = secret {
            builder = builder.header("Authorization", format!("Bearer {}", secret));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_secret_is_unauthorized() {
        let (app, store) = app(false);
        let response = app
            .oneshot(trigger("GET", "/api/scheduler/process", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "unauthorized");
        // Nothing was selected
        assert!(store.filters.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_secret_is_unauthorized() {
        let (app, _) = app(false);
        let response = app
            .oneshot(trigger("POST", "/api/scheduler/process", Some("guess")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_authorized_trigger_returns_summary() {
        let (app, store) = app(false);
        let response = app
            .oneshot(trigger(
                "GET",
                "/api/scheduler/process?searchType=hansard",
                Some(SECRET),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({
                "success": true,
                "selected": 0,
                "succeeded": 0,
                "failed": 0,
                "skipped": 0
            })
        );
        assert_eq!(
            *store.filters.lock().unwrap(),
            vec![Some(SearchType::Hansard)]
        );
    }

    #[tokio::test]
    async fn test_post_without_filter() {
        let (app, store) = app(false);
        let response = app
            .oneshot(trigger("POST", "/api/scheduler/process", Some(SECRET)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*store.filters.lock().unwrap(), vec![None]);
    }

    #[tokio::test]
    async fn test_unknown_filter_is_bad_request() {
        let (app, store) = app(false);
        let response = app
            .oneshot(trigger(
                "GET",
                "/api/scheduler/process?searchType=calendar",
                Some(SECRET),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.filters.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_selection_failure_is_internal_error() {
        let (app, _) = app(true);
        let response = app
            .oneshot(trigger("GET", "/api/scheduler/process", Some(SECRET)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], "Failed to process scheduled searches");
        assert!(!body.to_string().contains("db-primary"));
    }

    #[tokio::test]
    async fn test_metrics_is_public() {
        let (app, _) = app(false);
        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
