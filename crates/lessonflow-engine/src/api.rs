//! HTTP endpoints for lesson flow inspection and restructuring.
//!
//! # Endpoints
//!
//! - `GET /api/lessons` - List lessons
//! - `GET /api/lessons/:lesson_id/flow` - Composed timeline of one lesson
//! - `GET /api/lessons/:lesson_id/issues` - Placement issues of one lesson
//! - `POST /api/restructure` - Apply a restructuring plan
//!
//! # Example
//!
//! ```no_run
//! use lessonflow_engine::{create_router, AppState, Config, MemoryStore};
//!
//! # async fn example() {
//! let state = AppState::new(Config::default(), MemoryStore::new());
//!
//! let router = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//! axum::serve(listener, router).await.unwrap();
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::flow::{compose, FlowItem};
use crate::model::{EntryId, Lesson};
use crate::restructure::{execute, ExecutionResult, RestructureOperation, RestructureSummary};
use crate::store::{MemoryStore, RecordFilter, RecordStore, StoreError};
use crate::validator::{PlacementValidator, ValidationResult};
use crate::{Config, FlowError};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response body for the flow endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowResponse {
    /// Lesson id.
    pub lesson_id: String,
    /// Active entries in timeline order.
    pub items: Vec<FlowItem>,
}

/// Request body for the restructure endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestructureRequest {
    /// Lesson to restructure.
    pub lesson_id: String,
    /// Operations in the order they are applied.
    pub plan: Vec<RestructureOperation>,
}

/// Response body for the restructure endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestructureResponse {
    /// The run completed; individual operations may still have failed.
    pub success: bool,
    /// Counts and per-operation errors.
    pub results: ExecutionResult,
    /// Totals after the run.
    pub summary: RestructureSummary,
    /// Active entries left in the reserved key range.
    pub unplaced: Vec<EntryId>,
}

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the error.
    pub error: String,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Config,
    /// Record store shared by all handlers.
    pub store: Arc<Mutex<MemoryStore>>,
    /// Snapshot file rewritten after each successful restructuring run.
    pub snapshot_path: Option<PathBuf>,
}

impl AppState {
    /// Creates state that keeps changes in memory only.
    #[must_use]
    pub fn new(config: Config, store: MemoryStore) -> Self {
        Self {
            config,
            store: Arc::new(Mutex::new(store)),
            snapshot_path: None,
        }
    }

    /// Persists the store to `path` after every restructuring run.
    #[must_use]
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }
}

// ============================================================================
// API Error Type
// ============================================================================

/// Internal error type for API handlers.
#[derive(Debug)]
enum ApiError {
    /// The lesson does not exist.
    NotFound(String),
    /// The store or the restructuring run failed.
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<FlowError> for ApiError {
    fn from(e: FlowError) -> Self {
        match e {
            FlowError::LessonNotFound { lesson_id } => {
                Self::NotFound(format!("Lesson not found: '{lesson_id}'"))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with all API endpoints.
///
/// Routes live under `/api`, with permissive CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/lessons", get(handle_lessons))
        .route("/lessons/:lesson_id/flow", get(handle_flow))
        .route("/lessons/:lesson_id/issues", get(handle_issues))
        .route("/restructure", post(handle_restructure));

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for `GET /api/lessons`.
async fn handle_lessons(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Lesson>>, ApiError> {
    let store = state.store.lock().await;
    Ok(Json(store.lessons()?))
}

/// Handler for `GET /api/lessons/:lesson_id/flow`.
async fn handle_flow(
    State(state): State<Arc<AppState>>,
    Path(lesson_id): Path<String>,
) -> Result<Json<FlowResponse>, ApiError> {
    let store = state.store.lock().await;
    if store.lesson(&lesson_id)?.is_none() {
        return Err(FlowError::lesson_not_found(lesson_id).into());
    }

    let content = store.content_for_lesson(&lesson_id, RecordFilter::Active)?;
    let exercises = store.exercises_for_lesson(&lesson_id, RecordFilter::Active)?;
    Ok(Json(FlowResponse {
        items: compose(&content, &exercises),
        lesson_id,
    }))
}

/// Handler for `GET /api/lessons/:lesson_id/issues`.
///
/// An unknown lesson yields a result holding a single `missing_lesson` issue.
async fn handle_issues(
    State(state): State<Arc<AppState>>,
    Path(lesson_id): Path<String>,
) -> Result<Json<ValidationResult>, ApiError> {
    let validator = PlacementValidator::new(&state.config.validator);
    let store = state.store.lock().await;
    Ok(Json(validator.validate_lesson(&*store, &lesson_id)?))
}

/// Handler for `POST /api/restructure`.
///
/// Runs the plan against the shared store. Per-operation failures and a
/// failed snapshot save are reported in the body with status 200; `success`
/// is `false` only when the changes could not be persisted.
async fn handle_restructure(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RestructureRequest>,
) -> Result<Json<RestructureResponse>, ApiError> {
    info!(
        lesson = %request.lesson_id,
        operations = request.plan.len(),
        "Restructure request received"
    );

    let mut store = state.store.lock().await;
    let mut outcome = execute(&mut *store, &request.lesson_id, &request.plan).map_err(|e| {
        warn!(lesson = %request.lesson_id, error = %e, "Restructure request failed");
        ApiError::from(e)
    })?;

    // The store already holds the changes, so a failed save is reported
    // alongside the operation results rather than as a request failure.
    let mut persisted = true;
    if let Some(path) = &state.snapshot_path {
        if let Err(e) = store.save(path) {
            error!(path = %path.display(), error = %e, "Failed to persist record snapshot");
            outcome
                .results
                .errors
                .push(format!("snapshot not saved to {}: {e}", path.display()));
            persisted = false;
        }
    }

    Ok(Json(RestructureResponse {
        success: persisted,
        results: outcome.results,
        summary: outcome.summary,
        unplaced: outcome.unplaced,
    }))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    use super::*;
    use crate::model::{ExerciseConfig, ExerciseKind};
    use crate::store::{NewContent, NewExercise};

    /// Lesson whose email builder comes before its introducing content.
    fn test_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.add_lesson(Lesson::new("lesson-1", "Email under pressure").in_chapter(1));
        store
            .insert_content(NewContent {
                lesson_id: "lesson-1".to_string(),
                title: "The Nonprofit Email Crisis".to_string(),
                body: "Maya opens her inbox.".to_string(),
                order_key: 20,
            })
            .unwrap();
        store
            .insert_exercise(NewExercise {
                lesson_id: "lesson-1".to_string(),
                title: "Maya Email Confidence Builder".to_string(),
                description: String::new(),
                order_key: 15,
                configuration: ExerciseConfig::empty(ExerciseKind::EmailBuilder),
            })
            .unwrap();
        store
    }

    fn test_state() -> AppState {
        AppState::new(Config::default(), test_store())
    }

    async fn body_json(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    // ------------------------------------------------------------------------
    // Read endpoint tests
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_list_lessons() {
        let response = create_router(test_state())
            .oneshot(get_request("/api/lessons"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body[0]["id"], "lesson-1");
        assert_eq!(body[0]["chapter"], 1);
    }

    #[tokio::test]
    async fn test_flow_orders_by_key() {
        let response = create_router(test_state())
            .oneshot(get_request("/api/lessons/lesson-1/flow"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["lessonId"], "lesson-1");
        assert_eq!(body["items"][0]["kind"], "exercise");
        assert_eq!(body["items"][1]["title"], "The Nonprofit Email Crisis");
    }

    #[tokio::test]
    async fn test_flow_unknown_lesson_returns_404() {
        let response = create_router(test_state())
            .oneshot(get_request("/api/lessons/ghost/flow"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn test_issues_report_context_inversion() {
        let response = create_router(test_state())
            .oneshot(get_request("/api/lessons/lesson-1/issues"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let kinds: Vec<&str> = body["issues"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["kind"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, ["cold_open", "context_inversion"]);
    }

    // ------------------------------------------------------------------------
    // Restructure endpoint tests
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_restructure_success() {
        let state = test_state();
        let store = Arc::clone(&state.store);
        let request = json!({
            "lessonId": "lesson-1",
            "plan": [
                {"targetType": "content", "targetOrderKey": 10, "title": "The Nonprofit Email Crisis", "action": "keep"},
                {"targetType": "exercise", "targetOrderKey": 20, "title": "Maya Email Confidence Builder", "action": "keep"}
            ]
        });

        let response = create_router(state)
            .oneshot(post_json("/api/restructure", &request))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["results"]["updatedCount"], 2);
        assert_eq!(body["results"]["errors"], json!([]));
        assert_eq!(body["summary"]["totalContentEntries"], 1);
        assert_eq!(body["summary"]["operations"]["updated"], 2);

        let store = store.lock().await;
        let issues = PlacementValidator::default().validate_lesson(&*store, "lesson-1").unwrap();
        assert!(!issues.has_issues());
    }

    #[tokio::test]
    async fn test_restructure_partial_failure_is_still_200() {
        let request = json!({
            "lessonId": "lesson-1",
            "plan": [
                {"targetType": "exercise", "targetOrderKey": 30, "title": "No Such Exercise", "action": "hide"}
            ]
        });

        let response = create_router(test_state())
            .oneshot(post_json("/api/restructure", &request))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["results"]["errors"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_restructure_unknown_lesson_returns_404() {
        let request = json!({"lessonId": "ghost", "plan": []});

        let response = create_router(test_state())
            .oneshot(post_json("/api/restructure", &request))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_restructure_invalid_json_returns_400() {
        let response = create_router(test_state())
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/restructure")
                    .header("content-type", "application/json")
                    .body(Body::from("{ invalid json }"))
                    .unwrap(),
            )
            .await
            .unwrap();

        // Axum returns 400 for JSON parsing errors
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_restructure_persists_snapshot() {
        let path = std::env::temp_dir()
            .join(format!("lessonflow_api_snapshot_{}.json", std::process::id()));
        let state = test_state().with_snapshot_path(&path);
        let request = json!({
            "lessonId": "lesson-1",
            "plan": [{"targetType": "content", "targetOrderKey": 12, "title": "Bridge", "action": "create"}]
        });

        let response = create_router(state)
            .oneshot(post_json("/api/restructure", &request))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let saved = MemoryStore::load(&path).unwrap();
        let content = saved.content_for_lesson("lesson-1", RecordFilter::All).unwrap();
        assert_eq!(content.len(), 2);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_restructure_save_failure_still_reports_outcome() {
        let path = std::env::temp_dir()
            .join(format!("lessonflow_missing_dir_{}", std::process::id()))
            .join("lessons.json");
        let state = test_state().with_snapshot_path(&path);
        let store = Arc::clone(&state.store);
        let request = json!({
            "lessonId": "lesson-1",
            "plan": [{"targetType": "exercise", "targetOrderKey": 0, "title": "Maya Email Confidence Builder", "action": "hide"}]
        });

        let response = create_router(state)
            .oneshot(post_json("/api/restructure", &request))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["results"]["hiddenCount"], 1);
        assert_eq!(body["summary"]["operations"]["hidden"], 1);
        assert_eq!(body["unplaced"], json!([1]));
        let errors = body["results"]["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].as_str().unwrap().starts_with("snapshot not saved"));

        // The in-memory store matches what the response reports.
        let store = store.lock().await;
        let exercise = store.exercise(2).unwrap().unwrap();
        assert!(!exercise.active);
        assert!(!path.exists());
    }

    #[test]
    fn test_reset_failure_maps_to_500() {
        let error = FlowError::reset_failed("lesson-1", StoreError::unavailable("connection lost"));
        let response = ApiError::from(error).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
