//! End-to-end restructuring tests
//!
//! Applies the fixture repair plan to the nonprofit course, both directly
//! and through the HTTP endpoint, and re-runs the validator afterwards.

use std::collections::BTreeSet;
use std::path::PathBuf;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use lessonflow_engine::{
    create_router, execute, load_plan, Action, AppState, Config, MemoryStore, OrderKey,
    PlacementValidator, RecordFilter, RecordStore, RestructureOperation, TargetType,
};
use serde_json::{json, Value};
use tower::util::ServiceExt;

const LESSON: &str = "lesson-1";

/// Path to the nonprofit course fixture.
fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/nonprofit-course")
}

fn load_fixture() -> (Config, MemoryStore) {
    let dir = fixture_path();
    let config = Config::load_from_dir(&dir).expect("Failed to load config");
    let store = MemoryStore::load(&dir.join(&config.store)).expect("Failed to load records");
    (config, store)
}

fn fixture_plan() -> Vec<RestructureOperation> {
    load_plan(&fixture_path().join("plan.json")).expect("Failed to load plan")
}

/// Order keys of the lesson's live entries, in timeline order.
fn live_keys(store: &MemoryStore, lesson_id: &str) -> Vec<OrderKey> {
    let content = store
        .content_for_lesson(lesson_id, RecordFilter::ActiveVisible)
        .expect("Failed to list content");
    let exercises = store
        .exercises_for_lesson(lesson_id, RecordFilter::ActiveVisible)
        .expect("Failed to list exercises");
    let mut keys: Vec<OrderKey> = content
        .iter()
        .map(|c| c.order_key)
        .chain(exercises.iter().map(|e| e.order_key))
        .collect();
    keys.sort_unstable();
    keys
}

/// Temp path unique to one test.
fn temp_snapshot(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join(format!("lessonflow_integration_{name}_{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("Failed to create temp dir");
    dir.join("lessons.json")
}

/// Tests that the repair plan leaves the lesson without findings.
#[test]
fn test_plan_repairs_lesson() {
    let (config, mut store) = load_fixture();
    let validator = PlacementValidator::new(&config.validator);

    let before = validator
        .validate_lesson(&store, LESSON)
        .expect("Validation failed");
    assert_eq!(before.issues.len(), 2);

    let outcome = execute(&mut store, LESSON, &fixture_plan()).expect("Restructure failed");

    assert!(outcome.is_clean(), "errors: {:?}", outcome.results.errors);
    assert!(outcome.unplaced.is_empty());
    assert_eq!(outcome.results.updated_count, 4);
    assert_eq!(outcome.results.created_count, 1);
    assert_eq!(outcome.summary.total_content_entries, 3);
    assert_eq!(outcome.summary.total_exercise_entries, 2);

    assert_eq!(live_keys(&store, LESSON), [10, 20, 30, 40, 50]);

    let after = validator
        .validate_lesson(&store, LESSON)
        .expect("Validation failed");
    assert!(after.issues.is_empty(), "remaining: {:?}", after.issues);
}

/// Tests that other lessons are untouched by a run.
#[test]
fn test_restructure_is_scoped_to_one_lesson() {
    let (_, mut store) = load_fixture();
    let before = store.snapshot();

    execute(&mut store, LESSON, &fixture_plan()).expect("Restructure failed");

    let after = store.snapshot();
    let other = |snapshot: &lessonflow_engine::StoreSnapshot| {
        snapshot
            .content
            .iter()
            .filter(|c| c.lesson_id != LESSON)
            .map(|c| (c.id, c.order_key))
            .chain(
                snapshot
                    .exercises
                    .iter()
                    .filter(|e| e.lesson_id != LESSON)
                    .map(|e| (e.id, e.order_key)),
            )
            .collect::<Vec<_>>()
    };
    assert_eq!(other(&before), other(&after));
}

/// Tests that one failing operation is reported while the others apply.
#[test]
fn test_partial_failure_is_reported() {
    let (_, mut store) = load_fixture();
    let mut plan = fixture_plan();
    plan[2].title = "Maya Email Confidence Booster".to_string();
    plan[2].source_order_key = None;

    let outcome = execute(&mut store, LESSON, &plan).expect("Restructure failed");

    assert_eq!(outcome.results.errors.len(), 1);
    assert!(outcome.results.errors[0].starts_with("operation 3 (keep 'Maya Email Confidence Booster')"));
    assert_eq!(outcome.results.updated_count, 3);
    assert_eq!(outcome.results.created_count, 1);

    // The exercise the broken operation meant to move keeps its reserved key.
    assert_eq!(outcome.unplaced, [3]);
    let stranded = store.exercise(3).expect("Store failed").expect("Exercise missing");
    assert!(stranded.order_key > 50);

    let keys = live_keys(&store, LESSON);
    let distinct: BTreeSet<OrderKey> = keys.iter().copied().collect();
    assert_eq!(distinct.len(), keys.len(), "order keys collide: {keys:?}");
}

/// Tests that hide keeps the row while delete removes it.
#[test]
fn test_hide_and_delete_post_conditions() {
    let (_, mut store) = load_fixture();
    let plan = vec![
        RestructureOperation::new(Action::Hide, TargetType::Exercise, "Board Meeting Quiz", 0),
        RestructureOperation::new(Action::Delete, TargetType::Content, "Meet Maya", 0),
    ];

    let outcome = execute(&mut store, LESSON, &plan).expect("Restructure failed");
    assert!(outcome.is_clean());
    assert_eq!(outcome.summary.operations.hidden, 1);
    assert_eq!(outcome.summary.operations.deleted, 1);

    let hidden = store.exercise(4).expect("Store failed").expect("Hidden exercise removed");
    assert!(!hidden.visible);
    assert!(!hidden.active);
    assert!(store.content(1).expect("Store failed").is_none());

    let mut unplaced = outcome.unplaced;
    unplaced.sort_unstable();
    assert_eq!(unplaced, [2, 3]);
}

/// Tests that a saved snapshot reloads with the restructured timeline.
#[test]
fn test_snapshot_roundtrip_after_restructure() {
    let (config, mut store) = load_fixture();
    execute(&mut store, LESSON, &fixture_plan()).expect("Restructure failed");

    let path = temp_snapshot("roundtrip");
    store.save(&path).expect("Failed to save snapshot");

    let reloaded = MemoryStore::load(&path).expect("Failed to reload snapshot");
    assert_eq!(reloaded.snapshot(), store.snapshot());

    let result = PlacementValidator::new(&config.validator)
        .validate_lesson(&reloaded, LESSON)
        .expect("Validation failed");
    assert!(!result.has_issues());

    std::fs::remove_file(&path).ok();
}

/// Tests the mutation endpoint end to end, including persistence.
#[tokio::test]
async fn test_restructure_endpoint_persists_snapshot() {
    let (config, store) = load_fixture();
    let path = temp_snapshot("endpoint");
    store.save(&path).expect("Failed to seed snapshot");

    let router = create_router(AppState::new(config.clone(), store).with_snapshot_path(&path));

    let body = json!({ "lessonId": LESSON, "plan": fixture_plan() });
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/restructure")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("Failed to build request"),
        )
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);

    let value = read_json(response).await;
    assert_eq!(value["success"], true);
    assert_eq!(value["results"]["errors"], json!([]));
    assert_eq!(value["summary"]["operations"]["created"], 1);
    assert_eq!(value["summary"]["totalContentEntries"], 3);

    let response = router
        .clone()
        .oneshot(get_request("/api/lessons/lesson-1/issues"))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let value = read_json(response).await;
    assert_eq!(value["issues"], json!([]));

    let response = router
        .oneshot(get_request("/api/lessons/lesson-1/flow"))
        .await
        .expect("Request failed");
    let value = read_json(response).await;
    let titles: Vec<&str> = value["items"]
        .as_array()
        .expect("items should be an array")
        .iter()
        .filter_map(|item| item["title"].as_str())
        .collect();
    assert_eq!(
        titles,
        [
            "Meet Maya",
            "The Nonprofit Email Crisis",
            "Maya Email Confidence Builder",
            "Board meeting prep",
            "Board Meeting Quiz",
        ]
    );

    let persisted = MemoryStore::load(&path).expect("Failed to reload snapshot");
    let result = PlacementValidator::new(&config.validator)
        .validate_lesson(&persisted, LESSON)
        .expect("Validation failed");
    assert!(!result.has_issues());

    std::fs::remove_file(&path).ok();
}

/// Tests that an unknown lesson is a 404 and leaves the snapshot alone.
#[tokio::test]
async fn test_restructure_endpoint_unknown_lesson() {
    let (config, store) = load_fixture();
    let router = create_router(AppState::new(config, store));

    let body = json!({ "lessonId": "lesson-404", "plan": [] });
    let response = router
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/restructure")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("Failed to build request"),
        )
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let value = read_json(response).await;
    assert!(value["error"]
        .as_str()
        .is_some_and(|e| e.contains("lesson-404")));
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("Failed to build request")
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&body).expect("Body is not JSON")
}
