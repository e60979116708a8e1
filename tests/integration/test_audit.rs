//! End-to-end audit tests
//!
//! Loads the nonprofit course fixture through the record store, validates
//! every lesson with the configured thresholds and renders the audit
//! artifact in both formats.

use std::path::PathBuf;

use lessonflow_engine::{
    Config, IssueKind, MemoryStore, PlacementValidator, RecordFilter, RecordStore, Severity,
};
use lessonflow_report::{json::JsonGenerator, AuditReport, MarkdownGenerator};

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

/// Tests that the fixture config overrides only the fields it names.
#[test]
fn test_fixture_config_loads() {
    let (config, _) = load_fixture();

    assert_eq!(config.store, "lessons.json");
    assert_eq!(config.report_name, "nonprofit-audit");
    assert_eq!(config.output_dir, ".");
    assert_eq!(config.port, 3000);
    assert_eq!(config.validator.corrupted_order_threshold, 500);
    assert_eq!(config.validator.keyword_groups.len(), 4);
}

/// Tests that the snapshot loads with every lesson and row.
#[test]
fn test_fixture_records_load() {
    let (_, store) = load_fixture();

    let lessons = store.lessons().expect("Failed to list lessons");
    let ids: Vec<&str> = lessons.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, ["lesson-1", "lesson-2", "lesson-3"]);

    let content = store
        .content_for_lesson("lesson-1", RecordFilter::All)
        .expect("Failed to list content");
    let exercises = store
        .exercises_for_lesson("lesson-1", RecordFilter::All)
        .expect("Failed to list exercises");
    assert_eq!(content.len(), 2);
    assert_eq!(exercises.len(), 2);
}

/// Tests the per-lesson findings over the whole course.
#[test]
fn test_validate_course() {
    let (config, store) = load_fixture();
    let validator = PlacementValidator::new(&config.validator);

    let results = validator.validate_all(&store).expect("Validation failed");
    assert_eq!(results.len(), 3);

    let kinds = |index: usize| -> Vec<IssueKind> {
        results[index].issues.iter().map(|issue| issue.kind).collect()
    };

    // Email exercise at 15 precedes the email crisis at 20; nothing mentions
    // board meetings.
    assert_eq!(
        kinds(0),
        [IssueKind::ContextInversion, IssueKind::MissingContext]
    );
    let inversion = &results[0].issues[0];
    assert_eq!(inversion.severity, Severity::High);
    assert_eq!(inversion.exercise_id, Some(3));
    assert!(inversion.description.contains("Maya Email Confidence Builder"));
    assert!(inversion.description.contains("The Nonprofit Email Crisis"));
    assert!(inversion.suggestion.contains("20"));

    assert!(kinds(1).is_empty(), "grant lesson should be clean");

    assert_eq!(kinds(2), [IssueKind::ColdOpen, IssueKind::ContextInversion]);
    assert!(results[2].issues[0]
        .description
        .contains("appears before any story context"));
}

/// Tests that the audit summary and recommendations fold the results.
#[test]
fn test_audit_report_summary() {
    let (config, store) = load_fixture();
    let results = PlacementValidator::new(&config.validator)
        .validate_all(&store)
        .expect("Validation failed");

    let report = AuditReport::from_results(results);
    let summary = report.summary;

    assert_eq!(summary.total_lessons, 3);
    assert_eq!(summary.total_chapters, 2);
    assert_eq!(summary.total_issues, 4);
    assert_eq!(summary.items_with_issues, 2);
    assert_eq!((summary.high, summary.medium, summary.low), (3, 1, 0));
    assert!(report.has_high_severity());

    let recommendations: Vec<(u8, IssueKind, usize)> = report
        .recommendations
        .iter()
        .map(|r| (r.priority, r.kind, r.count))
        .collect();
    assert_eq!(
        recommendations,
        [
            (1, IssueKind::ColdOpen, 1),
            (1, IssueKind::ContextInversion, 2),
            (2, IssueKind::MissingContext, 1),
        ]
    );
}

/// Tests that both report formats render the audit.
#[test]
fn test_report_generation() {
    let (config, store) = load_fixture();
    let results = PlacementValidator::new(&config.validator)
        .validate_all(&store)
        .expect("Validation failed");
    let report = AuditReport::from_results(results);

    let markdown = MarkdownGenerator::new(&report).generate();
    assert!(markdown.contains("| Lessons | 3 |"));
    assert!(markdown.contains("#### Research basics: `cold_open`"));
    assert!(markdown.contains("**[missing_context]**"));

    let output_dir = std::env::temp_dir()
        .join(format!("lessonflow_integration_audit_{}", std::process::id()));
    std::fs::create_dir_all(&output_dir).expect("Failed to create output dir");
    let json_path = output_dir.join(format!("{}.json", config.report_name));

    JsonGenerator::new(&report)
        .write_to_file(&json_path, true)
        .expect("Failed to write JSON report");

    let written = std::fs::read_to_string(&json_path).expect("Failed to read JSON report");
    let value: serde_json::Value = serde_json::from_str(&written).expect("Invalid JSON report");
    assert_eq!(value["summary"]["totalIssues"], 4);
    assert_eq!(value["results"][0]["lessonId"], "lesson-1");
    assert_eq!(value["results"][0]["issues"][0]["kind"], "context_inversion");
    assert_eq!(value["results"][0]["issues"][0]["exerciseId"], 3);

    std::fs::remove_dir_all(&output_dir).ok();
}

/// Tests that auditing an unknown lesson yields one finding, not an error.
#[test]
fn test_unknown_lesson_is_reported() {
    let (config, store) = load_fixture();
    let result = PlacementValidator::new(&config.validator)
        .validate_lesson(&store, "lesson-404")
        .expect("Validation failed");

    assert_eq!(result.issues.len(), 1);
    assert_eq!(result.issues[0].kind, IssueKind::MissingLesson);

    let report = AuditReport::from_results(vec![result]);
    assert_eq!(report.summary.total_chapters, 0);
    assert_eq!(report.summary.high, 1);
}
