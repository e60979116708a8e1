//! Lesson Flow Audit Reports
//!
//! Folds placement validation results for many lessons into one audit
//! artifact. Reports serialize to JSON for offline review or render to
//! Markdown for people.
//!
//! # Types
//!
//! - [`AuditReport`] - Summary, per-lesson results and recommendations
//! - [`AuditSummary`] - Lesson, chapter and per-severity issue counts
//! - [`Recommendation`] - One prioritized action per issue kind present
//!
//! # Generators
//!
//! - [`json::JsonGenerator`] - Compact or pretty JSON
//! - [`MarkdownGenerator`] - Human-readable Markdown
//!
//! # Example
//!
//! ```rust
//! use lessonflow_engine::{MemoryStore, Lesson, PlacementValidator};
//! use lessonflow_report::{AuditReport, json::JsonGenerator};
//!
//! let mut store = MemoryStore::new();
//! store.add_lesson(Lesson::new("lesson-1", "Email under pressure"));
//!
//! let results = PlacementValidator::default().validate_all(&store).unwrap();
//! let report = AuditReport::from_results(results);
//! assert_eq!(report.summary.total_lessons, 1);
//!
//! let json = JsonGenerator::new(&report).generate_pretty().unwrap();
//! assert!(json.contains("\"totalIssues\": 0"));
//! ```

pub mod json;
mod markdown;

pub use markdown::MarkdownGenerator;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use lessonflow_engine::{IssueKind, Severity, ValidationResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Failed to serialize the report to JSON.
    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to write report files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

// ============================================================================
// Report
// ============================================================================

/// The complete audit artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    /// When the audit ran.
    pub timestamp: DateTime<Utc>,
    /// Aggregate counts.
    pub summary: AuditSummary,
    /// One result per audited lesson, in audit order.
    pub results: Vec<ValidationResult>,
    /// One recommendation per issue kind present, most urgent first.
    pub recommendations: Vec<Recommendation>,
}

impl AuditReport {
    /// Builds a report stamped with the current time.
    #[must_use]
    pub fn from_results(results: Vec<ValidationResult>) -> Self {
        Self::at_time(Utc::now(), results)
    }

    /// Builds a report with an explicit timestamp.
    #[must_use]
    pub fn at_time(timestamp: DateTime<Utc>, results: Vec<ValidationResult>) -> Self {
        let summary = AuditSummary::from_results(&results);
        let recommendations = Recommendation::from_results(&results);
        Self {
            timestamp,
            summary,
            results,
            recommendations,
        }
    }

    /// Returns `true` if any high-severity issue was found.
    #[must_use]
    pub const fn has_high_severity(&self) -> bool {
        self.summary.high > 0
    }
}

/// Aggregate counts over all audited lessons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    /// Lessons audited.
    pub total_lessons: usize,
    /// Distinct chapters among the audited lessons.
    pub total_chapters: usize,
    /// Issues of every severity.
    pub total_issues: usize,
    /// Lessons with at least one issue.
    pub items_with_issues: usize,
    /// High-severity issues.
    pub high: usize,
    /// Medium-severity issues.
    pub medium: usize,
    /// Low-severity issues.
    pub low: usize,
}

impl AuditSummary {
    /// Counts over a set of validation results.
    #[must_use]
    pub fn from_results(results: &[ValidationResult]) -> Self {
        let chapters: BTreeSet<u32> = results.iter().filter_map(|r| r.chapter).collect();
        Self {
            total_lessons: results.len(),
            total_chapters: chapters.len(),
            total_issues: results.iter().map(|r| r.issues.len()).sum(),
            items_with_issues: results.iter().filter(|r| r.has_issues()).count(),
            high: results.iter().map(|r| r.count(Severity::High)).sum(),
            medium: results.iter().map(|r| r.count(Severity::Medium)).sum(),
            low: results.iter().map(|r| r.count(Severity::Low)).sum(),
        }
    }
}

// ============================================================================
// Recommendations
// ============================================================================

/// A prioritized follow-up for one kind of issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Priority (1 = most urgent), taken from the kind's severity.
    pub priority: u8,
    /// Issue kind addressed.
    pub kind: IssueKind,
    /// Issues of this kind across the audit.
    pub count: usize,
    /// What to do about them.
    pub description: String,
}

impl Recommendation {
    /// Creates the recommendation for `count` issues of `kind`.
    #[must_use]
    pub fn new(kind: IssueKind, count: usize) -> Self {
        Self {
            priority: kind.severity().priority(),
            kind,
            count,
            description: recommendation_text(kind).to_string(),
        }
    }

    /// One recommendation per issue kind present, ordered by priority and
    /// then by kind.
    #[must_use]
    pub fn from_results(results: &[ValidationResult]) -> Vec<Self> {
        let mut counts: BTreeMap<IssueKind, usize> = BTreeMap::new();
        for issue in results.iter().flat_map(|r| &r.issues) {
            *counts.entry(issue.kind).or_default() += 1;
        }

        let mut recommendations: Vec<Self> = counts
            .into_iter()
            .map(|(kind, count)| Self::new(kind, count))
            .collect();
        recommendations.sort_by_key(|r| (r.priority, r.kind));
        recommendations
    }
}

const fn recommendation_text(kind: IssueKind) -> &'static str {
    match kind {
        IssueKind::ColdOpen => {
            "Move exercises that open a lesson after the first story content"
        }
        IssueKind::DuplicateFunctionality => {
            "Differentiate overlapping exercises or merge them into one adaptive component"
        }
        IssueKind::MissingContext => {
            "Add narrative content that introduces each orphaned exercise"
        }
        IssueKind::ContextInversion => {
            "Reorder exercises so they follow the content that introduces them"
        }
        IssueKind::CorruptedOrdering => {
            "Reassign order keys left in the reserved range by an interrupted restructuring"
        }
        IssueKind::OrderCollision => "Give every live entry in a lesson a distinct order key",
        IssueKind::MissingLesson => "Remove references to lessons that no longer exist",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use chrono::TimeZone;
    use lessonflow_engine::PlacementIssue;

    use super::*;

    fn issue(kind: IssueKind, lesson_id: &str) -> PlacementIssue {
        PlacementIssue {
            kind,
            severity: kind.severity(),
            lesson_id: lesson_id.to_string(),
            exercise_id: Some(7),
            description: format!("{kind} in {lesson_id}"),
            suggestion: "fix it".to_string(),
            related_ids: Vec::new(),
        }
    }

    pub(crate) fn sample_results() -> Vec<ValidationResult> {
        vec![
            ValidationResult {
                lesson_id: "lesson-1".to_string(),
                lesson_title: "Email under pressure".to_string(),
                chapter: Some(1),
                issues: vec![
                    issue(IssueKind::MissingContext, "lesson-1"),
                    issue(IssueKind::ContextInversion, "lesson-1"),
                ],
            },
            ValidationResult {
                lesson_id: "lesson-2".to_string(),
                lesson_title: "Grant season".to_string(),
                chapter: Some(1),
                issues: vec![issue(IssueKind::ContextInversion, "lesson-2")],
            },
            ValidationResult {
                lesson_id: "lesson-3".to_string(),
                lesson_title: "Board meeting".to_string(),
                chapter: Some(2),
                issues: Vec::new(),
            },
        ]
    }

    #[test]
    fn test_summary_counts() {
        let summary = AuditSummary::from_results(&sample_results());

        assert_eq!(summary.total_lessons, 3);
        assert_eq!(summary.total_chapters, 2);
        assert_eq!(summary.total_issues, 3);
        assert_eq!(summary.items_with_issues, 2);
        assert_eq!(summary.high, 2);
        assert_eq!(summary.medium, 1);
        assert_eq!(summary.low, 0);
    }

    #[test]
    fn test_recommendations_one_per_kind_by_priority() {
        let recommendations = Recommendation::from_results(&sample_results());

        assert_eq!(recommendations.len(), 2);
        assert_eq!(recommendations[0].kind, IssueKind::ContextInversion);
        assert_eq!(recommendations[0].priority, 1);
        assert_eq!(recommendations[0].count, 2);
        assert_eq!(recommendations[1].kind, IssueKind::MissingContext);
        assert_eq!(recommendations[1].priority, 2);
    }

    #[test]
    fn test_empty_audit() {
        let report = AuditReport::from_results(Vec::new());
        assert_eq!(report.summary, AuditSummary::default());
        assert!(report.recommendations.is_empty());
        assert!(!report.has_high_severity());
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let timestamp = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let report = AuditReport::at_time(timestamp, sample_results());
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["timestamp"], "2026-03-01T09:30:00Z");
        assert_eq!(json["summary"]["totalLessons"], 3);
        assert_eq!(json["summary"]["itemsWithIssues"], 2);
        assert_eq!(json["results"][0]["lessonTitle"], "Email under pressure");
        assert_eq!(json["recommendations"][0]["kind"], "context_inversion");
        assert!(report.has_high_severity());
    }
}
