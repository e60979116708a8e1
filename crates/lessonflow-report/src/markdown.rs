//! Markdown rendering of lesson flow audits.
//!
//! The document contains a summary table, every issue grouped by severity,
//! the prioritized recommendations, and a footer with the audit time.
//!
//! # Example
//!
//! ```rust
//! use lessonflow_report::{AuditReport, MarkdownGenerator};
//!
//! let report = AuditReport::from_results(Vec::new());
//! let markdown = MarkdownGenerator::new(&report).generate();
//! assert!(markdown.contains("# Lesson Flow Audit"));
//! ```

use std::fmt::Write;

use chrono::{DateTime, Utc};
use lessonflow_engine::{PlacementIssue, Severity, ValidationResult};

use crate::{AuditReport, Recommendation};

/// Generates Markdown reports from audit results.
pub struct MarkdownGenerator<'a> {
    report: &'a AuditReport,
}

impl<'a> MarkdownGenerator<'a> {
    /// Creates a new Markdown generator for the given report.
    #[must_use]
    pub const fn new(report: &'a AuditReport) -> Self {
        Self { report }
    }

    /// Generates the complete Markdown report.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        Self::write_title(&mut output);
        self.write_summary(&mut output);
        self.write_issues(&mut output);
        self.write_recommendations(&mut output);
        self.write_footer(&mut output);

        output
    }

    fn write_title(output: &mut String) {
        let _ = writeln!(output, "# Lesson Flow Audit\n");
    }

    /// Writes the summary section with metrics table.
    fn write_summary(&self, output: &mut String) {
        let summary = &self.report.summary;

        let _ = writeln!(output, "## Summary\n");
        let _ = writeln!(output, "| Metric | Value |");
        let _ = writeln!(output, "|--------|-------|");
        let _ = writeln!(output, "| Lessons | {} |", summary.total_lessons);
        let _ = writeln!(output, "| Chapters | {} |", summary.total_chapters);
        let _ = writeln!(
            output,
            "| Issues Found | {} ({} high, {} medium, {} low) |",
            summary.total_issues,
            format_severity_count(summary.high, Severity::High),
            format_severity_count(summary.medium, Severity::Medium),
            format_severity_count(summary.low, Severity::Low),
        );
        let _ = writeln!(
            output,
            "| Lessons With Issues | {} |",
            summary.items_with_issues
        );
        let _ = writeln!(output);
    }

    /// Writes every issue, grouped by severity.
    fn write_issues(&self, output: &mut String) {
        let _ = writeln!(output, "## Placement Issues\n");

        if self.report.summary.total_issues == 0 {
            let _ = writeln!(output, "*No placement issues found.*\n");
            return;
        }

        for severity in Severity::ALL {
            let issues: Vec<(&ValidationResult, &PlacementIssue)> = self
                .report
                .results
                .iter()
                .flat_map(|result| result.issues.iter().map(move |issue| (result, issue)))
                .filter(|(_, issue)| issue.severity == severity)
                .collect();
            Self::write_severity_section(output, severity, &issues);
        }
    }

    fn write_severity_section(
        output: &mut String,
        severity: Severity,
        issues: &[(&ValidationResult, &PlacementIssue)],
    ) {
        let _ = writeln!(
            output,
            "### {} {} Severity\n",
            severity_icon(severity),
            capitalize(severity.as_str())
        );

        if issues.is_empty() {
            let _ = writeln!(output, "*None*\n");
            return;
        }

        for (result, issue) in issues {
            let _ = writeln!(
                output,
                "#### {}: `{}`\n",
                escape_markdown(&result.lesson_title),
                issue.kind
            );
            let _ = writeln!(output, "**Description**: {}", escape_markdown(&issue.description));
            let _ = writeln!(output, "**Suggestion**: {}\n", escape_markdown(&issue.suggestion));
        }
    }

    fn write_recommendations(&self, output: &mut String) {
        let _ = writeln!(output, "## Recommendations\n");

        if self.report.recommendations.is_empty() {
            let _ = writeln!(output, "*No specific recommendations.*\n");
            return;
        }

        for (index, rec) in self.report.recommendations.iter().enumerate() {
            let _ = writeln!(output, "{}", format_recommendation(index + 1, rec));
        }

        let _ = writeln!(output);
    }

    fn write_footer(&self, output: &mut String) {
        let _ = writeln!(output, "---");
        let timestamp = format_timestamp(&self.report.timestamp);
        let _ = writeln!(output, "*Generated by lessonflow at {timestamp}*");
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn format_recommendation(position: usize, rec: &Recommendation) -> String {
    let noun = if rec.count == 1 { "issue" } else { "issues" };
    format!(
        "{position}. **[{}]** {} ({} {noun})",
        rec.kind,
        escape_markdown(&rec.description),
        rec.count
    )
}

/// Formats a timestamp as "YYYY-MM-DD HH:MM:SS UTC".
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn format_severity_count(count: usize, severity: Severity) -> String {
    format!("{} {count}", severity_icon(severity))
}

/// HTML entity for a severity's colored marker.
const fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "&#128308;",
        Severity::Medium => "&#128992;",
        Severity::Low => "&#128993;",
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Escapes special Markdown characters in text.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '*' | '_' | '`' | '#' | '[' | ']' | '(' | ')' | '!' | '\\' | '<' | '>' | '|' => {
                result.push('\\');
                result.push(ch);
            }
            '\n' => result.push_str("<br>"),
            _ => result.push(ch),
        }
    }

    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use lessonflow_engine::IssueKind;

    use super::*;
    use crate::tests::sample_results;

    fn sample_report() -> AuditReport {
        let timestamp = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        AuditReport::at_time(timestamp, sample_results())
    }

    #[test]
    fn test_summary_table() {
        let markdown = MarkdownGenerator::new(&sample_report()).generate();

        assert!(markdown.starts_with("# Lesson Flow Audit\n"));
        assert!(markdown.contains("| Lessons | 3 |"));
        assert!(markdown.contains("| Chapters | 2 |"));
        assert!(markdown.contains(
            "| Issues Found | 3 (&#128308; 2 high, &#128992; 1 medium, &#128993; 0 low) |"
        ));
        assert!(markdown.contains("| Lessons With Issues | 2 |"));
    }

    #[test]
    fn test_issues_grouped_by_severity() {
        let markdown = MarkdownGenerator::new(&sample_report()).generate();

        let high = markdown.find("### &#128308; High Severity").unwrap();
        let medium = markdown.find("### &#128992; Medium Severity").unwrap();
        let low = markdown.find("### &#128993; Low Severity").unwrap();
        assert!(high < medium && medium < low);

        assert!(markdown.contains("#### Grant season: `context_inversion`"));
        assert!(markdown.contains("**Description**: missing\\_context in lesson-1"));
        assert!(markdown.contains("### &#128993; Low Severity\n\n*None*"));
    }

    #[test]
    fn test_footer_uses_report_timestamp() {
        let markdown = MarkdownGenerator::new(&sample_report()).generate();
        assert!(markdown.ends_with("*Generated by lessonflow at 2026-03-01 09:30:00 UTC*\n"));
    }

    #[test]
    fn test_empty_report() {
        let report = AuditReport::from_results(Vec::new());
        let markdown = MarkdownGenerator::new(&report).generate();

        assert!(markdown.contains("*No placement issues found.*"));
        assert!(markdown.contains("*No specific recommendations.*"));
    }

    #[test]
    fn test_recommendation_line() {
        let rec = Recommendation::new(IssueKind::ContextInversion, 2);
        insta::assert_snapshot!(
            format_recommendation(1, &rec),
            @"1. **[context_inversion]** Reorder exercises so they follow the content that introduces them (2 issues)"
        );
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("a_b|c"), "a\\_b\\|c");
        assert_eq!(escape_markdown("line\nbreak"), "line<br>break");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("medium"), "Medium");
        assert_eq!(capitalize(""), "");
    }
}
