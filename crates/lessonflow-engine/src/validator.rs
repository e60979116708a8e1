//! Placement validation of a lesson timeline.
//!
//! [`PlacementValidator`] composes a lesson's active rows into a timeline
//! and evaluates every placement rule against it. Rules are independent:
//! one exercise can trigger several of them. The validator never fails on
//! well-formed records; an unknown lesson becomes a single
//! [`IssueKind::MissingLesson`] issue.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ValidatorConfig;
use crate::flow::{compose, FlowItem};
use crate::matcher::{ContextMatch, ContextStrategy, KeywordContextMatcher};
use crate::model::{ContentEntry, EntryId, ExerciseEntry, OrderKey};
use crate::store::{RecordFilter, RecordStore, StoreResult};

// ============================================================================
// Issue types
// ============================================================================

/// How urgently an issue needs fixing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Learners see a broken narrative.
    High,
    /// The timeline is confusing or redundant.
    Medium,
    /// Cosmetic.
    Low,
}

impl Severity {
    /// All severities, most urgent first.
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    /// Returns the lowercase label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Returns the recommendation priority (1 = most urgent).
    #[must_use]
    pub const fn priority(&self) -> u8 {
        match self {
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The rule that produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// An exercise opens the lesson before any content.
    ColdOpen,
    /// Several exercises do the same job.
    DuplicateFunctionality,
    /// No content introduces the exercise.
    MissingContext,
    /// The introducing content comes after the exercise.
    ContextInversion,
    /// The exercise's order key is in the corrupted range.
    CorruptedOrdering,
    /// Several live entries share one order key.
    OrderCollision,
    /// The lesson does not exist.
    MissingLesson,
}

impl IssueKind {
    /// All kinds in report order.
    pub const ALL: [Self; 7] = [
        Self::ColdOpen,
        Self::DuplicateFunctionality,
        Self::MissingContext,
        Self::ContextInversion,
        Self::CorruptedOrdering,
        Self::OrderCollision,
        Self::MissingLesson,
    ];

    /// Returns the snake_case label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ColdOpen => "cold_open",
            Self::DuplicateFunctionality => "duplicate_functionality",
            Self::MissingContext => "missing_context",
            Self::ContextInversion => "context_inversion",
            Self::CorruptedOrdering => "corrupted_ordering",
            Self::OrderCollision => "order_collision",
            Self::MissingLesson => "missing_lesson",
        }
    }

    /// Returns the severity every issue of this kind carries.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::ColdOpen | Self::ContextInversion | Self::OrderCollision | Self::MissingLesson => {
                Severity::High
            }
            Self::DuplicateFunctionality | Self::MissingContext | Self::CorruptedOrdering => {
                Severity::Medium
            }
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One placement defect with a remediation suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementIssue {
    /// Rule that fired.
    pub kind: IssueKind,
    /// Urgency.
    pub severity: Severity,
    /// Lesson the issue belongs to.
    pub lesson_id: String,
    /// Exercise the issue is about, if it concerns a single exercise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_id: Option<EntryId>,
    /// What is wrong.
    pub description: String,
    /// How to fix it.
    pub suggestion: String,
    /// Other entries involved (duplicate group members, colliding rows,
    /// matched context).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_ids: Vec<EntryId>,
}

impl PlacementIssue {
    fn new(
        kind: IssueKind,
        lesson_id: &str,
        description: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            lesson_id: lesson_id.to_string(),
            exercise_id: None,
            description: description.into(),
            suggestion: suggestion.into(),
            related_ids: Vec::new(),
        }
    }

    const fn for_exercise(mut self, id: EntryId) -> Self {
        self.exercise_id = Some(id);
        self
    }

    fn related(mut self, ids: Vec<EntryId>) -> Self {
        self.related_ids = ids;
        self
    }
}

/// Validation outcome for one lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Lesson id.
    pub lesson_id: String,
    /// Lesson title (the id when the lesson is missing).
    pub lesson_title: String,
    /// Chapter the lesson belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<u32>,
    /// Issues in rule order.
    pub issues: Vec<PlacementIssue>,
}

impl ValidationResult {
    /// Returns `true` if any issue was found.
    #[must_use]
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Counts issues of one severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

// ============================================================================
// Validator
// ============================================================================

/// Runs the placement rules over lesson timelines.
pub struct PlacementValidator {
    strategy: Box<dyn ContextStrategy>,
    corrupted_order_threshold: OrderKey,
    min_shared_title_words: usize,
}

impl fmt::Debug for PlacementValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlacementValidator")
            .field("corrupted_order_threshold", &self.corrupted_order_threshold)
            .field("min_shared_title_words", &self.min_shared_title_words)
            .finish_non_exhaustive()
    }
}

impl Default for PlacementValidator {
    fn default() -> Self {
        Self::new(&ValidatorConfig::default())
    }
}

impl PlacementValidator {
    /// Creates a validator using keyword matching with the configured groups.
    #[must_use]
    pub fn new(config: &ValidatorConfig) -> Self {
        let matcher = KeywordContextMatcher::new(config.keyword_groups.clone());
        Self::with_strategy(config, Box::new(matcher))
    }

    /// Creates a validator with a custom context strategy.
    #[must_use]
    pub fn with_strategy(config: &ValidatorConfig, strategy: Box<dyn ContextStrategy>) -> Self {
        Self {
            strategy,
            corrupted_order_threshold: config.corrupted_order_threshold,
            min_shared_title_words: config.min_shared_title_words,
        }
    }

    /// Validates one lesson's rows.
    ///
    /// `content` and `exercises` are normally the lesson's active rows. The
    /// result depends only on the inputs, so validating an unchanged
    /// timeline twice yields the same list.
    #[must_use]
    pub fn validate(
        &self,
        lesson_id: &str,
        content: &[ContentEntry],
        exercises: &[ExerciseEntry],
    ) -> Vec<PlacementIssue> {
        let flow = compose(content, exercises);
        let by_id: BTreeMap<EntryId, &ExerciseEntry> =
            exercises.iter().map(|e| (e.id, e)).collect();
        let ordered: Vec<&ExerciseEntry> = flow
            .iter()
            .filter(|item| item.is_exercise())
            .filter_map(|item| by_id.get(&item.id()).copied())
            .collect();

        let mut issues = cold_opens(lesson_id, &flow);
        issues.extend(self.duplicate_groups(lesson_id, &ordered));
        for exercise in &ordered {
            issues.extend(self.context_issue(lesson_id, exercise, content));
        }
        issues.extend(self.corrupted_keys(lesson_id, &ordered));
        issues.extend(order_collisions(lesson_id, content, exercises));

        tracing::debug!(lesson = lesson_id, issues = issues.len(), "Lesson validated");
        issues
    }

    /// Validates one lesson read from the store.
    ///
    /// # Errors
    ///
    /// Returns the store's error if a query fails. An unknown lesson is not
    /// an error.
    pub fn validate_lesson<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        lesson_id: &str,
    ) -> StoreResult<ValidationResult> {
        let Some(lesson) = store.lesson(lesson_id)? else {
            tracing::warn!(lesson = lesson_id, "Lesson not found");
            return Ok(ValidationResult {
                lesson_id: lesson_id.to_string(),
                lesson_title: lesson_id.to_string(),
                chapter: None,
                issues: vec![PlacementIssue::new(
                    IssueKind::MissingLesson,
                    lesson_id,
                    format!("Lesson '{lesson_id}' does not exist"),
                    "Check the lesson id against the record store",
                )],
            });
        };

        let content = store.content_for_lesson(lesson_id, RecordFilter::Active)?;
        let exercises = store.exercises_for_lesson(lesson_id, RecordFilter::Active)?;
        let issues = self.validate(lesson_id, &content, &exercises);

        Ok(ValidationResult {
            lesson_id: lesson.id,
            lesson_title: lesson.title,
            chapter: lesson.chapter,
            issues,
        })
    }

    /// Validates every lesson in the store, one after another.
    ///
    /// # Errors
    ///
    /// Returns the first store error encountered.
    pub fn validate_all<S: RecordStore + ?Sized>(
        &self,
        store: &S,
    ) -> StoreResult<Vec<ValidationResult>> {
        let lessons = store.lessons()?;
        let mut results = Vec::with_capacity(lessons.len());
        for lesson in &lessons {
            results.push(self.validate_lesson(store, &lesson.id)?);
        }

        let total: usize = results.iter().map(|r| r.issues.len()).sum();
        tracing::info!(lessons = results.len(), issues = total, "Validation complete");
        Ok(results)
    }

    /// Exercises sharing a kind or enough title words, grouped transitively.
    fn duplicate_groups(
        &self,
        lesson_id: &str,
        ordered: &[&ExerciseEntry],
    ) -> Vec<PlacementIssue> {
        let words: Vec<BTreeSet<String>> = ordered.iter().map(|e| title_words(&e.title)).collect();
        let mut groups = DisjointSet::new(ordered.len());

        for i in 0..ordered.len() {
            for j in (i + 1)..ordered.len() {
                let same_kind = ordered[i].kind() == ordered[j].kind();
                let shared = words[i].intersection(&words[j]).count();
                if same_kind || shared >= self.min_shared_title_words {
                    groups.union(i, j);
                }
            }
        }

        let mut members: BTreeMap<usize, Vec<&ExerciseEntry>> = BTreeMap::new();
        for (index, exercise) in ordered.iter().enumerate() {
            members.entry(groups.find(index)).or_default().push(exercise);
        }

        let mut found: Vec<Vec<&ExerciseEntry>> = members
            .into_values()
            .filter(|group| group.len() > 1)
            .map(|mut group| {
                group.sort_by_key(|e| (e.order_key, e.id));
                group
            })
            .collect();
        found.sort_by_key(|group| group.first().map(|e| (e.order_key, e.id)));

        found
            .into_iter()
            .map(|group| {
                let titles: Vec<String> = group.iter().map(|e| format!("'{}'", e.title)).collect();
                PlacementIssue::new(
                    IssueKind::DuplicateFunctionality,
                    lesson_id,
                    format!(
                        "{} exercises overlap in functionality: {}",
                        group.len(),
                        titles.join(", ")
                    ),
                    "Differentiate these exercises or merge them into one adaptive component",
                )
                .related(group.iter().map(|e| e.id).collect())
            })
            .collect()
    }

    /// Missing or inverted context for one exercise.
    fn context_issue(
        &self,
        lesson_id: &str,
        exercise: &ExerciseEntry,
        content: &[ContentEntry],
    ) -> Option<PlacementIssue> {
        match self.strategy.find_context(&exercise.title, content) {
            ContextMatch::NoMatch => Some(
                PlacementIssue::new(
                    IssueKind::MissingContext,
                    lesson_id,
                    format!(
                        "No content entry introduces exercise '{}'",
                        exercise.title
                    ),
                    "Add a content entry that introduces this exercise before it",
                )
                .for_exercise(exercise.id),
            ),
            ContextMatch::Matched {
                content_id,
                title,
                order_key,
                ..
            } if order_key > exercise.order_key => Some(
                PlacementIssue::new(
                    IssueKind::ContextInversion,
                    lesson_id,
                    format!(
                        "Exercise '{}' (order key {}) appears before its context '{}' (order key {})",
                        exercise.title, exercise.order_key, title, order_key
                    ),
                    format!("Move '{}' after '{}' (order key {})", exercise.title, title, order_key),
                )
                .for_exercise(exercise.id)
                .related(vec![content_id]),
            ),
            ContextMatch::Matched { .. } => None,
        }
    }

    /// Exercises whose order key lies in the corrupted range.
    fn corrupted_keys(&self, lesson_id: &str, ordered: &[&ExerciseEntry]) -> Vec<PlacementIssue> {
        ordered
            .iter()
            .filter(|e| e.order_key >= self.corrupted_order_threshold)
            .map(|e| {
                PlacementIssue::new(
                    IssueKind::CorruptedOrdering,
                    lesson_id,
                    format!(
                        "Exercise '{}' has corrupted order key {}",
                        e.title, e.order_key
                    ),
                    "Assign an order key that reflects the exercise's narrative position",
                )
                .for_exercise(e.id)
            })
            .collect()
    }
}

/// Leading exercises with no content before them.
fn cold_opens(lesson_id: &str, flow: &[FlowItem]) -> Vec<PlacementIssue> {
    let first_content = flow.iter().find(|item| item.is_content());
    let suggestion = first_content.map_or_else(
        || "Add a content entry that introduces this exercise before it".to_string(),
        |c| {
            format!(
                "Move the exercise after '{}' (order key {})",
                c.title(),
                c.order_key()
            )
        },
    );

    flow.iter()
        .take_while(|item| item.is_exercise())
        .map(|item| {
            PlacementIssue::new(
                IssueKind::ColdOpen,
                lesson_id,
                format!(
                    "Exercise '{}' appears before any story context",
                    item.title()
                ),
                suggestion.clone(),
            )
            .for_exercise(item.id())
        })
        .collect()
}

/// Live entries of either stream sharing one order key.
fn order_collisions(
    lesson_id: &str,
    content: &[ContentEntry],
    exercises: &[ExerciseEntry],
) -> Vec<PlacementIssue> {
    let mut by_key: BTreeMap<OrderKey, Vec<(EntryId, &str)>> = BTreeMap::new();
    for entry in content.iter().filter(|c| c.is_live()) {
        by_key
            .entry(entry.order_key)
            .or_default()
            .push((entry.id, entry.title.as_str()));
    }
    for entry in exercises.iter().filter(|e| e.is_live()) {
        by_key
            .entry(entry.order_key)
            .or_default()
            .push((entry.id, entry.title.as_str()));
    }

    by_key
        .into_iter()
        .filter(|(_, rows)| rows.len() > 1)
        .map(|(key, rows)| {
            let titles: Vec<String> = rows.iter().map(|(_, title)| format!("'{title}'")).collect();
            PlacementIssue::new(
                IssueKind::OrderCollision,
                lesson_id,
                format!("Order key {key} is shared by {}", titles.join(", ")),
                "Give each entry a distinct order key",
            )
            .related(rows.iter().map(|(id, _)| *id).collect())
        })
        .collect()
}

/// Lower-cases a title, strips non-letters, and splits it into words.
fn title_words(title: &str) -> BTreeSet<String> {
    static NON_LETTERS: OnceLock<Option<Regex>> = OnceLock::new();

    let Some(re) = NON_LETTERS.get_or_init(|| Regex::new(r"[^\p{Alphabetic}\s]").ok()) else {
        return BTreeSet::new();
    };

    re.replace_all(&title.to_lowercase(), "")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Union-find over exercise indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    fn find(&mut self, index: usize) -> usize {
        let mut root = index;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = index;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Keep the smaller index as root so group order follows input order.
            let (keep, fold) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[fold] = keep;
        }
    }
}
