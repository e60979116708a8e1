//! Restructuring executor: applies an operator plan to one lesson.
//!
//! A run has three phases:
//!
//! 1. **Reserve**: every active entry is moved to a distinct key above both
//!    the lesson's current keys and every key the plan targets, so that
//!    assigning plan keys can never collide with an entry that has not been
//!    processed yet. Keys held before this phase are remembered for
//!    `sourceOrderKey` lookups.
//! 2. **Apply**: operations run in plan order. Each one either succeeds or
//!    records a message in [`ExecutionResult::errors`]; earlier operations
//!    are never rolled back.
//! 3. **Finalize**: active rows are counted again and entries still sitting
//!    in the reserved range are reported as unplaced.
//!
//! Only a failure before or during the reserve phase aborts the run.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{FlowError, Result};
use crate::model::{ContentEntry, EntryId, ExerciseConfig, ExerciseEntry, ExerciseKind, OrderKey};
use crate::store::{NewContent, NewExercise, RecordFilter, RecordStore, StoreError};

// ============================================================================
// Plan types
// ============================================================================

/// Which record stream an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    /// A content entry.
    Content,
    /// An exercise entry.
    Exercise,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content => f.write_str("content"),
            Self::Exercise => f.write_str("exercise"),
        }
    }
}

/// What an operation does to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Move the entry to the target key.
    Keep,
    /// Change fields and move the entry.
    Edit,
    /// Fold another entry into this one.
    Merge,
    /// Insert a new entry.
    Create,
    /// Remove a content entry.
    Delete,
    /// Deactivate an exercise without removing it.
    Hide,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Keep => "keep",
            Self::Edit => "edit",
            Self::Merge => "merge",
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Hide => "hide",
        };
        f.write_str(label)
    }
}

/// One step of a restructuring plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestructureOperation {
    /// Order key the entry held before the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_order_key: Option<OrderKey>,
    /// Stream of the target entry.
    pub target_type: TargetType,
    /// Key the entry ends up with.
    pub target_order_key: OrderKey,
    /// Title used to find the entry, or the title of a created one.
    pub title: String,
    /// What to do.
    pub action: Action,
    /// Replacement body (content).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_body: Option<String>,
    /// Kind of a created or re-kinded exercise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_kind: Option<ExerciseKind>,
    /// Replacement description (exercise).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_description: Option<String>,
    /// Explicit id of the target entry; takes precedence over the title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<EntryId>,
    /// Entry folded into the target by `merge`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_from_id: Option<EntryId>,
    /// Replacement title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_title: Option<String>,
    /// Replacement exercise configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_configuration: Option<ExerciseConfig>,
}

impl RestructureOperation {
    /// Creates an operation with only the required fields set.
    #[must_use]
    pub fn new(
        action: Action,
        target_type: TargetType,
        title: impl Into<String>,
        target_order_key: OrderKey,
    ) -> Self {
        Self {
            source_order_key: None,
            target_type,
            target_order_key,
            title: title.into(),
            action,
            new_body: None,
            new_kind: None,
            new_description: None,
            target_id: None,
            merge_from_id: None,
            new_title: None,
            new_configuration: None,
        }
    }
}

/// Plan file layouts: a bare operation list or `{ "plan": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PlanFile {
    Bare(Vec<RestructureOperation>),
    Wrapped { plan: Vec<RestructureOperation> },
}

/// Reads a restructuring plan from a JSON file.
///
/// # Errors
///
/// Returns `FlowError::PlanParseError` if the file cannot be read or parsed.
pub fn load_plan(path: &Path) -> Result<Vec<RestructureOperation>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| FlowError::plan_parse(path, format!("failed to read file: {e}")))?;
    let plan: PlanFile =
        serde_json::from_str(&contents).map_err(|e| FlowError::plan_parse(path, e.to_string()))?;
    Ok(match plan {
        PlanFile::Bare(plan) | PlanFile::Wrapped { plan } => plan,
    })
}

// ============================================================================
// Outcome types
// ============================================================================

/// Why a single plan operation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// No active entry has the title.
    #[error("{target_type} entry '{title}' not found")]
    NotFound {
        /// Stream searched.
        target_type: TargetType,
        /// Title searched for.
        title: String,
    },

    /// The explicit id does not name an entry of this lesson.
    #[error("{target_type} entry {id} not found in lesson")]
    IdNotFound {
        /// Stream searched.
        target_type: TargetType,
        /// Id searched for.
        id: EntryId,
    },

    /// Several active entries have the title.
    #[error("{target_type} title '{title}' is ambiguous ({count} entries match)")]
    Ambiguous {
        /// Stream searched.
        target_type: TargetType,
        /// Title searched for.
        title: String,
        /// Number of matching entries.
        count: usize,
    },

    /// The action is not defined for this stream.
    #[error("{action} is not supported for {target_type} entries")]
    Unsupported {
        /// Requested action.
        action: Action,
        /// Target stream.
        target_type: TargetType,
    },

    /// A field the action needs is absent.
    #[error("{action} requires {field}")]
    MissingField {
        /// Requested action.
        action: Action,
        /// Missing plan field.
        field: &'static str,
    },

    /// The operation's fields contradict each other.
    #[error("{0}")]
    Conflict(String),

    /// The store rejected the change.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-run operation counts and collected errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Exercises hidden.
    pub hidden_count: usize,
    /// Content entries deleted.
    pub deleted_count: usize,
    /// Entries moved or changed in place.
    pub updated_count: usize,
    /// Entries created.
    pub created_count: usize,
    /// One message per failed operation, in plan order.
    pub errors: Vec<String>,
}

/// Operation counts as reported in a summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationCounts {
    /// Exercises hidden.
    pub hidden: usize,
    /// Content entries deleted.
    pub deleted: usize,
    /// Entries updated.
    pub updated: usize,
    /// Entries created.
    pub created: usize,
}

/// Totals read back after the apply phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestructureSummary {
    /// Active content entries in the lesson.
    pub total_content_entries: usize,
    /// Active exercise entries in the lesson.
    pub total_exercise_entries: usize,
    /// What the plan did.
    pub operations: OperationCounts,
}

/// Everything a completed run reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestructureOutcome {
    /// Lesson that was restructured.
    pub lesson_id: String,
    /// Counts and per-operation errors.
    pub results: ExecutionResult,
    /// Totals after the run.
    pub summary: RestructureSummary,
    /// Active entries still holding a reserved key.
    pub unplaced: Vec<EntryId>,
}

impl RestructureOutcome {
    /// Returns `true` if every operation succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.results.errors.is_empty()
    }
}

/// What one successful operation changed.
#[derive(Debug, Clone, Copy, Default)]
struct Effect {
    hidden: usize,
    deleted: usize,
    updated: usize,
    created: usize,
}

impl Effect {
    const fn updated() -> Self {
        Self {
            hidden: 0,
            deleted: 0,
            updated: 1,
            created: 0,
        }
    }
}

type OpResult<T> = std::result::Result<T, OperationError>;

// ============================================================================
// Executor
// ============================================================================

/// Applies `plan` to one lesson of `store`.
///
/// # Errors
///
/// Returns `FlowError::LessonNotFound` for an unknown lesson and
/// `FlowError::ResetFailed` if the store fails before any operation runs.
/// Per-operation failures are collected in the outcome instead.
pub fn execute<S: RecordStore + ?Sized>(
    store: &mut S,
    lesson_id: &str,
    plan: &[RestructureOperation],
) -> Result<RestructureOutcome> {
    let lesson = store
        .lesson(lesson_id)
        .map_err(|e| FlowError::reset_failed(lesson_id, e))?;
    if lesson.is_none() {
        return Err(FlowError::lesson_not_found(lesson_id));
    }

    tracing::info!(lesson = lesson_id, operations = plan.len(), "Restructuring lesson");

    let reservation = reserve(store, lesson_id, plan)
        .map_err(|e| FlowError::reset_failed(lesson_id, e))?;

    let mut run = Run {
        store: &mut *store,
        lesson_id,
        reservation: &reservation,
        results: ExecutionResult::default(),
    };
    for (index, operation) in plan.iter().enumerate() {
        run.apply(index, operation);
    }
    let results = run.results;

    tracing::info!(
        lesson = lesson_id,
        updated = results.updated_count,
        created = results.created_count,
        deleted = results.deleted_count,
        hidden = results.hidden_count,
        errors = results.errors.len(),
        "Plan applied"
    );

    finalize(store, lesson_id, reservation.base, results)
}

/// Keys captured by the reserve phase.
#[derive(Debug)]
struct Reservation {
    base: OrderKey,
    prior: Vec<(TargetType, EntryId, OrderKey)>,
}

impl Reservation {
    fn prior_ids(&self, target_type: TargetType, key: OrderKey) -> Vec<EntryId> {
        self.prior
            .iter()
            .filter(|(t, _, k)| *t == target_type && *k == key)
            .map(|(_, id, _)| *id)
            .collect()
    }
}

fn reserve<S: RecordStore + ?Sized>(
    store: &mut S,
    lesson_id: &str,
    plan: &[RestructureOperation],
) -> std::result::Result<Reservation, StoreError> {
    let mut content = store.content_for_lesson(lesson_id, RecordFilter::Active)?;
    let mut exercises = store.exercises_for_lesson(lesson_id, RecordFilter::Active)?;

    let highest = content
        .iter()
        .map(|c| c.order_key)
        .chain(exercises.iter().map(|e| e.order_key))
        .chain(plan.iter().map(|op| op.target_order_key))
        .max()
        .unwrap_or(0);
    let base = highest
        .checked_add(1)
        .ok_or_else(|| StoreError::invalid("order keys exhausted"))?;

    let mut prior = Vec::with_capacity(content.len() + exercises.len());
    let mut next = base;
    for entry in &mut content {
        prior.push((TargetType::Content, entry.id, entry.order_key));
        entry.order_key = next;
        store.update_content(entry)?;
        next = next
            .checked_add(1)
            .ok_or_else(|| StoreError::invalid("order keys exhausted"))?;
    }
    for entry in &mut exercises {
        prior.push((TargetType::Exercise, entry.id, entry.order_key));
        entry.order_key = next;
        store.update_exercise(entry)?;
        next = next
            .checked_add(1)
            .ok_or_else(|| StoreError::invalid("order keys exhausted"))?;
    }

    tracing::info!(
        lesson = lesson_id,
        base,
        reserved = prior.len(),
        "Order keys reserved"
    );
    Ok(Reservation { base, prior })
}

fn finalize<S: RecordStore + ?Sized>(
    store: &S,
    lesson_id: &str,
    base: OrderKey,
    results: ExecutionResult,
) -> Result<RestructureOutcome> {
    let content = store.content_for_lesson(lesson_id, RecordFilter::Active)?;
    let exercises = store.exercises_for_lesson(lesson_id, RecordFilter::Active)?;

    let mut unplaced = Vec::new();
    for (id, title, key) in content
        .iter()
        .map(|c| (c.id, &c.title, c.order_key))
        .chain(exercises.iter().map(|e| (e.id, &e.title, e.order_key)))
    {
        if key >= base {
            tracing::warn!(lesson = lesson_id, id, title = %title, order_key = key, "Entry left unplaced");
            unplaced.push(id);
        }
    }

    let summary = RestructureSummary {
        total_content_entries: content.len(),
        total_exercise_entries: exercises.len(),
        operations: OperationCounts {
            hidden: results.hidden_count,
            deleted: results.deleted_count,
            updated: results.updated_count,
            created: results.created_count,
        },
    };
    tracing::info!(
        lesson = lesson_id,
        content = summary.total_content_entries,
        exercises = summary.total_exercise_entries,
        unplaced = unplaced.len(),
        "Restructuring finalized"
    );

    Ok(RestructureOutcome {
        lesson_id: lesson_id.to_string(),
        results,
        summary,
        unplaced,
    })
}

/// State of the apply phase.
struct Run<'a, S: ?Sized> {
    store: &'a mut S,
    lesson_id: &'a str,
    reservation: &'a Reservation,
    results: ExecutionResult,
}

/// How an entry was found, which decides whether the plan title renames it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    ById,
    ByPriorKey,
    ByTitle,
}

impl<S: RecordStore + ?Sized> Run<'_, S> {
    fn apply(&mut self, index: usize, op: &RestructureOperation) {
        match self.dispatch(op) {
            Ok(effect) => {
                tracing::debug!(
                    step = index + 1,
                    action = %op.action,
                    target = %op.target_type,
                    title = %op.title,
                    order_key = op.target_order_key,
                    "Operation applied"
                );
                self.results.hidden_count += effect.hidden;
                self.results.deleted_count += effect.deleted;
                self.results.updated_count += effect.updated;
                self.results.created_count += effect.created;
            }
            Err(e) => {
                let message = format!("operation {} ({} '{}'): {e}", index + 1, op.action, op.title);
                tracing::warn!(lesson = self.lesson_id, "{message}");
                self.results.errors.push(message);
            }
        }
    }

    fn dispatch(&mut self, op: &RestructureOperation) -> OpResult<Effect> {
        match (op.action, op.target_type) {
            (Action::Keep, TargetType::Content) => {
                let (mut entry, _) = self.find_content(op)?;
                entry.order_key = op.target_order_key;
                self.store.update_content(&entry)?;
                Ok(Effect::updated())
            }
            (Action::Keep, TargetType::Exercise) => {
                let (mut entry, _) = self.find_exercise(op)?;
                entry.order_key = op.target_order_key;
                self.store.update_exercise(&entry)?;
                Ok(Effect::updated())
            }
            (Action::Edit, TargetType::Content) => self.edit_content(op),
            (Action::Edit, TargetType::Exercise) => self.edit_exercise(op),
            (Action::Merge, TargetType::Content) => self.merge_content(op),
            (Action::Merge, TargetType::Exercise) => self.merge_exercise(op),
            (Action::Create, TargetType::Content) => self.create_content(op),
            (Action::Create, TargetType::Exercise) => self.create_exercise(op),
            (Action::Delete, TargetType::Content) => {
                let (entry, _) = self.find_content(op)?;
                if !self.store.delete_content(entry.id)? {
                    return Err(OperationError::IdNotFound {
                        target_type: TargetType::Content,
                        id: entry.id,
                    });
                }
                Ok(Effect {
                    deleted: 1,
                    ..Effect::default()
                })
            }
            (Action::Hide, TargetType::Exercise) => {
                let (mut entry, _) = self.find_exercise(op)?;
                entry.visible = false;
                entry.active = false;
                self.store.update_exercise(&entry)?;
                Ok(Effect {
                    hidden: 1,
                    ..Effect::default()
                })
            }
            (action @ (Action::Delete | Action::Hide), target_type) => {
                Err(OperationError::Unsupported {
                    action,
                    target_type,
                })
            }
        }
    }

    fn edit_content(&mut self, op: &RestructureOperation) -> OpResult<Effect> {
        let (mut entry, lookup) = self.find_content(op)?;
        if let Some(title) = renamed_title(op, lookup) {
            entry.title = title;
        }
        if let Some(body) = &op.new_body {
            entry.body.clone_from(body);
        }
        entry.order_key = op.target_order_key;
        self.store.update_content(&entry)?;
        Ok(Effect::updated())
    }

    fn edit_exercise(&mut self, op: &RestructureOperation) -> OpResult<Effect> {
        let (mut entry, lookup) = self.find_exercise(op)?;
        if let Some(title) = renamed_title(op, lookup) {
            entry.title = title;
        }
        if let Some(description) = &op.new_description {
            entry.description.clone_from(description);
        }
        if let Some(configuration) = exercise_configuration(op)? {
            entry.configuration = configuration;
        } else if let Some(kind) = op.new_kind {
            if kind != entry.kind() {
                entry.configuration = ExerciseConfig::empty(kind);
            }
        }
        entry.order_key = op.target_order_key;
        self.store.update_exercise(&entry)?;
        Ok(Effect::updated())
    }

    fn merge_content(&mut self, op: &RestructureOperation) -> OpResult<Effect> {
        let source_id = op.merge_from_id.ok_or(OperationError::MissingField {
            action: Action::Merge,
            field: "mergeFromId",
        })?;
        let (mut target, _) = self.find_content(op)?;
        if source_id == target.id {
            return Err(OperationError::Conflict(format!(
                "cannot merge entry {source_id} into itself"
            )));
        }
        let source = self
            .store
            .content(source_id)?
            .filter(|c| c.lesson_id == self.lesson_id)
            .ok_or(OperationError::IdNotFound {
                target_type: TargetType::Content,
                id: source_id,
            })?;

        target.body = op
            .new_body
            .clone()
            .unwrap_or_else(|| combine(&target.body, &source.body));
        if let Some(title) = &op.new_title {
            target.title.clone_from(title);
        }
        target.order_key = op.target_order_key;
        self.store.update_content(&target)?;
        self.store.delete_content(source.id)?;

        Ok(Effect {
            updated: 1,
            deleted: 1,
            ..Effect::default()
        })
    }

    fn merge_exercise(&mut self, op: &RestructureOperation) -> OpResult<Effect> {
        let source_id = op.merge_from_id.ok_or(OperationError::MissingField {
            action: Action::Merge,
            field: "mergeFromId",
        })?;
        let (mut target, _) = self.find_exercise(op)?;
        if source_id == target.id {
            return Err(OperationError::Conflict(format!(
                "cannot merge entry {source_id} into itself"
            )));
        }
        let mut source = self
            .store
            .exercise(source_id)?
            .filter(|e| e.lesson_id == self.lesson_id)
            .ok_or(OperationError::IdNotFound {
                target_type: TargetType::Exercise,
                id: source_id,
            })?;

        target.description = op
            .new_description
            .clone()
            .unwrap_or_else(|| combine(&target.description, &source.description));
        if let Some(title) = &op.new_title {
            target.title.clone_from(title);
        }
        if let Some(configuration) = exercise_configuration(op)? {
            target.configuration = configuration;
        }
        target.order_key = op.target_order_key;
        self.store.update_exercise(&target)?;

        // Exercises are never deleted; the folded-in one is hidden instead.
        source.visible = false;
        source.active = false;
        self.store.update_exercise(&source)?;

        Ok(Effect {
            updated: 1,
            hidden: 1,
            ..Effect::default()
        })
    }

    fn create_content(&mut self, op: &RestructureOperation) -> OpResult<Effect> {
        let created = self.store.insert_content(NewContent {
            lesson_id: self.lesson_id.to_string(),
            title: op.new_title.clone().unwrap_or_else(|| op.title.clone()),
            body: op.new_body.clone().unwrap_or_default(),
            order_key: op.target_order_key,
        })?;
        tracing::debug!(id = created.id, title = %created.title, "Content entry created");
        Ok(Effect {
            created: 1,
            ..Effect::default()
        })
    }

    fn create_exercise(&mut self, op: &RestructureOperation) -> OpResult<Effect> {
        let configuration = match (exercise_configuration(op)?, op.new_kind) {
            (Some(configuration), _) => configuration,
            (None, Some(kind)) => ExerciseConfig::empty(kind),
            (None, None) => {
                return Err(OperationError::MissingField {
                    action: Action::Create,
                    field: "newKind",
                })
            }
        };
        let created = self.store.insert_exercise(NewExercise {
            lesson_id: self.lesson_id.to_string(),
            title: op.new_title.clone().unwrap_or_else(|| op.title.clone()),
            description: op.new_description.clone().unwrap_or_default(),
            order_key: op.target_order_key,
            configuration,
        })?;
        tracing::debug!(id = created.id, title = %created.title, "Exercise entry created");
        Ok(Effect {
            created: 1,
            ..Effect::default()
        })
    }

    /// Resolves the content entry an operation targets.
    ///
    /// Lookup order: `targetId`, then the key held before reservation, then
    /// the title among active entries.
    fn find_content(&self, op: &RestructureOperation) -> OpResult<(ContentEntry, Lookup)> {
        if let Some(id) = op.target_id {
            return self
                .store
                .content(id)?
                .filter(|c| c.lesson_id == self.lesson_id)
                .map(|c| (c, Lookup::ById))
                .ok_or(OperationError::IdNotFound {
                    target_type: TargetType::Content,
                    id,
                });
        }
        if let Some(key) = op.source_order_key {
            if let [id] = self.reservation.prior_ids(TargetType::Content, key)[..] {
                if let Some(entry) = self.store.content(id)? {
                    return Ok((entry, Lookup::ByPriorKey));
                }
            }
        }
        let rows = self
            .store
            .content_for_lesson(self.lesson_id, RecordFilter::Active)?;
        single_by_title(rows, |c| &c.title, TargetType::Content, &op.title)
            .map(|c| (c, Lookup::ByTitle))
    }

    /// Resolves the exercise entry an operation targets.
    fn find_exercise(&self, op: &RestructureOperation) -> OpResult<(ExerciseEntry, Lookup)> {
        if let Some(id) = op.target_id {
            return self
                .store
                .exercise(id)?
                .filter(|e| e.lesson_id == self.lesson_id)
                .map(|e| (e, Lookup::ById))
                .ok_or(OperationError::IdNotFound {
                    target_type: TargetType::Exercise,
                    id,
                });
        }
        if let Some(key) = op.source_order_key {
            if let [id] = self.reservation.prior_ids(TargetType::Exercise, key)[..] {
                if let Some(entry) = self.store.exercise(id)? {
                    return Ok((entry, Lookup::ByPriorKey));
                }
            }
        }
        let rows = self
            .store
            .exercises_for_lesson(self.lesson_id, RecordFilter::Active)?;
        single_by_title(rows, |e| &e.title, TargetType::Exercise, &op.title)
            .map(|e| (e, Lookup::ByTitle))
    }
}

/// Picks the one row whose title matches, trimmed and case-insensitively.
fn single_by_title<T>(
    rows: Vec<T>,
    title_of: impl Fn(&T) -> &String,
    target_type: TargetType,
    title: &str,
) -> OpResult<T> {
    let wanted = title.trim().to_lowercase();
    let mut matches: Vec<T> = rows
        .into_iter()
        .filter(|row| title_of(row).trim().to_lowercase() == wanted)
        .collect();

    match matches.len() {
        0 => Err(OperationError::NotFound {
            target_type,
            title: title.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        count => Err(OperationError::Ambiguous {
            target_type,
            title: title.to_string(),
            count,
        }),
    }
}

/// New title for an edited entry.
///
/// `newTitle` always wins. An entry found by id or prior key takes the
/// plan title, since the title was not needed to find it.
fn renamed_title(op: &RestructureOperation, lookup: Lookup) -> Option<String> {
    if let Some(title) = &op.new_title {
        return Some(title.clone());
    }
    (lookup != Lookup::ByTitle && !op.title.trim().is_empty()).then(|| op.title.clone())
}

/// Explicit configuration, checked against `newKind` when both are set.
fn exercise_configuration(op: &RestructureOperation) -> OpResult<Option<ExerciseConfig>> {
    match (&op.new_configuration, op.new_kind) {
        (Some(configuration), Some(kind)) if configuration.kind() != kind => {
            Err(OperationError::Conflict(format!(
                "newConfiguration is for {} but newKind is {kind}",
                configuration.kind()
            )))
        }
        (configuration, _) => Ok(configuration.clone()),
    }
}

fn combine(first: &str, second: &str) -> String {
    match (first.trim().is_empty(), second.trim().is_empty()) {
        (true, _) => second.to_string(),
        (false, true) => first.to_string(),
        (false, false) => format!("{first}\n\n{second}"),
    }
}
