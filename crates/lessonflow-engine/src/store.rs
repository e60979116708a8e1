//! Record store abstraction and the in-memory implementation.
//!
//! The engine reads and writes lesson records only through the keyed
//! queries of [`RecordStore`]. [`MemoryStore`] keeps everything in process
//! and persists to a JSON [`StoreSnapshot`]; exercise configurations are
//! validated when records cross that boundary.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{FlowError, Result};
use crate::model::{ContentEntry, EntryId, ExerciseConfig, ExerciseEntry, Lesson, OrderKey};

/// Store error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The referenced record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The record violates a store constraint.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// The store cannot be reached or rejected the query.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Creates a `NotFound` error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Creates an `InvalidRecord` error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRecord(message.into())
    }

    /// Creates an `Unavailable` error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

/// Result type for store queries.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Which rows a lesson query returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecordFilter {
    /// Every row, including hidden and inactive ones.
    #[default]
    All,
    /// Rows with `active == true`.
    Active,
    /// Rows that are both active and visible.
    ActiveVisible,
}

impl RecordFilter {
    /// Returns `true` if a row with these flags passes the filter.
    #[must_use]
    pub const fn admits(self, active: bool, visible: bool) -> bool {
        match self {
            Self::All => true,
            Self::Active => active,
            Self::ActiveVisible => active && visible,
        }
    }
}

/// Fields for a content row the store has not assigned an id to yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContent {
    /// Owning lesson.
    pub lesson_id: String,
    /// Entry title.
    pub title: String,
    /// Narrative body.
    pub body: String,
    /// Position in the timeline.
    pub order_key: OrderKey,
}

/// Fields for an exercise row the store has not assigned an id to yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExercise {
    /// Owning lesson.
    pub lesson_id: String,
    /// Entry title.
    pub title: String,
    /// Learner-facing description.
    pub description: String,
    /// Position in the timeline.
    pub order_key: OrderKey,
    /// Kind-specific configuration.
    pub configuration: ExerciseConfig,
}

/// Keyed access to lesson records.
///
/// Lesson listings are ordered by `order_key` ascending, ties by id.
/// Exercises can be hidden but never deleted; only content rows support
/// [`RecordStore::delete_content`].
pub trait RecordStore {
    /// Returns all lessons ordered by chapter, then id.
    fn lessons(&self) -> StoreResult<Vec<Lesson>>;

    /// Looks up one lesson.
    fn lesson(&self, lesson_id: &str) -> StoreResult<Option<Lesson>>;

    /// Returns the lesson's content rows admitted by `filter`.
    fn content_for_lesson(
        &self,
        lesson_id: &str,
        filter: RecordFilter,
    ) -> StoreResult<Vec<ContentEntry>>;

    /// Returns the lesson's exercise rows admitted by `filter`.
    fn exercises_for_lesson(
        &self,
        lesson_id: &str,
        filter: RecordFilter,
    ) -> StoreResult<Vec<ExerciseEntry>>;

    /// Looks up one content row.
    fn content(&self, id: EntryId) -> StoreResult<Option<ContentEntry>>;

    /// Looks up one exercise row.
    fn exercise(&self, id: EntryId) -> StoreResult<Option<ExerciseEntry>>;

    /// Inserts a content row and returns it with its assigned id.
    fn insert_content(&mut self, draft: NewContent) -> StoreResult<ContentEntry>;

    /// Inserts an exercise row and returns it with its assigned id.
    fn insert_exercise(&mut self, draft: NewExercise) -> StoreResult<ExerciseEntry>;

    /// Replaces an existing content row.
    fn update_content(&mut self, entry: &ContentEntry) -> StoreResult<()>;

    /// Replaces an existing exercise row.
    fn update_exercise(&mut self, entry: &ExerciseEntry) -> StoreResult<()>;

    /// Removes a content row. Returns `false` if it did not exist.
    fn delete_content(&mut self, id: EntryId) -> StoreResult<bool>;
}

// ============================================================================
// StoreSnapshot
// ============================================================================

/// Serialized form of a whole record store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// All lessons.
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    /// All content rows.
    #[serde(default)]
    pub content: Vec<ContentEntry>,
    /// All exercise rows.
    #[serde(default)]
    pub exercises: Vec<ExerciseEntry>,
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-process record store backed by ordered maps.
///
/// Content and exercise rows share one id sequence so an id names exactly
/// one row of either stream.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    lessons: BTreeMap<String, Lesson>,
    content: BTreeMap<EntryId, ContentEntry>,
    exercises: BTreeMap<EntryId, ExerciseEntry>,
    next_id: EntryId,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Adds or replaces a lesson.
    pub fn add_lesson(&mut self, lesson: Lesson) {
        self.lessons.insert(lesson.id.clone(), lesson);
    }

    /// Builds a store from a snapshot, validating every record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidRecord` on duplicate ids, on an id of
    /// `u64::MAX` (nothing left to allocate), or on exercise configurations
    /// that fail their per-kind schema, and `StoreError::NotFound` for rows
    /// that reference unknown lessons.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> StoreResult<Self> {
        let mut store = Self::new();
        for lesson in snapshot.lessons {
            if store.lessons.contains_key(&lesson.id) {
                return Err(StoreError::invalid(format!(
                    "duplicate lesson id '{}'",
                    lesson.id
                )));
            }
            store.add_lesson(lesson);
        }

        let mut seen = BTreeSet::new();
        for entry in snapshot.content {
            store.require_lesson(&entry.lesson_id)?;
            if !seen.insert(entry.id) {
                return Err(StoreError::invalid(format!("duplicate entry id {}", entry.id)));
            }
            store.content.insert(entry.id, entry);
        }
        for entry in snapshot.exercises {
            store.require_lesson(&entry.lesson_id)?;
            if !seen.insert(entry.id) {
                return Err(StoreError::invalid(format!("duplicate entry id {}", entry.id)));
            }
            validate_configuration(entry.id, &entry.configuration)?;
            store.exercises.insert(entry.id, entry);
        }

        store.next_id = match seen.last() {
            Some(max) => max.checked_add(1).ok_or_else(ids_exhausted)?,
            None => 1,
        };
        Ok(store)
    }

    /// Captures the whole store as a snapshot.
    #[must_use]
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            lessons: self.lessons.values().cloned().collect(),
            content: self.content.values().cloned().collect(),
            exercises: self.exercises.values().cloned().collect(),
        }
    }

    /// Loads a store from a JSON snapshot file.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::SnapshotNotFound` if the file does not exist and
    /// `FlowError::SnapshotCorrupted` if it cannot be parsed or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FlowError::snapshot_not_found(path));
            }
            Err(e) => return Err(FlowError::Io(e)),
        };

        let snapshot: StoreSnapshot = serde_json::from_str(&contents)
            .map_err(|e| FlowError::snapshot_corrupted(path, e.to_string()))?;
        let store = Self::from_snapshot(snapshot)
            .map_err(|e| FlowError::snapshot_corrupted(path, e.to_string()))?;

        tracing::debug!(
            path = %path.display(),
            lessons = store.lessons.len(),
            content = store.content.len(),
            exercises = store.exercises.len(),
            "Record snapshot loaded"
        );
        Ok(store)
    }

    /// Writes the store to a JSON snapshot file, pretty-printed.
    ///
    /// The snapshot is written to a sibling temp file and renamed into place.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::WriteError` if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot())?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| FlowError::write(&tmp, e.to_string()))?;
        std::fs::rename(&tmp, path).map_err(|e| FlowError::write(path, e.to_string()))?;
        Ok(())
    }

    fn require_lesson(&self, lesson_id: &str) -> StoreResult<()> {
        if self.lessons.contains_key(lesson_id) {
            Ok(())
        } else {
            Err(StoreError::not_found(format!("lesson '{lesson_id}'")))
        }
    }

    fn allocate_id(&mut self) -> StoreResult<EntryId> {
        let id = self.next_id.max(1);
        self.next_id = id.checked_add(1).ok_or_else(ids_exhausted)?;
        Ok(id)
    }
}

fn ids_exhausted() -> StoreError {
    StoreError::invalid("entry ids exhausted")
}

fn validate_configuration(id: EntryId, configuration: &ExerciseConfig) -> StoreResult<()> {
    configuration.validate().map_err(|message| {
        StoreError::invalid(format!(
            "exercise {id} ({}) configuration: {message}",
            configuration.kind()
        ))
    })
}

impl RecordStore for MemoryStore {
    fn lessons(&self) -> StoreResult<Vec<Lesson>> {
        let mut lessons: Vec<Lesson> = self.lessons.values().cloned().collect();
        lessons.sort_by(|a, b| a.chapter.cmp(&b.chapter).then_with(|| a.id.cmp(&b.id)));
        Ok(lessons)
    }

    fn lesson(&self, lesson_id: &str) -> StoreResult<Option<Lesson>> {
        Ok(self.lessons.get(lesson_id).cloned())
    }

    fn content_for_lesson(
        &self,
        lesson_id: &str,
        filter: RecordFilter,
    ) -> StoreResult<Vec<ContentEntry>> {
        let mut rows: Vec<ContentEntry> = self
            .content
            .values()
            .filter(|c| c.lesson_id == lesson_id && filter.admits(c.active, c.visible))
            .cloned()
            .collect();
        rows.sort_by_key(|c| (c.order_key, c.id));
        Ok(rows)
    }

    fn exercises_for_lesson(
        &self,
        lesson_id: &str,
        filter: RecordFilter,
    ) -> StoreResult<Vec<ExerciseEntry>> {
        let mut rows: Vec<ExerciseEntry> = self
            .exercises
            .values()
            .filter(|e| e.lesson_id == lesson_id && filter.admits(e.active, e.visible))
            .cloned()
            .collect();
        rows.sort_by_key(|e| (e.order_key, e.id));
        Ok(rows)
    }

    fn content(&self, id: EntryId) -> StoreResult<Option<ContentEntry>> {
        Ok(self.content.get(&id).cloned())
    }

    fn exercise(&self, id: EntryId) -> StoreResult<Option<ExerciseEntry>> {
        Ok(self.exercises.get(&id).cloned())
    }

    fn insert_content(&mut self, draft: NewContent) -> StoreResult<ContentEntry> {
        self.require_lesson(&draft.lesson_id)?;
        let entry = ContentEntry {
            id: self.allocate_id()?,
            lesson_id: draft.lesson_id,
            title: draft.title,
            body: draft.body,
            order_key: draft.order_key,
            visible: true,
            active: true,
        };
        self.content.insert(entry.id, entry.clone());
        Ok(entry)
    }

    fn insert_exercise(&mut self, draft: NewExercise) -> StoreResult<ExerciseEntry> {
        self.require_lesson(&draft.lesson_id)?;
        validate_configuration(self.next_id, &draft.configuration)?;
        let entry = ExerciseEntry {
            id: self.allocate_id()?,
            lesson_id: draft.lesson_id,
            title: draft.title,
            description: draft.description,
            order_key: draft.order_key,
            visible: true,
            active: true,
            gated: false,
            configuration: draft.configuration,
        };
        self.exercises.insert(entry.id, entry.clone());
        Ok(entry)
    }

    fn update_content(&mut self, entry: &ContentEntry) -> StoreResult<()> {
        match self.content.get_mut(&entry.id) {
            Some(existing) => {
                *existing = entry.clone();
                Ok(())
            }
            None => Err(StoreError::not_found(format!("content entry {}", entry.id))),
        }
    }

    fn update_exercise(&mut self, entry: &ExerciseEntry) -> StoreResult<()> {
        validate_configuration(entry.id, &entry.configuration)?;
        match self.exercises.get_mut(&entry.id) {
            Some(existing) => {
                *existing = entry.clone();
                Ok(())
            }
            None => Err(StoreError::not_found(format!("exercise entry {}", entry.id))),
        }
    }

    fn delete_content(&mut self, id: EntryId) -> StoreResult<bool> {
        Ok(self.content.remove(&id).is_some())
    }
}
