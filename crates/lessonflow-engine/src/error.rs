//! Error types for the lesson flow engine.
//!
//! Infrastructure failures (the record store is unreachable, a snapshot is
//! unreadable, a restructuring run cannot even reserve order keys) surface
//! as [`FlowError`]. Failures of a single plan operation are not errors of
//! the run; they are collected by the executor, see
//! [`crate::restructure::OperationError`].

use std::path::PathBuf;

use crate::store::StoreError;

/// A specialized `Result` type for engine operations.
pub type Result<T> = std::result::Result<T, FlowError>;

/// Errors that can occur while loading, validating or restructuring lessons.
///
/// Display messages carry an actionable suggestion where one exists.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in the configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your lessonflow.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Record Store Errors
    // ========================================================================
    /// The record snapshot file does not exist.
    #[error("Record snapshot not found: '{path}'\n\nSuggestion: Check the 'store' field in lessonflow.json or export the lesson records first")]
    SnapshotNotFound {
        /// Path where the snapshot was expected.
        path: PathBuf,
    },

    /// The record snapshot could not be parsed or failed boundary validation.
    #[error("Corrupted record snapshot '{path}': {message}\n\nSuggestion: Fix the offending record or restore the snapshot from backup")]
    SnapshotCorrupted {
        /// Path to the corrupted snapshot.
        path: PathBuf,
        /// Description of the corruption.
        message: String,
    },

    /// The requested lesson is not present in the record store.
    #[error("Lesson not found: '{lesson_id}'\n\nSuggestion: List available lessons with 'lessonflow audit' or check the lesson identifier")]
    LessonNotFound {
        /// Identifier of the missing lesson.
        lesson_id: String,
    },

    /// The record store rejected a query.
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    // ========================================================================
    // Restructuring Errors
    // ========================================================================
    /// The reservation phase of a restructuring run failed; nothing after it ran.
    #[error("Restructuring of lesson '{lesson_id}' aborted during order key reservation: {source}\n\nSuggestion: Check that the record store is reachable and retry the whole plan")]
    ResetFailed {
        /// Lesson that was being restructured.
        lesson_id: String,
        /// The store failure that aborted the run.
        source: StoreError,
    },

    /// The restructuring plan file could not be parsed.
    #[error("Invalid restructuring plan '{path}': {message}\n\nSuggestion: The plan must be a JSON array of operations or an object with a 'plan' array")]
    PlanParseError {
        /// Path to the plan file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    // ========================================================================
    // Report Errors
    // ========================================================================
    /// Failed to write an artifact to disk.
    #[error("Failed to write '{path}': {message}\n\nSuggestion: Check write permissions and available disk space")]
    WriteError {
        /// Path that was being written.
        path: PathBuf,
        /// Description of the write failure.
        message: String,
    },

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlowError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `SnapshotNotFound` error.
    #[must_use]
    pub fn snapshot_not_found(path: impl Into<PathBuf>) -> Self {
        Self::SnapshotNotFound { path: path.into() }
    }

    /// Creates a new `SnapshotCorrupted` error.
    #[must_use]
    pub fn snapshot_corrupted(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::SnapshotCorrupted {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `LessonNotFound` error.
    #[must_use]
    pub fn lesson_not_found(lesson_id: impl Into<String>) -> Self {
        Self::LessonNotFound {
            lesson_id: lesson_id.into(),
        }
    }

    /// Creates a new `ResetFailed` error.
    #[must_use]
    pub fn reset_failed(lesson_id: impl Into<String>, source: StoreError) -> Self {
        Self::ResetFailed {
            lesson_id: lesson_id.into(),
            source,
        }
    }

    /// Creates a new `PlanParseError`.
    #[must_use]
    pub fn plan_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::PlanParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `WriteError`.
    #[must_use]
    pub fn write(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::WriteError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this error aborts the current command outright.
    ///
    /// A missing lesson is reported but does not invalidate other lessons
    /// in a multi-lesson run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::LessonNotFound { .. })
    }
}
