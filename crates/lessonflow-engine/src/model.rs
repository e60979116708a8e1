//! Record types stored per lesson.
//!
//! A lesson owns two ordered record streams: narrative [`ContentEntry`] rows
//! and interactive [`ExerciseEntry`] rows. Both carry a mutable integer
//! order key plus visibility and active flags.

use serde::{Deserialize, Serialize};

/// Identifier assigned to content and exercise rows by the record store.
pub type EntryId = u64;

/// Integer establishing narrative sequence within a lesson.
pub type OrderKey = i64;

// ============================================================================
// Lesson
// ============================================================================

/// The unit owning one ordered timeline of content and exercises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    /// Stable lesson identifier.
    pub id: String,

    /// Human-readable lesson title.
    pub title: String,

    /// Chapter the lesson belongs to, if the course is organised in chapters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<u32>,
}

impl Lesson {
    /// Creates a lesson outside any chapter.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            chapter: None,
        }
    }

    /// Assigns the lesson to a chapter.
    #[must_use]
    pub const fn in_chapter(mut self, chapter: u32) -> Self {
        self.chapter = Some(chapter);
        self
    }
}

// ============================================================================
// ContentEntry
// ============================================================================

/// Narrative or expository material shown to learners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEntry {
    /// Store-assigned identifier.
    pub id: EntryId,

    /// Owning lesson.
    pub lesson_id: String,

    /// Entry title.
    pub title: String,

    /// Narrative body text.
    #[serde(default)]
    pub body: String,

    /// Position in the lesson timeline.
    pub order_key: OrderKey,

    /// Whether learners can see the entry.
    #[serde(default = "default_true")]
    pub visible: bool,

    /// Whether the entry participates in the lesson at all.
    #[serde(default = "default_true")]
    pub active: bool,
}

impl ContentEntry {
    /// Returns `true` if the entry is both active and visible.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.active && self.visible
    }
}

// ============================================================================
// ExerciseEntry
// ============================================================================

/// Reference to an interactive component placed in a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseEntry {
    /// Store-assigned identifier.
    pub id: EntryId,

    /// Owning lesson.
    pub lesson_id: String,

    /// Entry title.
    pub title: String,

    /// Short learner-facing description.
    #[serde(default)]
    pub description: String,

    /// Position in the lesson timeline.
    pub order_key: OrderKey,

    /// Whether learners can see the exercise.
    #[serde(default = "default_true")]
    pub visible: bool,

    /// Whether the exercise participates in the lesson at all.
    #[serde(default = "default_true")]
    pub active: bool,

    /// Whether progress is blocked until the exercise is completed.
    #[serde(default)]
    pub gated: bool,

    /// Kind-specific configuration; the `kind` tag lives inside it.
    pub configuration: ExerciseConfig,
}

impl ExerciseEntry {
    /// Returns the kind of interactive component.
    #[must_use]
    pub const fn kind(&self) -> ExerciseKind {
        self.configuration.kind()
    }

    /// Returns `true` if the exercise is both active and visible.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.active && self.visible
    }
}

const fn default_true() -> bool {
    true
}

// ============================================================================
// ExerciseKind
// ============================================================================

/// Kinds of interactive component an exercise can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    /// Guided email drafting exercise.
    EmailBuilder,
    /// Multiple-choice quiz.
    Quiz,
    /// Branching scenario with choices.
    Scenario,
    /// Free-text reflection prompt.
    Reflection,
    /// Checklist the learner works through.
    Checklist,
}

impl ExerciseKind {
    /// All kinds in declaration order.
    pub const ALL: [Self; 5] = [
        Self::EmailBuilder,
        Self::Quiz,
        Self::Scenario,
        Self::Reflection,
        Self::Checklist,
    ];

    /// Returns the wire name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EmailBuilder => "email_builder",
            Self::Quiz => "quiz",
            Self::Scenario => "scenario",
            Self::Reflection => "reflection",
            Self::Checklist => "checklist",
        }
    }

    /// Parses a kind name, case-insensitively.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|kind| kind.as_str() == wanted)
    }
}

impl std::fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ExerciseConfig
// ============================================================================

/// One quiz question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    /// Question text.
    pub prompt: String,
    /// Answer options.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub answer: usize,
}

/// Kind-specific exercise configuration, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ExerciseConfig {
    /// Guided email drafting.
    EmailBuilder {
        /// Situation the learner writes for.
        #[serde(default)]
        scenario: String,
        /// Tones the learner can pick from.
        #[serde(default)]
        tone_options: Vec<String>,
    },
    /// Multiple-choice quiz.
    Quiz {
        /// Questions in presentation order.
        #[serde(default)]
        questions: Vec<QuizQuestion>,
    },
    /// Branching scenario.
    Scenario {
        /// Situation description.
        #[serde(default)]
        prompt: String,
        /// Choices offered to the learner.
        #[serde(default)]
        choices: Vec<String>,
    },
    /// Free-text reflection.
    Reflection {
        /// Reflection prompt.
        #[serde(default)]
        prompt: String,
    },
    /// Checklist.
    Checklist {
        /// Checklist items.
        #[serde(default)]
        items: Vec<String>,
    },
}

impl ExerciseConfig {
    /// Returns the kind this configuration belongs to.
    #[must_use]
    pub const fn kind(&self) -> ExerciseKind {
        match self {
            Self::EmailBuilder { .. } => ExerciseKind::EmailBuilder,
            Self::Quiz { .. } => ExerciseKind::Quiz,
            Self::Scenario { .. } => ExerciseKind::Scenario,
            Self::Reflection { .. } => ExerciseKind::Reflection,
            Self::Checklist { .. } => ExerciseKind::Checklist,
        }
    }

    /// Returns an empty configuration for the given kind.
    ///
    /// Used when an exercise is created without explicit configuration.
    #[must_use]
    pub const fn empty(kind: ExerciseKind) -> Self {
        match kind {
            ExerciseKind::EmailBuilder => Self::EmailBuilder {
                scenario: String::new(),
                tone_options: Vec::new(),
            },
            ExerciseKind::Quiz => Self::Quiz {
                questions: Vec::new(),
            },
            ExerciseKind::Scenario => Self::Scenario {
                prompt: String::new(),
                choices: Vec::new(),
            },
            ExerciseKind::Reflection => Self::Reflection {
                prompt: String::new(),
            },
            ExerciseKind::Checklist => Self::Checklist { items: Vec::new() },
        }
    }

    /// Checks the per-kind schema.
    ///
    /// Returns a description of the first violation found.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Self::EmailBuilder { tone_options, .. } => {
                reject_blank("toneOptions", tone_options)?;
            }
            Self::Quiz { questions } => {
                for (index, question) in questions.iter().enumerate() {
                    if question.prompt.trim().is_empty() {
                        return Err(format!("question {} has an empty prompt", index + 1));
                    }
                    if question.options.len() < 2 {
                        return Err(format!(
                            "question {} needs at least two options",
                            index + 1
                        ));
                    }
                    if question.answer >= question.options.len() {
                        return Err(format!(
                            "question {} answer index {} is out of range (0..{})",
                            index + 1,
                            question.answer,
                            question.options.len()
                        ));
                    }
                }
            }
            Self::Scenario { choices, .. } => reject_blank("choices", choices)?,
            Self::Reflection { .. } => {}
            Self::Checklist { items } => reject_blank("items", items)?,
        }
        Ok(())
    }
}

fn reject_blank(field: &str, values: &[String]) -> std::result::Result<(), String> {
    match values.iter().position(|v| v.trim().is_empty()) {
        Some(index) => Err(format!("{field}[{index}] must not be blank")),
        None => Ok(()),
    }
}
