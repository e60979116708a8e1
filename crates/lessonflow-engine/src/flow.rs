//! Composition of a lesson's two record streams into one timeline.

use serde::{Deserialize, Serialize};

use crate::model::{ContentEntry, EntryId, ExerciseEntry, ExerciseKind, OrderKey};

/// One position in a composed lesson timeline.
///
/// Produced transiently by [`compose`]; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum FlowItem {
    /// A narrative content entry.
    Content {
        /// Entry id.
        id: EntryId,
        /// Order key at composition time.
        order_key: OrderKey,
        /// Entry title.
        title: String,
    },
    /// An interactive exercise.
    Exercise {
        /// Entry id.
        id: EntryId,
        /// Order key at composition time.
        order_key: OrderKey,
        /// Entry title.
        title: String,
        /// Kind of interactive component.
        exercise_kind: ExerciseKind,
    },
}

impl FlowItem {
    /// Returns the id of the underlying entry.
    #[must_use]
    pub const fn id(&self) -> EntryId {
        match self {
            Self::Content { id, .. } | Self::Exercise { id, .. } => *id,
        }
    }

    /// Returns the order key of the underlying entry.
    #[must_use]
    pub const fn order_key(&self) -> OrderKey {
        match self {
            Self::Content { order_key, .. } | Self::Exercise { order_key, .. } => *order_key,
        }
    }

    /// Returns the title of the underlying entry.
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Content { title, .. } | Self::Exercise { title, .. } => title,
        }
    }

    /// Returns `true` for exercise items.
    #[must_use]
    pub const fn is_exercise(&self) -> bool {
        matches!(self, Self::Exercise { .. })
    }

    /// Returns `true` for content items.
    #[must_use]
    pub const fn is_content(&self) -> bool {
        matches!(self, Self::Content { .. })
    }

    /// Tie-break rank: content sorts before exercises at equal keys.
    const fn stream_rank(&self) -> u8 {
        match self {
            Self::Content { .. } => 0,
            Self::Exercise { .. } => 1,
        }
    }
}

impl From<&ContentEntry> for FlowItem {
    fn from(entry: &ContentEntry) -> Self {
        Self::Content {
            id: entry.id,
            order_key: entry.order_key,
            title: entry.title.clone(),
        }
    }
}

impl From<&ExerciseEntry> for FlowItem {
    fn from(entry: &ExerciseEntry) -> Self {
        Self::Exercise {
            id: entry.id,
            order_key: entry.order_key,
            title: entry.title.clone(),
            exercise_kind: entry.kind(),
        }
    }
}

/// Merges content and exercise rows into one timeline.
///
/// Items are sorted by order key ascending. At equal keys content precedes
/// exercises, and within a stream the input order is kept (the sort is
/// stable). Callers normally pass active rows only.
#[must_use]
pub fn compose(content: &[ContentEntry], exercises: &[ExerciseEntry]) -> Vec<FlowItem> {
    let mut flow: Vec<FlowItem> = content
        .iter()
        .map(FlowItem::from)
        .chain(exercises.iter().map(FlowItem::from))
        .collect();
    flow.sort_by_key(|item| (item.order_key(), item.stream_rank()));
    flow
}
