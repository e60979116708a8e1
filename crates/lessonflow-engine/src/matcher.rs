//! Context matching: which content entry narratively introduces an exercise.
//!
//! Matching is a pluggable [`ContextStrategy`]. The default
//! [`KeywordContextMatcher`] walks a ranked list of topic keyword groups;
//! the first group whose keywords appear in the exercise title decides the
//! topic, and the first content entry (in order-key order) mentioning any
//! keyword of that group is the context. Later groups are never consulted
//! once one matched the title, so results are deterministic.

use serde::{Deserialize, Serialize};

use crate::model::{ContentEntry, EntryId, OrderKey};

/// Outcome of looking up an exercise's introducing content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ContextMatch {
    /// A content entry introduces the exercise.
    Matched {
        /// Matched content entry id.
        content_id: EntryId,
        /// Matched content entry title.
        title: String,
        /// Matched content entry order key.
        order_key: OrderKey,
        /// Name of the keyword group that decided the topic.
        group: String,
    },
    /// No topic group matched the title, or no content mentions the topic.
    NoMatch,
}

impl ContextMatch {
    /// Returns `true` if no introducing content was found.
    #[must_use]
    pub const fn is_no_match(&self) -> bool {
        matches!(self, Self::NoMatch)
    }
}

/// Strategy mapping an exercise to its introducing content.
pub trait ContextStrategy: Send + Sync {
    /// Finds the content entry introducing an exercise with this title.
    ///
    /// `content` holds the lesson's content rows; implementations must not
    /// depend on its order.
    fn find_context(&self, exercise_title: &str, content: &[ContentEntry]) -> ContextMatch;
}

/// A named set of topic keywords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordGroup {
    /// Topic name reported in matches.
    pub name: String,
    /// Lower-case keywords; any one of them identifies the topic.
    pub keywords: Vec<String>,
}

impl KeywordGroup {
    /// Creates a group, lower-casing the keywords.
    #[must_use]
    pub fn new(name: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    /// Returns `true` if any keyword occurs in the already lower-cased text.
    fn mentioned_in(&self, lowered: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| lowered.contains(keyword.to_lowercase().as_str()))
    }

    /// Returns `true` if the entry's title or body mentions the topic.
    fn introduced_by(&self, entry: &ContentEntry) -> bool {
        self.mentioned_in(&entry.title.to_lowercase()) || self.mentioned_in(&entry.body.to_lowercase())
    }
}

/// The built-in ranked topic groups.
#[must_use]
pub fn default_keyword_groups() -> Vec<KeywordGroup> {
    vec![
        KeywordGroup::new("email", &["email"]),
        KeywordGroup::new("grant", &["grant", "proposal"]),
        KeywordGroup::new("meeting", &["meeting", "board"]),
        KeywordGroup::new("research", &["research"]),
    ]
}

/// Keyword-group implementation of [`ContextStrategy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordContextMatcher {
    groups: Vec<KeywordGroup>,
}

impl Default for KeywordContextMatcher {
    fn default() -> Self {
        Self::new(default_keyword_groups())
    }
}

impl KeywordContextMatcher {
    /// Creates a matcher trying `groups` in the given priority order.
    #[must_use]
    pub const fn new(groups: Vec<KeywordGroup>) -> Self {
        Self { groups }
    }

    /// Returns the groups in priority order.
    #[must_use]
    pub fn groups(&self) -> &[KeywordGroup] {
        &self.groups
    }

    /// Returns the first group whose keywords appear in the title.
    #[must_use]
    pub fn topic_of(&self, exercise_title: &str) -> Option<&KeywordGroup> {
        let lowered = exercise_title.to_lowercase();
        self.groups.iter().find(|group| group.mentioned_in(&lowered))
    }
}

impl ContextStrategy for KeywordContextMatcher {
    fn find_context(&self, exercise_title: &str, content: &[ContentEntry]) -> ContextMatch {
        let Some(group) = self.topic_of(exercise_title) else {
            tracing::debug!(exercise = exercise_title, "No topic group matches exercise title");
            return ContextMatch::NoMatch;
        };

        let mut ordered: Vec<&ContentEntry> = content.iter().collect();
        ordered.sort_by_key(|entry| (entry.order_key, entry.id));

        ordered
            .into_iter()
            .find(|entry| group.introduced_by(entry))
            .map_or(ContextMatch::NoMatch, |entry| {
                tracing::debug!(
                    exercise = exercise_title,
                    group = %group.name,
                    content = %entry.title,
                    "Context matched"
                );
                ContextMatch::Matched {
                    content_id: entry.id,
                    title: entry.title.clone(),
                    order_key: entry.order_key,
                    group: group.name.clone(),
                }
            })
    }
}
