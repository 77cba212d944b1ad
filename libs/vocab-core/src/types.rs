//! Core types for vocabulary review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a word.
pub type WordId = Uuid;

/// Identifier of the course owning a word.
pub type CourseId = Uuid;

/// A vocabulary item owned by exactly one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub id: WordId,
    pub course_id: CourseId,
    pub text: String,
    pub pinyin: String,
    pub definition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_link: Option<String>,
}

impl Word {
    /// Create a word with a freshly generated id.
    pub fn new(
        course_id: CourseId,
        text: impl Into<String>,
        pinyin: impl Into<String>,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_id,
            text: text.into(),
            pinyin: pinyin.into(),
            definition: definition.into(),
            example: None,
            audio_link: None,
        }
    }

    pub fn with_example(mut self, example: Option<String>) -> Self {
        self.example = example;
        self
    }

    pub fn with_audio_link(mut self, audio_link: Option<String>) -> Self {
        self.audio_link = audio_link;
        self
    }
}

/// Mastery record attached to one word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningState {
    pub word_id: WordId,
    pub error_count: u32,
    pub consecutive_correct: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_review: Option<DateTime<Utc>>,
    pub is_difficult: bool,
}

impl LearningState {
    /// Zero-valued state for a word that has never been reviewed.
    pub fn new(word_id: WordId) -> Self {
        Self {
            word_id,
            error_count: 0,
            consecutive_correct: 0,
            last_reviewed: None,
            next_review: None,
            is_difficult: false,
        }
    }

    /// Manual override used by "mark as difficult" actions.
    ///
    /// Not part of answer scheduling; the flag is still cleared by a later
    /// correct streak.
    pub fn mark_difficult(mut self, difficult: bool) -> Self {
        self.is_difficult = difficult;
        self
    }

    /// Whether the word has ever been answered.
    pub fn is_unseen(&self) -> bool {
        self.last_reviewed.is_none()
    }
}

/// A word together with its learning state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordWithState {
    pub word: Word,
    pub state: LearningState,
}

/// Word paired with its initial learning state, ready to be persisted.
pub type ImportedWord = WordWithState;

/// Untyped record from a word list (one CSV line, one spreadsheet row, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow {
    fields: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and adapters.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.push((column.into(), value.into()));
    }

    /// Value of the first column whose normalized name matches `column`.
    pub fn get(&self, column: &str) -> Option<&str> {
        let wanted = normalize_column(column);
        self.fields
            .iter()
            .find(|(name, _)| normalize_column(name) == wanted)
            .map(|(_, value)| value.as_str())
    }

    /// Number of fields holding something other than whitespace.
    pub fn populated_fields(&self) -> usize {
        self.fields
            .iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.populated_fields() == 0
    }
}

/// Column names compare case-insensitively, ignoring `_`, `-`, spaces and a
/// leading byte-order mark.
pub fn normalize_column(name: &str) -> String {
    name.trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Progress counts for one course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseStats {
    pub course_id: CourseId,
    pub total_words: usize,
    /// Words answered at least once.
    pub learned_words: usize,
    pub difficult_words: usize,
    pub due_words: usize,
}

impl CourseStats {
    pub fn new(course_id: CourseId) -> Self {
        Self {
            course_id,
            total_words: 0,
            learned_words: 0,
            difficult_words: 0,
            due_words: 0,
        }
    }

    /// Share of learned words, in whole percent.
    pub fn progress(&self) -> u8 {
        if self.total_words == 0 {
            return 0;
        }
        (self.learned_words * 100 / self.total_words) as u8
    }
}

/// Offset/limit pagination for store queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_lookup_ignores_case_and_separators() {
        let row = RawRow::new()
            .with("\u{feff}Word", "你好")
            .with("audio_link", "https://example.com/a.mp3");
        assert_eq!(row.get("word"), Some("你好"));
        assert_eq!(row.get("audioLink"), Some("https://example.com/a.mp3"));
        assert_eq!(row.get("pinyin"), None);
    }

    #[test]
    fn populated_fields_skips_blank_values() {
        let row = RawRow::new()
            .with("word", "好")
            .with("pinyin", "   ")
            .with("meaning", "good");
        assert_eq!(row.populated_fields(), 2);
        assert!(!row.is_empty());
        assert!(RawRow::new().with("word", "").is_empty());
    }

    #[test]
    fn mark_difficult_only_touches_flag() {
        let state = LearningState::new(Uuid::new_v4());
        let marked = state.clone().mark_difficult(true);
        assert!(marked.is_difficult);
        assert_eq!(marked.error_count, state.error_count);
        assert!(marked.is_unseen());
    }

    #[test]
    fn progress_rounds_down() {
        let mut stats = CourseStats::new(Uuid::new_v4());
        assert_eq!(stats.progress(), 0);

        stats.total_words = 3;
        stats.learned_words = 2;
        assert_eq!(stats.progress(), 66);

        stats.learned_words = 3;
        assert_eq!(stats.progress(), 100);
    }
}
