//! Bulk word-list import.
//!
//! Rows are validated in input order. Soft problems (blank rows, missing
//! required values, duplicates) skip the row and the batch continues. Hard
//! problems (oversized fields, malformed audio links, missing columns) abandon
//! the whole batch before anything is persisted.

use crate::error::{ImportError, PersistError};
use crate::scheduler::{ReviewScheduler, StepScheduler};
use crate::store::WordStore;
use crate::types::{normalize_column, CourseId, ImportedWord, RawRow, Word};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

/// Columns every word list must provide.
pub const REQUIRED_COLUMNS: [&str; 3] = ["word", "pinyin", "meaning"];

const MEANING_ALIASES: [&str; 2] = ["meaning", "definition"];

/// Import limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Rows per persisted chunk.
    pub batch_size: usize,
    /// Character limit for `word` and `pinyin`.
    pub max_field_length: usize,
    /// Largest accepted input, checked before parsing.
    pub max_file_size: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_field_length: 50,
            max_file_size: 10 * 1024 * 1024,
        }
    }
}

impl ImportOptions {
    /// Reject input larger than `max_file_size`.
    pub fn check_size(&self, size: usize) -> Result<(), ImportError> {
        if size > self.max_file_size {
            return Err(ImportError::FileTooLarge {
                size,
                limit: self.max_file_size,
            });
        }
        Ok(())
    }
}

/// Outcome of a successfully validated batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    /// Accepted words with their initial state, in input order.
    pub accepted: Vec<ImportedWord>,
    pub skipped_invalid: usize,
    pub skipped_duplicate: usize,
}

impl ImportResult {
    pub fn skipped(&self) -> usize {
        self.skipped_invalid + self.skipped_duplicate
    }

    /// Order-preserving chunks of whole word/state pairs.
    pub fn chunks(&self, batch_size: usize) -> std::slice::Chunks<'_, ImportedWord> {
        self.accepted.chunks(batch_size.max(1))
    }
}

/// Verify the row source exposes every required column.
pub fn check_headers<S: AsRef<str>>(headers: &[S]) -> Result<(), ImportError> {
    let present: HashSet<String> = headers
        .iter()
        .map(|h| normalize_column(h.as_ref()))
        .collect();

    for column in REQUIRED_COLUMNS {
        let found = if column == "meaning" {
            MEANING_ALIASES
                .iter()
                .any(|alias| present.contains(&normalize_column(alias)))
        } else {
            present.contains(column)
        };
        if !found {
            return Err(ImportError::MissingColumn { column });
        }
    }
    Ok(())
}

/// Trimmed values of one row that passed soft validation.
struct CleanRow {
    word: String,
    pinyin: String,
    meaning: String,
    example: Option<String>,
    audio_link: Option<String>,
}

/// Validates word lists and persists them in chunks.
pub struct Importer {
    options: ImportOptions,
    scheduler: Arc<dyn ReviewScheduler>,
}

impl Default for Importer {
    fn default() -> Self {
        Self::new(ImportOptions::default())
    }
}

impl Importer {
    pub fn new(options: ImportOptions) -> Self {
        Self {
            options,
            scheduler: Arc::new(StepScheduler::default()),
        }
    }

    /// Use `scheduler` for the initial state of accepted words.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn ReviewScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Validate and deduplicate `rows` for `course_id`.
    ///
    /// `existing_words` is seeded with the course's current words and grows
    /// with every accepted word, so duplicates inside the batch are caught too.
    /// Rows are numbered from 1 in error reports.
    pub fn import_batch(
        &self,
        course_id: CourseId,
        existing_words: &mut HashSet<String>,
        rows: &[RawRow],
    ) -> Result<ImportResult, ImportError> {
        let mut result = ImportResult::default();

        for (idx, raw) in rows.iter().enumerate() {
            let row = idx + 1;
            let Some(clean) = self.validate_row(row, raw)? else {
                result.skipped_invalid += 1;
                continue;
            };

            if existing_words.contains(&clean.word) {
                result.skipped_duplicate += 1;
                continue;
            }

            let word = Word::new(course_id, clean.word, clean.pinyin, clean.meaning)
                .with_example(clean.example)
                .with_audio_link(clean.audio_link);
            let state = self.scheduler.initial_state(word.id);
            existing_words.insert(word.text.clone());
            result.accepted.push(ImportedWord { word, state });
        }

        tracing::debug!(
            course_id = %course_id,
            accepted = result.accepted.len(),
            skipped_invalid = result.skipped_invalid,
            skipped_duplicate = result.skipped_duplicate,
            "validated import batch"
        );
        Ok(result)
    }

    /// Write accepted words in chunks of `batch_size`, one transaction each.
    pub fn persist<S: WordStore + ?Sized>(
        &self,
        store: &S,
        result: &ImportResult,
    ) -> Result<usize, PersistError> {
        let mut committed = 0;
        for (n, chunk) in result.chunks(self.options.batch_size).enumerate() {
            committed += store
                .create_words(chunk)
                .map_err(|source| PersistError { committed, source })?;
            tracing::debug!(chunk = n + 1, committed, "committed import chunk");
        }
        Ok(committed)
    }

    fn validate_row(&self, row: usize, raw: &RawRow) -> Result<Option<CleanRow>, ImportError> {
        if raw.populated_fields() < REQUIRED_COLUMNS.len() {
            return Ok(None);
        }

        let word = trimmed(raw.get("word"));
        let pinyin = trimmed(raw.get("pinyin"));
        let meaning = trimmed(MEANING_ALIASES.iter().find_map(|alias| raw.get(alias)));
        let (Some(word), Some(pinyin), Some(meaning)) = (word, pinyin, meaning) else {
            return Ok(None);
        };

        self.check_length(row, "word", &word)?;
        self.check_length(row, "pinyin", &pinyin)?;

        let audio_link = trimmed(raw.get("audioLink"));
        if let Some(link) = &audio_link {
            if Url::parse(link).is_err() {
                return Err(ImportError::InvalidAudioLink {
                    row,
                    value: link.clone(),
                });
            }
        }

        Ok(Some(CleanRow {
            word,
            pinyin,
            meaning,
            example: trimmed(raw.get("example")),
            audio_link,
        }))
    }

    fn check_length(&self, row: usize, field: &'static str, value: &str) -> Result<(), ImportError> {
        let length = value.chars().count();
        if length > self.options.max_field_length {
            return Err(ImportError::FieldTooLong {
                row,
                field,
                length,
                limit: self.options.max_field_length,
            });
        }
        Ok(())
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
