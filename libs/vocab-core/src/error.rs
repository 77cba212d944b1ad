//! Error types for vocab-core.

use thiserror::Error;

use crate::types::{CourseId, WordId};

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Hard import failures. Any of these abandons the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("missing required column '{column}'")]
    MissingColumn { column: &'static str },

    #[error("file is {size} bytes, limit is {limit} bytes")]
    FileTooLarge { size: usize, limit: usize },

    #[error("row {row}: {field} is {length} characters, limit is {limit}")]
    FieldTooLong {
        row: usize,
        field: &'static str,
        length: usize,
        limit: usize,
    },

    #[error("row {row}: invalid audio link '{value}'")]
    InvalidAudioLink { row: usize, value: String },

    #[error("row {row}: malformed record: {message}")]
    Malformed { row: usize, message: String },
}

impl ImportError {
    /// Row number (1-indexed, header excluded) the error refers to, if any.
    pub fn row(&self) -> Option<usize> {
        match self {
            Self::FieldTooLong { row, .. }
            | Self::InvalidAudioLink { row, .. }
            | Self::Malformed { row, .. } => Some(*row),
            Self::MissingColumn { .. } | Self::FileTooLarge { .. } => None,
        }
    }
}

/// Storage failures surfaced by a [`crate::store::WordStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("transaction conflict: {0}")]
    Conflict(String),

    #[error("word not found: {0}")]
    WordNotFound(WordId),

    #[error("word '{text}' already exists in course {course_id}")]
    DuplicateWord { course_id: CourseId, text: String },
}

/// Chunked persistence stopped part-way through.
///
/// `committed` words are already durable; re-running the import re-reads the
/// course's words and skips them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("storage failure after {committed} words were committed: {source}")]
pub struct PersistError {
    pub committed: usize,
    #[source]
    pub source: StoreError,
}

impl StoreError {
    /// Transient failures that may succeed when the operation is re-applied.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn row_is_reported_for_row_level_errors() {
        let err = ImportError::FieldTooLong {
            row: 4,
            field: "word",
            length: 51,
            limit: 50,
        };
        assert_eq!(err.row(), Some(4));
        assert_eq!(err.to_string(), "row 4: word is 51 characters, limit is 50");

        let err = ImportError::MissingColumn { column: "meaning" };
        assert_eq!(err.row(), None);
    }

    #[test]
    fn only_transient_store_errors_are_retryable() {
        assert!(StoreError::Conflict("busy".into()).is_retryable());
        assert!(StoreError::Backend("io".into()).is_retryable());
        assert!(!StoreError::WordNotFound(Uuid::nil()).is_retryable());
    }
}
