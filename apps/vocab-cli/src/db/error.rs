//! Database error types.

use rusqlite::ErrorCode;
use thiserror::Error;
use vocab_core::{CourseId, StoreError, WordId};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("word not found: {0}")]
    WordNotFound(WordId),

    #[error("word '{text}' already exists in course {course_id}")]
    DuplicateWord { course_id: CourseId, text: String },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("connection lock poisoned")]
    Poisoned,
}

impl DbError {
    fn is_busy(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => {
                matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
            }
            _ => false,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        if err.is_busy() {
            return StoreError::Conflict(err.to_string());
        }
        match err {
            DbError::WordNotFound(id) => StoreError::WordNotFound(id),
            DbError::DuplicateWord { course_id, text } => {
                StoreError::DuplicateWord { course_id, text }
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}
