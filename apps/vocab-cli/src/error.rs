//! Error handling for the vocab services and CLI

use thiserror::Error;
use vocab_core::{CourseId, ImportError, PersistError, StoreError};

use crate::db::DbError;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Import rejected: {0}")]
    Import(#[from] ImportError),

    #[error("Import rejected at line {line}: {source}")]
    ImportAt {
        line: u64,
        #[source]
        source: ImportError,
    },

    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),

    #[error("Storage failure after {committed} words were committed: {source}")]
    PartialCommit {
        committed: usize,
        #[source]
        source: StoreError,
    },

    #[error("Import already running for course {0}")]
    ImportInProgress(CourseId),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PersistError> for AppError {
    fn from(err: PersistError) -> Self {
        if err.committed == 0 {
            return Self::Store(err.source);
        }
        Self::PartialCommit {
            committed: err.committed,
            source: err.source,
        }
    }
}

impl AppError {
    /// Store failures that can be retried as-is.
    ///
    /// Partial imports are excluded: a retry must re-run the whole import so
    /// that already committed words are deduplicated against the store.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_retryable())
    }
}

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_persist_error_without_commits_is_plain_store_error() {
        let error = AppError::from(PersistError {
            committed: 0,
            source: StoreError::Conflict("busy".to_string()),
        });
        assert!(matches!(error, AppError::Store(_)));
        assert!(error.is_retryable());
    }

    #[test]
    fn test_partial_commit_not_retryable() {
        let error = AppError::from(PersistError {
            committed: 1000,
            source: StoreError::Conflict("busy".to_string()),
        });
        assert!(matches!(error, AppError::PartialCommit { committed: 1000, .. }));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_error_display_import() {
        let error = AppError::from(ImportError::MissingColumn { column: "pinyin" });
        assert_eq!(
            error.to_string(),
            "Import rejected: missing required column 'pinyin'"
        );
    }

    #[test]
    fn test_error_display_import_at_line() {
        let error = AppError::ImportAt {
            line: 7,
            source: ImportError::InvalidAudioLink {
                row: 5,
                value: "nope".to_string(),
            },
        };
        assert!(error.to_string().starts_with("Import rejected at line 7: "));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_error_display_in_progress() {
        let id = Uuid::nil();
        let error = AppError::ImportInProgress(id);
        assert_eq!(
            error.to_string(),
            format!("Import already running for course {id}")
        );
    }

    #[test]
    fn test_error_display_not_found() {
        let error = AppError::NotFound("word 123".to_string());
        assert_eq!(error.to_string(), "Not found: word 123");
    }
}
