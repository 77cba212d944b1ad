//! Import service: course-exclusive, store-backed word-list import.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use vocab_core::{
    CourseId, ImportOptions, Importer, RawRow, ReviewScheduler, WordStore, WordWithState,
};

use crate::csv_source::read_csv;
use crate::error::{AppError, Result};

/// Summary of a committed import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub course_id: CourseId,
    pub imported: usize,
    pub skipped_invalid: usize,
    pub skipped_duplicate: usize,
    pub words: Vec<WordWithState>,
}

/// Runs imports against a store, one at a time per course.
pub struct ImportService {
    store: Arc<dyn WordStore>,
    importer: Importer,
    in_flight: Mutex<HashSet<CourseId>>,
}

impl ImportService {
    pub fn new(store: Arc<dyn WordStore>, options: ImportOptions) -> Self {
        Self {
            store,
            importer: Importer::new(options),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn ReviewScheduler>) -> Self {
        self.importer = self.importer.with_scheduler(scheduler);
        self
    }

    /// Parse a CSV word list and import it into `course_id`.
    ///
    /// Row-level rejections are reported against the file line the record
    /// starts on.
    pub fn import_csv(&self, course_id: CourseId, bytes: &[u8]) -> Result<ImportReport> {
        let parsed = read_csv(bytes, self.importer.options())?;
        self.import_rows(course_id, &parsed.rows)
            .map_err(|err| match err {
                AppError::Import(source) => match source.row().and_then(|row| parsed.line_of(row)) {
                    Some(line) => AppError::ImportAt { line, source },
                    None => AppError::Import(source),
                },
                other => other,
            })
    }

    /// Validate `rows` against the course's current words and persist the
    /// accepted ones in chunks.
    ///
    /// Nothing is written when validation fails. A storage failure after some
    /// chunks were committed is reported as [`AppError::PartialCommit`];
    /// re-running the same import then only adds the remaining words.
    pub fn import_rows(&self, course_id: CourseId, rows: &[RawRow]) -> Result<ImportReport> {
        let _slot = CourseSlot::acquire(&self.in_flight, course_id)?;

        let mut existing = self.store.course_word_texts(course_id)?;
        tracing::info!(
            course_id = %course_id,
            rows = rows.len(),
            existing = existing.len(),
            "Starting import"
        );

        let result = self
            .importer
            .import_batch(course_id, &mut existing, rows)
            .map_err(|err| {
                tracing::warn!(course_id = %course_id, error = %err, "Import rejected");
                err
            })?;

        let imported = self
            .importer
            .persist(self.store.as_ref(), &result)
            .map_err(|err| {
                tracing::error!(
                    course_id = %course_id,
                    committed = err.committed,
                    error = %err.source,
                    "Import stopped by storage failure"
                );
                err
            })?;

        tracing::info!(
            course_id = %course_id,
            imported,
            skipped = result.skipped(),
            "Import finished"
        );

        Ok(ImportReport {
            course_id,
            imported,
            skipped_invalid: result.skipped_invalid,
            skipped_duplicate: result.skipped_duplicate,
            words: result.accepted,
        })
    }
}

/// Marks a course as having an import in flight until dropped.
struct CourseSlot<'a> {
    in_flight: &'a Mutex<HashSet<CourseId>>,
    course_id: CourseId,
}

impl<'a> CourseSlot<'a> {
    fn acquire(in_flight: &'a Mutex<HashSet<CourseId>>, course_id: CourseId) -> Result<Self> {
        let mut courses = in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !courses.insert(course_id) {
            return Err(AppError::ImportInProgress(course_id));
        }
        Ok(Self {
            in_flight,
            course_id,
        })
    }
}

impl Drop for CourseSlot<'_> {
    fn drop(&mut self) {
        let mut courses = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        courses.remove(&self.course_id);
    }
}
