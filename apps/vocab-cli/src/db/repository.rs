//! SQLite implementation of the word store.

use crate::db::error::DbError;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use vocab_core::{
    CourseId, CourseStats, ImportedWord, LearningState, Page, ReviewFilter, StoreError,
    StoreResult, Word, WordId, WordStore, WordWithState,
};

type Result<T> = std::result::Result<T, DbError>;

const SELECT_WORD_WITH_STATE: &str = "SELECT w.id, w.course_id, w.text, w.pinyin, w.definition, w.example, w.audio_link,
        s.word_id, s.error_count, s.consecutive_correct, s.last_reviewed, s.next_review, s.is_difficult
    FROM words w
    JOIN learning_states s ON s.word_id = w.id";

/// SQLite-backed [`WordStore`].
///
/// The connection sits behind a mutex; state updates additionally run in
/// `BEGIN IMMEDIATE` transactions so other processes sharing the file cannot
/// interleave a read-modify-write.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open database at path, creating if necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::initialize(conn)
    }

    /// Open in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        conn.execute_batch(super::schema::SCHEMA)?;
        conn.execute(
            super::schema::INIT_SCHEMA_VERSION,
            params![super::schema::SCHEMA_VERSION],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    /// Highest schema version recorded in the database.
    pub fn schema_version(&self) -> Result<i32> {
        let version = self.lock()?.query_row(
            "SELECT MAX(version) FROM schema_version",
            [],
            |row| row.get(0),
        )?;
        Ok(version)
    }

    /// Number of stored words.
    pub fn word_count(&self) -> Result<usize> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM words", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn insert_pair(conn: &Connection, word: &Word, state: &LearningState) -> Result<()> {
        if word.id != state.word_id {
            return Err(DbError::InvalidData(format!(
                "learning state for {} attached to word {}",
                state.word_id, word.id
            )));
        }

        conn.execute(
            "INSERT INTO words (id, course_id, text, pinyin, definition, example, audio_link)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                word.id,
                word.course_id,
                word.text,
                word.pinyin,
                word.definition,
                word.example,
                word.audio_link
            ],
        )
        .map_err(|err| match err {
            rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
                DbError::DuplicateWord {
                    course_id: word.course_id,
                    text: word.text.clone(),
                }
            }
            other => other.into(),
        })?;

        conn.execute(
            "INSERT INTO learning_states (word_id, error_count, consecutive_correct, last_reviewed, next_review, is_difficult)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                state.word_id,
                state.error_count,
                state.consecutive_correct,
                to_micros(state.last_reviewed),
                to_micros(state.next_review),
                state.is_difficult
            ],
        )?;
        Ok(())
    }

    fn write_state(conn: &Connection, state: &LearningState) -> Result<()> {
        let updated = conn.execute(
            "UPDATE learning_states
             SET error_count = ?2, consecutive_correct = ?3, last_reviewed = ?4, next_review = ?5, is_difficult = ?6
             WHERE word_id = ?1",
            params![
                state.word_id,
                state.error_count,
                state.consecutive_correct,
                to_micros(state.last_reviewed),
                to_micros(state.next_review),
                state.is_difficult
            ],
        )?;
        if updated == 0 {
            return Err(DbError::WordNotFound(state.word_id));
        }
        Ok(())
    }

    fn read_state(conn: &Connection, word_id: WordId) -> Result<Option<LearningState>> {
        conn.query_row(
            "SELECT word_id, error_count, consecutive_correct, last_reviewed, next_review, is_difficult
             FROM learning_states WHERE word_id = ?1",
            params![word_id],
            |row| Self::row_to_state(row, 0),
        )
        .optional()
        .map_err(Into::into)
    }

    fn create_pair(&self, word: &Word, state: &LearningState) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::insert_pair(&tx, word, state)?;
        tx.commit()?;
        Ok(())
    }

    fn create_pairs(&self, words: &[ImportedWord]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for pair in words {
            Self::insert_pair(&tx, &pair.word, &pair.state)?;
        }
        tx.commit()?;
        Ok(words.len())
    }

    fn modify_state(
        &self,
        word_id: WordId,
        update: &dyn Fn(&LearningState) -> LearningState,
    ) -> Result<LearningState> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = Self::read_state(&tx, word_id)?.ok_or(DbError::WordNotFound(word_id))?;
        let next = update(&current);
        if next.word_id != word_id {
            return Err(DbError::InvalidData(format!(
                "update for {} returned state for {}",
                word_id, next.word_id
            )));
        }
        Self::write_state(&tx, &next)?;
        tx.commit()?;
        Ok(next)
    }

    fn fetch_word(&self, id: WordId) -> Result<Option<Word>> {
        self.lock()?
            .query_row(
                "SELECT id, course_id, text, pinyin, definition, example, audio_link FROM words WHERE id = ?1",
                params![id],
                Self::row_to_word,
            )
            .optional()
            .map_err(Into::into)
    }

    fn fetch_course_texts(&self, course_id: CourseId) -> Result<HashSet<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT text FROM words WHERE course_id = ?1")?;
        let texts = stmt
            .query_map(params![course_id], |row| row.get(0))?
            .collect::<std::result::Result<HashSet<String>, _>>()?;
        Ok(texts)
    }

    fn fetch_matching(&self, filter: ReviewFilter, page: Page) -> Result<Vec<WordWithState>> {
        let conn = self.lock()?;
        let limit = sql_count(page.limit);
        let offset = sql_count(page.offset);

        let rows = match filter {
            ReviewFilter::Difficult => {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_WORD_WITH_STATE}
                     WHERE s.is_difficult = 1
                     ORDER BY w.id
                     LIMIT ?1 OFFSET ?2"
                ))?;
                let rows = stmt
                    .query_map(params![limit, offset], Self::row_to_word_with_state)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            ReviewFilter::Unseen => {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_WORD_WITH_STATE}
                     WHERE s.last_reviewed IS NULL
                     ORDER BY w.id
                     LIMIT ?1 OFFSET ?2"
                ))?;
                let rows = stmt
                    .query_map(params![limit, offset], Self::row_to_word_with_state)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            ReviewFilter::Due { now } => {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_WORD_WITH_STATE}
                     WHERE s.next_review IS NOT NULL AND s.next_review <= ?1
                     ORDER BY w.id
                     LIMIT ?2 OFFSET ?3"
                ))?;
                let rows = stmt
                    .query_map(
                        params![now.timestamp_micros(), limit, offset],
                        Self::row_to_word_with_state,
                    )?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };

        Ok(rows)
    }

    fn fetch_course_words(&self, course_id: CourseId, page: Page) -> Result<Vec<WordWithState>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_WORD_WITH_STATE}
             WHERE w.course_id = ?1
             ORDER BY w.id
             LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
            .query_map(
                params![course_id, sql_count(page.limit), sql_count(page.offset)],
                Self::row_to_word_with_state,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn fetch_course_stats(&self, course_id: CourseId, now: DateTime<Utc>) -> Result<CourseStats> {
        let (total, learned, difficult, due) = self.lock()?.query_row(
            "SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN s.last_reviewed IS NOT NULL THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN s.is_difficult = 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN s.next_review IS NOT NULL AND s.next_review <= ?2 THEN 1 ELSE 0 END), 0)
             FROM words w
             JOIN learning_states s ON s.word_id = w.id
             WHERE w.course_id = ?1",
            params![course_id, now.timestamp_micros()],
            |row| {
                Ok((
                    row.get::<_, usize>(0)?,
                    row.get::<_, usize>(1)?,
                    row.get::<_, usize>(2)?,
                    row.get::<_, usize>(3)?,
                ))
            },
        )?;

        Ok(CourseStats {
            course_id,
            total_words: total,
            learned_words: learned,
            difficult_words: difficult,
            due_words: due,
        })
    }

    fn row_to_word(row: &rusqlite::Row) -> rusqlite::Result<Word> {
        Ok(Word {
            id: row.get(0)?,
            course_id: row.get(1)?,
            text: row.get(2)?,
            pinyin: row.get(3)?,
            definition: row.get(4)?,
            example: row.get(5)?,
            audio_link: row.get(6)?,
        })
    }

    fn row_to_state(row: &rusqlite::Row, start: usize) -> rusqlite::Result<LearningState> {
        Ok(LearningState {
            word_id: row.get(start)?,
            error_count: row.get(start + 1)?,
            consecutive_correct: row.get(start + 2)?,
            last_reviewed: from_micros(start + 3, row.get(start + 3)?)?,
            next_review: from_micros(start + 4, row.get(start + 4)?)?,
            is_difficult: row.get(start + 5)?,
        })
    }

    fn row_to_word_with_state(row: &rusqlite::Row) -> rusqlite::Result<WordWithState> {
        Ok(WordWithState {
            word: Self::row_to_word(row)?,
            state: Self::row_to_state(row, 7)?,
        })
    }
}

fn sql_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn to_micros(ts: Option<DateTime<Utc>>) -> Option<i64> {
    ts.map(|t| t.timestamp_micros())
}

fn from_micros(idx: usize, value: Option<i64>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value
        .map(|micros| {
            DateTime::from_timestamp_micros(micros).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    Type::Integer,
                    format!("timestamp out of range: {micros}").into(),
                )
            })
        })
        .transpose()
}

impl WordStore for SqliteStore {
    fn get_word(&self, id: WordId) -> StoreResult<Option<Word>> {
        Ok(self.fetch_word(id)?)
    }

    fn get_learning_state(&self, word_id: WordId) -> StoreResult<Option<LearningState>> {
        let conn = self.lock()?;
        Ok(Self::read_state(&conn, word_id)?)
    }

    fn create_word(&self, word: &Word, state: &LearningState) -> StoreResult<()> {
        Ok(self.create_pair(word, state)?)
    }

    fn create_words(&self, words: &[ImportedWord]) -> StoreResult<usize> {
        Ok(self.create_pairs(words)?)
    }

    fn update_learning_state(&self, state: &LearningState) -> StoreResult<()> {
        let conn = self.lock()?;
        Ok(Self::write_state(&conn, state)?)
    }

    fn update_learning_state_with(
        &self,
        word_id: WordId,
        update: &dyn Fn(&LearningState) -> LearningState,
    ) -> StoreResult<LearningState> {
        Ok(self.modify_state(word_id, update)?)
    }

    fn course_word_texts(&self, course_id: CourseId) -> StoreResult<HashSet<String>> {
        Ok(self.fetch_course_texts(course_id)?)
    }

    fn query_words(&self, filter: ReviewFilter, page: Page) -> StoreResult<Vec<WordWithState>> {
        self.fetch_matching(filter, page).map_err(StoreError::from)
    }

    fn course_words(&self, course_id: CourseId, page: Page) -> StoreResult<Vec<WordWithState>> {
        Ok(self.fetch_course_words(course_id, page)?)
    }

    fn course_stats(&self, course_id: CourseId, now: DateTime<Utc>) -> StoreResult<CourseStats> {
        Ok(self.fetch_course_stats(course_id, now)?)
    }
}
