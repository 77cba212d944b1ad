//! Shared setup for integration tests.
//!
//! Every test gets its own in-memory SQLite store, a fixed clock and the
//! services wired on top of them.

#![allow(dead_code)]

pub mod fixtures;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use vocab_cli::db::SqliteStore;
use vocab_cli::services::{ImportService, StudyService};
use vocab_core::{
    CourseId, CourseStats, FixedClock, ImportOptions, ImportedWord, LearningState, Page,
    ReviewFilter, StoreError, StoreResult, Word, WordId, WordStore, WordWithState,
};

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub struct TestContext {
    pub store: Arc<SqliteStore>,
    pub clock: Arc<FixedClock>,
    pub import: ImportService,
    pub study: StudyService,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_options(ImportOptions::default())
    }

    pub fn with_options(options: ImportOptions) -> Self {
        let store =
            Arc::new(SqliteStore::open_in_memory().expect("Failed to open in-memory database"));
        let clock = Arc::new(FixedClock::new(start_time()));
        let import = ImportService::new(store.clone(), options);
        let study = StudyService::new(store.clone(), clock.clone()).with_answer_retries(2);
        Self {
            store,
            clock,
            import,
            study,
        }
    }

    pub fn word_count(&self) -> usize {
        self.store.word_count().expect("Failed to count words")
    }

    pub fn course_texts(&self, course_id: CourseId) -> HashSet<String> {
        self.store
            .course_word_texts(course_id)
            .expect("Failed to read course words")
    }
}

/// Delegates to an inner store, optionally failing or pausing batch writes.
pub struct HookedStore<S> {
    pub inner: Arc<S>,
    /// `create_words` call (0-based) that fails with a backend error.
    fail_batch: Option<usize>,
    batches: AtomicUsize,
    gate: Option<Gate>,
}

/// Pauses the first `create_words` call until released.
struct Gate {
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl<S: WordStore> HookedStore<S> {
    /// Pass-through store that only counts batch writes.
    pub fn counting(inner: Arc<S>) -> Self {
        Self {
            inner,
            fail_batch: None,
            batches: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Number of `create_words` calls so far.
    pub fn batch_calls(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn failing_batch(inner: Arc<S>, batch: usize) -> Self {
        Self {
            inner,
            fail_batch: Some(batch),
            batches: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Returns the store plus channels: the first receives a message when a
    /// batch write starts, the second lets it continue.
    pub fn gated(inner: Arc<S>) -> (Self, Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let store = Self {
            inner,
            fail_batch: None,
            batches: AtomicUsize::new(0),
            gate: Some(Gate {
                entered: Mutex::new(entered_tx),
                release: Mutex::new(release_rx),
            }),
        };
        (store, entered_rx, release_tx)
    }
}

impl<S: WordStore> WordStore for HookedStore<S> {
    fn get_word(&self, id: WordId) -> StoreResult<Option<Word>> {
        self.inner.get_word(id)
    }

    fn get_learning_state(&self, word_id: WordId) -> StoreResult<Option<LearningState>> {
        self.inner.get_learning_state(word_id)
    }

    fn create_word(&self, word: &Word, state: &LearningState) -> StoreResult<()> {
        self.inner.create_word(word, state)
    }

    fn create_words(&self, words: &[ImportedWord]) -> StoreResult<usize> {
        let call = self.batches.fetch_add(1, Ordering::SeqCst);
        if self.fail_batch == Some(call) {
            return Err(StoreError::Backend("disk I/O error".to_string()));
        }
        if let (0, Some(gate)) = (call, &self.gate) {
            gate.entered.lock().unwrap().send(()).unwrap();
            gate.release.lock().unwrap().recv().unwrap();
        }
        self.inner.create_words(words)
    }

    fn update_learning_state(&self, state: &LearningState) -> StoreResult<()> {
        self.inner.update_learning_state(state)
    }

    fn update_learning_state_with(
        &self,
        word_id: WordId,
        update: &dyn Fn(&LearningState) -> LearningState,
    ) -> StoreResult<LearningState> {
        self.inner.update_learning_state_with(word_id, update)
    }

    fn course_word_texts(&self, course_id: CourseId) -> StoreResult<HashSet<String>> {
        self.inner.course_word_texts(course_id)
    }

    fn query_words(&self, filter: ReviewFilter, page: Page) -> StoreResult<Vec<WordWithState>> {
        self.inner.query_words(filter, page)
    }

    fn course_words(&self, course_id: CourseId, page: Page) -> StoreResult<Vec<WordWithState>> {
        self.inner.course_words(course_id, page)
    }

    fn course_stats(&self, course_id: CourseId, now: DateTime<Utc>) -> StoreResult<CourseStats> {
        self.inner.course_stats(course_id, now)
    }
}
