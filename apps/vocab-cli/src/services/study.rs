//! Study service: answer recording and review queues.

use std::sync::Arc;

use vocab_core::{
    Clock, CourseId, CourseStats, LearningState, Page, ReviewFilter, ReviewScheduler,
    StepScheduler, StoreError, Word, WordId, WordStore, WordWithState,
};

use crate::error::{AppError, Result};

pub struct StudyService {
    store: Arc<dyn WordStore>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn ReviewScheduler>,
    answer_retries: u32,
}

impl StudyService {
    pub fn new(store: Arc<dyn WordStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            scheduler: Arc::new(StepScheduler::default()),
            answer_retries: 0,
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn ReviewScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_answer_retries(mut self, retries: u32) -> Self {
        self.answer_retries = retries;
        self
    }

    /// Create a single word together with its initial learning state.
    pub fn add_word(&self, word: Word) -> Result<WordWithState> {
        let state = self.scheduler.initial_state(word.id);
        self.store.create_word(&word, &state)?;
        tracing::info!(word_id = %word.id, course_id = %word.course_id, "Added word");
        Ok(WordWithState { word, state })
    }

    /// Apply one answer event to a word's learning state.
    ///
    /// Transient store failures are retried with a fresh timestamp; the
    /// scheduler is re-run against the stored state on every attempt.
    pub fn record_answer(&self, word_id: WordId, correct: bool) -> Result<LearningState> {
        let mut attempt = 0;
        loop {
            let now = self.clock.now();
            let update =
                |state: &LearningState| self.scheduler.record_answer(state, correct, now);

            match self.store.update_learning_state_with(word_id, &update) {
                Ok(state) => {
                    tracing::debug!(
                        word_id = %word_id,
                        correct,
                        streak = state.consecutive_correct,
                        errors = state.error_count,
                        "Recorded answer"
                    );
                    return Ok(state);
                }
                Err(StoreError::WordNotFound(id)) => {
                    return Err(AppError::NotFound(format!("word {id}")));
                }
                Err(err) if err.is_retryable() && attempt < self.answer_retries => {
                    attempt += 1;
                    tracing::warn!(word_id = %word_id, attempt, error = %err, "Retrying answer");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Manually set or clear the difficult flag.
    pub fn mark_difficult(&self, word_id: WordId, difficult: bool) -> Result<LearningState> {
        let update = |state: &LearningState| state.clone().mark_difficult(difficult);
        self.store
            .update_learning_state_with(word_id, &update)
            .map_err(|err| match err {
                StoreError::WordNotFound(id) => AppError::NotFound(format!("word {id}")),
                other => other.into(),
            })
    }

    pub fn get_word(&self, word_id: WordId) -> Result<WordWithState> {
        let not_found = || AppError::NotFound(format!("word {word_id}"));
        let word = self.store.get_word(word_id)?.ok_or_else(not_found)?;
        let state = self
            .store
            .get_learning_state(word_id)?
            .ok_or_else(not_found)?;
        Ok(WordWithState { word, state })
    }

    /// Words whose review time has arrived, ordered by id.
    pub fn due_words(&self, page: Page) -> Result<Vec<WordWithState>> {
        let now = self.clock.now();
        Ok(self.store.query_words(ReviewFilter::Due { now }, page)?)
    }

    /// Words currently flagged difficult, ordered by id.
    pub fn difficult_words(&self, page: Page) -> Result<Vec<WordWithState>> {
        Ok(self.store.query_words(ReviewFilter::Difficult, page)?)
    }

    /// Words never answered, ordered by id.
    pub fn unseen_words(&self, page: Page) -> Result<Vec<WordWithState>> {
        Ok(self.store.query_words(ReviewFilter::Unseen, page)?)
    }

    pub fn course_words(&self, course_id: CourseId, page: Page) -> Result<Vec<WordWithState>> {
        Ok(self.store.course_words(course_id, page)?)
    }

    pub fn course_stats(&self, course_id: CourseId) -> Result<CourseStats> {
        Ok(self.store.course_stats(course_id, self.clock.now())?)
    }
}
