//! Review scheduling.
//!
//! Schedulers are pure: they take a snapshot of a [`LearningState`] and return
//! the next one. Persisting the result is the caller's job.

pub mod step;

use crate::types::{LearningState, WordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use step::StepScheduler;

/// Trait for review scheduling policies.
pub trait ReviewScheduler: Send + Sync {
    /// Scheduler identifier.
    fn name(&self) -> &'static str;

    /// Apply one answer event.
    fn record_answer(&self, state: &LearningState, correct: bool, now: DateTime<Utc>)
        -> LearningState;

    /// State for a word that has just been created.
    fn initial_state(&self, word_id: WordId) -> LearningState {
        LearningState::new(word_id)
    }

    /// Whether the word's review time has arrived. Never-reviewed words are
    /// not due.
    fn is_due(&self, state: &LearningState, now: DateTime<Utc>) -> bool {
        state.next_review.is_some_and(|next| next <= now)
    }
}

/// Selection predicates the store must be able to answer.
///
/// All depend on the learning state alone, so stores can index on
/// `(is_difficult, next_review)` and `last_reviewed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ReviewFilter {
    Difficult,
    Due { now: DateTime<Utc> },
    /// Never answered. These words are not due until their first answer.
    Unseen,
}

impl ReviewFilter {
    pub fn matches(&self, state: &LearningState) -> bool {
        match self {
            Self::Difficult => state.is_difficult,
            Self::Due { now } => is_due(state, *now),
            Self::Unseen => state.is_unseen(),
        }
    }
}

/// Apply an answer with the default step schedule.
pub fn record_answer(state: &LearningState, correct: bool, now: DateTime<Utc>) -> LearningState {
    StepScheduler::default().record_answer(state, correct, now)
}

/// Zero-valued learning state bound to `word_id`.
pub fn initial_state(word_id: WordId) -> LearningState {
    LearningState::new(word_id)
}

/// True iff `next_review` is set and not after `now`.
pub fn is_due(state: &LearningState, now: DateTime<Utc>) -> bool {
    state.next_review.is_some_and(|next| next <= now)
}
