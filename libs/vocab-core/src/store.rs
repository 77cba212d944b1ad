//! Storage interface consumed by the scheduler and importer services.

use crate::error::{StoreError, StoreResult};
use crate::scheduler::ReviewFilter;
use crate::types::{
    CourseId, CourseStats, ImportedWord, LearningState, Page, Word, WordId, WordWithState,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Repository for words and their learning state.
///
/// Implementations own transactional isolation: every method is atomic, and
/// [`WordStore::update_learning_state_with`] serializes concurrent updates of
/// the same word.
pub trait WordStore: Send + Sync {
    fn get_word(&self, id: WordId) -> StoreResult<Option<Word>>;
    fn get_learning_state(&self, word_id: WordId) -> StoreResult<Option<LearningState>>;

    /// Insert a word and its learning state together.
    fn create_word(&self, word: &Word, state: &LearningState) -> StoreResult<()>;

    /// Insert a batch of pairs in one transaction. Returns the number inserted.
    fn create_words(&self, words: &[ImportedWord]) -> StoreResult<usize>;

    fn update_learning_state(&self, state: &LearningState) -> StoreResult<()>;

    /// Read-modify-write of one word's learning state.
    fn update_learning_state_with(
        &self,
        word_id: WordId,
        update: &dyn Fn(&LearningState) -> LearningState,
    ) -> StoreResult<LearningState>;

    /// Texts of all words currently in a course, for import deduplication.
    fn course_word_texts(&self, course_id: CourseId) -> StoreResult<HashSet<String>>;

    /// Words whose state matches `filter`, ordered by word id.
    fn query_words(&self, filter: ReviewFilter, page: Page) -> StoreResult<Vec<WordWithState>>;

    /// Words of one course with their state, ordered by word id.
    fn course_words(&self, course_id: CourseId, page: Page) -> StoreResult<Vec<WordWithState>>;

    /// Progress counts for one course, with due words counted at `now`.
    fn course_stats(&self, course_id: CourseId, now: DateTime<Utc>) -> StoreResult<CourseStats>;
}

pub(crate) fn check_pair(word: &Word, state: &LearningState) -> StoreResult<()> {
    if word.id != state.word_id {
        return Err(StoreError::Backend(format!(
            "learning state for {} attached to word {}",
            state.word_id, word.id
        )));
    }
    Ok(())
}

#[derive(Debug, Default)]
struct MemoryInner {
    words: BTreeMap<WordId, Word>,
    states: HashMap<WordId, LearningState>,
    /// Word texts per course.
    texts: HashMap<CourseId, HashSet<String>>,
}

impl MemoryInner {
    fn contains_text(&self, course_id: CourseId, text: &str) -> bool {
        self.texts
            .get(&course_id)
            .is_some_and(|texts| texts.contains(text))
    }

    fn insert(&mut self, word: &Word, state: &LearningState) {
        self.texts
            .entry(word.course_id)
            .or_default()
            .insert(word.text.clone());
        self.words.insert(word.id, word.clone());
        self.states.insert(word.id, state.clone());
    }

    /// Word/state pairs in id order.
    fn entries(&self) -> impl Iterator<Item = (&Word, &LearningState)> + '_ {
        self.words
            .values()
            .filter_map(|word| Some((word, self.states.get(&word.id)?)))
    }
}

fn collect_page<'a>(
    entries: impl Iterator<Item = (&'a Word, &'a LearningState)>,
    page: Page,
) -> Vec<WordWithState> {
    entries
        .skip(page.offset)
        .take(page.limit)
        .map(|(word, state)| WordWithState {
            word: word.clone(),
            state: state.clone(),
        })
        .collect()
}

/// In-process store backed by ordered maps behind one mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.words.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MemoryInner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

impl WordStore for MemoryStore {
    fn get_word(&self, id: WordId) -> StoreResult<Option<Word>> {
        Ok(self.lock()?.words.get(&id).cloned())
    }

    fn get_learning_state(&self, word_id: WordId) -> StoreResult<Option<LearningState>> {
        Ok(self.lock()?.states.get(&word_id).cloned())
    }

    fn create_word(&self, word: &Word, state: &LearningState) -> StoreResult<()> {
        check_pair(word, state)?;
        let mut inner = self.lock()?;
        if inner.contains_text(word.course_id, &word.text) {
            return Err(StoreError::DuplicateWord {
                course_id: word.course_id,
                text: word.text.clone(),
            });
        }
        inner.insert(word, state);
        Ok(())
    }

    fn create_words(&self, words: &[ImportedWord]) -> StoreResult<usize> {
        let mut inner = self.lock()?;

        // Validate the whole batch before touching the maps.
        let mut batch: HashSet<(CourseId, &str)> = HashSet::new();
        for pair in words {
            check_pair(&pair.word, &pair.state)?;
            let key = (pair.word.course_id, pair.word.text.as_str());
            if inner.contains_text(key.0, key.1) || !batch.insert(key) {
                return Err(StoreError::DuplicateWord {
                    course_id: pair.word.course_id,
                    text: pair.word.text.clone(),
                });
            }
        }

        for pair in words {
            inner.insert(&pair.word, &pair.state);
        }
        Ok(words.len())
    }

    fn update_learning_state(&self, state: &LearningState) -> StoreResult<()> {
        let mut inner = self.lock()?;
        match inner.states.get_mut(&state.word_id) {
            Some(slot) => {
                *slot = state.clone();
                Ok(())
            }
            None => Err(StoreError::WordNotFound(state.word_id)),
        }
    }

    fn update_learning_state_with(
        &self,
        word_id: WordId,
        update: &dyn Fn(&LearningState) -> LearningState,
    ) -> StoreResult<LearningState> {
        let mut inner = self.lock()?;
        let slot = inner
            .states
            .get_mut(&word_id)
            .ok_or(StoreError::WordNotFound(word_id))?;
        let next = update(slot);
        *slot = next.clone();
        Ok(next)
    }

    fn course_word_texts(&self, course_id: CourseId) -> StoreResult<HashSet<String>> {
        Ok(self
            .lock()?
            .texts
            .get(&course_id)
            .cloned()
            .unwrap_or_default())
    }

    fn query_words(&self, filter: ReviewFilter, page: Page) -> StoreResult<Vec<WordWithState>> {
        let inner = self.lock()?;
        let matching = inner.entries().filter(|(_, state)| filter.matches(state));
        Ok(collect_page(matching, page))
    }

    fn course_words(&self, course_id: CourseId, page: Page) -> StoreResult<Vec<WordWithState>> {
        let inner = self.lock()?;
        let in_course = inner
            .entries()
            .filter(|(word, _)| word.course_id == course_id);
        Ok(collect_page(in_course, page))
    }

    fn course_stats(&self, course_id: CourseId, now: DateTime<Utc>) -> StoreResult<CourseStats> {
        let inner = self.lock()?;
        let due = ReviewFilter::Due { now };
        let mut stats = CourseStats::new(course_id);
        for (_, state) in inner
            .entries()
            .filter(|(word, _)| word.course_id == course_id)
        {
            stats.total_words += 1;
            stats.learned_words += usize::from(!state.is_unseen());
            stats.difficult_words += usize::from(state.is_difficult);
            stats.due_words += usize::from(due.matches(state));
        }
        Ok(stats)
    }
}
