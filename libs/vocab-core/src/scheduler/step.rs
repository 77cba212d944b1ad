//! Fixed-step review schedule.
//!
//! Each correct answer in a streak moves the word one step further along an
//! interval table (4h, 1d, 3d, 7d, 14d, then 30d forever). A wrong answer
//! resets the streak and brings the word back after an hour.

use super::ReviewScheduler;
use crate::types::LearningState;
use chrono::{DateTime, Duration, Utc};

/// Step schedule with configurable parameters.
#[derive(Debug, Clone)]
pub struct StepScheduler {
    /// Interval after the n-th consecutive correct answer; the last entry
    /// repeats for longer streaks.
    pub steps: Vec<Duration>,
    pub lapse_delay: Duration,
    /// Error count at which a word is flagged difficult.
    pub difficult_after_errors: u32,
    /// Streak length that clears the difficult flag.
    pub recovered_after_streak: u32,
}

impl Default for StepScheduler {
    fn default() -> Self {
        Self {
            steps: vec![
                Duration::hours(4),
                Duration::days(1),
                Duration::days(3),
                Duration::days(7),
                Duration::days(14),
                Duration::days(30),
            ],
            lapse_delay: Duration::hours(1),
            difficult_after_errors: 3,
            recovered_after_streak: 3,
        }
    }
}

impl ReviewScheduler for StepScheduler {
    fn name(&self) -> &'static str {
        "step"
    }

    fn record_answer(
        &self,
        state: &LearningState,
        correct: bool,
        now: DateTime<Utc>,
    ) -> LearningState {
        let mut next = state.clone();
        next.last_reviewed = Some(now);

        if correct {
            next.consecutive_correct = state.consecutive_correct.saturating_add(1);
            next.next_review = Some(offset(now, self.interval(next.consecutive_correct)));
            if next.consecutive_correct >= self.recovered_after_streak && next.is_difficult {
                next.is_difficult = false;
            }
        } else {
            next.error_count = state.error_count.saturating_add(1);
            next.consecutive_correct = 0;
            next.next_review = Some(offset(now, self.lapse_delay));
            if next.error_count >= self.difficult_after_errors {
                next.is_difficult = true;
            }
        }

        next
    }
}

impl StepScheduler {
    /// Interval for a streak of `streak` correct answers.
    pub fn interval(&self, streak: u32) -> Duration {
        let Some(last) = self.steps.len().checked_sub(1) else {
            return Duration::zero();
        };
        let idx = (streak.max(1) as usize - 1).min(last);
        self.steps[idx]
    }
}

// Saturates at the latest representable instant so the schedule stays total.
fn offset(now: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    now.checked_add_signed(interval)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn fresh() -> LearningState {
        LearningState::new(Uuid::new_v4())
    }

    fn answer_all(
        scheduler: &StepScheduler,
        mut state: LearningState,
        answers: &[bool],
    ) -> LearningState {
        for &correct in answers {
            state = scheduler.record_answer(&state, correct, now());
        }
        state
    }

    #[test]
    fn correct_streak_walks_interval_table() {
        let sm = StepScheduler::default();
        let expected = [
            Duration::hours(4),
            Duration::days(1),
            Duration::days(3),
            Duration::days(7),
            Duration::days(14),
            Duration::days(30),
            Duration::days(30),
            Duration::days(30),
        ];

        let mut state = fresh();
        for (i, interval) in expected.iter().enumerate() {
            let before = state.consecutive_correct;
            state = sm.record_answer(&state, true, now());
            assert_eq!(state.consecutive_correct, before + 1);
            assert_eq!(state.next_review, Some(now() + *interval), "step {}", i + 1);
            assert_eq!(state.last_reviewed, Some(now()));
        }
        assert_eq!(state.error_count, 0);
    }

    #[test]
    fn wrong_answer_resets_streak_regardless_of_length() {
        let sm = StepScheduler::default();
        let state = answer_all(&sm, fresh(), &[true; 10]);
        assert_eq!(state.consecutive_correct, 10);

        let state = sm.record_answer(&state, false, now());
        assert_eq!(state.consecutive_correct, 0);
        assert_eq!(state.error_count, 1);
        assert_eq!(state.next_review, Some(now() + Duration::hours(1)));
    }

    #[test]
    fn difficult_after_third_error() {
        let sm = StepScheduler::default();
        let state = answer_all(&sm, fresh(), &[false, false]);
        assert!(!state.is_difficult);

        let state = sm.record_answer(&state, false, now());
        assert_eq!(state.error_count, 3);
        assert!(state.is_difficult);
    }

    #[test]
    fn difficult_cleared_by_three_correct() {
        let sm = StepScheduler::default();
        let state = answer_all(&sm, fresh(), &[false, false, false, true, true]);
        assert!(state.is_difficult);

        let state = sm.record_answer(&state, true, now());
        assert_eq!(state.consecutive_correct, 3);
        assert!(!state.is_difficult);
        // Errors are cumulative and are not reset by recovery.
        assert_eq!(state.error_count, 3);
    }

    #[test]
    fn next_error_after_recovery_flags_again() {
        let sm = StepScheduler::default();
        let state = answer_all(&sm, fresh(), &[false, false, false, true, true, true]);
        assert!(!state.is_difficult);

        let state = sm.record_answer(&state, false, now());
        assert!(state.is_difficult);
    }

    #[test]
    fn mixed_sequence_below_threshold() {
        let sm = StepScheduler::default();
        let state = answer_all(&sm, fresh(), &[true, true, true, false, true, true]);
        assert_eq!(state.consecutive_correct, 2);
        assert_eq!(state.error_count, 1);
        assert!(!state.is_difficult);
        assert_eq!(state.next_review, Some(now() + Duration::days(1)));
    }

    #[test]
    fn manual_flag_kept_until_streak_reaches_three() {
        let sm = StepScheduler::default();
        let state = fresh().mark_difficult(true);
        let state = answer_all(&sm, state, &[true, true]);
        assert!(state.is_difficult);
        let state = sm.record_answer(&state, true, now());
        assert!(!state.is_difficult);
    }

    #[test]
    fn counters_saturate() {
        let sm = StepScheduler::default();
        let mut state = fresh();
        state.consecutive_correct = u32::MAX;
        state.error_count = u32::MAX;

        let correct = sm.record_answer(&state, true, now());
        assert_eq!(correct.consecutive_correct, u32::MAX);
        assert_eq!(correct.next_review, Some(now() + Duration::days(30)));

        let wrong = sm.record_answer(&state, false, now());
        assert_eq!(wrong.error_count, u32::MAX);
        assert!(wrong.is_difficult);
    }

    #[test]
    fn next_review_never_precedes_last_reviewed() {
        let sm = StepScheduler::default();
        let late = DateTime::<Utc>::MAX_UTC - Duration::hours(2);
        let state = sm.record_answer(&fresh(), true, late);
        assert_eq!(state.next_review, Some(DateTime::<Utc>::MAX_UTC));
        assert!(state.next_review >= state.last_reviewed);
    }

    #[test]
    fn untouched_fields_preserved() {
        let sm = StepScheduler::default();
        let state = fresh();
        let next = sm.record_answer(&state, true, now());
        assert_eq!(next.word_id, state.word_id);
        assert_eq!(next.error_count, 0);
    }

    #[test]
    fn interval_lookup_clamps() {
        let sm = StepScheduler::default();
        assert_eq!(sm.interval(0), Duration::hours(4));
        assert_eq!(sm.interval(6), Duration::days(30));
        assert_eq!(sm.interval(1000), Duration::days(30));

        let empty = StepScheduler {
            steps: vec![],
            ..Default::default()
        };
        assert_eq!(empty.interval(3), Duration::zero());
    }
}
