//! Single-shot page answers checked against the answer key, and the global stats they feed.
//!
//! This is the older interaction mode: one answer per page, committed once.
//! It is kept separate from the per-question [`crate::answers::AnswerPanel`].

use crate::answers::Choice;
use crate::catalog::AnswerKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A committed page answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredRecord {
    pub selected: Choice,
    /// Expected answer, when the key has one.
    pub correct: Option<Choice>,
    /// `None` when there was nothing to compare against.
    pub was_correct: Option<bool>,
}

/// Result of a commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Recorded(AnsweredRecord),
    /// The page already had a record; it is returned unchanged.
    AlreadyAnswered(AnsweredRecord),
}

/// Committed answers: exercise name → page number → record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommittedAnswers {
    exercises: BTreeMap<String, BTreeMap<u32, AnsweredRecord>>,
}

impl CommittedAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, exercise: &str, page: u32) -> Option<&AnsweredRecord> {
        self.exercises.get(exercise)?.get(&page)
    }

    /// Commit `selected` for a page unless the page already has a record.
    ///
    /// With no category the key is searched across all categories.
    pub fn commit(
        &mut self,
        key: &AnswerKey,
        category: Option<&str>,
        exercise: &str,
        page: u32,
        selected: Choice,
    ) -> CommitOutcome {
        if let Some(existing) = self.get(exercise, page) {
            return CommitOutcome::AlreadyAnswered(*existing);
        }
        let correct = match category {
            Some(category) => key.lookup(category, exercise, page),
            None => key.lookup_any(exercise, page),
        };
        let record = AnsweredRecord {
            selected,
            correct,
            was_correct: correct.map(|expected| expected == selected),
        };
        self.exercises
            .entry(exercise.to_string())
            .or_default()
            .insert(page, record);
        CommitOutcome::Recorded(record)
    }
}

/// Global correct/incorrect counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub correct: u32,
    pub incorrect: u32,
}

impl Stats {
    /// Count a committed answer. Unknown correctness counts for neither side.
    pub fn record(&mut self, was_correct: Option<bool>) -> bool {
        match was_correct {
            Some(true) => self.correct += 1,
            Some(false) => self.incorrect += 1,
            None => return false,
        }
        true
    }

    pub fn total(&self) -> u32 {
        self.correct + self.incorrect
    }

    /// Share of correct answers, if any were counted.
    pub fn accuracy(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| f64::from(self.correct) / f64::from(total))
    }

    /// Zero both counters, but only if `confirm` agrees.
    pub fn reset(&mut self, confirm: impl FnOnce() -> bool) -> bool {
        if !confirm() {
            return false;
        }
        *self = Self::default();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> AnswerKey {
        AnswerKey::from_json(r#"{"Verbal": {"Series 1": {"1": "b", "2": ""}}}"#).unwrap()
    }

    #[test]
    fn test_commit_checks_key_case_insensitively() {
        let mut committed = CommittedAnswers::new();
        let outcome = committed.commit(&key(), Some("Verbal"), "Series 1", 1, Choice::B);
        assert_eq!(
            outcome,
            CommitOutcome::Recorded(AnsweredRecord {
                selected: Choice::B,
                correct: Some(Choice::B),
                was_correct: Some(true),
            })
        );
    }

    #[test]
    fn test_commit_without_key_entry() {
        let mut committed = CommittedAnswers::new();
        let CommitOutcome::Recorded(record) =
            committed.commit(&key(), Some("Verbal"), "Series 1", 2, Choice::A)
        else {
            panic!("expected a new record");
        };
        assert_eq!(record.correct, None);
        assert_eq!(record.was_correct, None);
    }

    #[test]
    fn test_second_commit_rejected() {
        let mut committed = CommittedAnswers::new();
        committed.commit(&key(), Some("Verbal"), "Series 1", 1, Choice::B);
        let second = committed.commit(&key(), Some("Verbal"), "Series 1", 1, Choice::C);

        let first = *committed.get("Series 1", 1).unwrap();
        assert_eq!(second, CommitOutcome::AlreadyAnswered(first));
        assert_eq!(first.selected, Choice::B);
    }

    #[test]
    fn test_record_json_shape() {
        let mut committed = CommittedAnswers::new();
        committed.commit(&key(), None, "Series 1", 1, Choice::A);
        let json = serde_json::to_value(&committed).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Series 1": {"1": {"selected": "A", "correct": "B", "wasCorrect": false}}
            })
        );
        let back: CommittedAnswers = serde_json::from_value(json).unwrap();
        assert_eq!(back, committed);
    }

    #[test]
    fn test_stats_record_and_accuracy() {
        let mut stats = Stats::default();
        assert_eq!(stats.accuracy(), None);
        assert!(stats.record(Some(true)));
        assert!(stats.record(Some(false)));
        assert!(stats.record(Some(true)));
        assert!(!stats.record(None));
        assert_eq!(stats, Stats { correct: 2, incorrect: 1 });
        assert!((stats.accuracy().unwrap() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_stats_reset_needs_confirmation() {
        let mut stats = Stats { correct: 4, incorrect: 2 };
        assert!(!stats.reset(|| false));
        assert_eq!(stats.total(), 6);
        assert!(stats.reset(|| true));
        assert_eq!(stats, Stats::default());
    }
}
