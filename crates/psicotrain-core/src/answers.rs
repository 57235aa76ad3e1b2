//! Exercise-scoped multiple-choice answer panel.
//!
//! Each question is either unanswered or has exactly one selected option.
//! Selecting the option that is already selected clears it again. Answers
//! belong to the whole exercise, not to the page on screen.

use crate::catalog::AnswerKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Default number of question rows shown.
pub const DEFAULT_QUESTION_COUNT: u32 = 10;
/// Rows added by each "more questions" request.
pub const QUESTION_COUNT_STEP: u32 = 5;

/// One of the five option letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Choice {
    A,
    B,
    C,
    D,
    E,
}

impl Choice {
    /// Parse a single letter, ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Choice::A),
            "B" => Some(Choice::B),
            "C" => Some(Choice::C),
            "D" => Some(Choice::D),
            "E" => Some(Choice::E),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Choice::A => 'A',
            Choice::B => 'B',
            Choice::C => 'C',
            Choice::D => 'D',
            Choice::E => 'E',
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// State of one question row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionState {
    Unanswered,
    Selected(Choice),
}

impl QuestionState {
    pub fn choice(self) -> Option<Choice> {
        match self {
            QuestionState::Unanswered => None,
            QuestionState::Selected(choice) => Some(choice),
        }
    }
}

/// All panel answers: exercise name → question number → selected option.
///
/// A question only has an entry while an option is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerBook {
    exercises: BTreeMap<String, BTreeMap<u32, Choice>>,
}

impl AnswerBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answers(&self, exercise: &str) -> Option<&BTreeMap<u32, Choice>> {
        self.exercises.get(exercise)
    }

    pub fn get(&self, exercise: &str, question: u32) -> Option<Choice> {
        self.exercises.get(exercise)?.get(&question).copied()
    }

    fn set(&mut self, exercise: &str, question: u32, choice: Option<Choice>) {
        match choice {
            Some(choice) => {
                self.exercises
                    .entry(exercise.to_string())
                    .or_default()
                    .insert(question, choice);
            }
            None => {
                if let Some(answers) = self.exercises.get_mut(exercise) {
                    answers.remove(&question);
                    if answers.is_empty() {
                        self.exercises.remove(exercise);
                    }
                }
            }
        }
    }

    fn clear(&mut self, exercise: &str) -> bool {
        self.exercises.remove(exercise).is_some()
    }
}

/// Correctness of the panel answers against the answer key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PanelScore {
    pub correct: u32,
    pub incorrect: u32,
    /// Answered questions the key has no entry for.
    pub unscored: u32,
}

/// The answer panel state machine for the open exercise.
#[derive(Debug, Clone)]
pub struct AnswerPanel {
    book: AnswerBook,
    exercise: Option<String>,
    question_count: u32,
    initial_count: u32,
    step: u32,
    visible: bool,
}

impl Default for AnswerPanel {
    fn default() -> Self {
        Self::new(DEFAULT_QUESTION_COUNT, QUESTION_COUNT_STEP)
    }
}

impl AnswerPanel {
    pub fn new(initial_count: u32, step: u32) -> Self {
        let step = step.max(1);
        Self {
            book: AnswerBook::new(),
            exercise: None,
            question_count: initial_count,
            initial_count,
            step,
            visible: true,
        }
    }

    /// Replace all answers, e.g. with the persisted copy.
    pub fn set_book(&mut self, book: AnswerBook) {
        self.book = book;
    }

    pub fn book(&self) -> &AnswerBook {
        &self.book
    }

    /// Exercise the panel currently shows.
    pub fn exercise(&self) -> Option<&str> {
        self.exercise.as_deref()
    }

    /// Show the answers of `exercise`.
    ///
    /// The row count starts at the default but grows in whole steps to
    /// cover the highest question already answered.
    pub fn open(&mut self, exercise: &str) {
        self.exercise = Some(exercise.to_string());
        let highest = self
            .book
            .answers(exercise)
            .and_then(|answers| answers.keys().next_back().copied())
            .unwrap_or(0);
        self.question_count = self.initial_count;
        while self.question_count < highest {
            self.question_count += self.step;
        }
    }

    pub fn close(&mut self) {
        self.exercise = None;
        self.question_count = self.initial_count;
    }

    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    /// Show more question rows. The count never shrinks.
    pub fn grow_question_count(&mut self) -> u32 {
        self.question_count += self.step;
        self.question_count
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn toggle_visible(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    pub fn state(&self, question: u32) -> QuestionState {
        self.exercise
            .as_deref()
            .and_then(|exercise| self.book.get(exercise, question))
            .map_or(QuestionState::Unanswered, QuestionState::Selected)
    }

    /// Apply a click on option `choice` of `question`.
    ///
    /// Returns the new state of the question, or `None` when no exercise is
    /// open or the question number is 0.
    pub fn select(&mut self, question: u32, choice: Choice) -> Option<QuestionState> {
        let exercise = self.exercise.clone()?;
        if question == 0 {
            return None;
        }
        let next = match self.state(question) {
            QuestionState::Selected(current) if current == choice => QuestionState::Unanswered,
            _ => QuestionState::Selected(choice),
        };
        self.book.set(&exercise, question, next.choice());
        Some(next)
    }

    /// Drop every answer of `exercise`. Returns false if it had none.
    pub fn clear_all(&mut self, exercise: &str) -> bool {
        self.book.clear(exercise)
    }

    /// Score the open exercise: question *n* against the key's entry for page *n*.
    pub fn score(&self, category: Option<&str>, key: &AnswerKey) -> PanelScore {
        let mut score = PanelScore::default();
        let Some(exercise) = self.exercise.as_deref() else {
            return score;
        };
        let Some(answers) = self.book.answers(exercise) else {
            return score;
        };
        for (&question, &choice) in answers {
            let expected = match category {
                Some(category) => key.lookup(category, exercise, question),
                None => key.lookup_any(exercise, question),
            };
            match expected {
                Some(expected) if expected == choice => score.correct += 1,
                Some(_) => score.incorrect += 1,
                None => score.unscored += 1,
            }
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel() -> AnswerPanel {
        let mut panel = AnswerPanel::default();
        panel.open("Series 1");
        panel
    }

    #[test]
    fn test_choice_parse() {
        assert_eq!(Choice::parse("a"), Some(Choice::A));
        assert_eq!(Choice::parse(" E "), Some(Choice::E));
        assert_eq!(Choice::parse(""), None);
        assert_eq!(Choice::parse("F"), None);
        assert_eq!(Choice::parse("AB"), None);
        assert_eq!(Choice::C.to_string(), "C");
    }

    #[test]
    fn test_select_toggles_off() {
        let mut panel = panel();
        assert_eq!(panel.select(3, Choice::A), Some(QuestionState::Selected(Choice::A)));
        assert_eq!(panel.select(3, Choice::A), Some(QuestionState::Unanswered));
        assert_eq!(panel.state(3), QuestionState::Unanswered);
        // No null marker left behind
        assert!(panel.book().answers("Series 1").is_none());
    }

    #[test]
    fn test_select_overwrites() {
        let mut panel = panel();
        panel.select(1, Choice::A);
        assert_eq!(panel.select(1, Choice::B), Some(QuestionState::Selected(Choice::B)));
        assert_eq!(panel.book().answers("Series 1").unwrap().len(), 1);
        assert_eq!(panel.book().get("Series 1", 1), Some(Choice::B));
    }

    #[test]
    fn test_select_without_exercise() {
        let mut panel = AnswerPanel::default();
        assert_eq!(panel.select(1, Choice::A), None);
        let mut panel = self::panel();
        assert_eq!(panel.select(0, Choice::A), None);
    }

    #[test]
    fn test_answers_are_per_exercise() {
        let mut panel = panel();
        panel.select(1, Choice::D);
        panel.open("Series 2");
        assert_eq!(panel.state(1), QuestionState::Unanswered);
        panel.open("Series 1");
        assert_eq!(panel.state(1), QuestionState::Selected(Choice::D));
    }

    #[test]
    fn test_grow_question_count() {
        let mut panel = panel();
        assert_eq!(panel.question_count(), 10);
        assert_eq!(panel.grow_question_count(), 15);
        assert_eq!(panel.grow_question_count(), 20);
    }

    #[test]
    fn test_open_covers_highest_answer() {
        let mut panel = panel();
        panel.grow_question_count();
        panel.grow_question_count();
        panel.select(17, Choice::C);
        panel.close();
        panel.open("Series 1");
        assert_eq!(panel.question_count(), 20);
        panel.open("Series 2");
        assert_eq!(panel.question_count(), 10);
    }

    #[test]
    fn test_clear_all() {
        let mut panel = panel();
        assert!(!panel.clear_all("Series 1"));
        panel.select(1, Choice::A);
        panel.select(2, Choice::B);
        assert!(panel.clear_all("Series 1"));
        assert_eq!(panel.state(1), QuestionState::Unanswered);
        assert!(!panel.clear_all("Series 1"));
    }

    #[test]
    fn test_toggle_visible() {
        let mut panel = panel();
        assert!(panel.is_visible());
        assert!(!panel.toggle_visible());
        assert!(panel.toggle_visible());
    }

    #[test]
    fn test_book_json_shape() {
        let mut panel = panel();
        panel.select(2, Choice::C);
        let json = serde_json::to_value(panel.book()).unwrap();
        assert_eq!(json, serde_json::json!({"Series 1": {"2": "C"}}));

        let book: AnswerBook = serde_json::from_value(json).unwrap();
        assert_eq!(book.get("Series 1", 2), Some(Choice::C));
    }

    #[test]
    fn test_score() {
        let key = AnswerKey::from_json(r#"{"Verbal": {"Series 1": {"1": "a", "2": "b"}}}"#).unwrap();
        let mut panel = panel();
        panel.select(1, Choice::A);
        panel.select(2, Choice::C);
        panel.select(3, Choice::E);

        let score = panel.score(Some("Verbal"), &key);
        assert_eq!(score, PanelScore { correct: 1, incorrect: 1, unscored: 1 });
        assert_eq!(panel.score(None, &key), score);
    }
}
