use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{QuestionId, UserId};

/// Top of the band-score scale.
pub const MAX_BAND_SCORE: f64 = 90.0;

/// Minimum free-text score counted as a correct answer.
pub const CORRECT_SCORE_THRESHOLD: f64 = 70.0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubmissionError {
    #[error("answer shape does not match question type {0:?}")]
    AnswerShapeMismatch(QuestionKind),

    #[error("free-text answer is empty")]
    EmptyAnswer,
}

/// Section of the practice test a question belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Speaking,
    Writing,
    Reading,
    Listening,
}

impl Section {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Speaking => "speaking",
            Section::Writing => "writing",
            Section::Reading => "reading",
            Section::Listening => "listening",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "speaking" => Some(Section::Speaking),
            "writing" => Some(Section::Writing),
            "reading" => Some(Section::Reading),
            "listening" => Some(Section::Listening),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice,
    MultipleChoice,
    Reorder,
    FillInBlank,
    Summarize,
    Essay,
}

impl QuestionKind {
    /// Free-text kinds are graded by the language model.
    #[must_use]
    pub fn is_free_text(&self) -> bool {
        matches!(self, QuestionKind::Summarize | QuestionKind::Essay)
    }
}

/// A learner's answer, shaped by question kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Answer {
    Choice(String),
    Choices(Vec<String>),
    Sequence(Vec<String>),
    Blanks(Vec<String>),
    Text(String),
}

impl Answer {
    /// Flat text form stored with the submission.
    #[must_use]
    pub fn raw_text(&self) -> String {
        match self {
            Answer::Choice(s) | Answer::Text(s) => s.clone(),
            Answer::Choices(v) | Answer::Sequence(v) | Answer::Blanks(v) => v.join(" | "),
        }
    }
}

/// A practice question together with its answer key for objective kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeQuestion {
    pub id: QuestionId,
    pub section: Section,
    pub kind: QuestionKind,
    pub prompt: String,
    #[serde(default)]
    pub passage: Option<String>,
    #[serde(default)]
    pub expected: Option<Answer>,
}

fn trimmed(items: &[String]) -> Vec<&str> {
    items.iter().map(|s| s.trim()).collect()
}

/// Compares an objective answer against its key.
///
/// Single choice and reorder compare exactly after trimming; multiple choice
/// compares as a set; blanks compare per position, case-insensitively.
///
/// # Errors
///
/// Returns `SubmissionError::AnswerShapeMismatch` when the answer or key does
/// not fit the question kind.
pub fn objective_match(
    kind: QuestionKind,
    expected: &Answer,
    given: &Answer,
) -> Result<bool, SubmissionError> {
    match (kind, expected, given) {
        (QuestionKind::SingleChoice, Answer::Choice(want), Answer::Choice(got)) => {
            Ok(want.trim() == got.trim())
        }
        (QuestionKind::MultipleChoice, Answer::Choices(want), Answer::Choices(got)) => {
            let want: BTreeSet<&str> = trimmed(want).into_iter().collect();
            let got: BTreeSet<&str> = trimmed(got).into_iter().collect();
            Ok(want == got)
        }
        (QuestionKind::Reorder, Answer::Sequence(want), Answer::Sequence(got)) => {
            Ok(trimmed(want) == trimmed(got))
        }
        (QuestionKind::FillInBlank, Answer::Blanks(want), Answer::Blanks(got)) => {
            Ok(want.len() == got.len()
                && want
                    .iter()
                    .zip(got)
                    .all(|(w, g)| w.trim().eq_ignore_ascii_case(g.trim())))
        }
        _ => Err(SubmissionError::AnswerShapeMismatch(kind)),
    }
}

/// Clamps a score into the band range.
#[must_use]
pub fn clamp_band_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, MAX_BAND_SCORE)
}

/// A graded answer for one question. Resubmission amends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedSubmission {
    pub user_id: UserId,
    pub question_id: QuestionId,
    pub section: Section,
    pub answer: String,
    pub is_correct: bool,
    pub score: f64,
    pub feedback: String,
    pub details: BTreeMap<String, f64>,
    pub attempt: u32,
    pub time_spent_secs: u32,
    pub submitted_at: DateTime<Utc>,
}

/// Running per-section totals for the graded track.
///
/// The average is an incremental mean over submission order; individual scores
/// are not retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionProgress {
    pub user_id: UserId,
    pub section: Section,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub completion_percentage: u8,
    pub average_score: f64,
}

impl SectionProgress {
    #[must_use]
    pub fn empty(user_id: UserId, section: Section) -> Self {
        Self {
            user_id,
            section,
            correct_answers: 0,
            total_questions: 0,
            completion_percentage: 0,
            average_score: 0.0,
        }
    }

    /// Fold one submission into the totals.
    pub fn record(&mut self, is_correct: bool, score: f64) {
        if is_correct {
            self.correct_answers = self.correct_answers.saturating_add(1);
        }
        self.total_questions = self.total_questions.saturating_add(1);
        self.completion_percentage =
            crate::model::week::completion_percentage(self.correct_answers, self.total_questions);

        let n = f64::from(self.total_questions);
        self.average_score = (self.average_score * (n - 1.0) + score) / n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn multiple_choice_ignores_order() {
        let want = Answer::Choices(strings(&["b", "d"]));
        let got = Answer::Choices(strings(&[" d", "b "]));
        assert!(objective_match(QuestionKind::MultipleChoice, &want, &got).unwrap());
        let partial = Answer::Choices(strings(&["b"]));
        assert!(!objective_match(QuestionKind::MultipleChoice, &want, &partial).unwrap());
    }

    #[test]
    fn reorder_is_order_sensitive() {
        let want = Answer::Sequence(strings(&["p1", "p2", "p3"]));
        let swapped = Answer::Sequence(strings(&["p2", "p1", "p3"]));
        assert!(!objective_match(QuestionKind::Reorder, &want, &swapped).unwrap());
        assert!(objective_match(QuestionKind::Reorder, &want, &want).unwrap());
    }

    #[test]
    fn blanks_are_case_insensitive() {
        let want = Answer::Blanks(strings(&["Although", "their"]));
        let got = Answer::Blanks(strings(&["although ", "THEIR"]));
        assert!(objective_match(QuestionKind::FillInBlank, &want, &got).unwrap());
        let short = Answer::Blanks(strings(&["although"]));
        assert!(!objective_match(QuestionKind::FillInBlank, &want, &short).unwrap());
    }

    #[test]
    fn mismatched_shape_is_an_error() {
        let want = Answer::Choice("a".into());
        let got = Answer::Choices(strings(&["a"]));
        assert_eq!(
            objective_match(QuestionKind::SingleChoice, &want, &got),
            Err(SubmissionError::AnswerShapeMismatch(QuestionKind::SingleChoice))
        );
    }

    #[test]
    fn section_progress_uses_incremental_mean() {
        let mut progress = SectionProgress::empty(UserId::new("u").unwrap(), Section::Writing);
        progress.record(true, 85.0);
        assert_eq!(progress.total_questions, 1);
        assert_eq!(progress.correct_answers, 1);
        assert_eq!(progress.completion_percentage, 100);
        assert!((progress.average_score - 85.0).abs() < f64::EPSILON);

        progress.record(false, 50.0);
        assert_eq!(progress.total_questions, 2);
        assert_eq!(progress.correct_answers, 1);
        assert_eq!(progress.completion_percentage, 50);
        assert!((progress.average_score - 67.5).abs() < 1e-9);

        progress.record(false, 0.0);
        assert_eq!(progress.completion_percentage, 33);
        assert!((progress.average_score - 45.0).abs() < 1e-9);
    }

    #[test]
    fn band_scores_are_clamped() {
        assert!((clamp_band_score(120.0) - 90.0).abs() < f64::EPSILON);
        assert!(clamp_band_score(-3.0).abs() < f64::EPSILON);
        assert!(clamp_band_score(f64::NAN).abs() < f64::EPSILON);
    }
}
