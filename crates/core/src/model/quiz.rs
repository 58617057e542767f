use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of questions in one comprehension check.
pub const QUESTIONS_PER_CHECK: usize = 3;

/// Number of answer options per question.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// Minimum correct answers needed to pass a check (strict majority of 3).
pub const PASS_THRESHOLD: u8 = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("expected {QUESTIONS_PER_CHECK} questions, got {0}")]
    WrongQuestionCount(usize),

    #[error("question {index} has {count} options, expected {OPTIONS_PER_QUESTION}")]
    WrongOptionCount { index: usize, count: usize },

    #[error("question {index} has correct answer {answer} outside 0..{OPTIONS_PER_QUESTION}")]
    AnswerOutOfRange { index: usize, answer: usize },

    #[error("question {index} has empty text")]
    EmptyQuestion { index: usize },

    #[error("question {index} has an empty option")]
    EmptyOption { index: usize },
}

/// A generated multiple-choice question. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: String,
}

/// Exactly three validated questions forming one comprehension check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizSet {
    questions: Vec<QuizQuestion>,
}

impl QuizSet {
    /// Validates the shape of a generated check.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` for the wrong number of questions or options, an
    /// out-of-range correct answer, or blank text.
    pub fn new(questions: Vec<QuizQuestion>) -> Result<Self, QuizError> {
        if questions.len() != QUESTIONS_PER_CHECK {
            return Err(QuizError::WrongQuestionCount(questions.len()));
        }
        for (index, q) in questions.iter().enumerate() {
            if q.question.trim().is_empty() {
                return Err(QuizError::EmptyQuestion { index });
            }
            if q.options.len() != OPTIONS_PER_QUESTION {
                return Err(QuizError::WrongOptionCount {
                    index,
                    count: q.options.len(),
                });
            }
            if q.options.iter().any(|o| o.trim().is_empty()) {
                return Err(QuizError::EmptyOption { index });
            }
            if q.correct_answer >= OPTIONS_PER_QUESTION {
                return Err(QuizError::AnswerOutOfRange {
                    index,
                    answer: q.correct_answer,
                });
            }
        }
        Ok(Self { questions })
    }

    #[must_use]
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&QuizQuestion> {
        self.questions.get(index)
    }

    /// Counts answers matching the correct option, position by position.
    #[must_use]
    pub fn score(&self, answers: &[usize]) -> u8 {
        let correct = self
            .questions
            .iter()
            .zip(answers)
            .filter(|(q, a)| q.correct_answer == **a)
            .count();
        u8::try_from(correct).unwrap_or(u8::MAX)
    }
}

/// Whether a score clears the fixed pass threshold.
#[must_use]
pub fn is_passing(score: u8) -> bool {
    score >= PASS_THRESHOLD
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn question(correct: usize) -> QuizQuestion {
        QuizQuestion {
            question: format!("Which option is {correct}?"),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: correct,
            explanation: "because".into(),
        }
    }

    pub fn quiz(correct: [usize; 3]) -> QuizSet {
        QuizSet::new(correct.iter().map(|c| question(*c)).collect()).unwrap()
    }
}
