use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{TaskId, WeekNumber};
use crate::model::quiz::{is_passing, QuizQuestion, QuizSet, OPTIONS_PER_QUESTION, QUESTIONS_PER_CHECK};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("the check is not accepting answers")]
    NotAnswering,

    #[error("retry is only possible after a failed check")]
    NotFailed,

    #[error("option {0} does not exist")]
    InvalidOption(usize),

    #[error("question {0} does not exist")]
    InvalidQuestion(usize),

    #[error("question {0} cannot be reached before the previous ones are answered")]
    Unreachable(usize),

    #[error("only {answered} of {QUESTIONS_PER_CHECK} questions answered")]
    Incomplete { answered: usize },
}

/// Where an attempt is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AttemptPhase {
    Answering,
    Passed { score: u8 },
    Failed { score: u8 },
}

/// Result of finishing a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QuizOutcome {
    Passed { score: u8 },
    Failed { score: u8 },
}

/// In-progress comprehension check for one task-marking attempt.
///
/// Questions are shown one at a time. Moving back is always allowed; moving
/// forward requires every earlier question to be answered. Answers may change
/// until the check is finished. A failed check can be retried with the same
/// questions and cleared answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizAttempt {
    week: WeekNumber,
    task_id: TaskId,
    questions: QuizSet,
    answers: [Option<usize>; QUESTIONS_PER_CHECK],
    current: usize,
    phase: AttemptPhase,
}

impl QuizAttempt {
    #[must_use]
    pub fn new(week: WeekNumber, task_id: TaskId, questions: QuizSet) -> Self {
        Self {
            week,
            task_id,
            questions,
            answers: [None; QUESTIONS_PER_CHECK],
            current: 0,
            phase: AttemptPhase::Answering,
        }
    }

    #[must_use]
    pub fn week(&self) -> WeekNumber {
        self.week
    }

    #[must_use]
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    #[must_use]
    pub fn questions(&self) -> &QuizSet {
        &self.questions
    }

    #[must_use]
    pub fn phase(&self) -> AttemptPhase {
        self.phase
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    /// Index of the first question without an answer.
    fn first_unanswered(&self) -> Option<usize> {
        self.answers.iter().position(Option::is_none)
    }

    fn ensure_answering(&self) -> Result<(), AttemptError> {
        match self.phase {
            AttemptPhase::Answering => Ok(()),
            _ => Err(AttemptError::NotAnswering),
        }
    }

    /// Select (or change) the answer for the current question.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotAnswering` once the check is finished and
    /// `AttemptError::InvalidOption` for an option outside `0..4`.
    pub fn select(&mut self, option: usize) -> Result<(), AttemptError> {
        self.ensure_answering()?;
        if option >= OPTIONS_PER_QUESTION {
            return Err(AttemptError::InvalidOption(option));
        }
        self.answers[self.current] = Some(option);
        Ok(())
    }

    /// Jump to a question.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::InvalidQuestion` for an index past the last
    /// question and `AttemptError::Unreachable` if an earlier question is
    /// still unanswered.
    pub fn go_to(&mut self, index: usize) -> Result<(), AttemptError> {
        self.ensure_answering()?;
        if index >= QUESTIONS_PER_CHECK {
            return Err(AttemptError::InvalidQuestion(index));
        }
        if let Some(gap) = self.first_unanswered() {
            if index > gap {
                return Err(AttemptError::Unreachable(index));
            }
        }
        self.current = index;
        Ok(())
    }

    /// Move to the next question.
    ///
    /// # Errors
    ///
    /// See [`QuizAttempt::go_to`].
    pub fn next(&mut self) -> Result<(), AttemptError> {
        self.go_to(self.current + 1)
    }

    /// Move to the previous question. Staying on the first question is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotAnswering` once the check is finished.
    pub fn previous(&mut self) -> Result<(), AttemptError> {
        self.go_to(self.current.saturating_sub(1))
    }

    /// Score the answers and close the check.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Incomplete` if any question is unanswered.
    pub fn finish(&mut self) -> Result<QuizOutcome, AttemptError> {
        self.ensure_answering()?;
        let answers: Vec<usize> = self.answers.iter().filter_map(|a| *a).collect();
        if answers.len() != QUESTIONS_PER_CHECK {
            return Err(AttemptError::Incomplete {
                answered: answers.len(),
            });
        }

        let score = self.questions.score(&answers);
        if is_passing(score) {
            self.phase = AttemptPhase::Passed { score };
            Ok(QuizOutcome::Passed { score })
        } else {
            self.phase = AttemptPhase::Failed { score };
            Ok(QuizOutcome::Failed { score })
        }
    }

    /// Restart a failed check with the same questions.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotFailed` unless the last finish failed.
    pub fn retry(&mut self) -> Result<(), AttemptError> {
        if !matches!(self.phase, AttemptPhase::Failed { .. }) {
            return Err(AttemptError::NotFailed);
        }
        self.answers = [None; QUESTIONS_PER_CHECK];
        self.current = 0;
        self.phase = AttemptPhase::Answering;
        Ok(())
    }
}
