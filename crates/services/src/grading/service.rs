use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use storage::repository::SubmissionRepository;
use tracker_core::Clock;
use tracker_core::model::{
    Answer, CORRECT_SCORE_THRESHOLD, GradedSubmission, MAX_BAND_SCORE, PracticeQuestion, Section,
    SectionProgress, SubmissionError, UserId, clamp_band_score, objective_match,
};

use super::rubric::{Rubric, grading_schema};
use crate::error::GradingError;
use crate::llm::{LanguageModel, LlmOutcome, StructuredRequest, generate_checked};

/// Score stored when a free-text answer could not be graded.
pub const FALLBACK_SCORE: f64 = 50.0;

pub const FALLBACK_FEEDBACK: &str = "Unable to grade this response right now. Please try again.";

#[derive(Debug, Deserialize)]
struct GradeReply {
    score: f64,
    feedback: String,
    details: BTreeMap<String, f64>,
}

struct Grade {
    score: f64,
    feedback: String,
    details: BTreeMap<String, f64>,
}

impl Grade {
    fn fallback() -> Self {
        Self {
            score: FALLBACK_SCORE,
            feedback: FALLBACK_FEEDBACK.to_owned(),
            details: BTreeMap::new(),
        }
    }
}

/// Keep only rubric criteria, clamp every score into the band, and reject
/// replies that skip a criterion.
fn repair(reply: GradeReply, rubric: &Rubric) -> Result<Grade, String> {
    let mut details = BTreeMap::new();
    for criterion in rubric.criteria {
        let value = reply
            .details
            .get(*criterion)
            .ok_or_else(|| format!("missing criterion `{criterion}`"))?;
        details.insert((*criterion).to_owned(), clamp_band_score(*value));
    }
    Ok(Grade {
        score: clamp_band_score(reply.score),
        feedback: reply.feedback.trim().to_owned(),
        details,
    })
}

/// Grades practice submissions and keeps per-section running totals.
#[derive(Clone)]
pub struct GradingService {
    clock: Clock,
    model: Arc<dyn LanguageModel>,
    submissions: Arc<dyn SubmissionRepository>,
}

impl GradingService {
    #[must_use]
    pub fn new(
        clock: Clock,
        model: Arc<dyn LanguageModel>,
        submissions: Arc<dyn SubmissionRepository>,
    ) -> Self {
        Self {
            clock,
            model,
            submissions,
        }
    }

    /// Grade an answer, store it, and update the question's section totals.
    ///
    /// Model failures never surface here: the submission is stored with
    /// [`FALLBACK_SCORE`] and [`FALLBACK_FEEDBACK`]. Resubmitting a question
    /// amends the stored submission and bumps its attempt number.
    ///
    /// # Errors
    ///
    /// Returns `GradingError::MissingAnswerKey` for an objective question
    /// without an answer key, `GradingError::Submission` when the answer does
    /// not fit the question kind or is empty, and `GradingError::Storage` if
    /// persistence fails.
    pub async fn submit(
        &self,
        user: &UserId,
        question: &PracticeQuestion,
        answer: Answer,
        time_spent_secs: u32,
    ) -> Result<GradedSubmission, GradingError> {
        let grade = match Rubric::for_kind(question.kind) {
            Some(rubric) => {
                let Answer::Text(text) = &answer else {
                    return Err(SubmissionError::AnswerShapeMismatch(question.kind).into());
                };
                if text.trim().is_empty() {
                    return Err(SubmissionError::EmptyAnswer.into());
                }
                self.grade_free_text(&rubric, question, text).await
            }
            None => {
                let expected = question
                    .expected
                    .as_ref()
                    .ok_or_else(|| GradingError::MissingAnswerKey(question.id.to_string()))?;
                grade_objective(objective_match(question.kind, expected, &answer)?, expected)
            }
        };

        let is_correct = grade.score >= CORRECT_SCORE_THRESHOLD;
        let attempt = self
            .submissions
            .get_submission(user, &question.id)
            .await?
            .map_or(1, |previous| previous.attempt.saturating_add(1));

        let submission = GradedSubmission {
            user_id: user.clone(),
            question_id: question.id.clone(),
            section: question.section,
            answer: answer.raw_text(),
            is_correct,
            score: grade.score,
            feedback: grade.feedback,
            details: grade.details,
            attempt,
            time_spent_secs,
            submitted_at: self.clock.now(),
        };
        self.submissions.upsert_submission(&submission).await?;

        let mut progress = self.section_progress(user, question.section).await?;
        progress.record(is_correct, submission.score);
        self.submissions.upsert_section_progress(&progress).await?;

        tracing::info!(
            user = %user,
            question = %question.id,
            section = question.section.as_str(),
            score = submission.score,
            is_correct,
            attempt,
            "submission graded"
        );
        Ok(submission)
    }

    /// Running totals for a section; empty totals when nothing was submitted yet.
    ///
    /// # Errors
    ///
    /// Returns `GradingError::Storage` if repository access fails.
    pub async fn section_progress(
        &self,
        user: &UserId,
        section: Section,
    ) -> Result<SectionProgress, GradingError> {
        Ok(self
            .submissions
            .get_section_progress(user, section)
            .await?
            .unwrap_or_else(|| SectionProgress::empty(user.clone(), section)))
    }

    async fn grade_free_text(
        &self,
        rubric: &Rubric,
        question: &PracticeQuestion,
        text: &str,
    ) -> Grade {
        let request = StructuredRequest {
            schema_name: rubric.schema_name(),
            system_prompt: rubric.system_prompt.to_owned(),
            user_prompt: rubric.user_prompt(question, text),
            schema: grading_schema(rubric.criteria),
        };

        let outcome = generate_checked(self.model.as_ref(), &request, |reply: GradeReply| {
            repair(reply, rubric)
        })
        .await;
        match outcome {
            LlmOutcome::Parsed(grade) => grade,
            LlmOutcome::Malformed { raw, reason } => {
                tracing::warn!(
                    question = %question.id,
                    %reason,
                    raw_len = raw.len(),
                    "grading reply did not match the rubric; storing fallback score"
                );
                Grade::fallback()
            }
            LlmOutcome::Transport(err) => {
                tracing::warn!(
                    question = %question.id,
                    error = %err,
                    "grading request failed; storing fallback score"
                );
                Grade::fallback()
            }
        }
    }
}

fn grade_objective(matched: bool, expected: &Answer) -> Grade {
    if matched {
        Grade {
            score: MAX_BAND_SCORE,
            feedback: "Correct.".to_owned(),
            details: BTreeMap::new(),
        }
    } else {
        Grade {
            score: 0.0,
            feedback: format!("Incorrect. Expected: {}", expected.raw_text()),
            details: BTreeMap::new(),
        }
    }
}
