use std::sync::Arc;

use serde::Serialize;
use storage::repository::TaskRepository;
use tracker_core::Clock;
use tracker_core::model::{
    AttemptError, AttemptPhase, QuizAttempt, QuizOutcome, TaskDefinition, TaskId, UserId,
    WeekNumber, WeekProgress,
};

use crate::assessment_service::AssessmentService;
use crate::attempts::AttemptSessions;
use crate::error::GateError;
use crate::llm::LlmOutcome;
use crate::progress_service::ProgressService;

/// One question as presented to the learner.
///
/// The answer key and explanation stay hidden until the check is finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub question: String,
    pub options: Vec<String>,
    pub selected: Option<usize>,
    pub correct_answer: Option<usize>,
    pub explanation: Option<String>,
}

/// Presentation snapshot of a comprehension check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptView {
    pub week: WeekNumber,
    pub task_id: TaskId,
    pub phase: AttemptPhase,
    pub current_index: usize,
    pub answered: usize,
    pub questions: Vec<QuestionView>,
}

impl AttemptView {
    #[must_use]
    pub fn current(&self) -> Option<&QuestionView> {
        self.questions.get(self.current_index)
    }

    #[must_use]
    pub fn is_answering(&self) -> bool {
        matches!(self.phase, AttemptPhase::Answering)
    }
}

impl From<&QuizAttempt> for AttemptView {
    fn from(attempt: &QuizAttempt) -> Self {
        let reveal = !matches!(attempt.phase(), AttemptPhase::Answering);
        let questions = attempt
            .questions()
            .questions()
            .iter()
            .zip(attempt.answers())
            .map(|(q, selected)| QuestionView {
                question: q.question.clone(),
                options: q.options.clone(),
                selected: *selected,
                correct_answer: reveal.then_some(q.correct_answer),
                explanation: reveal.then(|| q.explanation.clone()),
            })
            .collect();

        Self {
            week: attempt.week(),
            task_id: attempt.task_id().clone(),
            phase: attempt.phase(),
            current_index: attempt.current_index(),
            answered: attempt.answered_count(),
            questions,
        }
    }
}

/// What happened when completion was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum CompletionStep {
    /// The task was already complete; nothing changed.
    AlreadyComplete { progress: WeekProgress },
    /// No check could be generated, so the task was completed directly.
    CheckUnavailable { progress: WeekProgress },
    /// A check must be passed first.
    InQuiz { attempt: AttemptView },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ToggleResult {
    Unmarked { progress: WeekProgress },
    Completion { step: CompletionStep },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum FinishResult {
    /// Task recorded complete and the attempt cleared.
    Passed {
        score: u8,
        progress: WeekProgress,
        attempt: AttemptView,
    },
    /// Attempt kept; only retry or skip are accepted now.
    Failed { score: u8, attempt: AttemptView },
}

/// Gates task completion behind a passing comprehension check.
///
/// Un-marking never needs a check. A failed check generation completes the
/// task directly.
#[derive(Clone)]
pub struct CompletionGate {
    clock: Clock,
    tasks: Arc<dyn TaskRepository>,
    progress: Arc<ProgressService>,
    assessment: Arc<AssessmentService>,
    attempts: Arc<AttemptSessions>,
}

impl CompletionGate {
    #[must_use]
    pub fn new(
        clock: Clock,
        tasks: Arc<dyn TaskRepository>,
        progress: Arc<ProgressService>,
        assessment: Arc<AssessmentService>,
        attempts: Arc<AttemptSessions>,
    ) -> Self {
        Self {
            clock,
            tasks,
            progress,
            assessment,
            attempts,
        }
    }

    /// Ask to mark a task complete.
    ///
    /// Returns the live attempt if one already exists for this task instead of
    /// generating a new check.
    ///
    /// # Errors
    ///
    /// Returns `GateError::EmptyTaskText` for a blank description,
    /// `GateError::UnknownWeek`/`GateError::UnknownTask` when the task is not in
    /// the curriculum, and `GateError::Storage`/`GateError::Progress` on
    /// persistence failures.
    pub async fn request_completion(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
        task_text: &str,
    ) -> Result<CompletionStep, GateError> {
        let task_text = task_text.trim();
        if task_text.is_empty() {
            return Err(GateError::EmptyTaskText);
        }
        self.task_definition(week, task)?;

        if self.tasks.get_task_state(user, week, task).await? {
            let progress = self.progress.week_progress(user, week).await?;
            return Ok(CompletionStep::AlreadyComplete { progress });
        }

        let now = self.clock.now();
        if let Some(live) = self.attempts.get(user, week, task, now).await {
            return Ok(CompletionStep::InQuiz {
                attempt: AttemptView::from(&live),
            });
        }

        let reason = match self.assessment.generate_check(task_text, week).await {
            LlmOutcome::Parsed(quiz) => {
                let attempt = QuizAttempt::new(week, task.clone(), quiz);
                let view = AttemptView::from(&attempt);
                self.attempts.insert(user, attempt, now).await;
                tracing::info!(user = %user, week = %week, task = %task, "comprehension check started");
                return Ok(CompletionStep::InQuiz { attempt: view });
            }
            LlmOutcome::Malformed { reason, .. } => format!("malformed reply: {reason}"),
            LlmOutcome::Transport(err) => err.to_string(),
        };

        tracing::warn!(
            user = %user,
            week = %week,
            task = %task,
            %reason,
            "comprehension check unavailable; completing task directly"
        );
        let progress = self.record(user, week, task, true).await?;
        Ok(CompletionStep::CheckUnavailable { progress })
    }

    /// Mark a task incomplete. Always allowed; discards any attempt for it.
    ///
    /// # Errors
    ///
    /// Returns `GateError::UnknownWeek`/`GateError::UnknownTask` when the task
    /// is not in the curriculum and `GateError::Storage`/`GateError::Progress`
    /// on persistence failures.
    pub async fn mark_incomplete(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
    ) -> Result<WeekProgress, GateError> {
        self.task_definition(week, task)?;
        self.attempts.remove(user, week, task, self.clock.now()).await;
        let progress = self.record(user, week, task, false).await?;
        tracing::info!(user = %user, week = %week, task = %task, "task marked incomplete");
        Ok(progress)
    }

    /// Flip a task: complete tasks are un-marked, others go through the gate
    /// using the curriculum's task description.
    ///
    /// # Errors
    ///
    /// See [`CompletionGate::request_completion`] and [`CompletionGate::mark_incomplete`].
    pub async fn toggle(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
    ) -> Result<ToggleResult, GateError> {
        let text = self.task_definition(week, task)?.text.clone();
        if self.tasks.get_task_state(user, week, task).await? {
            let progress = self.mark_incomplete(user, week, task).await?;
            Ok(ToggleResult::Unmarked { progress })
        } else {
            let step = self.request_completion(user, week, task, &text).await?;
            Ok(ToggleResult::Completion { step })
        }
    }

    /// Current view of the live attempt, if any.
    pub async fn attempt(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
    ) -> Option<AttemptView> {
        self.attempts
            .get(user, week, task, self.clock.now())
            .await
            .as_ref()
            .map(AttemptView::from)
    }

    /// Select (or change) the answer for the current question.
    ///
    /// # Errors
    ///
    /// Returns `GateError::NoActiveAttempt` without a live attempt and
    /// `GateError::Attempt` when the attempt rejects the selection.
    pub async fn select_answer(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
        option: usize,
    ) -> Result<AttemptView, GateError> {
        self.step(user, week, task, |a| a.select(option)).await
    }

    /// # Errors
    ///
    /// Returns `GateError::NoActiveAttempt` without a live attempt and
    /// `GateError::Attempt` when the question cannot be reached yet.
    pub async fn go_to_question(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
        index: usize,
    ) -> Result<AttemptView, GateError> {
        self.step(user, week, task, |a| a.go_to(index)).await
    }

    /// # Errors
    ///
    /// See [`CompletionGate::go_to_question`].
    pub async fn next_question(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
    ) -> Result<AttemptView, GateError> {
        self.step(user, week, task, QuizAttempt::next).await
    }

    /// # Errors
    ///
    /// See [`CompletionGate::go_to_question`].
    pub async fn previous_question(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
    ) -> Result<AttemptView, GateError> {
        self.step(user, week, task, QuizAttempt::previous).await
    }

    /// Score the check. A pass records the task complete and then clears the
    /// attempt. If recording fails the passed attempt is kept and a later
    /// `finish` records it again.
    ///
    /// # Errors
    ///
    /// Returns `GateError::NoActiveAttempt` without a live attempt,
    /// `GateError::Attempt` if questions are unanswered, and
    /// `GateError::Storage`/`GateError::Progress` on persistence failures.
    pub async fn finish(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
    ) -> Result<FinishResult, GateError> {
        let now = self.clock.now();
        let (outcome, attempt) = self
            .attempts
            .update(user, week, task, now, |a| {
                let outcome = match a.phase() {
                    AttemptPhase::Passed { score } => Ok(QuizOutcome::Passed { score }),
                    _ => a.finish(),
                };
                outcome.map(|outcome| (outcome, AttemptView::from(&*a)))
            })
            .await
            .ok_or_else(|| GateError::NoActiveAttempt(task.clone()))??;

        match outcome {
            QuizOutcome::Passed { score } => {
                let progress = self.record(user, week, task, true).await?;
                self.attempts.remove(user, week, task, now).await;
                tracing::info!(user = %user, week = %week, task = %task, score, "comprehension check passed");
                Ok(FinishResult::Passed {
                    score,
                    progress,
                    attempt,
                })
            }
            QuizOutcome::Failed { score } => {
                tracing::info!(user = %user, week = %week, task = %task, score, "comprehension check failed");
                Ok(FinishResult::Failed { score, attempt })
            }
        }
    }

    /// Restart a failed check with the same questions.
    ///
    /// # Errors
    ///
    /// Returns `GateError::NoActiveAttempt` without a live attempt and
    /// `GateError::Attempt` unless the check was failed.
    pub async fn retry(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
    ) -> Result<AttemptView, GateError> {
        self.step(user, week, task, QuizAttempt::retry).await
    }

    /// Abandon the check. The task stays incomplete.
    ///
    /// # Errors
    ///
    /// Returns `GateError::NoActiveAttempt` without a live attempt.
    pub async fn skip(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
    ) -> Result<(), GateError> {
        self.attempts
            .remove(user, week, task, self.clock.now())
            .await
            .ok_or_else(|| GateError::NoActiveAttempt(task.clone()))?;
        tracing::info!(user = %user, week = %week, task = %task, "comprehension check skipped");
        Ok(())
    }

    async fn step(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
        f: impl FnOnce(&mut QuizAttempt) -> Result<(), AttemptError>,
    ) -> Result<AttemptView, GateError> {
        let view = self
            .attempts
            .update(user, week, task, self.clock.now(), |a| {
                f(a).map(|()| AttemptView::from(&*a))
            })
            .await
            .ok_or_else(|| GateError::NoActiveAttempt(task.clone()))??;
        Ok(view)
    }

    async fn record(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
        completed: bool,
    ) -> Result<WeekProgress, GateError> {
        self.tasks
            .set_task_state(user, week, task, completed, self.clock.now())
            .await?;
        Ok(self.progress.refresh_week(user, week).await?)
    }

    fn task_definition(
        &self,
        week: WeekNumber,
        task: &TaskId,
    ) -> Result<&TaskDefinition, GateError> {
        self.progress
            .curriculum()
            .week(week)
            .ok_or(GateError::UnknownWeek(week))?
            .task(task)
            .ok_or_else(|| GateError::UnknownTask {
                week,
                task: task.clone(),
            })
    }
}
