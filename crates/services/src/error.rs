//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use tracker_core::model::{AttemptError, CurriculumError, SubmissionError, WeekNumber};
use tracker_core::model::{TaskId, TrackId};

/// Transport-level failures of a language model call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LlmError {
    #[error("language model is not configured")]
    Disabled,
    #[error("language model returned an empty response")]
    EmptyResponse,
    #[error("language model request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("week {0} is not in the curriculum")]
    UnknownWeek(WeekNumber),
    #[error("track {0} is not in the curriculum")]
    UnknownTrack(TrackId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CompletionGate`.
///
/// Assessment failures never appear here; they fall back to direct completion.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GateError {
    #[error("task description cannot be empty")]
    EmptyTaskText,
    #[error("week {0} is not in the curriculum")]
    UnknownWeek(WeekNumber),
    #[error("task {task} is not part of week {week}")]
    UnknownTask { week: WeekNumber, task: TaskId },
    #[error("no active comprehension check for task {0}")]
    NoActiveAttempt(TaskId),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CheckInService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CheckInServiceError {
    #[error("invalid calendar month {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `GradingService`.
///
/// Model failures never appear here; they fall back to a neutral score.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GradingError {
    #[error("question {0} has no answer key")]
    MissingAnswerKey(String),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while loading curriculum content.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CurriculumLoadError {
    #[error("failed to read curriculum: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse curriculum: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] CurriculumError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Curriculum(#[from] CurriculumLoadError),
}
