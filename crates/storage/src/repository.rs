use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracker_core::model::{
    DailyCheckIn, GradedSubmission, QuestionId, Section, SectionProgress, TaskId, TaskRecord,
    UserId, WeekNumber, WeekProgress,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Per-task completion flags, keyed by (user, week, task).
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Whether the task is recorded complete. Missing records read as `false`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_task_state(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
    ) -> Result<bool, StorageError>;

    /// Create or update a task record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn set_task_state(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
        completed: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// All task records for a user's week.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_tasks(
        &self,
        user: &UserId,
        week: WeekNumber,
    ) -> Result<Vec<TaskRecord>, StorageError>;
}

/// Stored week aggregates, keyed by (user, week).
#[async_trait]
pub trait WeekProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_week_progress(
        &self,
        user: &UserId,
        week: WeekNumber,
    ) -> Result<Option<WeekProgress>, StorageError>;

    /// Overwrite the aggregate for the record's (user, week).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_week_progress(&self, progress: &WeekProgress) -> Result<(), StorageError>;

    /// Every stored week for a user, ordered by week number.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_week_progress(&self, user: &UserId) -> Result<Vec<WeekProgress>, StorageError>;
}

/// Daily check-ins, at most one per (user, date).
#[async_trait]
pub trait CheckInRepository: Send + Sync {
    /// Insert or overwrite the check-in for its date.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_check_in(&self, check_in: &DailyCheckIn) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_check_in(
        &self,
        user: &UserId,
        date: NaiveDate,
    ) -> Result<Option<DailyCheckIn>, StorageError>;

    /// Dates with a check-in on or after `since`, ascending.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn check_in_dates_since(
        &self,
        user: &UserId,
        since: NaiveDate,
    ) -> Result<Vec<NaiveDate>, StorageError>;
}

/// Graded submissions and per-section running totals.
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_submission(
        &self,
        user: &UserId,
        question: &QuestionId,
    ) -> Result<Option<GradedSubmission>, StorageError>;

    /// Insert or amend the submission for (user, question).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_submission(&self, submission: &GradedSubmission) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_section_progress(
        &self,
        user: &UserId,
        section: Section,
    ) -> Result<Option<SectionProgress>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_section_progress(&self, progress: &SectionProgress)
    -> Result<(), StorageError>;
}

type TaskKey = (UserId, WeekNumber, TaskId);

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tasks: Arc<Mutex<HashMap<TaskKey, TaskRecord>>>,
    weeks: Arc<Mutex<HashMap<(UserId, WeekNumber), WeekProgress>>>,
    check_ins: Arc<Mutex<HashMap<(UserId, NaiveDate), DailyCheckIn>>>,
    submissions: Arc<Mutex<HashMap<(UserId, QuestionId), GradedSubmission>>>,
    sections: Arc<Mutex<HashMap<(UserId, Section), SectionProgress>>>,
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    m.lock().map_err(|e| StorageError::Connection(e.to_string()))
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryRepository {
    async fn get_task_state(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
    ) -> Result<bool, StorageError> {
        let guard = lock(&self.tasks)?;
        Ok(guard
            .get(&(user.clone(), week, task.clone()))
            .is_some_and(|r| r.completed))
    }

    async fn set_task_state(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
        completed: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = lock(&self.tasks)?;
        guard.insert(
            (user.clone(), week, task.clone()),
            TaskRecord {
                user_id: user.clone(),
                week,
                task_id: task.clone(),
                completed,
                updated_at: at,
            },
        );
        Ok(())
    }

    async fn list_tasks(
        &self,
        user: &UserId,
        week: WeekNumber,
    ) -> Result<Vec<TaskRecord>, StorageError> {
        let guard = lock(&self.tasks)?;
        let mut out: Vec<TaskRecord> = guard
            .values()
            .filter(|r| &r.user_id == user && r.week == week)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        Ok(out)
    }
}

#[async_trait]
impl WeekProgressRepository for InMemoryRepository {
    async fn get_week_progress(
        &self,
        user: &UserId,
        week: WeekNumber,
    ) -> Result<Option<WeekProgress>, StorageError> {
        let guard = lock(&self.weeks)?;
        Ok(guard.get(&(user.clone(), week)).cloned())
    }

    async fn upsert_week_progress(&self, progress: &WeekProgress) -> Result<(), StorageError> {
        let mut guard = lock(&self.weeks)?;
        guard.insert(
            (progress.user_id().clone(), progress.week()),
            progress.clone(),
        );
        Ok(())
    }

    async fn list_week_progress(&self, user: &UserId) -> Result<Vec<WeekProgress>, StorageError> {
        let guard = lock(&self.weeks)?;
        let mut out: Vec<WeekProgress> = guard
            .values()
            .filter(|p| p.user_id() == user)
            .cloned()
            .collect();
        out.sort_by_key(WeekProgress::week);
        Ok(out)
    }
}

#[async_trait]
impl CheckInRepository for InMemoryRepository {
    async fn upsert_check_in(&self, check_in: &DailyCheckIn) -> Result<(), StorageError> {
        let mut guard = lock(&self.check_ins)?;
        guard.insert(
            (check_in.user_id().clone(), check_in.date()),
            check_in.clone(),
        );
        Ok(())
    }

    async fn get_check_in(
        &self,
        user: &UserId,
        date: NaiveDate,
    ) -> Result<Option<DailyCheckIn>, StorageError> {
        let guard = lock(&self.check_ins)?;
        Ok(guard.get(&(user.clone(), date)).cloned())
    }

    async fn check_in_dates_since(
        &self,
        user: &UserId,
        since: NaiveDate,
    ) -> Result<Vec<NaiveDate>, StorageError> {
        let guard = lock(&self.check_ins)?;
        let mut out: Vec<NaiveDate> = guard
            .keys()
            .filter(|(u, d)| u == user && *d >= since)
            .map(|(_, d)| *d)
            .collect();
        out.sort_unstable();
        Ok(out)
    }
}

#[async_trait]
impl SubmissionRepository for InMemoryRepository {
    async fn get_submission(
        &self,
        user: &UserId,
        question: &QuestionId,
    ) -> Result<Option<GradedSubmission>, StorageError> {
        let guard = lock(&self.submissions)?;
        Ok(guard.get(&(user.clone(), question.clone())).cloned())
    }

    async fn upsert_submission(&self, submission: &GradedSubmission) -> Result<(), StorageError> {
        let mut guard = lock(&self.submissions)?;
        guard.insert(
            (submission.user_id.clone(), submission.question_id.clone()),
            submission.clone(),
        );
        Ok(())
    }

    async fn get_section_progress(
        &self,
        user: &UserId,
        section: Section,
    ) -> Result<Option<SectionProgress>, StorageError> {
        let guard = lock(&self.sections)?;
        Ok(guard.get(&(user.clone(), section)).cloned())
    }

    async fn upsert_section_progress(
        &self,
        progress: &SectionProgress,
    ) -> Result<(), StorageError> {
        let mut guard = lock(&self.sections)?;
        guard.insert((progress.user_id.clone(), progress.section), progress.clone());
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub tasks: Arc<dyn TaskRepository>,
    pub weeks: Arc<dyn WeekProgressRepository>,
    pub check_ins: Arc<dyn CheckInRepository>,
    pub submissions: Arc<dyn SubmissionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            tasks: Arc::new(repo.clone()),
            weeks: Arc::new(repo.clone()),
            check_ins: Arc::new(repo.clone()),
            submissions: Arc::new(repo),
        }
    }
}
