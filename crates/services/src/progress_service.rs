use std::collections::HashMap;
use std::sync::Arc;

use storage::repository::{TaskRepository, WeekProgressRepository};
use tracker_core::model::{TrackId, UserId, WeekDefinition, WeekNumber, WeekProgress};
use tracker_core::{ProgressRollup, rollup};

use crate::curriculum::CurriculumSource;
use crate::error::ProgressError;

/// Maintains week progress records and derives track/overall rollups.
#[derive(Clone)]
pub struct ProgressService {
    curriculum: Arc<dyn CurriculumSource>,
    tasks: Arc<dyn TaskRepository>,
    weeks: Arc<dyn WeekProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        curriculum: Arc<dyn CurriculumSource>,
        tasks: Arc<dyn TaskRepository>,
        weeks: Arc<dyn WeekProgressRepository>,
    ) -> Self {
        Self {
            curriculum,
            tasks,
            weeks,
        }
    }

    #[must_use]
    pub fn curriculum(&self) -> &Arc<dyn CurriculumSource> {
        &self.curriculum
    }

    /// Overwrite the week record with caller-supplied counts.
    ///
    /// `total_tasks` is trusted as given; completions above it clamp the
    /// percentage at 100.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the upsert fails.
    pub async fn recompute(
        &self,
        user: &UserId,
        week: WeekNumber,
        tasks_completed: u32,
        total_tasks: u32,
    ) -> Result<WeekProgress, ProgressError> {
        let progress = WeekProgress::new(user.clone(), week, tasks_completed, total_tasks);
        self.weeks.upsert_week_progress(&progress).await?;
        tracing::debug!(
            user = %user,
            week = %week,
            completed = tasks_completed,
            total = total_tasks,
            percentage = progress.completion_percentage(),
            "week progress recomputed"
        );
        Ok(progress)
    }

    /// Recompute a week from its task records, taking the task total from the
    /// curriculum. Records for task ids the curriculum does not list are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownWeek` if the curriculum has no such week.
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn refresh_week(
        &self,
        user: &UserId,
        week: WeekNumber,
    ) -> Result<WeekProgress, ProgressError> {
        let definition = self
            .curriculum
            .week(week)
            .ok_or(ProgressError::UnknownWeek(week))?;
        let total = definition.total_tasks();

        let records = self.tasks.list_tasks(user, week).await?;
        let completed = records
            .iter()
            .filter(|r| r.completed && definition.task(&r.task_id).is_some())
            .count();
        let completed = u32::try_from(completed).unwrap_or(u32::MAX);

        self.recompute(user, week, completed, total).await
    }

    /// Stored progress for a week, or an untouched record when none exists yet.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownWeek` if the curriculum has no such week.
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn week_progress(
        &self,
        user: &UserId,
        week: WeekNumber,
    ) -> Result<WeekProgress, ProgressError> {
        let definition = self
            .curriculum
            .week(week)
            .ok_or(ProgressError::UnknownWeek(week))?;
        let stored = self.weeks.get_week_progress(user, week).await?;
        Ok(stored.unwrap_or_else(|| {
            WeekProgress::untouched(user.clone(), week, definition.total_tasks())
        }))
    }

    /// Rollup over one track's weeks.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownTrack` if the curriculum has no such track.
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn track_summary(
        &self,
        user: &UserId,
        track: &TrackId,
    ) -> Result<ProgressRollup, ProgressError> {
        let definition = self
            .curriculum
            .tracks()
            .iter()
            .find(|t| &t.id == track)
            .ok_or_else(|| ProgressError::UnknownTrack(track.clone()))?;
        self.summarize(user, definition.weeks.iter()).await
    }

    /// Rollup over every week of every track.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if repository access fails.
    pub async fn overall_summary(&self, user: &UserId) -> Result<ProgressRollup, ProgressError> {
        let weeks = self.curriculum.tracks().iter().flat_map(|t| t.weeks.iter());
        self.summarize(user, weeks).await
    }

    async fn summarize<'a>(
        &'a self,
        user: &UserId,
        weeks: impl Iterator<Item = &'a WeekDefinition>,
    ) -> Result<ProgressRollup, ProgressError> {
        let mut stored: HashMap<WeekNumber, WeekProgress> = self
            .weeks
            .list_week_progress(user)
            .await?
            .into_iter()
            .map(|p| (p.week(), p))
            .collect();

        let paired = weeks
            .map(|def| {
                let progress = stored.remove(&def.number).unwrap_or_else(|| {
                    WeekProgress::untouched(user.clone(), def.number, def.total_tasks())
                });
                (def, progress)
            })
            .collect();
        Ok(rollup(paired))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::Storage;
    use tracker_core::model::{Curriculum, TaskDefinition, TaskId, Track};
    use tracker_core::time::fixed_now;

    fn week_def(number: u32, phase: &str, tasks: u32) -> WeekDefinition {
        WeekDefinition {
            number: WeekNumber::new(number).unwrap(),
            title: format!("Week {number}"),
            phase: phase.into(),
            tasks: (1..=tasks)
                .map(|i| TaskDefinition {
                    id: TaskId::new(format!("{number}-{i}")).unwrap(),
                    text: format!("Task {i}"),
                })
                .collect(),
        }
    }

    fn curriculum() -> Arc<dyn CurriculumSource> {
        Arc::new(
            Curriculum::new(vec![
                Track {
                    id: TrackId::new("pro").unwrap(),
                    title: "Professional".into(),
                    weeks: vec![week_def(1, "Foundations", 4), week_def(2, "Build", 2)],
                },
                Track {
                    id: TrackId::new("personal").unwrap(),
                    title: "Personal".into(),
                    weeks: vec![week_def(10, "Habits", 3)],
                },
            ])
            .unwrap(),
        )
    }

    fn service() -> (ProgressService, Storage) {
        let storage = Storage::in_memory();
        let svc = ProgressService::new(
            curriculum(),
            Arc::clone(&storage.tasks),
            Arc::clone(&storage.weeks),
        );
        (svc, storage)
    }

    fn user() -> UserId {
        UserId::new("u1").unwrap()
    }

    fn week(n: u32) -> WeekNumber {
        WeekNumber::new(n).unwrap()
    }

    #[tokio::test]
    async fn recompute_trusts_counts_and_clamps() {
        let (svc, _) = service();
        let p = svc.recompute(&user(), week(1), 3, 4).await.unwrap();
        assert_eq!(p.completion_percentage(), 75);
        let over = svc.recompute(&user(), week(1), 6, 4).await.unwrap();
        assert_eq!(over.completion_percentage(), 100);
        let empty = svc.recompute(&user(), week(1), 0, 0).await.unwrap();
        assert_eq!(empty.completion_percentage(), 0);
    }

    #[tokio::test]
    async fn refresh_counts_only_curriculum_tasks() {
        let (svc, storage) = service();
        let at = fixed_now();
        for id in ["1-1", "1-3", "9-9"] {
            storage
                .tasks
                .set_task_state(&user(), week(1), &TaskId::new(id).unwrap(), true, at)
                .await
                .unwrap();
        }
        storage
            .tasks
            .set_task_state(&user(), week(1), &TaskId::new("1-2").unwrap(), false, at)
            .await
            .unwrap();

        let p = svc.refresh_week(&user(), week(1)).await.unwrap();
        assert_eq!(p.tasks_completed(), 2);
        assert_eq!(p.total_tasks(), 4);
        assert_eq!(p.completion_percentage(), 50);

        let again = svc.refresh_week(&user(), week(1)).await.unwrap();
        assert_eq!(again, p);
    }

    #[tokio::test]
    async fn unknown_week_is_rejected() {
        let (svc, _) = service();
        assert!(matches!(
            svc.refresh_week(&user(), week(5)).await,
            Err(ProgressError::UnknownWeek(_))
        ));
        assert!(matches!(
            svc.week_progress(&user(), week(5)).await,
            Err(ProgressError::UnknownWeek(_))
        ));
    }

    #[tokio::test]
    async fn track_summary_counts_missing_weeks_as_zero() {
        let (svc, _) = service();
        svc.recompute(&user(), week(1), 4, 4).await.unwrap();

        let summary = svc
            .track_summary(&user(), &TrackId::new("pro").unwrap())
            .await
            .unwrap();
        assert_eq!(summary.weeks.len(), 2);
        assert_eq!(summary.overall_completion, 50);
        assert_eq!(summary.weeks_completed, 1);
        assert_eq!(summary.current_phase.as_deref(), Some("Build"));

        assert!(matches!(
            svc.track_summary(&user(), &TrackId::new("nope").unwrap()).await,
            Err(ProgressError::UnknownTrack(_))
        ));
    }

    #[tokio::test]
    async fn overall_summary_spans_tracks() {
        let (svc, _) = service();
        svc.recompute(&user(), week(1), 4, 4).await.unwrap();
        svc.recompute(&user(), week(2), 2, 2).await.unwrap();
        svc.recompute(&user(), week(10), 1, 3).await.unwrap();

        let summary = svc.overall_summary(&user()).await.unwrap();
        assert_eq!(summary.weeks.len(), 3);
        // (100 + 100 + 33) / 3 = 77.67
        assert_eq!(summary.overall_completion, 78);
        assert_eq!(summary.weeks_completed, 2);
        assert_eq!(summary.current_phase.as_deref(), Some("Habits"));
    }
}
