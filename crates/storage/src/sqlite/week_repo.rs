use async_trait::async_trait;
use sqlx::Row;
use tracker_core::model::{UserId, WeekNumber, WeekProgress};

use super::SqliteRepository;
use super::mapping::{conn, ser, u32_from_i64, user_id, week_from_i64};
use crate::repository::{StorageError, WeekProgressRepository};

fn map_week_row(row: &sqlx::sqlite::SqliteRow) -> Result<WeekProgress, StorageError> {
    let completed = u32_from_i64(
        "tasks_completed",
        row.try_get::<i64, _>("tasks_completed").map_err(ser)?,
    )?;
    let total = u32_from_i64("total_tasks", row.try_get::<i64, _>("total_tasks").map_err(ser)?)?;
    Ok(WeekProgress::new(
        user_id(row.try_get("user_id").map_err(ser)?)?,
        week_from_i64(row.try_get("week").map_err(ser)?)?,
        completed,
        total,
    ))
}

#[async_trait]
impl WeekProgressRepository for SqliteRepository {
    async fn get_week_progress(
        &self,
        user: &UserId,
        week: WeekNumber,
    ) -> Result<Option<WeekProgress>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT user_id, week, tasks_completed, total_tasks
                FROM week_progress
                WHERE user_id = ?1 AND week = ?2
            ",
        )
        .bind(user.as_str())
        .bind(i64::from(week.value()))
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_week_row).transpose()
    }

    async fn upsert_week_progress(&self, progress: &WeekProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO week_progress (
                    user_id, week, tasks_completed, total_tasks, completion_percentage
                )
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(user_id, week) DO UPDATE SET
                    tasks_completed = excluded.tasks_completed,
                    total_tasks = excluded.total_tasks,
                    completion_percentage = excluded.completion_percentage
            ",
        )
        .bind(progress.user_id().as_str())
        .bind(i64::from(progress.week().value()))
        .bind(i64::from(progress.tasks_completed()))
        .bind(i64::from(progress.total_tasks()))
        .bind(i64::from(progress.completion_percentage()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn list_week_progress(&self, user: &UserId) -> Result<Vec<WeekProgress>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT user_id, week, tasks_completed, total_tasks
                FROM week_progress
                WHERE user_id = ?1
                ORDER BY week ASC
            ",
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_week_row).collect()
    }
}
