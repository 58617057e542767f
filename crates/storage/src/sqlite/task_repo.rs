use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracker_core::model::{TaskId, TaskRecord, UserId, WeekNumber};

use super::SqliteRepository;
use super::mapping::{conn, ser, task_id, user_id, week_from_i64};
use crate::repository::{StorageError, TaskRepository};

#[async_trait]
impl TaskRepository for SqliteRepository {
    async fn get_task_state(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
    ) -> Result<bool, StorageError> {
        let row = sqlx::query(
            r"
                SELECT completed
                FROM task_records
                WHERE user_id = ?1 AND week = ?2 AND task_id = ?3
            ",
        )
        .bind(user.as_str())
        .bind(i64::from(week.value()))
        .bind(task.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        match row {
            Some(row) => Ok(row.try_get::<bool, _>("completed").map_err(ser)?),
            None => Ok(false),
        }
    }

    async fn set_task_state(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
        completed: bool,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO task_records (user_id, week, task_id, completed, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(user_id, week, task_id) DO UPDATE SET
                    completed = excluded.completed,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(user.as_str())
        .bind(i64::from(week.value()))
        .bind(task.as_str())
        .bind(completed)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn list_tasks(
        &self,
        user: &UserId,
        week: WeekNumber,
    ) -> Result<Vec<TaskRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT user_id, week, task_id, completed, updated_at
                FROM task_records
                WHERE user_id = ?1 AND week = ?2
                ORDER BY task_id ASC
            ",
        )
        .bind(user.as_str())
        .bind(i64::from(week.value()))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(TaskRecord {
                user_id: user_id(row.try_get("user_id").map_err(ser)?)?,
                week: week_from_i64(row.try_get("week").map_err(ser)?)?,
                task_id: task_id(row.try_get("task_id").map_err(ser)?)?,
                completed: row.try_get("completed").map_err(ser)?,
                updated_at: row.try_get("updated_at").map_err(ser)?,
            });
        }
        Ok(out)
    }
}
