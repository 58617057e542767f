use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::Row;
use tracker_core::model::{
    format_check_in_date, parse_check_in_date, DailyCheckIn, UserId,
};

use super::SqliteRepository;
use super::mapping::{conn, ser, u32_from_i64, user_id};
use crate::repository::{CheckInRepository, StorageError};

#[async_trait]
impl CheckInRepository for SqliteRepository {
    async fn upsert_check_in(&self, check_in: &DailyCheckIn) -> Result<(), StorageError> {
        let activities = serde_json::to_string(check_in.activities()).map_err(ser)?;
        sqlx::query(
            r"
                INSERT INTO daily_check_ins (
                    user_id, date, activities, notes, streak_count, recorded_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(user_id, date) DO UPDATE SET
                    activities = excluded.activities,
                    notes = excluded.notes,
                    streak_count = excluded.streak_count,
                    recorded_at = excluded.recorded_at
            ",
        )
        .bind(check_in.user_id().as_str())
        .bind(format_check_in_date(check_in.date()))
        .bind(activities)
        .bind(check_in.notes())
        .bind(i64::from(check_in.streak_snapshot()))
        .bind(check_in.recorded_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn get_check_in(
        &self,
        user: &UserId,
        date: NaiveDate,
    ) -> Result<Option<DailyCheckIn>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT user_id, date, activities, notes, streak_count, recorded_at
                FROM daily_check_ins
                WHERE user_id = ?1 AND date = ?2
            ",
        )
        .bind(user.as_str())
        .bind(format_check_in_date(date))
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw_date: String = row.try_get("date").map_err(ser)?;
        let activities: String = row.try_get("activities").map_err(ser)?;
        let activities: Vec<String> = serde_json::from_str(&activities).map_err(ser)?;
        Ok(Some(DailyCheckIn::new(
            user_id(row.try_get("user_id").map_err(ser)?)?,
            parse_check_in_date(&raw_date).map_err(ser)?,
            activities,
            row.try_get::<String, _>("notes").map_err(ser)?,
            u32_from_i64("streak_count", row.try_get("streak_count").map_err(ser)?)?,
            row.try_get("recorded_at").map_err(ser)?,
        )))
    }

    async fn check_in_dates_since(
        &self,
        user: &UserId,
        since: NaiveDate,
    ) -> Result<Vec<NaiveDate>, StorageError> {
        // ISO dates compare correctly as text.
        let rows = sqlx::query(
            r"
                SELECT date
                FROM daily_check_ins
                WHERE user_id = ?1 AND date >= ?2
                ORDER BY date ASC
            ",
        )
        .bind(user.as_str())
        .bind(format_check_in_date(since))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| {
                let raw: String = row.try_get("date").map_err(ser)?;
                parse_check_in_date(&raw).map_err(ser)
            })
            .collect()
    }
}
