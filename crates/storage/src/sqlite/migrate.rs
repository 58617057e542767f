use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs versioned migrations for the tracker schema.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: task records, week progress, check-ins.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS task_records (
                    user_id TEXT NOT NULL,
                    week INTEGER NOT NULL CHECK (week >= 1),
                    task_id TEXT NOT NULL,
                    completed INTEGER NOT NULL CHECK (completed IN (0, 1)),
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, week, task_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS week_progress (
                    user_id TEXT NOT NULL,
                    week INTEGER NOT NULL CHECK (week >= 1),
                    tasks_completed INTEGER NOT NULL CHECK (tasks_completed >= 0),
                    total_tasks INTEGER NOT NULL CHECK (total_tasks >= 0),
                    completion_percentage INTEGER NOT NULL
                        CHECK (completion_percentage BETWEEN 0 AND 100),
                    PRIMARY KEY (user_id, week)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS daily_check_ins (
                    user_id TEXT NOT NULL,
                    date TEXT NOT NULL,
                    activities TEXT NOT NULL,
                    notes TEXT NOT NULL,
                    streak_count INTEGER NOT NULL CHECK (streak_count >= 0),
                    recorded_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, date)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        mark_applied(&mut tx, 1).await?;
        tx.commit().await?;
    }

    // Version 2: graded submissions and section totals.
    if !is_applied(pool, 2).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS graded_submissions (
                    user_id TEXT NOT NULL,
                    question_id TEXT NOT NULL,
                    section TEXT NOT NULL,
                    answer TEXT NOT NULL,
                    is_correct INTEGER NOT NULL CHECK (is_correct IN (0, 1)),
                    score REAL NOT NULL CHECK (score BETWEEN 0 AND 90),
                    feedback TEXT NOT NULL,
                    details TEXT NOT NULL,
                    attempt INTEGER NOT NULL CHECK (attempt >= 1),
                    time_spent_secs INTEGER NOT NULL CHECK (time_spent_secs >= 0),
                    submitted_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, question_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS section_progress (
                    user_id TEXT NOT NULL,
                    section TEXT NOT NULL,
                    correct_answers INTEGER NOT NULL CHECK (correct_answers >= 0),
                    total_questions INTEGER NOT NULL CHECK (total_questions >= 0),
                    completion_percentage INTEGER NOT NULL
                        CHECK (completion_percentage BETWEEN 0 AND 100),
                    average_score REAL NOT NULL,
                    PRIMARY KEY (user_id, section)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        mark_applied(&mut tx, 2).await?;
        tx.commit().await?;
    }

    Ok(())
}

async fn mark_applied(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    version: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(version)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;
    Ok(())
}
