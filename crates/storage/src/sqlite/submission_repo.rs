use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::Row;
use tracker_core::model::{GradedSubmission, QuestionId, Section, SectionProgress, UserId};

use super::SqliteRepository;
use super::mapping::{conn, parse_section, question_id, ser, u32_from_i64, user_id};
use crate::repository::{StorageError, SubmissionRepository};

#[async_trait]
impl SubmissionRepository for SqliteRepository {
    async fn get_submission(
        &self,
        user: &UserId,
        question: &QuestionId,
    ) -> Result<Option<GradedSubmission>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    user_id, question_id, section, answer, is_correct, score,
                    feedback, details, attempt, time_spent_secs, submitted_at
                FROM graded_submissions
                WHERE user_id = ?1 AND question_id = ?2
            ",
        )
        .bind(user.as_str())
        .bind(question.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let section: String = row.try_get("section").map_err(ser)?;
        let details: String = row.try_get("details").map_err(ser)?;
        let details: BTreeMap<String, f64> = serde_json::from_str(&details).map_err(ser)?;
        Ok(Some(GradedSubmission {
            user_id: user_id(row.try_get("user_id").map_err(ser)?)?,
            question_id: question_id(row.try_get("question_id").map_err(ser)?)?,
            section: parse_section(&section)?,
            answer: row.try_get("answer").map_err(ser)?,
            is_correct: row.try_get("is_correct").map_err(ser)?,
            score: row.try_get("score").map_err(ser)?,
            feedback: row.try_get("feedback").map_err(ser)?,
            details,
            attempt: u32_from_i64("attempt", row.try_get("attempt").map_err(ser)?)?,
            time_spent_secs: u32_from_i64(
                "time_spent_secs",
                row.try_get("time_spent_secs").map_err(ser)?,
            )?,
            submitted_at: row.try_get("submitted_at").map_err(ser)?,
        }))
    }

    async fn upsert_submission(&self, submission: &GradedSubmission) -> Result<(), StorageError> {
        let details = serde_json::to_string(&submission.details).map_err(ser)?;
        sqlx::query(
            r"
                INSERT INTO graded_submissions (
                    user_id, question_id, section, answer, is_correct, score,
                    feedback, details, attempt, time_spent_secs, submitted_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                ON CONFLICT(user_id, question_id) DO UPDATE SET
                    section = excluded.section,
                    answer = excluded.answer,
                    is_correct = excluded.is_correct,
                    score = excluded.score,
                    feedback = excluded.feedback,
                    details = excluded.details,
                    attempt = excluded.attempt,
                    time_spent_secs = excluded.time_spent_secs,
                    submitted_at = excluded.submitted_at
            ",
        )
        .bind(submission.user_id.as_str())
        .bind(submission.question_id.as_str())
        .bind(submission.section.as_str())
        .bind(&submission.answer)
        .bind(submission.is_correct)
        .bind(submission.score)
        .bind(&submission.feedback)
        .bind(details)
        .bind(i64::from(submission.attempt))
        .bind(i64::from(submission.time_spent_secs))
        .bind(submission.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn get_section_progress(
        &self,
        user: &UserId,
        section: Section,
    ) -> Result<Option<SectionProgress>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    user_id, section, correct_answers, total_questions,
                    completion_percentage, average_score
                FROM section_progress
                WHERE user_id = ?1 AND section = ?2
            ",
        )
        .bind(user.as_str())
        .bind(section.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let section: String = row.try_get("section").map_err(ser)?;
        let percentage: i64 = row.try_get("completion_percentage").map_err(ser)?;
        Ok(Some(SectionProgress {
            user_id: user_id(row.try_get("user_id").map_err(ser)?)?,
            section: parse_section(&section)?,
            correct_answers: u32_from_i64(
                "correct_answers",
                row.try_get("correct_answers").map_err(ser)?,
            )?,
            total_questions: u32_from_i64(
                "total_questions",
                row.try_get("total_questions").map_err(ser)?,
            )?,
            completion_percentage: u8::try_from(percentage)
                .map_err(|_| ser(format!("invalid completion_percentage: {percentage}")))?,
            average_score: row.try_get("average_score").map_err(ser)?,
        }))
    }

    async fn upsert_section_progress(
        &self,
        progress: &SectionProgress,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO section_progress (
                    user_id, section, correct_answers, total_questions,
                    completion_percentage, average_score
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(user_id, section) DO UPDATE SET
                    correct_answers = excluded.correct_answers,
                    total_questions = excluded.total_questions,
                    completion_percentage = excluded.completion_percentage,
                    average_score = excluded.average_score
            ",
        )
        .bind(progress.user_id.as_str())
        .bind(progress.section.as_str())
        .bind(i64::from(progress.correct_answers))
        .bind(i64::from(progress.total_questions))
        .bind(i64::from(progress.completion_percentage))
        .bind(progress.average_score)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }
}
