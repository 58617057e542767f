//! Server-side storage for in-progress comprehension checks.
//!
//! One attempt per (user, week, task). Each access slides the expiry forward; an
//! expired attempt behaves as if it never existed.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracker_core::model::{QuizAttempt, TaskId, UserId, WeekNumber};

pub const DEFAULT_ATTEMPT_TTL_MINS: i64 = 30;

/// Attempt lifetime from `TRACKER_ATTEMPT_TTL_MINS`, falling back to the default
/// when unset, unparsable or not positive.
#[must_use]
pub fn attempt_ttl_from_env() -> Duration {
    let minutes = std::env::var("TRACKER_ATTEMPT_TTL_MINS")
        .ok()
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|m| *m > 0)
        .unwrap_or(DEFAULT_ATTEMPT_TTL_MINS);
    Duration::minutes(minutes)
}

type SessionKey = (UserId, WeekNumber, TaskId);

#[derive(Debug)]
struct Session {
    attempt: QuizAttempt,
    expires_at: DateTime<Utc>,
}

impl Session {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug)]
pub struct AttemptSessions {
    ttl: Duration,
    sessions: Mutex<HashMap<SessionKey, Session>>,
}

impl Default for AttemptSessions {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_ATTEMPT_TTL_MINS))
    }
}

impl AttemptSessions {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store an attempt for `user`, replacing any earlier one for the same task.
    pub async fn insert(&self, user: &UserId, attempt: QuizAttempt, now: DateTime<Utc>) {
        let key = (user.clone(), attempt.week(), attempt.task_id().clone());
        let session = Session {
            attempt,
            expires_at: now + self.ttl,
        };
        self.sessions.lock().await.insert(key, session);
    }

    /// Snapshot of the live attempt, if any.
    pub async fn get(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
        now: DateTime<Utc>,
    ) -> Option<QuizAttempt> {
        self.update(user, week, task, now, |attempt| attempt.clone()).await
    }

    /// Run `f` against the live attempt. Returns `None` when there is no live attempt.
    pub async fn update<R>(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut QuizAttempt) -> R,
    ) -> Option<R> {
        let mut sessions = self.sessions.lock().await;
        let key = (user.clone(), week, task.clone());
        match sessions.get_mut(&key) {
            Some(session) if session.is_live(now) => {
                session.expires_at = now + self.ttl;
                Some(f(&mut session.attempt))
            }
            Some(_) => {
                sessions.remove(&key);
                tracing::debug!(user = %user, week = %week, task = %task, "comprehension check expired");
                None
            }
            None => None,
        }
    }

    /// Discard the attempt, returning it if it was still live.
    pub async fn remove(
        &self,
        user: &UserId,
        week: WeekNumber,
        task: &TaskId,
        now: DateTime<Utc>,
    ) -> Option<QuizAttempt> {
        self.sessions
            .lock()
            .await
            .remove(&(user.clone(), week, task.clone()))
            .filter(|s| s.is_live(now))
            .map(|s| s.attempt)
    }

    /// Drop every expired attempt. Returns how many were removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.is_live(now));
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracker_core::model::{QuizQuestion, QuizSet, WeekNumber};
    use tracker_core::time::fixed_now;

    fn attempt(week: u32, task: &str) -> QuizAttempt {
        let question = QuizQuestion {
            question: "Q".into(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: 0,
            explanation: "e".into(),
        };
        let set = QuizSet::new(vec![question.clone(), question.clone(), question]).unwrap();
        QuizAttempt::new(WeekNumber::new(week).unwrap(), TaskId::new(task).unwrap(), set)
    }

    fn user() -> UserId {
        UserId::new("u1").unwrap()
    }

    fn week(n: u32) -> WeekNumber {
        WeekNumber::new(n).unwrap()
    }

    #[tokio::test]
    async fn attempts_are_keyed_by_user_week_and_task() {
        let sessions = AttemptSessions::new(Duration::minutes(10));
        let now = fixed_now();
        sessions.insert(&user(), attempt(1, "1-1"), now).await;

        let task = TaskId::new("1-1").unwrap();
        assert!(sessions.get(&user(), week(1), &task, now).await.is_some());
        assert!(
            sessions
                .get(&UserId::new("u2").unwrap(), week(1), &task, now)
                .await
                .is_none()
        );
        assert!(
            sessions
                .get(&user(), week(1), &TaskId::new("1-2").unwrap(), now)
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn access_slides_expiry() {
        let sessions = AttemptSessions::new(Duration::minutes(10));
        let task = TaskId::new("1-1").unwrap();
        let start = fixed_now();
        sessions.insert(&user(), attempt(1, "1-1"), start).await;

        let later = start + Duration::minutes(8);
        let selected = sessions
            .update(&user(), week(1), &task, later, |a| a.select(2))
            .await;
        assert_eq!(selected, Some(Ok(())));

        let still_live = later + Duration::minutes(8);
        let snapshot = sessions.get(&user(), week(1), &task, still_live).await.unwrap();
        assert_eq!(snapshot.answers()[0], Some(2));

        let expired = still_live + Duration::minutes(10);
        assert!(sessions.get(&user(), week(1), &task, expired).await.is_none());
        assert!(sessions.get(&user(), week(1), &task, still_live).await.is_none());
    }

    #[tokio::test]
    async fn remove_and_purge() {
        let sessions = AttemptSessions::new(Duration::minutes(1));
        let now = fixed_now();
        sessions.insert(&user(), attempt(1, "1-1"), now).await;
        sessions.insert(&user(), attempt(1, "1-2"), now).await;

        let task = TaskId::new("1-1").unwrap();
        assert!(sessions.remove(&user(), week(1), &task, now).await.is_some());
        assert!(sessions.remove(&user(), week(1), &task, now).await.is_none());

        assert_eq!(sessions.purge_expired(now + Duration::minutes(2)).await, 1);
    }

    #[tokio::test]
    async fn same_task_id_in_two_weeks_is_two_attempts() {
        let sessions = AttemptSessions::new(Duration::minutes(10));
        let now = fixed_now();
        let task = TaskId::new("read").unwrap();
        sessions.insert(&user(), attempt(1, "read"), now).await;
        sessions.insert(&user(), attempt(2, "read"), now).await;

        let second = sessions.get(&user(), week(2), &task, now).await.unwrap();
        assert_eq!(second.week(), week(2));

        assert!(sessions.remove(&user(), week(1), &task, now).await.is_some());
        assert!(sessions.get(&user(), week(2), &task, now).await.is_some());
    }
}
