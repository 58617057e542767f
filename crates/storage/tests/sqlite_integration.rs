use std::collections::BTreeMap;

use chrono::Duration;
use storage::repository::{
    CheckInRepository, SubmissionRepository, TaskRepository, WeekProgressRepository,
};
use storage::sqlite::SqliteRepository;
use tracker_core::model::{
    DailyCheckIn, GradedSubmission, QuestionId, Section, SectionProgress, TaskId, UserId,
    WeekNumber, WeekProgress,
};
use tracker_core::time::fixed_now;

async fn repo(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn user() -> UserId {
    UserId::new("learner-1").unwrap()
}

#[tokio::test]
async fn sqlite_task_and_week_progress_round_trip() {
    let repo = repo("memdb_tasks").await;
    let week = WeekNumber::new(1).unwrap();
    let t1 = TaskId::new("1-1").unwrap();
    let t2 = TaskId::new("1-2").unwrap();

    assert!(!repo.get_task_state(&user(), week, &t1).await.unwrap());
    repo.set_task_state(&user(), week, &t1, true, fixed_now())
        .await
        .unwrap();
    repo.set_task_state(&user(), week, &t2, true, fixed_now())
        .await
        .unwrap();
    repo.set_task_state(&user(), week, &t2, false, fixed_now())
        .await
        .unwrap();

    let tasks = repo.list_tasks(&user(), week).await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert!(tasks[0].completed);
    assert!(!tasks[1].completed);

    repo.upsert_week_progress(&WeekProgress::new(user(), week, 1, 3))
        .await
        .unwrap();
    repo.upsert_week_progress(&WeekProgress::new(user(), week, 2, 3))
        .await
        .unwrap();
    let stored = repo
        .get_week_progress(&user(), week)
        .await
        .unwrap()
        .expect("week stored");
    assert_eq!(stored.tasks_completed(), 2);
    assert_eq!(stored.completion_percentage(), 67);
    assert_eq!(repo.list_week_progress(&user()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn sqlite_check_ins_upsert_per_day() {
    let repo = repo("memdb_check_ins").await;
    let now = fixed_now();
    let today = now.date_naive();
    let yesterday = today - Duration::days(1);

    repo.upsert_check_in(&DailyCheckIn::new(user(), yesterday, vec!["x".into()], "", 1, now))
        .await
        .unwrap();
    repo.upsert_check_in(&DailyCheckIn::new(user(), today, vec!["a".into()], "first", 2, now))
        .await
        .unwrap();
    repo.upsert_check_in(&DailyCheckIn::new(
        user(),
        today,
        vec!["b".into(), "c".into()],
        "second",
        2,
        now,
    ))
    .await
    .unwrap();

    let dates = repo.check_in_dates_since(&user(), yesterday).await.unwrap();
    assert_eq!(dates, [yesterday, today]);
    let only_today = repo.check_in_dates_since(&user(), today).await.unwrap();
    assert_eq!(only_today, [today]);

    let stored = repo.get_check_in(&user(), today).await.unwrap().unwrap();
    assert_eq!(stored.activities(), ["b", "c"]);
    assert_eq!(stored.notes(), "second");
    assert_eq!(stored.streak_snapshot(), 2);
}

#[tokio::test]
async fn sqlite_submissions_and_section_progress() {
    let repo = repo("memdb_submissions").await;
    let question = QuestionId::new("essay-7").unwrap();
    let mut details = BTreeMap::new();
    details.insert("content".to_string(), 3.0);
    let mut submission = GradedSubmission {
        user_id: user(),
        question_id: question.clone(),
        section: Section::Writing,
        answer: "An essay".into(),
        is_correct: true,
        score: 85.0,
        feedback: "Good structure".into(),
        details,
        attempt: 1,
        time_spent_secs: 600,
        submitted_at: fixed_now(),
    };
    repo.upsert_submission(&submission).await.unwrap();
    submission.attempt = 2;
    submission.score = 60.0;
    submission.is_correct = false;
    repo.upsert_submission(&submission).await.unwrap();

    let stored = repo
        .get_submission(&user(), &question)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, submission);

    let mut progress = SectionProgress::empty(user(), Section::Writing);
    progress.record(true, 85.0);
    repo.upsert_section_progress(&progress).await.unwrap();
    let stored = repo
        .get_section_progress(&user(), Section::Writing)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, progress);
    assert!(
        repo.get_section_progress(&user(), Section::Reading)
            .await
            .unwrap()
            .is_none()
    );
}
