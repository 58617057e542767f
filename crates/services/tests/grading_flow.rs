use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use services::{
    Clock, FALLBACK_FEEDBACK, FALLBACK_SCORE, GradingError, GradingService, LanguageModel,
    LlmError, StructuredRequest,
};
use storage::repository::{Storage, SubmissionRepository};
use tracker_core::model::{
    Answer, PracticeQuestion, QuestionId, QuestionKind, Section, SubmissionError, UserId,
};
use tracker_core::time::fixed_now;

/// Returns the same reply for every call and keeps the last request.
struct FixedReply {
    reply: Result<String, u16>,
    last: Mutex<Option<StructuredRequest>>,
}

impl FixedReply {
    fn ok(body: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(body.into()),
            last: Mutex::new(None),
        })
    }

    fn status(code: u16) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(code),
            last: Mutex::new(None),
        })
    }
}

#[async_trait]
impl LanguageModel for FixedReply {
    async fn generate(&self, request: &StructuredRequest) -> Result<String, LlmError> {
        *self.last.lock().unwrap() = Some(request.clone());
        match &self.reply {
            Ok(body) => Ok(body.clone()),
            Err(code) => Err(LlmError::HttpStatus(
                reqwest::StatusCode::from_u16(*code).unwrap(),
            )),
        }
    }
}

fn service(model: Arc<FixedReply>) -> (GradingService, Storage) {
    let storage = Storage::in_memory();
    let svc = GradingService::new(
        Clock::fixed(fixed_now()),
        model,
        Arc::clone(&storage.submissions),
    );
    (svc, storage)
}

fn user() -> UserId {
    UserId::new("learner").unwrap()
}

fn essay() -> PracticeQuestion {
    PracticeQuestion {
        id: QuestionId::new("we-1").unwrap(),
        section: Section::Writing,
        kind: QuestionKind::Essay,
        prompt: "Should cities ban cars from their centres?".into(),
        passage: None,
        expected: None,
    }
}

fn essay_reply(score: f64) -> String {
    json!({
        "score": score,
        "feedback": "Clear position, limited development.",
        "details": {
            "content": 80, "form": 90, "development": 75, "grammar": 85,
            "linguistic_range": 70, "vocabulary": 88, "spelling": 95
        }
    })
    .to_string()
}

#[tokio::test]
async fn essay_scored_85_updates_section_progress() {
    let model = FixedReply::ok(essay_reply(85.0));
    let (svc, _) = service(model.clone());

    let graded = svc
        .submit(&user(), &essay(), Answer::Text("Cars should go.".into()), 240)
        .await
        .unwrap();
    assert!((graded.score - 85.0).abs() < f64::EPSILON);
    assert!(graded.is_correct);
    assert_eq!(graded.attempt, 1);
    assert_eq!(graded.details.len(), 7);
    // Criterion scores are clamped into the band.
    assert!((graded.details["spelling"] - 90.0).abs() < f64::EPSILON);

    let progress = svc.section_progress(&user(), Section::Writing).await.unwrap();
    assert_eq!(progress.total_questions, 1);
    assert_eq!(progress.correct_answers, 1);
    assert_eq!(progress.completion_percentage, 100);
    assert!((progress.average_score - 85.0).abs() < f64::EPSILON);

    let request = model.last.lock().unwrap().clone().unwrap();
    assert_eq!(request.schema_name, "essay_grade");
    assert!(request.system_prompt.contains("linguistic_range"));
    assert!(request.user_prompt.contains("ban cars"));
}

#[tokio::test]
async fn malformed_reply_stores_fallback_score() {
    let (svc, storage) = service(FixedReply::ok("I think this essay is quite good!"));

    let graded = svc
        .submit(&user(), &essay(), Answer::Text("Cars should go.".into()), 60)
        .await
        .unwrap();
    assert!((graded.score - FALLBACK_SCORE).abs() < f64::EPSILON);
    assert_eq!(graded.feedback, FALLBACK_FEEDBACK);
    assert!(!graded.is_correct);

    let stored = storage
        .submissions
        .get_submission(&user(), &essay().id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, graded);
}

#[tokio::test]
async fn missing_criterion_counts_as_malformed() {
    let reply = json!({"score": 80, "feedback": "ok", "details": {"content": 80}}).to_string();
    let (svc, _) = service(FixedReply::ok(reply));

    let graded = svc
        .submit(&user(), &essay(), Answer::Text("text".into()), 0)
        .await
        .unwrap();
    assert!((graded.score - FALLBACK_SCORE).abs() < f64::EPSILON);
}

#[tokio::test]
async fn transport_failure_stores_fallback_score() {
    let (svc, _) = service(FixedReply::status(503));

    let graded = svc
        .submit(&user(), &essay(), Answer::Text("text".into()), 0)
        .await
        .unwrap();
    assert!((graded.score - FALLBACK_SCORE).abs() < f64::EPSILON);
    assert_eq!(graded.feedback, FALLBACK_FEEDBACK);

    let progress = svc.section_progress(&user(), Section::Writing).await.unwrap();
    assert_eq!(progress.total_questions, 1);
    assert_eq!(progress.correct_answers, 0);
}

#[tokio::test]
async fn objective_questions_skip_the_model() {
    let model = FixedReply::status(500);
    let (svc, _) = service(model.clone());
    let question = PracticeQuestion {
        id: QuestionId::new("rmc-1").unwrap(),
        section: Section::Reading,
        kind: QuestionKind::MultipleChoice,
        prompt: "Which statements are supported?".into(),
        passage: Some("...".into()),
        expected: Some(Answer::Choices(vec!["A".into(), "C".into()])),
    };

    let wrong = svc
        .submit(&user(), &question, Answer::Choices(vec!["A".into()]), 30)
        .await
        .unwrap();
    assert!(wrong.score.abs() < f64::EPSILON);
    assert!(!wrong.is_correct);

    let right = svc
        .submit(&user(), &question, Answer::Choices(vec!["C".into(), "A".into()]), 20)
        .await
        .unwrap();
    assert!((right.score - 90.0).abs() < f64::EPSILON);
    assert!(right.is_correct);
    assert_eq!(right.attempt, 2);

    let progress = svc.section_progress(&user(), Section::Reading).await.unwrap();
    assert_eq!(progress.total_questions, 2);
    assert_eq!(progress.correct_answers, 1);
    assert_eq!(progress.completion_percentage, 50);
    assert!((progress.average_score - 45.0).abs() < 1e-9);
    assert!(model.last.lock().unwrap().is_none());
}

#[tokio::test]
async fn invalid_submissions_are_rejected() {
    let (svc, _) = service(FixedReply::status(500));

    let err = svc
        .submit(&user(), &essay(), Answer::Text("   ".into()), 0)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GradingError::Submission(SubmissionError::EmptyAnswer)
    ));

    let err = svc
        .submit(&user(), &essay(), Answer::Choice("A".into()), 0)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GradingError::Submission(SubmissionError::AnswerShapeMismatch(QuestionKind::Essay))
    ));

    let keyless = PracticeQuestion {
        kind: QuestionKind::SingleChoice,
        ..essay()
    };
    let err = svc
        .submit(&user(), &keyless, Answer::Choice("A".into()), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, GradingError::MissingAnswerKey(_)));
}
